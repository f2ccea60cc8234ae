//! Audio and speech collaborators.
//!
//! The crate only consumes these. Platform backends live in the embedding
//! application; the no-op versions here keep the CLI and tests self-contained.

mod pronouncer;

use anyhow::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

pub use pronouncer::{Pronouncer, PRONUNCIATION_LOCALE};

/// Audio captured from the microphone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioSource {
    File(PathBuf),
    Pcm { sample_rate: u32, samples: Vec<i16> },
}

pub trait AudioPlayer: Send + Sync {
    fn play(&self, uri: &str) -> Result<()>;
    fn stop(&self);
}

pub trait SpeechSynthesizer: Send + Sync {
    fn speak(&self, text: &str, locale: &str) -> Result<()>;
    fn stop(&self);
}

#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    async fn transcribe(&self, audio: AudioSource, cancel: &CancellationToken) -> Result<String>;
}

pub trait AudioCapture: Send + Sync {
    fn start(&self) -> Result<()>;
    fn stop(&self) -> Result<AudioSource>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAudio;

impl AudioPlayer for NoopAudio {
    fn play(&self, _uri: &str) -> Result<()> {
        Ok(())
    }

    fn stop(&self) {}
}

impl SpeechSynthesizer for NoopAudio {
    fn speak(&self, _text: &str, _locale: &str) -> Result<()> {
        Ok(())
    }

    fn stop(&self) {}
}

#[async_trait]
impl SpeechRecognizer for NoopAudio {
    async fn transcribe(&self, _audio: AudioSource, cancel: &CancellationToken) -> Result<String> {
        if cancel.is_cancelled() {
            anyhow::bail!("transcription cancelled");
        }
        Ok(String::new())
    }
}

impl AudioCapture for NoopAudio {
    fn start(&self) -> Result<()> {
        Ok(())
    }

    fn stop(&self) -> Result<AudioSource> {
        Ok(AudioSource::Pcm {
            sample_rate: 16_000,
            samples: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_recognizer_respects_cancellation() {
        let cancel = CancellationToken::new();
        let audio = AudioCapture::stop(&NoopAudio).unwrap();
        assert_eq!(NoopAudio.transcribe(audio.clone(), &cancel).await.unwrap(), "");

        cancel.cancel();
        assert!(NoopAudio.transcribe(audio, &cancel).await.is_err());
    }
}
