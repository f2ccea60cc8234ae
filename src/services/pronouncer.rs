use anyhow::Result;
use std::sync::Arc;

use super::{AudioPlayer, SpeechSynthesizer};
use crate::db::SentenceRecord;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::log_debug;

pub const PRONUNCIATION_LOCALE: &str = "zh-CN";

/// Speaks a sentence with recorded audio when it has some, synthesized
/// Mandarin otherwise.
#[derive(Clone)]
pub struct Pronouncer {
    player: Arc<dyn AudioPlayer>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
}

impl Pronouncer {
    pub fn new(player: Arc<dyn AudioPlayer>, synthesizer: Arc<dyn SpeechSynthesizer>) -> Self {
        Self {
            player,
            synthesizer,
        }
    }

    pub fn pronounce(&self, record: &SentenceRecord) -> Result<()> {
        self.stop();
        match record.audio_reference.as_deref() {
            Some(uri) => {
                log_debug!("playing recorded audio for {}", record.id);
                self.player.play(uri)
            }
            None => self.synthesizer.speak(&record.hanzi, PRONUNCIATION_LOCALE),
        }
    }

    pub fn stop(&self) {
        self.player.stop();
        self.synthesizer.stop();
    }
}
