//! First tier: sentences from an OpenAI-compatible chat completion endpoint.

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::{
    stamp::{BatchStamp, SentenceDraft},
    ContentProvider,
};
use crate::{
    config::{CredentialProvider, RemoteConfig, API_KEY_VAR},
    db::SentenceRecord,
    errors::SourceError,
};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::log_debug;

pub const REMOTE_TAG: &str = "remote";

const SYSTEM_PROMPT: &str = "You are a Mandarin Chinese teacher writing short, natural \
sentences for self-study. Reply with JSON only, no markdown, no commentary.";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Payload the model must return. Any extra or missing key rejects the batch.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeneratedBatch {
    pub sentences: Vec<GeneratedSentence>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeneratedSentence {
    pub text: String,
    pub pronunciation: String,
    pub translation: String,
    pub context: String,
    pub difficulty: Difficulty,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Difficulty {
    Level(u8),
    Label(String),
}

fn build_prompt(count: usize, date: NaiveDate) -> String {
    format!(
        "Write {count} different everyday Mandarin sentences for learners, for {date}. \
         Return exactly this JSON shape: \
         {{\"sentences\":[{{\"text\":\"<simplified Chinese>\",\"pronunciation\":\"<pinyin with tone marks>\",\
         \"translation\":\"<English>\",\"context\":\"<when to use it>\",\"difficulty\":\"beginner|intermediate|advanced\"}}]}}"
    )
}

fn preview(body: &str) -> String {
    const LIMIT: usize = 200;
    if body.chars().count() <= LIMIT {
        body.to_string()
    } else {
        let cut: String = body.chars().take(LIMIT).collect();
        format!("{cut}…")
    }
}

/// Extracts and validates the sentence batch from a raw completion body.
pub fn parse_completion(body: &str) -> Result<GeneratedBatch, SourceError> {
    let completion: ChatCompletion = serde_json::from_str(body)
        .map_err(|err| SourceError::Format(format!("completion envelope: {err}")))?;

    let content = completion
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| SourceError::Format("completion has no message content".into()))?;

    let batch: GeneratedBatch = serde_json::from_str(content.trim()).map_err(|err| {
        SourceError::Format(format!("sentence payload: {err} in '{}'", preview(&content)))
    })?;

    if batch.sentences.is_empty() {
        return Err(SourceError::Format("sentence payload is empty".into()));
    }

    if let Some(position) = batch.sentences.iter().position(|s| {
        s.text.trim().is_empty() || s.pronunciation.trim().is_empty() || s.translation.trim().is_empty()
    }) {
        return Err(SourceError::Format(format!(
            "sentence {position} has blank text, pronunciation or translation"
        )));
    }

    Ok(batch)
}

pub struct RemoteProvider {
    client: reqwest::Client,
    config: RemoteConfig,
    credentials: Arc<dyn CredentialProvider>,
}

impl RemoteProvider {
    /// No request timeout is set here; callers bound the whole refresh instead.
    pub fn new(
        config: RemoteConfig,
        credentials: Arc<dyn CredentialProvider>,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            config,
            credentials,
        })
    }

    async fn request_completion(
        &self,
        api_key: &str,
        count: usize,
        date: NaiveDate,
    ) -> Result<String, SourceError> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: build_prompt(count, date),
                },
            ],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|err| SourceError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Transport(format!(
                "provider returned {status}: {}",
                preview(&body)
            )));
        }

        response
            .text()
            .await
            .map_err(|err| SourceError::Transport(format!("failed to read body: {err}")))
    }
}

#[async_trait]
impl ContentProvider for RemoteProvider {
    fn tag(&self) -> &'static str {
        REMOTE_TAG
    }

    async fn generate(
        &self,
        count: usize,
        date: NaiveDate,
        cancel: &CancellationToken,
    ) -> Result<Vec<SentenceRecord>, SourceError> {
        let api_key = self
            .credentials
            .api_key()
            .ok_or_else(|| SourceError::Configuration(format!("{API_KEY_VAR} is not set")))?;

        let body = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(SourceError::Cancelled),
            body = self.request_completion(&api_key, count, date) => body?,
        };

        let batch = parse_completion(&body)?;
        log_debug!(
            "remote provider returned {} sentences (asked for {count})",
            batch.sentences.len()
        );

        // Short batches are accepted as-is; long ones are cut to what was asked.
        let drafts = batch
            .sentences
            .into_iter()
            .take(count)
            .map(|s| SentenceDraft {
                hanzi: s.text.trim().to_string(),
                pinyin: s.pronunciation.trim().to_string(),
                english: s.translation.trim().to_string(),
            })
            .collect();

        Ok(BatchStamp::next(REMOTE_TAG).apply(drafts, date))
    }
}
