use std::sync::Arc;

use chrono::NaiveDate;
use tokio_util::sync::CancellationToken;

use super::ContentProvider;
use crate::{
    db::SentenceRecord,
    errors::{ChainError, SourceError},
};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// Ordered list of content tiers, tried until one yields a batch.
#[derive(Clone)]
pub struct ContentSourceChain {
    providers: Vec<Arc<dyn ContentProvider>>,
}

impl ContentSourceChain {
    pub fn new(providers: Vec<Arc<dyn ContentProvider>>) -> Self {
        Self { providers }
    }

    pub fn tiers(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.tag()).collect()
    }

    /// Returns the first successful tier's batch.
    ///
    /// Tier failures are logged and absorbed. An error comes back only when the
    /// caller cancels or every tier failed. Nothing is written anywhere.
    pub async fn generate(
        &self,
        count: usize,
        date: NaiveDate,
        cancel: &CancellationToken,
    ) -> Result<Vec<SentenceRecord>, ChainError> {
        if count == 0 {
            return Ok(Vec::new());
        }

        let mut last_failure = String::from("no content tiers configured");

        for provider in &self.providers {
            if cancel.is_cancelled() {
                return Err(ChainError::Cancelled);
            }

            match provider.generate(count, date, cancel).await {
                Ok(records) if !records.is_empty() => {
                    log_info!(
                        "{} tier produced {} sentences for {date}",
                        provider.tag(),
                        records.len()
                    );
                    return Ok(records);
                }
                Ok(_) => {
                    log_warn!("{} tier returned an empty batch; falling back", provider.tag());
                    last_failure = format!("{}: empty batch", provider.tag());
                }
                Err(SourceError::Cancelled) => return Err(ChainError::Cancelled),
                Err(err) => {
                    log_warn!("{} tier failed: {err}; falling back", provider.tag());
                    last_failure = format!("{}: {err}", provider.tag());
                }
            }
        }

        Err(ChainError::Exhausted {
            tiers: self.providers.len(),
            last: last_failure,
        })
    }
}
