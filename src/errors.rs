//! Error taxonomy shared by the content chain, the store and the repository.

use thiserror::Error;

/// Why a single content tier did not produce a batch.
///
/// Everything except `Cancelled` is absorbed by the chain and triggers the
/// next tier.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("provider not configured: {0}")]
    Configuration(String),

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("unexpected response format: {0}")]
    Format(String),

    #[error("generation cancelled")]
    Cancelled,
}

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("all {tiers} content tiers failed; last error: {last}")]
    Exhausted { tiers: usize, last: String },

    #[error("generation cancelled")]
    Cancelled,
}

/// A store read or write failed. Never retried.
#[derive(Debug, Error)]
#[error("persistence failure: {0:#}")]
pub struct PersistenceError(#[from] anyhow::Error);

impl PersistenceError {
    pub fn msg(message: impl std::fmt::Display) -> Self {
        Self(anyhow::anyhow!("{message}"))
    }
}

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("could not generate sentences: {0}")]
    Generation(String),

    #[error("refresh cancelled")]
    Cancelled,

    #[error("refresh timed out after {0:?}")]
    TimedOut(std::time::Duration),
}

impl From<ChainError> for RepositoryError {
    fn from(err: ChainError) -> Self {
        match err {
            ChainError::Cancelled => RepositoryError::Cancelled,
            other => RepositoryError::Generation(other.to_string()),
        }
    }
}

pub type StoreResult<T> = Result<T, PersistenceError>;
