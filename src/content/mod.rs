pub mod chain;
pub mod curated;
pub mod remote;
pub mod stamp;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio_util::sync::CancellationToken;

use crate::{db::SentenceRecord, errors::SourceError};

pub use chain::ContentSourceChain;
pub use curated::{seed_batch, CuratedProvider};
pub use remote::RemoteProvider;

/// One tier of the content chain.
#[async_trait]
pub trait ContentProvider: Send + Sync {
    /// Prefix used in the ids this provider mints.
    fn tag(&self) -> &'static str;

    /// Makes a single attempt at a batch of up to `count` sentences for `date`.
    async fn generate(
        &self,
        count: usize,
        date: NaiveDate,
        cancel: &CancellationToken,
    ) -> Result<Vec<SentenceRecord>, SourceError>;
}
