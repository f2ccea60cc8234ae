use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tokio_util::sync::CancellationToken;

use super::{clock::Clock, retention::RetentionPolicy};
use crate::{
    content::{seed_batch, ContentSourceChain},
    db::{models::window_bounds, DailyPack, SentenceRecord, SentenceStore},
    errors::{ChainError, RepositoryError},
};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// What `seed_if_empty` ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    /// Today's pack already had sentences.
    AlreadySeeded,
    /// A content tier produced the batch.
    Generated(usize),
    /// Every tier failed and the bundled seed batch was stored.
    Bundled(usize),
}

/// Entry point for everything that reads or writes sentences.
///
/// Writes flow chain -> repository -> store and are always additive: new
/// batches are inserted next to earlier ones for the same day.
#[derive(Clone)]
pub struct SentenceRepository {
    store: Arc<dyn SentenceStore>,
    chain: ContentSourceChain,
    clock: Arc<dyn Clock>,
    batch_size: usize,
    retention: RetentionPolicy,
}

impl SentenceRepository {
    pub fn new(
        store: Arc<dyn SentenceStore>,
        chain: ContentSourceChain,
        clock: Arc<dyn Clock>,
        batch_size: usize,
        retention: RetentionPolicy,
    ) -> Self {
        Self {
            store,
            chain,
            clock,
            batch_size,
            retention,
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn store(&self) -> &Arc<dyn SentenceStore> {
        &self.store
    }

    /// Fills today's pack on first use. A populated day is left alone.
    pub async fn seed_if_empty(
        &self,
        cancel: &CancellationToken,
    ) -> Result<SeedOutcome, RepositoryError> {
        let today = self.today();
        if !self.store.fetch_pack(today).await?.is_empty() {
            return Ok(SeedOutcome::AlreadySeeded);
        }

        let (records, outcome) = match self.chain.generate(self.batch_size, today, cancel).await {
            Ok(records) => {
                let count = records.len();
                (records, SeedOutcome::Generated(count))
            }
            Err(ChainError::Exhausted { last, .. }) => {
                log_warn!("content chain unreachable ({last}); storing bundled seed batch");
                let records = seed_batch(today);
                let count = records.len();
                (records, SeedOutcome::Bundled(count))
            }
            Err(err) => return Err(err.into()),
        };

        self.store_batch(&records).await?;
        log_info!("seeded {today} with {outcome:?}");
        Ok(outcome)
    }

    /// Generates a fresh batch for today and adds it to the store.
    ///
    /// Earlier batches for the day stay in place; `fetch_pack` shows the newest
    /// records and `fetch_all` shows every one. When generation or the batch
    /// write fails nothing is written.
    pub async fn refresh(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<SentenceRecord>, RepositoryError> {
        let today = self.today();
        let records = self.chain.generate(self.batch_size, today, cancel).await?;
        self.store_batch(&records).await?;
        log_info!("refresh added {} sentences to {today}", records.len());
        Ok(records)
    }

    /// Once the batch is committed it stays; a failed prune is retried on the
    /// next write.
    async fn store_batch(&self, records: &[SentenceRecord]) -> Result<(), RepositoryError> {
        self.store.upsert_batch(records).await?;
        if let Err(err) = self.apply_retention().await {
            log_warn!("retention pass failed after storing {} sentences: {err}", records.len());
        }
        Ok(())
    }

    /// Prunes records the retention policy has expired. Returns how many went.
    pub async fn apply_retention(&self) -> Result<usize, RepositoryError> {
        let Some(cutoff) = self.retention.cutoff(self.clock.now().with_timezone(&Utc)) else {
            return Ok(0);
        };
        let removed = self
            .store
            .prune_created_before(cutoff, self.retention.keeps_favorites())
            .await?;
        if removed > 0 {
            log_info!("retention removed {removed} sentences created before {cutoff}");
        }
        Ok(removed)
    }

    pub async fn fetch_pack(&self, date: NaiveDate) -> Result<Vec<SentenceRecord>, RepositoryError> {
        Ok(self.store.fetch_pack(date).await?)
    }

    pub async fn today_pack(&self) -> Result<Vec<SentenceRecord>, RepositoryError> {
        self.fetch_pack(self.today()).await
    }

    pub async fn fetch_all(&self, date: NaiveDate) -> Result<Vec<SentenceRecord>, RepositoryError> {
        Ok(self.store.fetch_all(date).await?)
    }

    /// Every sentence stored for `date`, grouped in batch order.
    pub async fn daily_pack(&self, date: NaiveDate) -> Result<DailyPack, RepositoryError> {
        let records = self.store.fetch_all(date).await?;
        Ok(DailyPack::from_records(date, records))
    }

    pub async fn find(&self, id: &str) -> Result<Option<SentenceRecord>, RepositoryError> {
        Ok(self.store.fetch(id).await?)
    }

    pub async fn favorites(&self) -> Result<Vec<SentenceRecord>, RepositoryError> {
        Ok(self.store.fetch_favorites().await?)
    }

    /// Records from the last `days` calendar days, today included, newest first.
    pub async fn history_window(&self, days: u32) -> Result<Vec<SentenceRecord>, RepositoryError> {
        let (start, end) = window_bounds(self.today(), days);
        Ok(self.store.fetch_range(start, end).await?)
    }

    pub async fn toggle_learned(&self, id: &str) -> Result<Option<bool>, RepositoryError> {
        Ok(self.store.toggle_learned(id).await?)
    }

    pub async fn toggle_favorite(&self, id: &str) -> Result<Option<bool>, RepositoryError> {
        Ok(self.store.toggle_favorite(id).await?)
    }

    pub async fn delete(&self, record: &SentenceRecord) -> Result<bool, RepositoryError> {
        Ok(self.store.delete(record).await?)
    }
}
