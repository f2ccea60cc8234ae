//! Storage seam used by the repository and the history navigator.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::{db::models::SentenceRecord, errors::StoreResult};

/// Maximum number of records returned by [`SentenceStore::fetch_pack`].
pub const PACK_SIZE: usize = 5;

/// Identity-keyed sentence storage with a day-granularity index.
///
/// Implementations must serialize mutations and must never expose a partially
/// applied write to readers.
#[async_trait]
pub trait SentenceStore: Send + Sync {
    /// Newest [`PACK_SIZE`] records for `date`, ordered by
    /// `(created_at desc, index_in_pack asc)`.
    async fn fetch_pack(&self, date: NaiveDate) -> StoreResult<Vec<SentenceRecord>>;

    /// Every record for `date`, newest first.
    async fn fetch_all(&self, date: NaiveDate) -> StoreResult<Vec<SentenceRecord>>;

    /// Every record with `start <= pack_date < end`, newest first.
    async fn fetch_range(&self, start: NaiveDate, end: NaiveDate)
        -> StoreResult<Vec<SentenceRecord>>;

    /// Looks a single record up by id.
    async fn fetch(&self, id: &str) -> StoreResult<Option<SentenceRecord>>;

    async fn fetch_favorites(&self) -> StoreResult<Vec<SentenceRecord>>;

    async fn count_all(&self) -> StoreResult<u64>;

    /// Insert or replace by id. `created_at` of an existing row is kept.
    async fn upsert(&self, record: &SentenceRecord) -> StoreResult<()>;

    /// Upserts every record atomically: either all land or none do.
    async fn upsert_batch(&self, records: &[SentenceRecord]) -> StoreResult<()>;

    /// Flips `learned`. Returns the new value, or `None` if `id` is unknown.
    async fn toggle_learned(&self, id: &str) -> StoreResult<Option<bool>>;

    /// Flips `favorite`. Returns the new value, or `None` if `id` is unknown.
    async fn toggle_favorite(&self, id: &str) -> StoreResult<Option<bool>>;

    /// Removes the record with the same id. Returns whether a row was removed.
    async fn delete(&self, record: &SentenceRecord) -> StoreResult<bool>;

    /// Removes records created before `cutoff`. Returns the number removed.
    async fn prune_created_before(
        &self,
        cutoff: DateTime<Utc>,
        keep_favorites: bool,
    ) -> StoreResult<usize>;
}
