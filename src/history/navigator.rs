use std::collections::HashSet;

use chrono::NaiveDate;
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};

use crate::db::{models::window_bounds, SentenceRecord, SentenceStore};
use crate::errors::StoreResult;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = false;

use crate::log_debug;

pub const DEFAULT_WINDOW_DAYS: u32 = 30;

/// Random browser over recently stored sentences.
///
/// Every record shown is appended to `visited`, so moving back and then forward
/// again replays exactly what was seen. Only a step past the end draws a new
/// record, and that draw is the one already offered by `next_preview`.
pub struct HistoryNavigator {
    pool: Vec<SentenceRecord>,
    visited: Vec<SentenceRecord>,
    cursor: Option<usize>,
    previous_preview: Option<SentenceRecord>,
    next_preview: Option<SentenceRecord>,
    avoid_repeats: bool,
    rng: StdRng,
}

impl Default for HistoryNavigator {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryNavigator {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            pool: Vec::new(),
            visited: Vec::new(),
            cursor: None,
            previous_preview: None,
            next_preview: None,
            avoid_repeats: false,
            rng,
        }
    }

    /// When set, draws skip the record under the cursor as long as the pool
    /// has another one. Off by default, which keeps draws uniform.
    pub fn set_avoid_repeats(&mut self, avoid: bool) {
        self.avoid_repeats = avoid;
        self.refresh_previews();
    }

    /// Replaces the pool. The first occurrence of an id wins.
    ///
    /// The visit history is kept, so records seen before a reload can still be
    /// replayed.
    pub fn load_pool(&mut self, records: impl IntoIterator<Item = SentenceRecord>) {
        let mut seen = HashSet::new();
        self.pool = records
            .into_iter()
            .filter(|record| seen.insert(record.id.clone()))
            .collect();
        log_debug!("history pool loaded with {} records", self.pool.len());
        self.refresh_previews();
    }

    /// Loads the last `window_days` days ending at `today` from `store`.
    pub async fn load_from(
        &mut self,
        store: &dyn SentenceStore,
        today: NaiveDate,
        window_days: u32,
    ) -> StoreResult<usize> {
        let (start, end) = window_bounds(today, window_days);
        let records = store.fetch_range(start, end).await?;
        self.load_pool(records);
        Ok(self.pool.len())
    }

    pub fn pool_len(&self) -> usize {
        self.pool.len()
    }

    pub fn visited(&self) -> &[SentenceRecord] {
        &self.visited
    }

    /// Jumps to a fresh random record and makes it the newest visit.
    pub fn pick_random(&mut self) -> Option<&SentenceRecord> {
        let record = self.draw()?;
        self.push(record);
        self.current()
    }

    /// Moves forward. Replays when there is history ahead, otherwise commits
    /// the pending preview.
    pub fn next(&mut self) -> Option<&SentenceRecord> {
        match self.cursor {
            Some(cursor) if cursor + 1 < self.visited.len() => {
                self.cursor = Some(cursor + 1);
                self.refresh_previews();
            }
            _ => {
                let record = match self.next_preview.take() {
                    Some(record) => record,
                    None => self.draw()?,
                };
                self.push(record);
            }
        }
        self.current()
    }

    /// Moves back one visit. A no-op at the start of the history.
    pub fn previous(&mut self) -> Option<&SentenceRecord> {
        if let Some(cursor) = self.cursor.filter(|c| *c > 0) {
            self.cursor = Some(cursor - 1);
            self.refresh_previews();
        }
        self.current()
    }

    pub fn current(&self) -> Option<&SentenceRecord> {
        self.cursor.and_then(|c| self.visited.get(c))
    }

    pub fn can_go_back(&self) -> bool {
        matches!(self.cursor, Some(c) if c > 0)
    }

    pub fn can_go_forward(&self) -> bool {
        match self.cursor {
            Some(c) if c + 1 < self.visited.len() => true,
            _ => !self.pool.is_empty(),
        }
    }

    pub fn previous_preview(&self) -> Option<&SentenceRecord> {
        self.previous_preview.as_ref()
    }

    pub fn next_preview(&self) -> Option<&SentenceRecord> {
        self.next_preview.as_ref()
    }

    fn push(&mut self, record: SentenceRecord) {
        self.visited.push(record);
        self.cursor = Some(self.visited.len() - 1);
        self.refresh_previews();
    }

    fn refresh_previews(&mut self) {
        let Some(cursor) = self.cursor else {
            self.previous_preview = None;
            self.next_preview = None;
            return;
        };
        self.previous_preview = cursor.checked_sub(1).and_then(|i| self.visited.get(i)).cloned();
        let ahead = self.visited.get(cursor + 1).cloned();
        let next = ahead.or_else(|| self.draw());
        self.next_preview = next;
    }

    /// Uniform pick from the pool, optionally skipping the current record.
    fn draw(&mut self) -> Option<SentenceRecord> {
        let current_id = self
            .current()
            .filter(|_| self.avoid_repeats)
            .map(|r| r.id.clone());
        match current_id {
            Some(id) if self.pool.len() > 1 => {
                let candidates: Vec<&SentenceRecord> =
                    self.pool.iter().filter(|r| r.id != id).collect();
                if candidates.is_empty() {
                    return self.pool.choose(&mut self.rng).cloned();
                }
                let index = self.rng.gen_range(0..candidates.len());
                Some(candidates[index].clone())
            }
            _ => self.pool.choose(&mut self.rng).cloned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use chrono::{Duration, Utc};
    use tempfile::tempdir;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, 10).unwrap()
    }

    fn record(id: &str) -> SentenceRecord {
        SentenceRecord::new(id.into(), "字", "zì", id, day(), 0, Utc::now())
    }

    fn pool(ids: &[&str]) -> Vec<SentenceRecord> {
        ids.iter().map(|id| record(id)).collect()
    }

    fn current_id(nav: &HistoryNavigator) -> String {
        nav.current().unwrap().id.clone()
    }

    #[test]
    fn empty_pool_yields_nothing() {
        let mut nav = HistoryNavigator::with_seed(1);
        assert!(nav.pick_random().is_none());
        assert!(nav.next().is_none());
        assert!(nav.previous().is_none());
        assert!(!nav.can_go_back());
        assert!(!nav.can_go_forward());
    }

    #[test]
    fn load_pool_dedupes_by_id() {
        let mut nav = HistoryNavigator::with_seed(1);
        let mut records = pool(&["a", "b", "a"]);
        records[2].english = "duplicate".into();
        nav.load_pool(records);
        assert_eq!(nav.pool_len(), 2);

        for _ in 0..20 {
            let picked = nav.pick_random().unwrap().clone();
            assert_ne!(picked.english, "duplicate");
        }
    }

    #[test]
    fn back_then_forward_replays_the_same_records() {
        let mut nav = HistoryNavigator::with_seed(7);
        nav.load_pool(pool(&["a", "b", "c"]));

        let first = nav.pick_random().unwrap().id.clone();
        let second = nav.next().unwrap().id.clone();
        let third = nav.next().unwrap().id.clone();
        assert_eq!(nav.visited().len(), 3);

        assert_eq!(nav.previous().unwrap().id, second);
        assert_eq!(nav.previous().unwrap().id, first);
        assert!(!nav.can_go_back());
        assert_eq!(nav.next().unwrap().id, second);
        assert_eq!(nav.next().unwrap().id, third);
        assert_eq!(nav.visited().len(), 3);
    }

    #[test]
    fn next_at_the_tail_commits_the_preview() {
        let mut nav = HistoryNavigator::with_seed(42);
        nav.load_pool(pool(&["a", "b", "c", "d"]));
        nav.pick_random();

        let preview = nav.next_preview().unwrap().id.clone();
        assert_eq!(nav.next().unwrap().id, preview);
        assert_eq!(nav.previous_preview().unwrap().id, nav.visited()[0].id);
    }

    #[test]
    fn previews_follow_the_cursor() {
        let mut nav = HistoryNavigator::with_seed(3);
        nav.load_pool(pool(&["a", "b", "c"]));
        nav.pick_random();
        nav.next();
        nav.next();

        nav.previous();
        assert_eq!(nav.previous_preview().unwrap().id, nav.visited()[0].id);
        assert_eq!(nav.next_preview().unwrap().id, nav.visited()[2].id);
        assert!(nav.can_go_forward());

        nav.previous();
        assert!(nav.previous_preview().is_none());
    }

    #[test]
    fn uniform_draws_can_repeat_the_current_record() {
        let mut nav = HistoryNavigator::with_seed(9);
        nav.load_pool(pool(&["a", "b"]));
        let mut last = nav.pick_random().unwrap().id.clone();
        let mut repeated = false;
        for _ in 0..64 {
            let id = nav.next().unwrap().id.clone();
            repeated |= id == last;
            last = id;
        }
        assert!(repeated);
    }

    #[test]
    fn picks_avoid_repeating_the_current_record_when_asked() {
        let mut nav = HistoryNavigator::with_seed(9);
        nav.set_avoid_repeats(true);
        nav.load_pool(pool(&["a", "b"]));
        let mut last = nav.pick_random().unwrap().id.clone();
        for _ in 0..10 {
            let id = nav.next().unwrap().id.clone();
            assert_ne!(id, last);
            last = id;
        }
    }

    #[test]
    fn single_record_pool_repeats_it() {
        let mut nav = HistoryNavigator::with_seed(5);
        nav.load_pool(pool(&["only"]));
        nav.pick_random();
        nav.next();
        assert_eq!(current_id(&nav), "only");
        assert_eq!(nav.visited().len(), 2);
    }

    #[test]
    fn reloading_the_pool_keeps_history() {
        let mut nav = HistoryNavigator::with_seed(4);
        nav.load_pool(pool(&["a", "b"]));
        nav.pick_random();
        nav.next();
        let seen: Vec<String> = nav.visited().iter().map(|r| r.id.clone()).collect();

        nav.load_pool(pool(&["x", "y"]));
        assert_eq!(nav.previous().unwrap().id, seen[0]);
        assert_eq!(nav.next().unwrap().id, seen[1]);
    }

    #[tokio::test]
    async fn load_from_reads_the_rolling_window() {
        let dir = tempdir().unwrap();
        let db = Database::new(dir.path().join("history.sqlite3")).unwrap();
        let today = day();
        let inside = SentenceRecord {
            pack_date: today - Duration::days(6),
            ..record("inside")
        };
        let outside = SentenceRecord {
            pack_date: today - Duration::days(7),
            ..record("outside")
        };
        db.upsert_batch(&[inside, outside]).await.unwrap();

        let mut nav = HistoryNavigator::with_seed(1);
        assert_eq!(nav.load_from(&db, today, 7).await.unwrap(), 1);
        assert_eq!(nav.pick_random().unwrap().id, "inside");
    }
}
