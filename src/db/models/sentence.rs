//! Sentence data models.
//!
//! `SentenceRecord` is the only persisted entity. `DailyPack` is a view built
//! from the records of one calendar day and is never stored.

use chrono::{DateTime, Days, Duration, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SentenceRecord {
    /// `<tier-tag>-<timestamp>-<index>`, unique for the lifetime of the store.
    pub id: String,
    pub hanzi: String,
    pub pinyin: String,
    pub english: String,
    pub pack_date: NaiveDate,
    pub index_in_pack: i64,
    /// Recorded audio for the sentence. `None` means speech must be synthesized.
    pub audio_reference: Option<String>,
    pub learned: bool,
    pub favorite: bool,
    /// Set once at insert; upserts never overwrite it.
    pub created_at: DateTime<Utc>,
    pub batch_id: Option<String>,
}

impl SentenceRecord {
    pub fn new(
        id: String,
        hanzi: impl Into<String>,
        pinyin: impl Into<String>,
        english: impl Into<String>,
        pack_date: NaiveDate,
        index_in_pack: i64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            hanzi: hanzi.into(),
            pinyin: pinyin.into(),
            english: english.into(),
            pack_date,
            index_in_pack,
            audio_reference: None,
            learned: false,
            favorite: false,
            created_at,
            batch_id: None,
        }
    }

    pub fn with_batch(mut self, batch_id: impl Into<String>) -> Self {
        self.batch_id = Some(batch_id.into());
        self
    }
}

/// Truncates a local timestamp to its calendar day.
pub fn pack_day(at: DateTime<Local>) -> NaiveDate {
    at.date_naive()
}

/// Half-open `[start, end)` day range covering `date`.
pub fn day_bounds(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    (date, date + Duration::days(1))
}

/// Half-open range covering the `days` calendar days that end with `today`.
///
/// Windows reaching past the calendar's limits are clamped to them.
pub fn window_bounds(today: NaiveDate, days: u32) -> (NaiveDate, NaiveDate) {
    let back = u64::from(days.max(1)) - 1;
    let start = today.checked_sub_days(Days::new(back)).unwrap_or(NaiveDate::MIN);
    let end = today.checked_add_days(Days::new(1)).unwrap_or(NaiveDate::MAX);
    (start, end)
}

/// All sentences for one day, in batch order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyPack {
    pub date: NaiveDate,
    pub sentences: Vec<SentenceRecord>,
}

impl DailyPack {
    pub fn from_records(date: NaiveDate, records: Vec<SentenceRecord>) -> Self {
        let mut sentences: Vec<SentenceRecord> = records
            .into_iter()
            .filter(|record| record.pack_date == date)
            .collect();
        // Stable sort keeps the newest-first order between equal indices.
        sentences.sort_by_key(|record| record.index_in_pack);
        Self { date, sentences }
    }

    pub fn len(&self) -> usize {
        self.sentences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }

    pub fn learned_count(&self) -> usize {
        self.sentences.iter().filter(|s| s.learned).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(id: &str, index: i64, day: NaiveDate) -> SentenceRecord {
        SentenceRecord::new(id.into(), "你好", "nǐ hǎo", "hello", day, index, Utc::now())
    }

    #[test]
    fn daily_pack_orders_by_index_and_filters_day() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let other = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();
        let pack = DailyPack::from_records(
            day,
            vec![record("b", 2, day), record("x", 0, other), record("a", 0, day)],
        );

        let ids: Vec<&str> = pack.sentences.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(pack.learned_count(), 0);
    }

    #[test]
    fn day_bounds_are_half_open() {
        let day = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        let (start, end) = day_bounds(day);
        assert_eq!(start, day);
        assert_eq!(end, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
    }

    #[test]
    fn window_bounds_include_today() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 30).unwrap();
        assert_eq!(
            window_bounds(today, 30),
            (
                NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 3, 31).unwrap()
            )
        );
        assert_eq!(window_bounds(today, 0), window_bounds(today, 1));
    }

    #[test]
    fn huge_windows_clamp_instead_of_overflowing() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 30).unwrap();
        assert_eq!(window_bounds(today, u32::MAX).0, NaiveDate::MIN);
        assert_eq!(window_bounds(NaiveDate::MAX, 1).1, NaiveDate::MAX);
    }

    #[test]
    fn pack_day_truncates_to_local_midnight() {
        let late = Local.with_ymd_and_hms(2024, 5, 6, 23, 59, 59).unwrap();
        assert_eq!(pack_day(late), NaiveDate::from_ymd_opt(2024, 5, 6).unwrap());
    }
}
