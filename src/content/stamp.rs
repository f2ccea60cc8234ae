//! Identity and timestamps for freshly generated batches.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::db::SentenceRecord;

static LAST_STAMP_MICROS: AtomicI64 = AtomicI64::new(0);

/// Strictly increasing microsecond clock shared by every tier in the process.
///
/// Two batches never share a stamp, so `<tag>-<stamp>-<index>` ids cannot
/// collide even when refreshes land in the same microsecond.
fn next_stamp_micros() -> i64 {
    let now = Utc::now().timestamp_micros();
    let mut previous = LAST_STAMP_MICROS.load(Ordering::Relaxed);
    loop {
        let candidate = now.max(previous + 1);
        match LAST_STAMP_MICROS.compare_exchange_weak(
            previous,
            candidate,
            Ordering::SeqCst,
            Ordering::Relaxed,
        ) {
            Ok(_) => return candidate,
            Err(actual) => previous = actual,
        }
    }
}

/// Text of one sentence before it has an identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentenceDraft {
    pub hanzi: String,
    pub pinyin: String,
    pub english: String,
}

impl SentenceDraft {
    pub fn new(hanzi: &str, pinyin: &str, english: &str) -> Self {
        Self {
            hanzi: hanzi.to_string(),
            pinyin: pinyin.to_string(),
            english: english.to_string(),
        }
    }
}

/// Shared identity for every record produced by one generation call.
#[derive(Debug, Clone)]
pub struct BatchStamp {
    pub tier_tag: &'static str,
    pub created_at: DateTime<Utc>,
    pub batch_id: String,
    micros: i64,
}

impl BatchStamp {
    pub fn next(tier_tag: &'static str) -> Self {
        let micros = next_stamp_micros();
        Self {
            tier_tag,
            created_at: DateTime::<Utc>::from_timestamp_micros(micros).unwrap_or_else(Utc::now),
            batch_id: Uuid::new_v4().to_string(),
            micros,
        }
    }

    pub fn record_id(&self, index: usize) -> String {
        format!("{}-{}-{}", self.tier_tag, self.micros, index)
    }

    pub fn apply(&self, drafts: Vec<SentenceDraft>, pack_date: NaiveDate) -> Vec<SentenceRecord> {
        drafts
            .into_iter()
            .enumerate()
            .map(|(index, draft)| {
                SentenceRecord::new(
                    self.record_id(index),
                    draft.hanzi,
                    draft.pinyin,
                    draft.english,
                    pack_date,
                    index as i64,
                    self.created_at,
                )
                .with_batch(self.batch_id.clone())
            })
            .collect()
    }
}
