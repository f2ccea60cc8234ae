use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// How long generated sentences are kept.
///
/// Refreshes only ever add records, so without a limit the table grows with
/// every refresh. `KeepAll` keeps the full history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum RetentionPolicy {
    #[default]
    KeepAll,
    MaxAgeDays { days: u32, keep_favorites: bool },
}

impl RetentionPolicy {
    /// Records created strictly before the returned instant are expired.
    ///
    /// An age reaching past the earliest representable instant keeps everything.
    pub fn cutoff(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            RetentionPolicy::KeepAll => None,
            RetentionPolicy::MaxAgeDays { days, .. } => {
                now.checked_sub_signed(Duration::days(i64::from(*days)))
            }
        }
    }

    pub fn keeps_favorites(&self) -> bool {
        match self {
            RetentionPolicy::KeepAll => true,
            RetentionPolicy::MaxAgeDays { keep_favorites, .. } => *keep_favorites,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn keep_all_has_no_cutoff() {
        assert_eq!(RetentionPolicy::KeepAll.cutoff(Utc::now()), None);
        assert!(RetentionPolicy::default().keeps_favorites());
    }

    #[test]
    fn max_age_cutoff_counts_back_whole_days() {
        let now = Utc.with_ymd_and_hms(2024, 3, 31, 12, 0, 0).unwrap();
        let policy = RetentionPolicy::MaxAgeDays {
            days: 30,
            keep_favorites: false,
        };
        assert_eq!(
            policy.cutoff(now),
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap())
        );
        assert!(!policy.keeps_favorites());
    }

    #[test]
    fn oversized_age_keeps_everything() {
        let policy = RetentionPolicy::MaxAgeDays {
            days: u32::MAX,
            keep_favorites: true,
        };
        assert_eq!(policy.cutoff(Utc::now()), None);
    }
}
