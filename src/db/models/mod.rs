pub mod sentence;

pub use sentence::{day_bounds, pack_day, window_bounds, DailyPack, SentenceRecord};
