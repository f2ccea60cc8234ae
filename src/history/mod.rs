mod navigator;

pub use navigator::{HistoryNavigator, DEFAULT_WINDOW_DAYS};
