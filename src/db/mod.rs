mod connection;
mod helpers;
mod migrations;
pub mod models;
mod repositories;
pub mod store;

pub use connection::Database;
pub use models::{DailyPack, SentenceRecord};
pub use store::{SentenceStore, PACK_SIZE};
