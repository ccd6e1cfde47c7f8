mod connection;
pub mod helpers;
mod migrations;
pub mod models;
mod repositories;

pub use connection::Database;
pub use models::{ActivitySnapshot, FeedbackEntry, FeedbackKind};
pub use repositories::feedback::{DEFAULT_SCORE, LEDGER_CAPACITY};
