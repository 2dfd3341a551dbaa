// src/storage/mod.rs
// This module handles all data persistence: the local database, the replay
// log, and the remote API client.

pub mod db;
pub mod remote;
pub mod replay_log;

// Re-export the main structs for easier access.
pub use self::db::FlashcardDb;
pub use self::remote::ApiClient;
pub use self::replay_log::{LoggedReviewSink, ReplayLogger};
