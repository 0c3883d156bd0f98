//! Filesystem-backed stores behind the quest and leaderboard endpoints.
//!
//! Everything here is plain read-modify-write on JSON files. Concurrent
//! writers can lose updates; callers that need more must serialise access
//! themselves.

mod catalog;
mod error;
mod json;
pub mod leaderboard;
mod legacy_js;
mod rating;
mod submit;

pub use catalog::{QuestCatalog, QuestDocument, QuestSummary, SubmittedQuest};
pub use error::StoreError;
pub use leaderboard::LeaderboardStore;
pub use rating::RatingReceipt;
pub use submit::SubmitReceipt;

use chrono::{DateTime, Local};

/// Local time with microseconds, e.g. `2025-03-01T14:05:09.123456`.
pub(crate) fn iso_timestamp(now: DateTime<Local>) -> String {
    now.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}
