//! Rows of the three local tables.
//!
//! The tables are independent: no foreign keys and no cross-table writes.
//! Every timestamp is assigned by the store, never by the caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A submitted search. At most one row exists per distinct `query`;
/// resubmitting refreshes `used_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHistoryEntry {
  pub id:      i64,
  pub query:   String,
  pub used_at: DateTime<Utc>,
}

/// The most recent visit to a character's detail view.
///
/// `viewed_at` is pinned to the start of the visit's day, so revisiting on
/// the same day leaves the row in the same history bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewHistoryEntry {
  pub character_slug: String,
  pub character_name: String,
  pub viewed_at:      DateTime<Utc>,
}

/// A bookmarked character. The existence of the row is the bookmark.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedCharacter {
  pub character_slug: String,
  pub character_name: String,
  pub saved_at:       DateTime<Utc>,
}

/// Result of a bookmark toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookmarkState {
  Saved,
  Removed,
}

impl BookmarkState {
  pub fn is_saved(self) -> bool { matches!(self, Self::Saved) }
}
