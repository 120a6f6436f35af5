//! Conversions between domain rows and the plain values stored in SQLite.
//!
//! Timestamps are stored as unix seconds (`INTEGER`) and always produced by
//! SQL from the store clock, never taken from callers.

use chrono::{DateTime, Utc};
use grimoire_core::entry::{SavedCharacter, SearchHistoryEntry, ViewHistoryEntry};

use crate::{Error, Result};

// ─── Timestamps ──────────────────────────────────────────────────────────────

pub fn encode_ts(at: DateTime<Utc>) -> i64 { at.timestamp() }

pub fn decode_ts(column: &'static str, secs: i64) -> Result<DateTime<Utc>> {
  DateTime::from_timestamp(secs, 0).ok_or(Error::Timestamp { column, value: secs })
}

// ─── LIKE patterns ───────────────────────────────────────────────────────────

/// `%text%` with `\`, `%` and `_` escaped; pair with `ESCAPE '\'`.
pub fn contains_pattern(text: &str) -> String {
  let mut pattern = String::with_capacity(text.len() + 2);
  pattern.push('%');
  for c in text.chars() {
    if matches!(c, '\\' | '%' | '_') {
      pattern.push('\\');
    }
    pattern.push(c);
  }
  pattern.push('%');
  pattern
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read from a `search_history` row.
pub struct RawSearch {
  pub id:      i64,
  pub query:   String,
  pub used_at: i64,
}

impl RawSearch {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self { id: row.get(0)?, query: row.get(1)?, used_at: row.get(2)? })
  }

  pub fn into_entry(self) -> Result<SearchHistoryEntry> {
    Ok(SearchHistoryEntry {
      id:      self.id,
      query:   self.query,
      used_at: decode_ts("used_at", self.used_at)?,
    })
  }
}

/// Raw values read from a `view_history` row.
pub struct RawView {
  pub slug:      String,
  pub name:      String,
  pub viewed_at: i64,
}

impl RawView {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self { slug: row.get(0)?, name: row.get(1)?, viewed_at: row.get(2)? })
  }

  pub fn into_entry(self) -> Result<ViewHistoryEntry> {
    Ok(ViewHistoryEntry {
      character_slug: self.slug,
      character_name: self.name,
      viewed_at:      decode_ts("viewed_at", self.viewed_at)?,
    })
  }
}

/// Raw values read from a `saved_characters` row.
pub struct RawSaved {
  pub slug:     String,
  pub name:     String,
  pub saved_at: i64,
}

impl RawSaved {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self { slug: row.get(0)?, name: row.get(1)?, saved_at: row.get(2)? })
  }

  pub fn into_entry(self) -> Result<SavedCharacter> {
    Ok(SavedCharacter {
      character_slug: self.slug,
      character_name: self.name,
      saved_at:       decode_ts("saved_at", self.saved_at)?,
    })
  }
}
