//! Versioned schema migrations.
//!
//! Applied in order at connection startup. `PRAGMA user_version` records the
//! last applied version so each migration runs exactly once; each one runs in
//! its own transaction together with the version bump.

use rusqlite::Connection;

/// A single forward-only schema step.
pub struct Migration {
  pub version: u32,
  pub name:    &'static str,
  pub sql:     &'static str,
}

/// All migrations, in application order. Versions are contiguous from 1.
pub const MIGRATIONS: &[Migration] = &[
  Migration {
    version: 1,
    name:    "initial",
    sql:     "
-- One row per distinct query; used_at refreshed on every resubmission.
CREATE TABLE IF NOT EXISTS search_history (
    id      INTEGER PRIMARY KEY AUTOINCREMENT,
    query   TEXT    NOT NULL UNIQUE,
    used_at INTEGER NOT NULL DEFAULT (unixepoch())        -- unix seconds
);

-- One row per character; viewed_at pinned to the start of the visit's day.
CREATE TABLE IF NOT EXISTS view_history (
    character_slug TEXT    PRIMARY KEY NOT NULL,
    character_name TEXT    NOT NULL,
    viewed_at      INTEGER NOT NULL DEFAULT (unixepoch('now', 'start of day'))
);

-- Presence of a row is the bookmark.
CREATE TABLE IF NOT EXISTS saved_characters (
    character_slug TEXT    PRIMARY KEY NOT NULL,
    character_name TEXT    NOT NULL,
    saved_at       INTEGER NOT NULL DEFAULT (unixepoch())
);
",
  },
  Migration {
    version: 2,
    name:    "scan_indexes",
    sql:     "
CREATE INDEX IF NOT EXISTS query_idx           ON search_history(query);
CREATE INDEX IF NOT EXISTS view_history_at_idx ON view_history(viewed_at);
CREATE INDEX IF NOT EXISTS saved_at_idx        ON saved_characters(saved_at);
",
  },
];

/// The version a fully migrated database reports.
pub const SCHEMA_VERSION: u32 = MIGRATIONS[MIGRATIONS.len() - 1].version;

/// Configure the connection and apply every pending migration.
///
/// Returns the schema version after migrating.
pub fn run(conn: &mut Connection) -> rusqlite::Result<u32> {
  // In-memory databases answer "memory"; that is fine.
  let mode: String = conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
    row.get(0)
  })?;
  let start: u32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
  let mut current = start;

  tracing::info!(
    journal_mode = %mode,
    current_version = start,
    target_version = SCHEMA_VERSION,
    "checking database migrations"
  );

  for migration in MIGRATIONS.iter().filter(|m| m.version > start) {
    tracing::info!(
      version = migration.version,
      name = migration.name,
      "applying migration"
    );
    let tx = conn.transaction()?;
    tx.execute_batch(migration.sql)?;
    tx.pragma_update(None, "user_version", migration.version)?;
    tx.commit()?;
    current = migration.version;
  }

  Ok(current)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn versions_are_contiguous() {
    for (i, migration) in MIGRATIONS.iter().enumerate() {
      assert_eq!(migration.version as usize, i + 1, "{}", migration.name);
    }
  }

  #[test]
  fn running_twice_is_a_no_op() {
    let mut conn = Connection::open_in_memory().unwrap();
    assert_eq!(run(&mut conn).unwrap(), SCHEMA_VERSION);
    assert_eq!(run(&mut conn).unwrap(), SCHEMA_VERSION);

    let tables: i64 = conn
      .query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'
           AND name IN ('search_history', 'view_history', 'saved_characters')",
        [],
        |row| row.get(0),
      )
      .unwrap();
    assert_eq!(tables, 3);
  }

  #[test]
  fn resumes_from_a_partially_migrated_schema() {
    let mut conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(MIGRATIONS[0].sql).unwrap();
    conn.pragma_update(None, "user_version", 1).unwrap();

    assert_eq!(run(&mut conn).unwrap(), SCHEMA_VERSION);
    let index: i64 = conn
      .query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND name = 'query_idx'",
        [],
        |row| row.get(0),
      )
      .unwrap();
    assert_eq!(index, 1);
  }
}
