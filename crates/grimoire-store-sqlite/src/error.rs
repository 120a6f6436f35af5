//! Error type for `grimoire-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  /// The schema could not be brought up to date. The store is unusable.
  #[error("schema migration failed: {0}")]
  Migration(#[source] tokio_rusqlite::Error),

  #[error("invalid timestamp {value} in column {column}")]
  Timestamp { column: &'static str, value: i64 },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
