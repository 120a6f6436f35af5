//! Error types for `grimoire-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown filter field: {0:?}")]
  UnknownFilterField(String),

  #[error("unknown sort order: {0:?}")]
  UnknownSort(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
