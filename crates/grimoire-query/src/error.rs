//! Error type for `grimoire-query`.

use std::sync::Arc;

use grimoire_core::remote::FetchError;
use thiserror::Error;

/// A failed query, as seen by every caller waiting on it.
///
/// Cloneable so that one outcome can be handed to all joined waiters.
#[derive(Debug, Clone, Error)]
pub enum QueryError {
  /// The remote resource does not exist.
  #[error("not found")]
  NotFound,

  #[error("transient failure: {0}")]
  Transient(String),

  /// Gave up after `attempts` tries.
  #[error("failed after {attempts} attempt(s): {message}")]
  Failed { attempts: u32, message: String },

  /// The local store rejected a read or write.
  #[error("local store error: {0}")]
  Store(#[source] Arc<dyn std::error::Error + Send + Sync>),

  /// The query was superseded. Callers should drop it silently.
  #[error("cancelled")]
  Cancelled,
}

impl QueryError {
  pub fn store(error: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Arc::new(error))
  }

  pub fn is_retryable(&self) -> bool { matches!(self, Self::Transient(_)) }

  pub fn is_not_found(&self) -> bool { matches!(self, Self::NotFound) }

  pub fn is_cancelled(&self) -> bool { matches!(self, Self::Cancelled) }
}

impl From<FetchError> for QueryError {
  fn from(error: FetchError) -> Self {
    match error {
      FetchError::NotFound => Self::NotFound,
      FetchError::Transient(message) => Self::Transient(message),
      FetchError::Invalid(message) => Self::Failed { attempts: 1, message },
      FetchError::Cancelled => Self::Cancelled,
    }
  }
}

pub type Result<T, E = QueryError> = std::result::Result<T, E>;
