//! The `CharacterSource` trait: the remote character database as seen by the
//! query layer.
//!
//! Implemented over HTTP by `grimoire-client`; tests substitute in-memory
//! fakes.

use std::future::Future;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::{
  character::{CharacterAttributes, CharacterPage},
  params::ParameterSet,
};

/// Outcome classes of a remote fetch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
  /// The resource does not exist. Terminal; never retried.
  #[error("not found")]
  NotFound,

  /// Network or server failure. Worth retrying.
  #[error("transient failure: {0}")]
  Transient(String),

  /// The response could not be understood. Retrying will not help.
  #[error("invalid response: {0}")]
  Invalid(String),

  /// The caller abandoned the request.
  #[error("cancelled")]
  Cancelled,
}

/// Read access to the remote character resource.
///
/// Implementations must stop work and return [`FetchError::Cancelled`] once
/// `cancel` fires.
pub trait CharacterSource: Send + Sync {
  /// `GET /characters` with `params` (which carry `page[number]`).
  fn list_characters(
    &self,
    params: ParameterSet,
    cancel: CancellationToken,
  ) -> impl Future<Output = Result<CharacterPage, FetchError>> + Send + '_;

  /// `GET /characters/:slug`.
  fn get_character(
    &self,
    slug: String,
    cancel: CancellationToken,
  ) -> impl Future<Output = Result<CharacterAttributes, FetchError>> + Send + '_;
}
