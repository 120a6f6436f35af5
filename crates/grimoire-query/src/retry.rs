//! Retry policy for remote fetches.

use std::{future::Future, time::Duration};

use grimoire_core::remote::FetchError;
use tokio_util::sync::CancellationToken;

use crate::{QueryError, Result};

/// Exponential backoff for transient failures.
///
/// A fetch is tried once and then retried up to `retries` times. The wait
/// before retry `n` (zero-based) is `min(base_delay * 2^n, max_delay)`.
/// Only [`FetchError::Transient`] is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
  pub retries:    u32,
  pub base_delay: Duration,
  pub max_delay:  Duration,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self {
      retries:    3,
      base_delay: Duration::from_secs(1),
      max_delay:  Duration::from_secs(30),
    }
  }
}

impl RetryPolicy {
  /// Try once, never retry.
  pub fn never() -> Self { Self { retries: 0, ..Self::default() } }

  pub fn delay(&self, retry: u32) -> Duration {
    self
      .base_delay
      .saturating_mul(2u32.saturating_pow(retry))
      .min(self.max_delay)
  }

  /// Run `attempt` until it succeeds, fails terminally, or the retries are
  /// spent. Waiting between attempts stops early once `cancel` fires.
  pub async fn run<T, F, Fut>(
    &self,
    what: &str,
    cancel: &CancellationToken,
    mut attempt: F,
  ) -> Result<T>
  where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
  {
    let mut attempts = 0u32;
    loop {
      attempts += 1;
      let message = match attempt().await {
        Ok(value) => return Ok(value),
        Err(FetchError::Transient(message)) => message,
        Err(error) => return Err(error.into()),
      };

      if attempts > self.retries {
        tracing::warn!(what, attempts, error = %message, "giving up on fetch");
        return Err(QueryError::Failed { attempts, message });
      }

      let delay = self.delay(attempts - 1);
      tracing::debug!(
        what,
        attempt = attempts,
        delay_ms = delay.as_millis() as u64,
        error = %message,
        "retrying after transient failure"
      );
      tokio::select! {
        _ = cancel.cancelled() => return Err(QueryError::Cancelled),
        _ = tokio::time::sleep(delay) => {}
      }
    }
  }
}
