//! Time source for store-assigned timestamps.
//!
//! The local store never accepts timestamps from callers; it reads them from
//! a [`Clock`]. Production uses [`SystemClock`]; tests drive a
//! [`ManualClock`].

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveTime, Utc};
use parking_lot::Mutex;

pub trait Clock: Send + Sync {
  fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> { Utc::now() }
}

/// A clock that only moves when told to. Clones share the same instant.
#[derive(Debug, Clone)]
pub struct ManualClock {
  now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
  pub fn new(start: DateTime<Utc>) -> Self {
    Self { now: Arc::new(Mutex::new(start)) }
  }

  pub fn set(&self, to: DateTime<Utc>) { *self.now.lock() = to; }

  pub fn advance(&self, by: Duration) { *self.now.lock() += by; }
}

impl Clock for ManualClock {
  fn now(&self) -> DateTime<Utc> { *self.now.lock() }
}

/// Truncate `at` to midnight UTC of the same calendar day.
pub fn day_start(at: DateTime<Utc>) -> DateTime<Utc> {
  at.date_naive().and_time(NaiveTime::MIN).and_utc()
}
