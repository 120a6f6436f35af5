//! Live reads: standing queries that are re-delivered after every write that
//! could affect them.
//!
//! Writers publish a [`Change`] naming the table and the affected keys.
//! Subscribers register an [`Interest`]; a store re-runs every subscriber
//! whose interest [`is_affected_by`](Interest::is_affected_by) the change and
//! pushes the fresh result into the subscriber's [`Live`] handle before the
//! write returns.

use std::fmt;

use parking_lot::Mutex;
use strum::{AsRefStr, Display};
use tokio::sync::watch;

/// The three local tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Table {
  SearchHistory,
  ViewHistory,
  SavedCharacters,
}

/// Rows touched by a write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangedRows {
  /// Rows with these primary or unique keys.
  Keys(Vec<String>),
  /// Potentially every row (e.g. an unconditional delete).
  All,
}

/// A write notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
  pub table: Table,
  pub rows:  ChangedRows,
}

impl Change {
  pub fn row(table: Table, key: impl Into<String>) -> Self {
    Self { table, rows: ChangedRows::Keys(vec![key.into()]) }
  }

  pub fn all(table: Table) -> Self { Self { table, rows: ChangedRows::All } }
}

/// The rows a subscriber reads: a whole table or a single keyed row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interest {
  pub table: Table,
  pub key:   Option<String>,
}

impl Interest {
  pub fn table(table: Table) -> Self { Self { table, key: None } }

  pub fn row(table: Table, key: impl Into<String>) -> Self {
    Self { table, key: Some(key.into()) }
  }

  /// Conservative: any doubt resolves to `true`.
  pub fn is_affected_by(&self, change: &Change) -> bool {
    if self.table != change.table {
      return false;
    }
    match (&self.key, &change.rows) {
      (None, _) | (_, ChangedRows::All) => true,
      (Some(key), ChangedRows::Keys(keys)) => keys.contains(key),
    }
  }
}

// ─── Subscription handle ─────────────────────────────────────────────────────

/// Deregisters a live read exactly once, on [`unsubscribe`](Self::unsubscribe)
/// or on drop.
pub struct Subscription {
  cancel: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl Subscription {
  pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
    Self { cancel: Mutex::new(Some(Box::new(cancel))) }
  }

  pub fn unsubscribe(&self) {
    let cancel = self.cancel.lock().take();
    if let Some(cancel) = cancel {
      cancel();
    }
  }

  pub fn is_active(&self) -> bool { self.cancel.lock().is_some() }
}

impl Drop for Subscription {
  fn drop(&mut self) { self.unsubscribe(); }
}

impl fmt::Debug for Subscription {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Subscription")
      .field("active", &self.is_active())
      .finish()
  }
}

/// The receiving end of a live read.
///
/// Holds the latest result. [`changed`](Self::changed) resolves after each
/// re-delivery and errors once the subscription is gone.
#[derive(Debug)]
pub struct Live<T> {
  rx:           watch::Receiver<T>,
  subscription: Subscription,
}

impl<T> Live<T> {
  pub fn new(rx: watch::Receiver<T>, subscription: Subscription) -> Self {
    Self { rx, subscription }
  }

  /// Borrow the latest delivered value.
  pub fn current(&self) -> watch::Ref<'_, T> { self.rx.borrow() }

  /// Wait for the next delivery and mark it seen.
  pub async fn changed(&mut self) -> Result<(), watch::error::RecvError> {
    self.rx.changed().await
  }

  /// Whether a delivery arrived that has not been seen via
  /// [`changed`](Self::changed) or [`latest`](Self::latest).
  pub fn has_changed(&self) -> bool { self.rx.has_changed().unwrap_or(false) }

  /// An extra receiver, e.g. for a second observer of the same read.
  pub fn receiver(&self) -> watch::Receiver<T> { self.rx.clone() }

  /// Idempotent.
  pub fn unsubscribe(&self) { self.subscription.unsubscribe(); }

  pub fn is_subscribed(&self) -> bool { self.subscription.is_active() }
}

impl<T: Clone> Live<T> {
  pub fn get(&self) -> T { self.rx.borrow().clone() }

  /// The latest value, marking it seen.
  pub fn latest(&mut self) -> T { self.rx.borrow_and_update().clone() }
}
