//! Registry of live reads.
//!
//! Every write closure calls [`LiveRegistry::notify`] on the database thread
//! right after its statement, so affected subscribers hold the new result
//! before the write's future resolves.

use std::{
  collections::BTreeMap,
  sync::{Arc, Weak},
};

use grimoire_core::live::{Change, Interest, Subscription};
use parking_lot::Mutex;
use rusqlite::Connection;

/// Re-runs a subscriber's query and delivers the result.
pub type Refresh = Arc<dyn Fn(&Connection) + Send + Sync>;

struct Entry {
  interest: Interest,
  refresh:  Refresh,
}

#[derive(Default)]
struct Inner {
  next_id: u64,
  entries: BTreeMap<u64, Entry>,
}

/// Cloning is cheap; clones share the same registry.
#[derive(Clone, Default)]
pub struct LiveRegistry {
  inner: Arc<Mutex<Inner>>,
}

impl LiveRegistry {
  pub fn register(&self, interest: Interest, refresh: Refresh) -> u64 {
    let mut inner = self.inner.lock();
    let id = inner.next_id;
    inner.next_id += 1;
    inner.entries.insert(id, Entry { interest, refresh });
    id
  }

  /// A handle that removes entry `id` when unsubscribed or dropped.
  pub fn subscription(&self, id: u64) -> Subscription {
    let inner: Weak<Mutex<Inner>> = Arc::downgrade(&self.inner);
    Subscription::new(move || {
      if let Some(inner) = inner.upgrade() {
        inner.lock().entries.remove(&id);
      }
    })
  }

  /// Re-run every subscriber whose interest `change` touches.
  pub fn notify(&self, conn: &Connection, change: &Change) {
    let targets: Vec<Refresh> = self
      .inner
      .lock()
      .entries
      .values()
      .filter(|entry| entry.interest.is_affected_by(change))
      .map(|entry| Arc::clone(&entry.refresh))
      .collect();

    if !targets.is_empty() {
      tracing::debug!(
        table = %change.table,
        subscribers = targets.len(),
        "re-running live reads"
      );
    }
    for refresh in targets {
      refresh(conn);
    }
  }

  pub fn len(&self) -> usize { self.inner.lock().entries.len() }
}
