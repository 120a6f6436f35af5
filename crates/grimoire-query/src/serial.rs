//! Per-key serialisation of async operations.

use std::{collections::HashMap, sync::Arc};

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// A set of async locks, one per key, created on demand.
///
/// Operations holding the guard for a key run one at a time, in the order
/// they called [`lock`](Self::lock). Locks for distinct keys are
/// independent. A key's lock is dropped from the set once nobody holds or
/// awaits it.
#[derive(Default)]
pub struct KeyedMutex {
  locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl KeyedMutex {
  pub fn new() -> Self { Self::default() }

  pub async fn lock(&self, key: &str) -> KeyedGuard<'_> {
    let mutex = Arc::clone(self.locks.lock().entry(key.to_owned()).or_default());
    let guard = mutex.lock_owned().await;
    KeyedGuard { owner: self, key: key.to_owned(), guard: Some(guard) }
  }

  /// Number of keys currently locked or awaited.
  pub fn len(&self) -> usize { self.locks.lock().len() }

  pub fn is_empty(&self) -> bool { self.len() == 0 }
}

/// Holds the lock for one key until dropped.
pub struct KeyedGuard<'a> {
  owner: &'a KeyedMutex,
  key:   String,
  guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyedGuard<'_> {
  fn drop(&mut self) {
    drop(self.guard.take());
    let mut locks = self.owner.locks.lock();
    // Waiters hold a clone, so a count of one means nobody else wants it.
    if locks.get(&self.key).is_some_and(|m| Arc::strong_count(m) == 1) {
      locks.remove(&self.key);
    }
  }
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use super::*;

  #[tokio::test]
  async fn same_key_never_interleaves() {
    let locks = Arc::new(KeyedMutex::new());
    let log = Arc::new(Mutex::new(Vec::new()));

    let mut tasks = Vec::new();
    for i in 0..4 {
      let (locks, log) = (Arc::clone(&locks), Arc::clone(&log));
      tasks.push(async move {
        let _guard = locks.lock("slug").await;
        log.lock().push(format!("start {i}"));
        tokio::time::sleep(Duration::from_millis(2)).await;
        log.lock().push(format!("end {i}"));
      });
    }
    futures::future::join_all(tasks).await;

    let log = log.lock();
    for pair in log.chunks(2) {
      let i = &pair[0]["start ".len()..];
      assert_eq!(pair[1], format!("end {i}"));
    }
    assert!(locks.is_empty());
  }

  #[tokio::test]
  async fn distinct_keys_do_not_block_each_other() {
    let locks = KeyedMutex::new();
    let _a = locks.lock("a").await;
    let _b = locks.lock("b").await;
    assert_eq!(locks.len(), 2);
  }
}
