//! Keyed, deduplicating result cache.
//!
//! Each key owns a slot holding the last good value and at most one pending
//! fetch. Callers that arrive while a fetch is pending join it instead of
//! starting another. A pending fetch carries a [`CancellationToken`]; once
//! cancelled or invalidated it can no longer write its result into the slot.

use std::{
  collections::HashMap,
  future::Future,
  sync::{Arc, Weak},
};

use futures::{
  FutureExt as _,
  future::{BoxFuture, Shared},
};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::{QueryError, QueryKey, Result};

type SharedFetch<V> = Shared<BoxFuture<'static, Result<V>>>;

struct Pending<V> {
  id:     u64,
  future: SharedFetch<V>,
  cancel: CancellationToken,
}

struct Slot<V> {
  data:    Option<V>,
  pending: Option<Pending<V>>,
}

impl<V> Slot<V> {
  fn empty() -> Self { Self { data: None, pending: None } }

  fn is_vacant(&self) -> bool { self.data.is_none() && self.pending.is_none() }
}

struct Inner<V> {
  name:    &'static str,
  next_id: Mutex<u64>,
  slots:   Mutex<HashMap<QueryKey, Slot<V>>>,
}

/// What a caller does next, decided under the slot lock.
enum Step<V> {
  Done(V),
  Wait(SharedFetch<V>),
}

impl<V: Clone> Step<V> {
  async fn resolve(self) -> Result<V> {
    match self {
      Self::Done(value) => Ok(value),
      Self::Wait(future) => future.await,
    }
  }
}

/// An in-memory cache of query results. Clones share the same entries.
pub struct QueryCache<V> {
  inner: Arc<Inner<V>>,
}

impl<V> Clone for QueryCache<V> {
  fn clone(&self) -> Self { Self { inner: Arc::clone(&self.inner) } }
}

impl<V> QueryCache<V>
where
  V: Clone + Send + Sync + 'static,
{
  /// `name` labels this cache in logs.
  pub fn new(name: &'static str) -> Self {
    Self {
      inner: Arc::new(Inner {
        name,
        next_id: Mutex::new(0),
        slots: Mutex::new(HashMap::new()),
      }),
    }
  }

  /// The cached value for `key`, or the result of `fetcher`.
  ///
  /// A pending fetch for `key` is joined rather than duplicated. `fetcher`
  /// is called at most once, and only when the key has neither a value nor
  /// a pending fetch.
  pub async fn fetch<F, Fut>(&self, key: &QueryKey, fetcher: F) -> Result<V>
  where
    F: FnOnce(CancellationToken) -> Fut,
    Fut: Future<Output = Result<V>> + Send + 'static,
  {
    let step = {
      let mut slots = self.inner.slots.lock();
      let slot = slots.entry(key.clone()).or_insert_with(Slot::empty);
      if let Some(data) = &slot.data {
        tracing::trace!(cache = self.inner.name, %key, "cache hit");
        Step::Done(data.clone())
      } else if let Some(pending) = &slot.pending {
        tracing::debug!(cache = self.inner.name, %key, "joining pending fetch");
        Step::Wait(pending.future.clone())
      } else {
        tracing::debug!(cache = self.inner.name, %key, "cache miss");
        Step::Wait(self.start(key, slot, fetcher))
      }
    };
    step.resolve().await
  }

  /// Register a new pending fetch in `slot`. Must be called with the slot
  /// lock held.
  fn start<F, Fut>(&self, key: &QueryKey, slot: &mut Slot<V>, fetcher: F) -> SharedFetch<V>
  where
    F: FnOnce(CancellationToken) -> Fut,
    Fut: Future<Output = Result<V>> + Send + 'static,
  {
    let id = {
      let mut next = self.inner.next_id.lock();
      *next += 1;
      *next
    };
    let cancel = CancellationToken::new();
    let work = fetcher(cancel.clone());

    let inner = Arc::downgrade(&self.inner);
    let key = key.clone();
    let token = cancel.clone();
    let future = async move {
      let result = tokio::select! {
        biased;
        _ = token.cancelled() => Err(QueryError::Cancelled),
        result = work => result,
      };
      settle(&inner, &key, id, &result);
      result
    }
    .boxed()
    .shared();

    slot.pending = Some(Pending { id, future: future.clone(), cancel });
    future
  }

  /// The cached value, without fetching.
  pub fn get(&self, key: &QueryKey) -> Option<V> {
    self.inner.slots.lock().get(key).and_then(|slot| slot.data.clone())
  }

  /// Seed `key` with a value already in hand.
  pub fn set(&self, key: &QueryKey, value: V) {
    tracing::trace!(cache = self.inner.name, %key, "priming");
    let mut slots = self.inner.slots.lock();
    slots.entry(key.clone()).or_insert_with(Slot::empty).data = Some(value);
  }

  pub fn is_pending(&self, key: &QueryKey) -> bool {
    self
      .inner
      .slots
      .lock()
      .get(key)
      .is_some_and(|slot| slot.pending.is_some())
  }

  /// Abandon the pending fetch for `key`. Its waiters receive
  /// [`QueryError::Cancelled`] and its result is discarded. Cached data is
  /// kept. Returns whether a fetch was pending.
  pub fn cancel(&self, key: &QueryKey) -> bool {
    let mut slots = self.inner.slots.lock();
    let Some(slot) = slots.get_mut(key) else { return false };
    let Some(pending) = slot.pending.take() else { return false };
    pending.cancel.cancel();
    if slot.is_vacant() {
      slots.remove(key);
    }
    tracing::debug!(cache = self.inner.name, %key, "cancelled pending fetch");
    true
  }

  /// Drop everything cached for `key`. A fetch already in flight still
  /// resolves for its waiters but is no longer stored.
  pub fn invalidate(&self, key: &QueryKey) -> bool {
    let removed = self.inner.slots.lock().remove(key).is_some();
    if removed {
      tracing::debug!(cache = self.inner.name, %key, "invalidated");
    }
    removed
  }

  /// Drop every key that starts with `prefix`. Returns how many were
  /// dropped.
  pub fn invalidate_prefix(&self, prefix: &[&str]) -> usize {
    let mut slots = self.inner.slots.lock();
    let before = slots.len();
    slots.retain(|key, _| !key.starts_with(prefix));
    let removed = before - slots.len();
    tracing::debug!(cache = self.inner.name, ?prefix, removed, "invalidated family");
    removed
  }

  /// A guard that invalidates the `prefix` family when dropped, including
  /// when the future holding it is abandoned part way.
  pub fn invalidate_on_drop(&self, prefix: &'static [&'static str]) -> InvalidateOnDrop<'_, V> {
    InvalidateOnDrop { cache: self, prefix }
  }

  pub fn len(&self) -> usize { self.inner.slots.lock().len() }

  pub fn is_empty(&self) -> bool { self.len() == 0 }
}

/// Returned by [`QueryCache::invalidate_on_drop`].
pub struct InvalidateOnDrop<'a, V: Clone + Send + Sync + 'static> {
  cache:  &'a QueryCache<V>,
  prefix: &'static [&'static str],
}

impl<V: Clone + Send + Sync + 'static> Drop for InvalidateOnDrop<'_, V> {
  fn drop(&mut self) { self.cache.invalidate_prefix(self.prefix); }
}

/// Store the outcome of fetch `id`, unless it was cancelled, invalidated or
/// replaced in the meantime.
fn settle<V: Clone>(inner: &Weak<Inner<V>>, key: &QueryKey, id: u64, result: &Result<V>) {
  let Some(inner) = inner.upgrade() else { return };
  let mut slots = inner.slots.lock();
  let Some(slot) = slots.get_mut(key) else { return };
  if !slot.pending.as_ref().is_some_and(|pending| pending.id == id) {
    return;
  }

  slot.pending = None;
  match result {
    Ok(value) => slot.data = Some(value.clone()),
    Err(error) => {
      tracing::debug!(cache = inner.name, %key, %error, "fetch failed");
    }
  }
  if slot.is_vacant() {
    slots.remove(key);
  }
}

// ─── Pagination ──────────────────────────────────────────────────────────────

/// Pages fetched so far for one key, in request order.
///
/// `params[i]` is the cursor that produced `pages[i]`. `next` is the cursor
/// of the following page, `None` once the source is exhausted.
#[derive(Debug, Clone, PartialEq)]
pub struct Pages<P, C> {
  pub pages:  Vec<P>,
  pub params: Vec<C>,
  pub next:   Option<C>,
}

impl<P, C> Default for Pages<P, C> {
  fn default() -> Self { Self { pages: Vec::new(), params: Vec::new(), next: None } }
}

impl<P, C> Pages<P, C> {
  pub fn len(&self) -> usize { self.pages.len() }

  pub fn is_empty(&self) -> bool { self.pages.is_empty() }

  pub fn is_exhausted(&self) -> bool { self.next.is_none() }

  fn push(&mut self, page: P, cursor: C, next: Option<C>) {
    self.pages.push(page);
    self.params.push(cursor);
    self.next = next;
  }
}

impl<T, C> Pages<Vec<T>, C> {
  /// Every row of every page, in order.
  pub fn items(&self) -> impl Iterator<Item = &T> { self.pages.iter().flatten() }
}

impl<P, C> QueryCache<Pages<P, C>>
where
  P: Clone + Send + Sync + 'static,
  C: Clone + Send + Sync + 'static,
{
  /// The pages cached for `key`, or the first page fetched from `first`.
  ///
  /// `fetcher` maps a cursor to a page and the cursor after it.
  pub async fn fetch_first<F, Fut>(&self, key: &QueryKey, first: C, fetcher: F) -> Result<Pages<P, C>>
  where
    F: FnOnce(C, CancellationToken) -> Fut,
    Fut: Future<Output = Result<(P, Option<C>)>> + Send + 'static,
  {
    self
      .fetch(key, move |cancel| {
        let work = fetcher(first.clone(), cancel);
        async move {
          let (page, next) = work.await?;
          let mut pages = Pages::default();
          pages.push(page, first, next);
          Ok(pages)
        }
      })
      .await
  }

  /// Load the page after the last cached one.
  ///
  /// Joins a pending fetch for `key` if there is one. Without cached pages
  /// this loads the first page from `first`. Once `next` is `None` this is
  /// a no-op returning the cached pages.
  pub async fn fetch_next_page<F, Fut>(
    &self,
    key: &QueryKey,
    first: C,
    fetcher: F,
  ) -> Result<Pages<P, C>>
  where
    F: FnOnce(C, CancellationToken) -> Fut,
    Fut: Future<Output = Result<(P, Option<C>)>> + Send + 'static,
  {
    let step = {
      let mut slots = self.inner.slots.lock();
      let slot = slots.entry(key.clone()).or_insert_with(Slot::empty);
      if let Some(pending) = &slot.pending {
        Step::Wait(pending.future.clone())
      } else {
        let (base, cursor) = match &slot.data {
          None => (Pages::default(), first),
          Some(pages) => match &pages.next {
            None => {
              tracing::trace!(cache = self.inner.name, %key, "pagination exhausted");
              return Ok(pages.clone());
            }
            Some(next) => (pages.clone(), next.clone()),
          },
        };
        tracing::debug!(cache = self.inner.name, %key, page = base.len() + 1, "fetching next page");
        Step::Wait(self.start(key, slot, move |cancel| {
          let work = fetcher(cursor.clone(), cancel);
          async move {
            let (page, next) = work.await?;
            let mut pages = base;
            pages.push(page, cursor, next);
            Ok(pages)
          }
        }))
      }
    };
    step.resolve().await
  }
}

#[cfg(test)]
mod tests {
  use std::{
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
  };

  use super::*;

  fn key(parts: &[&str]) -> QueryKey { QueryKey::new(parts.iter().copied()) }

  #[tokio::test]
  async fn concurrent_fetches_share_one_call() {
    let cache = QueryCache::<u32>::new("test");
    let calls = Arc::new(AtomicUsize::new(0));
    let k = key(&["character", "harry-potter"]);

    let fetch = || {
      let calls = Arc::clone(&calls);
      cache.fetch(&k, move |_| async move {
        calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(10)).await;
        Ok(7)
      })
    };
    let (a, b) = tokio::join!(fetch(), fetch());

    assert_eq!((a.unwrap(), b.unwrap()), (7, 7));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(cache.get(&k), Some(7));
  }

  #[tokio::test]
  async fn failures_are_not_cached() {
    let cache = QueryCache::<u32>::new("test");
    let k = key(&["x"]);

    let err = cache.fetch(&k, |_| async { Err(QueryError::NotFound) }).await;
    assert!(matches!(err, Err(QueryError::NotFound)));
    assert!(cache.is_empty());

    assert_eq!(cache.fetch(&k, |_| async { Ok(1) }).await.unwrap(), 1);
  }

  #[tokio::test]
  async fn cancelled_fetch_does_not_store_its_result() {
    let cache = QueryCache::<u32>::new("test");
    let k = key(&["slow"]);

    let waiter = {
      let cache = cache.clone();
      let k = k.clone();
      tokio::spawn(async move {
        cache
          .fetch(&k, |_| async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(1)
          })
          .await
      })
    };
    while !cache.is_pending(&k) {
      tokio::task::yield_now().await;
    }

    assert!(cache.cancel(&k));
    assert!(matches!(waiter.await.unwrap(), Err(QueryError::Cancelled)));
    assert_eq!(cache.get(&k), None);
    assert!(!cache.cancel(&k));
  }

  #[tokio::test]
  async fn invalidated_fetch_is_not_stored() {
    let cache = QueryCache::<u32>::new("test");
    let k = key(&["k"]);
    let gate = Arc::new(tokio::sync::Notify::new());

    let waiter = {
      let (cache, k, gate) = (cache.clone(), k.clone(), Arc::clone(&gate));
      tokio::spawn(async move {
        cache
          .fetch(&k, move |_| async move {
            gate.notified().await;
            Ok(1)
          })
          .await
      })
    };
    while !cache.is_pending(&k) {
      tokio::task::yield_now().await;
    }

    cache.invalidate(&k);
    gate.notify_one();
    assert_eq!(waiter.await.unwrap().unwrap(), 1);
    assert_eq!(cache.get(&k), None);
  }

  #[tokio::test]
  async fn primed_value_skips_the_fetcher() {
    let cache = QueryCache::<&'static str>::new("test");
    let k = key(&["character", "dobby"]);
    cache.set(&k, "Dobby");

    let calls = AtomicUsize::new(0);
    let value = cache
      .fetch(&k, |_| {
        calls.fetch_add(1, Ordering::SeqCst);
        async { Ok("fetched") }
      })
      .await
      .unwrap();
    assert_eq!(value, "Dobby");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
  }

  #[tokio::test]
  async fn prefix_invalidation_only_hits_the_family() {
    let cache = QueryCache::<u32>::new("test");
    cache.set(&key(&["suggestions", "ha"]), 1);
    cache.set(&key(&["suggestions", "her"]), 2);
    cache.set(&key(&["history"]), 3);

    assert_eq!(cache.invalidate_prefix(&["suggestions"]), 2);
    assert_eq!(cache.get(&key(&["history"])), Some(3));
    assert_eq!(cache.len(), 1);
  }

  #[tokio::test]
  async fn next_page_stops_at_the_end() {
    let cache = QueryCache::<Pages<u32, u32>>::new("pages");
    let k = key(&["list"]);
    let calls = Arc::new(AtomicUsize::new(0));

    let fetcher = |calls: Arc<AtomicUsize>| {
      move |cursor: u32, _: CancellationToken| async move {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok::<_, QueryError>((cursor * 10, (cursor < 2).then_some(cursor + 1)))
      }
    };

    let first = cache.fetch_first(&k, 1, fetcher(calls.clone())).await.unwrap();
    assert_eq!(first.pages, [10]);
    assert_eq!(first.next, Some(2));

    let second = cache.fetch_next_page(&k, 1, fetcher(calls.clone())).await.unwrap();
    assert_eq!(second.pages, [10, 20]);
    assert_eq!(second.params, [1, 2]);
    assert!(second.is_exhausted());

    let third = cache.fetch_next_page(&k, 1, fetcher(calls.clone())).await.unwrap();
    assert_eq!(third, second);
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    // The cached pages are what a later first-page request sees.
    let again = cache.fetch_first(&k, 1, fetcher(calls.clone())).await.unwrap();
    assert_eq!(again.len(), 2);
  }
}
