//! [`Library`]: the operations the front-end performs, over one local store
//! and one remote source.

use std::sync::Arc;

use futures::{FutureExt as _, future::BoxFuture};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use grimoire_core::{
  character::{CharacterAttributes, CharacterPage},
  entry::{BookmarkState, SavedCharacter, SearchHistoryEntry, ViewHistoryEntry},
  filter::{FilterSelection, compile_query},
  history::{PAGE_SIZE, next_page_index},
  live::Live,
  remote::CharacterSource,
  store::LocalStore,
};

use crate::{KeyedMutex, Pages, QueryCache, QueryError, QueryKey, Result, RetryPolicy};

/// Maximum number of search suggestions returned.
pub const SUGGESTION_LIMIT: usize = 10;

/// Remote list pages, keyed by 1-based page number.
pub type CharacterPages = Pages<CharacterPage, u32>;
/// Local history pages, keyed by zero-based page index.
pub type HistoryPages = Pages<Vec<ViewHistoryEntry>, u32>;
/// Local saved-list pages, keyed by zero-based page index.
pub type SavedPages = Pages<Vec<SavedCharacter>, u32>;

type PageFuture<P> = BoxFuture<'static, Result<(P, Option<u32>)>>;

struct Inner<S, R> {
  store:       S,
  remote:      R,
  retry:       RetryPolicy,
  details:     QueryCache<CharacterAttributes>,
  lists:       QueryCache<CharacterPages>,
  history:     QueryCache<HistoryPages>,
  saved:       QueryCache<SavedPages>,
  suggestions: QueryCache<Vec<SearchHistoryEntry>>,
  toggles:     KeyedMutex,
  active_list: Mutex<Option<QueryKey>>,
}

/// The query layer's facade.
///
/// Cloning is cheap; clones share caches and backends.
pub struct Library<S, R> {
  inner: Arc<Inner<S, R>>,
}

impl<S, R> Clone for Library<S, R> {
  fn clone(&self) -> Self { Self { inner: Arc::clone(&self.inner) } }
}

impl<S, R> Library<S, R>
where
  S: LocalStore + 'static,
  R: CharacterSource + 'static,
{
  pub fn new(store: S, remote: R, retry: RetryPolicy) -> Self {
    Self {
      inner: Arc::new(Inner {
        store,
        remote,
        retry,
        details: QueryCache::new("details"),
        lists: QueryCache::new("lists"),
        history: QueryCache::new("history"),
        saved: QueryCache::new("saved"),
        suggestions: QueryCache::new("suggestions"),
        toggles: KeyedMutex::new(),
        active_list: Mutex::new(None),
      }),
    }
  }

  pub fn store(&self) -> &S { &self.inner.store }

  // ─── Characters ──────────────────────────────────────────────────────────

  /// A character's details, from the cache when resident.
  pub async fn character(&self, slug: &str) -> Result<CharacterAttributes> {
    let inner = Arc::clone(&self.inner);
    let slug = slug.to_owned();
    self
      .inner
      .details
      .fetch(&QueryKey::character(&slug), move |cancel| async move {
        inner
          .retry
          .run("character", &cancel, || {
            inner.remote.get_character(slug.clone(), cancel.clone())
          })
          .await
      })
      .await
  }

  /// The cached details for `slug`, without fetching.
  pub fn cached_character(&self, slug: &str) -> Option<CharacterAttributes> {
    self.inner.details.get(&QueryKey::character(slug))
  }

  /// Seed the detail entry with attributes already known from a list.
  pub fn prime_character(&self, attributes: CharacterAttributes) {
    let key = QueryKey::character(&attributes.slug);
    self.inner.details.set(&key, attributes);
  }

  pub fn invalidate_character(&self, slug: &str) -> bool {
    self.inner.details.invalidate(&QueryKey::character(slug))
  }

  /// Open a detail view: fetch the character and record the visit.
  pub async fn open_character(&self, slug: &str) -> Result<CharacterAttributes> {
    let character = self.character(slug).await?;
    self.record_view(&character.slug, &character.name).await?;
    Ok(character)
  }

  // ─── Lists ───────────────────────────────────────────────────────────────

  /// The first page of a list query (or every page loaded so far).
  ///
  /// Starting a different list query cancels the previous one if it is
  /// still loading.
  pub async fn browse(&self, search: &str, selection: &FilterSelection) -> Result<CharacterPages> {
    let key = self.activate(search, selection);
    let fetch = self.list_fetcher(search, selection);
    self.inner.lists.fetch_first(&key, 1, fetch).await
  }

  /// Load the next page of a list query. A no-op once the remote signals
  /// the last page.
  pub async fn browse_next(
    &self,
    search: &str,
    selection: &FilterSelection,
  ) -> Result<CharacterPages> {
    let key = self.activate(search, selection);
    let fetch = self.list_fetcher(search, selection);
    self.inner.lists.fetch_next_page(&key, 1, fetch).await
  }

  /// The saved pages currently cached, without loading.
  pub fn cached_saved(&self) -> Option<SavedPages> { self.inner.saved.get(&QueryKey::saved()) }

  pub fn cached_list(&self, search: &str, selection: &FilterSelection) -> Option<CharacterPages> {
    self.inner.lists.get(&QueryKey::characters(search, selection))
  }

  /// Abandon the current list query if it is still loading.
  pub fn cancel_browse(&self) -> bool {
    let active = self.inner.active_list.lock().take();
    active.is_some_and(|key| self.inner.lists.cancel(&key))
  }

  fn activate(&self, search: &str, selection: &FilterSelection) -> QueryKey {
    let key = QueryKey::characters(search, selection);
    let previous = self.inner.active_list.lock().replace(key.clone());
    if let Some(previous) = previous.filter(|previous| *previous != key) {
      if self.inner.lists.cancel(&previous) {
        tracing::debug!(superseded = %previous, "superseded list query");
      }
    }
    key
  }

  fn list_fetcher(
    &self,
    search: &str,
    selection: &FilterSelection,
  ) -> impl FnOnce(u32, CancellationToken) -> PageFuture<CharacterPage> {
    let inner = Arc::clone(&self.inner);
    let params = compile_query(search, selection);
    move |page, cancel| {
      async move {
        let mut params = params;
        params.set("page[number]", page.to_string());
        let response = inner
          .retry
          .run("characters", &cancel, || {
            inner.remote.list_characters(params.clone(), cancel.clone())
          })
          .await?;
        let next = response.next_page();
        Ok((response, next))
      }
      .boxed()
    }
  }

  // ─── Bookmarks ───────────────────────────────────────────────────────────

  /// Save `slug` if it is not saved, remove it otherwise.
  ///
  /// Toggles on one slug run strictly one after another. Existence is read
  /// from the store, never from the cache. The saved list is invalidated
  /// whether the toggle succeeds, fails or is abandoned.
  pub async fn toggle_bookmark(&self, slug: &str) -> Result<BookmarkState> {
    let result = {
      let _refresh = self.inner.saved.invalidate_on_drop(&QueryKey::SAVED_PREFIX);
      let _guard = self.inner.toggles.lock(slug).await;
      self.toggle_locked(slug).await
    };

    match &result {
      Ok(state) => tracing::info!(slug, saved = state.is_saved(), "toggled bookmark"),
      Err(error) if error.is_cancelled() => {}
      Err(error) => tracing::warn!(slug, %error, "bookmark toggle failed"),
    }
    result
  }

  async fn toggle_locked(&self, slug: &str) -> Result<BookmarkState> {
    let store = &self.inner.store;
    if store.is_saved(slug.to_owned()).await.map_err(QueryError::store)? {
      store
        .unsave_character(slug.to_owned())
        .await
        .map_err(QueryError::store)?;
      return Ok(BookmarkState::Removed);
    }

    let name = match self.cached_character(slug) {
      Some(character) => character.name,
      None => self.character(slug).await?.name,
    };
    store
      .save_character(slug.to_owned(), name)
      .await
      .map_err(QueryError::store)?;
    Ok(BookmarkState::Saved)
  }

  /// Whether `slug` is saved, updated after every write to its row.
  pub async fn is_bookmarked(&self, slug: &str) -> Result<Live<bool>> {
    self
      .inner
      .store
      .watch_saved(slug.to_owned())
      .await
      .map_err(QueryError::store)
  }

  /// Remove a saved row directly, e.g. from the saved list.
  pub async fn remove_saved(&self, slug: &str) -> Result<bool> {
    let _refresh = self.inner.saved.invalidate_on_drop(&QueryKey::SAVED_PREFIX);
    let _guard = self.inner.toggles.lock(slug).await;
    self
      .inner
      .store
      .unsave_character(slug.to_owned())
      .await
      .map_err(QueryError::store)
  }

  /// The saved list, most recently saved first.
  pub async fn saved(&self) -> Result<SavedPages> {
    let fetch = self.saved_fetcher();
    self.inner.saved.fetch_first(&QueryKey::saved(), 0, fetch).await
  }

  pub async fn saved_next(&self) -> Result<SavedPages> {
    let fetch = self.saved_fetcher();
    self.inner.saved.fetch_next_page(&QueryKey::saved(), 0, fetch).await
  }

  fn saved_fetcher(
    &self,
  ) -> impl FnOnce(u32, CancellationToken) -> PageFuture<Vec<SavedCharacter>> {
    let inner = Arc::clone(&self.inner);
    move |index, _cancel| {
      async move {
        let offset = index as usize * PAGE_SIZE;
        let rows = inner
          .store
          .saved_characters(PAGE_SIZE, offset)
          .await
          .map_err(QueryError::store)?;
        let next = next_page_index(index, rows.len());
        Ok((rows, next))
      }
      .boxed()
    }
  }

  // ─── View history ────────────────────────────────────────────────────────

  pub async fn record_view(&self, slug: &str, name: &str) -> Result<ViewHistoryEntry> {
    let entry = self
      .inner
      .store
      .record_view(slug.to_owned(), name.to_owned())
      .await
      .map_err(QueryError::store)?;
    self.inner.history.invalidate_prefix(&[QueryKey::HISTORY]);
    Ok(entry)
  }

  /// View history pages loaded so far, newest first. Group them with
  /// [`group_view_history`](grimoire_core::history::group_view_history).
  pub async fn history(&self) -> Result<HistoryPages> {
    let fetch = self.history_fetcher();
    self.inner.history.fetch_first(&QueryKey::history(), 0, fetch).await
  }

  /// Load one more page of history. A no-op after a short page.
  pub async fn history_next(&self) -> Result<HistoryPages> {
    let fetch = self.history_fetcher();
    self.inner.history.fetch_next_page(&QueryKey::history(), 0, fetch).await
  }

  fn history_fetcher(
    &self,
  ) -> impl FnOnce(u32, CancellationToken) -> PageFuture<Vec<ViewHistoryEntry>> {
    let inner = Arc::clone(&self.inner);
    move |index, _cancel| {
      async move {
        let offset = index as usize * PAGE_SIZE;
        let rows = inner
          .store
          .view_history(PAGE_SIZE, offset)
          .await
          .map_err(QueryError::store)?;
        let next = next_page_index(index, rows.len());
        Ok((rows, next))
      }
      .boxed()
    }
  }

  pub async fn delete_history_entry(&self, slug: &str) -> Result<bool> {
    let deleted = self
      .inner
      .store
      .delete_view(slug.to_owned())
      .await
      .map_err(QueryError::store)?;
    self.inner.history.invalidate_prefix(&[QueryKey::HISTORY]);
    Ok(deleted)
  }

  pub async fn clear_history(&self) -> Result<usize> {
    let removed = self
      .inner
      .store
      .clear_view_history()
      .await
      .map_err(QueryError::store)?;
    self.inner.history.invalidate_prefix(&[QueryKey::HISTORY]);
    Ok(removed)
  }

  // ─── Search history ──────────────────────────────────────────────────────

  /// Remember a submitted search. Invalidates every cached suggestion list.
  pub async fn record_search(&self, query: &str) -> Result<SearchHistoryEntry> {
    let entry = self
      .inner
      .store
      .record_search(query.to_owned())
      .await
      .map_err(QueryError::store)?;
    self.inner.suggestions.invalidate_prefix(&[QueryKey::SUGGESTIONS]);
    Ok(entry)
  }

  /// Past searches containing `text`, most recently used first.
  pub async fn suggestions(&self, text: &str) -> Result<Vec<SearchHistoryEntry>> {
    let inner = Arc::clone(&self.inner);
    let owned = text.to_owned();
    self
      .inner
      .suggestions
      .fetch(&QueryKey::suggestions(text), move |_cancel| async move {
        inner
          .store
          .search_suggestions(owned, SUGGESTION_LIMIT)
          .await
          .map_err(QueryError::store)
      })
      .await
  }
}
