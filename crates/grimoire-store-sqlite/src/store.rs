//! [`SqliteStore`]: the SQLite implementation of [`LocalStore`].

use std::{path::Path, sync::Arc};

use tokio::sync::watch;

use grimoire_core::{
  clock::{Clock, SystemClock},
  entry::{SavedCharacter, SearchHistoryEntry, ViewHistoryEntry},
  live::{Change, Interest, Live, Table},
  store::LocalStore,
};

use crate::{
  encode::{contains_pattern, encode_ts, RawSaved, RawSearch, RawView},
  live::{LiveRegistry, Refresh},
  migrations, Error, Result,
};

/// SQLite takes signed limits; anything past `i64::MAX` means "no limit".
fn sql_count(n: usize) -> i64 { i64::try_from(n).unwrap_or(i64::MAX) }

fn saved_exists(conn: &rusqlite::Connection, slug: &str) -> rusqlite::Result<bool> {
  conn.query_row(
    "SELECT EXISTS(SELECT 1 FROM saved_characters WHERE character_slug = ?1)",
    rusqlite::params![slug],
    |r| r.get(0),
  )
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A local store backed by a single SQLite file.
///
/// Cloning is cheap: clones share the connection, the clock and the live
/// read registry.
#[derive(Clone)]
pub struct SqliteStore {
  conn:  tokio_rusqlite::Connection,
  live:  LiveRegistry,
  clock: Arc<dyn Clock>,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and bring its schema up to date.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    Self::open_with_clock(path, SystemClock).await
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    Self::open_in_memory_with_clock(SystemClock).await
  }

  pub async fn open_with_clock(
    path: impl AsRef<Path>,
    clock: impl Clock + 'static,
  ) -> Result<Self> {
    let path = path.as_ref();
    tracing::info!(path = %path.display(), "opening local store");
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::init(conn, Arc::new(clock)).await
  }

  pub async fn open_in_memory_with_clock(clock: impl Clock + 'static) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::init(conn, Arc::new(clock)).await
  }

  async fn init(conn: tokio_rusqlite::Connection, clock: Arc<dyn Clock>) -> Result<Self> {
    let store = Self { conn, live: LiveRegistry::default(), clock };
    store.migrate().await?;
    Ok(store)
  }

  /// Apply pending migrations. A failure here leaves the store unusable.
  async fn migrate(&self) -> Result<u32> {
    self
      .conn
      .call(|conn| Ok(migrations::run(conn)?))
      .await
      .map_err(|e| {
        tracing::error!(error = %e, "local store migration failed");
        Error::Migration(e)
      })
  }

  /// The `user_version` the database reports.
  pub async fn schema_version(&self) -> Result<u32> {
    let version = self
      .conn
      .call(|conn| Ok(conn.pragma_query_value(None, "user_version", |r| r.get(0))?))
      .await?;
    Ok(version)
  }

  /// Register a live read.
  ///
  /// `query` runs once now for the initial value, then again on the database
  /// thread after every write whose [`Change`] touches `interest`.
  pub async fn subscribe<T, Q>(&self, interest: Interest, query: Q) -> Result<Live<T>>
  where
    T: Send + Sync + 'static,
    Q: Fn(&rusqlite::Connection) -> rusqlite::Result<T> + Send + Sync + 'static,
  {
    let live = self.live.clone();
    let (rx, subscription) = self
      .conn
      .call(move |conn| {
        let initial = query(conn)?;
        let (tx, rx) = watch::channel(initial);
        let described = format!("{interest:?}");
        let refresh: Refresh = Arc::new(move |conn: &rusqlite::Connection| {
          match query(conn) {
            Ok(value) => {
              tx.send_replace(value);
            }
            Err(error) => {
              tracing::error!(%error, interest = %described, "live read refresh failed");
            }
          }
        });
        let id = live.register(interest, refresh);
        Ok((rx, live.subscription(id)))
      })
      .await?;
    Ok(Live::new(rx, subscription))
  }

  /// Number of live reads currently registered.
  pub fn live_count(&self) -> usize { self.live.len() }

  fn now(&self) -> i64 { encode_ts(self.clock.now()) }
}

// ─── LocalStore impl ─────────────────────────────────────────────────────────

impl LocalStore for SqliteStore {
  type Error = Error;

  // ── Search history ────────────────────────────────────────────────────────

  async fn record_search(&self, query: String) -> Result<SearchHistoryEntry> {
    let now = self.now();
    let live = self.live.clone();

    let raw = self
      .conn
      .call(move |conn| {
        let raw = conn.query_row(
          "INSERT INTO search_history (query, used_at) VALUES (?1, ?2)
           ON CONFLICT(query) DO UPDATE SET used_at = excluded.used_at
           RETURNING id, query, used_at",
          rusqlite::params![query, now],
          RawSearch::from_row,
        )?;
        live.notify(conn, &Change::row(Table::SearchHistory, query));
        Ok(raw)
      })
      .await?;

    raw.into_entry()
  }

  async fn search_suggestions(
    &self,
    text: String,
    limit: usize,
  ) -> Result<Vec<SearchHistoryEntry>> {
    let pattern = contains_pattern(&text);
    let limit = sql_count(limit);

    let raws: Vec<RawSearch> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT id, query, used_at FROM search_history
           WHERE query LIKE ?1 ESCAPE '\\'
           ORDER BY used_at DESC, id DESC
           LIMIT ?2",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![pattern, limit], RawSearch::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSearch::into_entry).collect()
  }

  // ── View history ──────────────────────────────────────────────────────────

  async fn record_view(&self, slug: String, name: String) -> Result<ViewHistoryEntry> {
    let now = self.now();
    let live = self.live.clone();

    let raw = self
      .conn
      .call(move |conn| {
        let raw = conn.query_row(
          "INSERT INTO view_history (character_slug, character_name, viewed_at)
           VALUES (?1, ?2, unixepoch(?3, 'unixepoch', 'start of day'))
           ON CONFLICT(character_slug) DO UPDATE SET
             character_name = excluded.character_name,
             viewed_at      = excluded.viewed_at
           RETURNING character_slug, character_name, viewed_at",
          rusqlite::params![slug, name, now],
          RawView::from_row,
        )?;
        live.notify(conn, &Change::row(Table::ViewHistory, slug));
        Ok(raw)
      })
      .await?;

    raw.into_entry()
  }

  async fn view_history(&self, limit: usize, offset: usize) -> Result<Vec<ViewHistoryEntry>> {
    let (limit, offset) = (sql_count(limit), sql_count(offset));

    let raws: Vec<RawView> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT character_slug, character_name, viewed_at FROM view_history
           ORDER BY viewed_at DESC, rowid DESC
           LIMIT ?1 OFFSET ?2",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![limit, offset], RawView::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawView::into_entry).collect()
  }

  async fn delete_view(&self, slug: String) -> Result<bool> {
    let live = self.live.clone();

    let deleted = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "DELETE FROM view_history WHERE character_slug = ?1",
          rusqlite::params![slug],
        )?;
        if n > 0 {
          live.notify(conn, &Change::row(Table::ViewHistory, slug));
        }
        Ok(n > 0)
      })
      .await?;
    Ok(deleted)
  }

  async fn clear_view_history(&self) -> Result<usize> {
    let live = self.live.clone();

    let n = self
      .conn
      .call(move |conn| {
        let n = conn.execute("DELETE FROM view_history", [])?;
        live.notify(conn, &Change::all(Table::ViewHistory));
        Ok(n)
      })
      .await?;
    tracing::info!(removed = n, "cleared view history");
    Ok(n)
  }

  // ── Saved characters ──────────────────────────────────────────────────────

  async fn is_saved(&self, slug: String) -> Result<bool> {
    let saved = self.conn.call(move |conn| Ok(saved_exists(conn, &slug)?)).await?;
    Ok(saved)
  }

  async fn save_character(&self, slug: String, name: String) -> Result<SavedCharacter> {
    let now = self.now();
    let live = self.live.clone();

    let raw = self
      .conn
      .call(move |conn| {
        let raw = conn.query_row(
          "INSERT INTO saved_characters (character_slug, character_name, saved_at)
           VALUES (?1, ?2, ?3)
           ON CONFLICT(character_slug) DO UPDATE SET
             character_name = excluded.character_name,
             saved_at       = excluded.saved_at
           RETURNING character_slug, character_name, saved_at",
          rusqlite::params![slug, name, now],
          RawSaved::from_row,
        )?;
        live.notify(conn, &Change::row(Table::SavedCharacters, slug));
        Ok(raw)
      })
      .await?;

    raw.into_entry()
  }

  async fn unsave_character(&self, slug: String) -> Result<bool> {
    let live = self.live.clone();

    let deleted = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "DELETE FROM saved_characters WHERE character_slug = ?1",
          rusqlite::params![slug],
        )?;
        if n > 0 {
          live.notify(conn, &Change::row(Table::SavedCharacters, slug));
        }
        Ok(n > 0)
      })
      .await?;
    Ok(deleted)
  }

  async fn saved_characters(&self, limit: usize, offset: usize) -> Result<Vec<SavedCharacter>> {
    let (limit, offset) = (sql_count(limit), sql_count(offset));

    let raws: Vec<RawSaved> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT character_slug, character_name, saved_at FROM saved_characters
           ORDER BY saved_at DESC, rowid DESC
           LIMIT ?1 OFFSET ?2",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![limit, offset], RawSaved::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSaved::into_entry).collect()
  }

  // ── Live reads ────────────────────────────────────────────────────────────

  async fn watch_saved(&self, slug: String) -> Result<Live<bool>> {
    let interest = Interest::row(Table::SavedCharacters, slug.clone());
    self.subscribe(interest, move |conn| saved_exists(conn, &slug)).await
  }
}
