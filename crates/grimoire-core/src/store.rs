//! The `LocalStore` trait: durable storage for search history, view history
//! and saved characters.
//!
//! The trait is implemented by storage backends (e.g.
//! `grimoire-store-sqlite`). Higher layers (`grimoire-query`, the CLI)
//! depend on this abstraction, not on any concrete backend.

use std::future::Future;

use crate::{
  entry::{SavedCharacter, SearchHistoryEntry, ViewHistoryEntry},
  live::Live,
};

/// Abstraction over a local store backend.
///
/// The three tables are independent; every write is a single-table
/// statement. Upserts are atomic: readers never observe a half-applied row.
/// Timestamps are assigned by the store.
///
/// Every write notifies the live reads whose interest it touches before the
/// returned future resolves.
pub trait LocalStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Search history ────────────────────────────────────────────────────

  /// Insert `query`, or refresh `used_at` if it was searched before.
  fn record_search(
    &self,
    query: String,
  ) -> impl Future<Output = Result<SearchHistoryEntry, Self::Error>> + Send + '_;

  /// Up to `limit` past searches containing `text`, most recently used
  /// first.
  fn search_suggestions(
    &self,
    text: String,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<SearchHistoryEntry>, Self::Error>> + Send + '_;

  // ── View history ──────────────────────────────────────────────────────

  /// Insert a visit, or update the name and move `viewed_at` to the start
  /// of the current day.
  fn record_view(
    &self,
    slug: String,
    name: String,
  ) -> impl Future<Output = Result<ViewHistoryEntry, Self::Error>> + Send + '_;

  /// A page of view history, newest first.
  fn view_history(
    &self,
    limit: usize,
    offset: usize,
  ) -> impl Future<Output = Result<Vec<ViewHistoryEntry>, Self::Error>> + Send + '_;

  /// Remove one visit. Returns whether a row was deleted.
  fn delete_view(
    &self,
    slug: String,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Remove every visit. Returns the number of rows deleted.
  fn clear_view_history(
    &self,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  // ── Saved characters ──────────────────────────────────────────────────

  /// Whether a saved row exists for `slug`.
  fn is_saved(
    &self,
    slug: String,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Insert a saved row, or refresh its name and `saved_at`.
  fn save_character(
    &self,
    slug: String,
    name: String,
  ) -> impl Future<Output = Result<SavedCharacter, Self::Error>> + Send + '_;

  /// Remove the saved row for `slug`. Returns whether a row was deleted.
  fn unsave_character(
    &self,
    slug: String,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// A page of saved characters, most recently saved first.
  fn saved_characters(
    &self,
    limit: usize,
    offset: usize,
  ) -> impl Future<Output = Result<Vec<SavedCharacter>, Self::Error>> + Send + '_;

  // ── Live reads ────────────────────────────────────────────────────────

  /// Whether `slug` is saved, re-delivered after every write to its row.
  fn watch_saved(
    &self,
    slug: String,
  ) -> impl Future<Output = Result<Live<bool>, Self::Error>> + Send + '_;
}
