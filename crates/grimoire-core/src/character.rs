//! Remote character records as served by the character database API.
//!
//! These types mirror the JSON:API-style envelopes of the remote resource.
//! The core never mutates them; only `slug` and `name` flow into the local
//! store.

use serde::{Deserialize, Serialize};

// ─── Envelopes ───────────────────────────────────────────────────────────────

/// A single JSON:API resource object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource<T> {
  pub id:         String,
  #[serde(rename = "type", default)]
  pub kind:       String,
  pub attributes: T,
}

/// `GET /characters/:slug` response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Single<T> {
  pub data: Resource<T>,
}

/// Pagination block of a list response. `next` is absent on the last page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Pagination {
  pub current: u32,
  #[serde(default)]
  pub next:    Option<u32>,
  #[serde(default)]
  pub records: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PageMeta {
  pub pagination: Pagination,
}

/// `GET /characters` response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
  pub data: Vec<Resource<T>>,
  pub meta: PageMeta,
}

impl<T> Page<T> {
  /// The cursor of the following page, or `None` at the end.
  pub fn next_page(&self) -> Option<u32> { self.meta.pagination.next }
}

pub type CharacterPage = Page<CharacterAttributes>;

// ─── Character ───────────────────────────────────────────────────────────────

/// Attributes of a character. `slug` is the immutable identity.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CharacterAttributes {
  pub slug:           String,
  pub name:           String,
  pub born:           Option<String>,
  pub died:           Option<String>,
  pub gender:         Option<String>,
  pub species:        Option<String>,
  pub height:         Option<String>,
  pub weight:         Option<String>,
  pub hair_color:     Option<String>,
  pub eye_color:      Option<String>,
  pub skin_color:     Option<String>,
  pub blood_status:   Option<String>,
  pub marital_status: Option<String>,
  pub nationality:    Option<String>,
  pub animagus:       Option<String>,
  pub boggart:        Option<String>,
  pub house:          Option<String>,
  pub patronus:       Option<String>,
  #[serde(default)]
  pub alias_names:    Vec<String>,
  #[serde(default)]
  pub family_members: Vec<String>,
  #[serde(default)]
  pub jobs:           Vec<String>,
  #[serde(default)]
  pub romances:       Vec<String>,
  #[serde(default)]
  pub titles:         Vec<String>,
  #[serde(default)]
  pub wands:          Vec<String>,
  /// Image URL; the API sends `null` for characters without a portrait.
  pub image:          Option<String>,
  pub wiki:           Option<String>,
}
