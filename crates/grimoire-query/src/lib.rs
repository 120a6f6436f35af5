//! The query layer: an in-memory cache over remote and local reads, and the
//! [`Library`] facade the front-end talks to.
//!
//! Remote fetches are deduplicated per [`QueryKey`], retried according to a
//! [`RetryPolicy`], and abandoned through cancellation tokens when a key is
//! superseded. The local store stays authoritative for bookmark state; the
//! cache only mirrors reads of it.

mod cache;
mod error;
mod key;
mod library;
mod retry;
mod serial;

pub use cache::{InvalidateOnDrop, Pages, QueryCache};
pub use error::{QueryError, Result};
pub use key::QueryKey;
pub use library::{CharacterPages, HistoryPages, Library, SavedPages, SUGGESTION_LIMIT};
pub use retry::RetryPolicy;
pub use serial::{KeyedGuard, KeyedMutex};
