//! SQLite backend for the Grimoire local store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated
//! thread without blocking the async runtime. Live reads are re-evaluated on
//! that same thread, inside the closure that performed the write.

mod encode;
mod live;
mod migrations;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use migrations::SCHEMA_VERSION;
pub use store::SqliteStore;
