//! Core types and trait definitions for Grimoire, an offline-friendly
//! browser for a remote character database.
//!
//! This crate is deliberately free of HTTP and database dependencies. The
//! local store (`grimoire-store-sqlite`), the remote client
//! (`grimoire-client`) and the query layer (`grimoire-query`) all depend on
//! it, never on each other's concrete types.

pub mod character;
pub mod clock;
pub mod entry;
pub mod error;
pub mod filter;
pub mod history;
pub mod live;
pub mod params;
pub mod remote;
pub mod slug;
pub mod store;

pub use error::{Error, Result};
