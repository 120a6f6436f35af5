//! HTTP client for the remote character database.
//!
//! [`ApiClient`] implements [`CharacterSource`](grimoire_core::remote::CharacterSource)
//! over `reqwest` and classifies every response into the outcome classes
//! the query layer retries on.

mod client;

pub mod error;

pub use client::{ApiClient, ApiConfig, DEFAULT_BASE_URL};
pub use error::{Error, Result};

#[cfg(test)]
mod tests;
