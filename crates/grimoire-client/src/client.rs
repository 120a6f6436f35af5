//! Async HTTP client wrapping the character database's JSON API.

use std::time::Duration;

use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use grimoire_core::{
  character::{CharacterAttributes, CharacterPage, Single},
  params::ParameterSet,
  remote::{CharacterSource, FetchError},
};

use crate::{Error, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.potterdb.com/v1";

/// Connection settings for the remote API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  pub base_url: String,
  pub timeout:  Duration,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self { base_url: DEFAULT_BASE_URL.to_owned(), timeout: Duration::from_secs(30) }
  }
}

/// Async HTTP client for the character API.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  base:   Url,
  config: ApiConfig,
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self> {
    let invalid = |reason: String| Error::BaseUrl { url: config.base_url.clone(), reason };
    let base = Url::parse(&config.base_url).map_err(|e| invalid(e.to_string()))?;
    if base.cannot_be_a_base() {
      return Err(invalid("cannot be a base".to_owned()));
    }
    let client = Client::builder().timeout(config.timeout).build()?;
    Ok(Self { client, base, config })
  }

  pub fn base_url(&self) -> &str { &self.config.base_url }

  /// The base URL followed by `segments`, each percent-encoded as a single
  /// path segment.
  fn url(&self, segments: &[&str]) -> Url {
    let mut url = self.base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
      path.pop_if_empty().extend(segments);
    }
    url
  }

  /// Send a GET and decode the JSON body, classifying failures.
  async fn get_json<T: DeserializeOwned>(
    &self,
    segments: &[&str],
    query: &[(String, String)],
    cancel: &CancellationToken,
  ) -> Result<T, FetchError> {
    let url = self.url(segments);
    let path = url.path().to_owned();
    let request = async {
      let response = self
        .client
        .get(url)
        .query(query)
        .send()
        .await
        .map_err(|e| FetchError::Transient(e.to_string()))?;

      let status = response.status();
      if status == StatusCode::NOT_FOUND {
        return Err(FetchError::NotFound);
      }
      if !status.is_success() {
        return Err(FetchError::Transient(format!("GET {path} → {status}")));
      }

      let body = response
        .bytes()
        .await
        .map_err(|e| FetchError::Transient(e.to_string()))?;
      serde_json::from_slice(&body).map_err(|e| FetchError::Invalid(e.to_string()))
    };

    let result = tokio::select! {
      _ = cancel.cancelled() => Err(FetchError::Cancelled),
      result = request => result,
    };
    if let Err(error) = &result {
      tracing::debug!(%path, %error, "remote request failed");
    }
    result
  }
}

impl CharacterSource for ApiClient {
  /// `GET /characters?<params>`
  async fn list_characters(
    &self,
    params: ParameterSet,
    cancel: CancellationToken,
  ) -> Result<CharacterPage, FetchError> {
    tracing::debug!(%params, "GET /characters");
    self.get_json(&["characters"], params.pairs(), &cancel).await
  }

  /// `GET /characters/:slug`
  async fn get_character(
    &self,
    slug: String,
    cancel: CancellationToken,
  ) -> Result<CharacterAttributes, FetchError> {
    let single: Single<CharacterAttributes> =
      self.get_json(&["characters", slug.as_str()], &[], &cancel).await?;
    Ok(single.data.attributes)
  }
}
