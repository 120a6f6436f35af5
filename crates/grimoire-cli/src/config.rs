//! Layered configuration: defaults, then the TOML file, then `GRIMOIRE_*`
//! environment variables.

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use anyhow::Context as _;
use serde::Deserialize;

use grimoire_client::{ApiConfig, DEFAULT_BASE_URL};
use grimoire_query::RetryPolicy;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
  pub api_url:              String,
  pub store_path:           PathBuf,
  pub request_timeout_secs: u64,
  pub retry:                RetrySettings,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
  pub retries:       u32,
  pub base_delay_ms: u64,
  pub max_delay_ms:  u64,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      api_url:              DEFAULT_BASE_URL.to_owned(),
      store_path:           PathBuf::from("~/.local/share/grimoire/grimoire.db"),
      request_timeout_secs: 30,
      retry:                RetrySettings::default(),
    }
  }
}

impl Default for RetrySettings {
  fn default() -> Self { Self { retries: 3, base_delay_ms: 1_000, max_delay_ms: 30_000 } }
}

impl Settings {
  /// Read `path` if it exists and apply environment overrides.
  ///
  /// Nested keys use a double underscore, e.g. `GRIMOIRE_RETRY__RETRIES`.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("GRIMOIRE").separator("__"))
      .build()
      .with_context(|| format!("failed to read config file {}", path.display()))?;

    settings
      .try_deserialize()
      .context("failed to deserialise settings")
  }

  /// The store location with a leading `~` expanded.
  pub fn store_path(&self) -> PathBuf { expand_tilde(&self.store_path) }

  pub fn api_config(&self) -> ApiConfig {
    ApiConfig {
      base_url: self.api_url.clone(),
      timeout:  Duration::from_secs(self.request_timeout_secs),
    }
  }

  pub fn retry_policy(&self) -> RetryPolicy {
    RetryPolicy {
      retries:    self.retry.retries,
      base_delay: Duration::from_millis(self.retry.base_delay_ms),
      max_delay:  Duration::from_millis(self.retry.max_delay_ms),
    }
  }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use std::io::Write as _;

  use super::*;

  #[test]
  fn missing_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings::load(&dir.path().join("absent.toml")).unwrap();
    assert_eq!(settings.api_url, DEFAULT_BASE_URL);
    assert_eq!(settings.retry_policy(), RetryPolicy::default());
  }

  #[test]
  fn file_values_override_defaults() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(
      file,
      "api_url = \"http://localhost:9000/v1\"\nstore_path = \"/tmp/g.db\"\n\n[retry]\nretries = 1"
    )
    .unwrap();

    let settings = Settings::load(file.path()).unwrap();
    assert_eq!(settings.api_url, "http://localhost:9000/v1");
    assert_eq!(settings.store_path(), PathBuf::from("/tmp/g.db"));
    assert_eq!(settings.retry.retries, 1);
    assert_eq!(settings.retry.base_delay_ms, 1_000);
    assert_eq!(settings.request_timeout_secs, 30);
  }

  #[test]
  fn tilde_is_expanded() {
    let Ok(home) = std::env::var("HOME") else { return };
    let expanded = expand_tilde(Path::new("~/grimoire.db"));
    assert_eq!(expanded, PathBuf::from(home).join("grimoire.db"));
    assert_eq!(expand_tilde(Path::new("/abs")), PathBuf::from("/abs"));
  }
}
