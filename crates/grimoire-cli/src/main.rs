//! grimoire command-line browser.
//!
//! Searches the character database, shows character details, and keeps
//! saved characters, view history and search history in a local SQLite
//! store. Settings come from `grimoire.toml` (or `--config`) and
//! `GRIMOIRE_*` environment variables.

mod commands;
mod config;
mod render;

use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use grimoire_client::ApiClient;
use grimoire_query::Library;
use grimoire_store_sqlite::SqliteStore;

use crate::{commands::Command, config::Settings};

#[derive(Parser)]
#[command(author, version, about = "Browse wizarding-world characters")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "grimoire.toml", global = true)]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Logs go to stderr so command output stays pipeable.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();
  let settings = Settings::load(&cli.config)?;

  let store_path = settings.store_path();
  if let Some(parent) = store_path.parent().filter(|p| !p.as_os_str().is_empty()) {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {}", parent.display()))?;
  }

  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {}", store_path.display()))?;
  let client = ApiClient::new(settings.api_config()).context("failed to build HTTP client")?;
  tracing::debug!(store = %store_path.display(), api = %client.base_url(), "starting");

  let app = Library::new(store, client, settings.retry_policy());
  commands::run(&app, cli.command).await
}
