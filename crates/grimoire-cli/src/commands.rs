//! Subcommands and their handlers.

use anyhow::{Context as _, Result, bail};
use chrono::Utc;
use clap::{Args, Subcommand};

use grimoire_client::ApiClient;
use grimoire_core::{
  filter::{FilterField, FilterSelection, FilterState, SortOrder, compile_query},
  history::group_view_history,
};
use grimoire_query::{Library, QueryError};
use grimoire_store_sqlite::SqliteStore;

use crate::render;

pub type App = Library<SqliteStore, ApiClient>;

// ─── Arguments ───────────────────────────────────────────────────────────────

#[derive(Subcommand, Debug)]
pub enum Command {
  /// Search characters by name, with optional filters and sort.
  Search {
    /// Text the name must contain.
    #[arg(default_value = "")]
    text:    String,
    #[command(flatten)]
    filters: FilterArgs,
    /// Number of result pages to load.
    #[arg(long, default_value_t = 1)]
    pages:   u32,
  },
  /// Show a character and record the visit.
  Show { slug: String },
  /// Save a character, or remove it if already saved.
  Bookmark { slug: String },
  /// List saved characters.
  Saved {
    #[arg(long, default_value_t = 1)]
    pages: u32,
  },
  /// Remove a saved character.
  Unsave { slug: String },
  /// Show view history grouped by day.
  History {
    #[arg(long, default_value_t = 1)]
    pages: u32,
  },
  /// Remove one character from the view history.
  Forget { slug: String },
  /// Remove the whole view history.
  ClearHistory,
  /// Past searches containing some text.
  Suggest {
    #[arg(default_value = "")]
    text: String,
  },
  /// Show the filter screen for a selection and the parameters it sends.
  Filter {
    #[command(flatten)]
    filters: FilterArgs,
  },
}

/// Filter and sort flags shared by `search` and `filter`.
#[derive(Args, Debug, Default)]
pub struct FilterArgs {
  /// `name` or `-name`.
  #[arg(long, allow_hyphen_values = true)]
  sort:              Option<String>,
  #[arg(long, value_name = "VALUE")]
  gender:            Vec<String>,
  #[arg(long, value_name = "VALUE")]
  house:             Vec<String>,
  #[arg(long, value_name = "VALUE")]
  blood_status:      Vec<String>,
  #[arg(long, value_name = "VALUE")]
  species:           Vec<String>,
  /// Only characters with no gender.
  #[arg(long)]
  gender_none:       bool,
  /// Only characters with no house.
  #[arg(long)]
  house_none:        bool,
  /// Only characters with no blood status.
  #[arg(long)]
  blood_status_none: bool,
  /// Only characters with no species.
  #[arg(long)]
  species_none:      bool,
}

impl FilterArgs {
  /// Replay the flags as filter-screen taps on a fresh state.
  pub fn state(&self) -> Result<FilterState> {
    let state = FilterState::default();
    if let Some(sort) = &self.sort {
      state.toggle_sort(SortOrder::parse(sort)?);
    }

    for (field, values, none) in [
      (FilterField::Gender, &self.gender, self.gender_none),
      (FilterField::House, &self.house, self.house_none),
      (FilterField::BloodStatus, &self.blood_status, self.blood_status_none),
      (FilterField::Species, &self.species, self.species_none),
    ] {
      if none && !values.is_empty() {
        let flag = field.as_ref().replace('_', "-");
        bail!("--{flag}-none cannot be combined with --{flag} values");
      }
      if none {
        state.toggle_none(field);
      }
      for value in values {
        state.toggle(field, value);
      }
    }
    Ok(state)
  }
}

// ─── Handlers ────────────────────────────────────────────────────────────────

pub async fn run(app: &App, command: Command) -> Result<()> {
  match command {
    Command::Search { text, filters, pages } => {
      search(app, &text, &filters.state()?.snapshot(), pages).await
    }
    Command::Show { slug } => show(app, &slug).await,
    Command::Bookmark { slug } => bookmark(app, &slug).await,
    Command::Saved { pages } => saved(app, pages).await,
    Command::Unsave { slug } => {
      if app.remove_saved(&slug).await? {
        println!("Removed {slug} from saved characters");
      } else {
        println!("{slug} was not saved");
      }
      Ok(())
    }
    Command::History { pages } => history(app, pages).await,
    Command::Forget { slug } => {
      if app.delete_history_entry(&slug).await? {
        println!("Removed {slug} from history");
      } else {
        println!("{slug} is not in the history");
      }
      Ok(())
    }
    Command::ClearHistory => {
      let removed = app.clear_history().await?;
      println!("Cleared {removed} history entries");
      Ok(())
    }
    Command::Suggest { text } => {
      for entry in app.suggestions(&text).await? {
        println!("{}", render::suggestion_row(&entry));
      }
      Ok(())
    }
    Command::Filter { filters } => {
      let selection = filters.state()?.snapshot();
      print!("{}", render::filter_screen(&selection, &selection.compile()));
      Ok(())
    }
  }
}

async fn search(app: &App, text: &str, selection: &FilterSelection, pages: u32) -> Result<()> {
  let text = text.trim();
  if !text.is_empty() {
    app.record_search(text).await?;
  }
  tracing::debug!(params = %compile_query(text, selection), "searching");

  let mut loaded = app.browse(text, selection).await.context("loading characters")?;
  while loaded.len() < pages as usize && !loaded.is_exhausted() {
    loaded = app.browse_next(text, selection).await.context("loading more characters")?;
  }

  let mut count = 0;
  for page in &loaded.pages {
    for resource in &page.data {
      println!("{}", render::character_row(&resource.attributes));
      app.prime_character(resource.attributes.clone());
      count += 1;
    }
  }

  let total = loaded.pages.last().map_or(0, |page| page.meta.pagination.records);
  println!("\n{count} of {total} characters");
  if !loaded.is_exhausted() {
    println!("(more available, use --pages {})", loaded.len() + 1);
  }
  Ok(())
}

async fn show(app: &App, slug: &str) -> Result<()> {
  let character = match app.open_character(slug).await {
    Ok(character) => character,
    Err(QueryError::NotFound) => bail!("character not found: {slug}"),
    Err(error) => return Err(error).context("failed to load character"),
  };
  let saved = app.is_bookmarked(&character.slug).await?;
  print!("{}", render::character_details(&character, saved.get()));
  Ok(())
}

async fn bookmark(app: &App, slug: &str) -> Result<()> {
  match app.toggle_bookmark(slug).await {
    Ok(state) if state.is_saved() => println!("Saved {slug}"),
    Ok(_) => println!("Removed {slug} from saved characters"),
    Err(QueryError::NotFound) => bail!("character not found: {slug}"),
    Err(error) => return Err(error).context("failed to toggle bookmark"),
  }
  Ok(())
}

async fn saved(app: &App, pages: u32) -> Result<()> {
  let mut loaded = app.saved().await?;
  while loaded.len() < pages as usize && !loaded.is_exhausted() {
    loaded = app.saved_next().await?;
  }
  for entry in loaded.items() {
    println!("{}", render::saved_row(entry));
  }
  Ok(())
}

async fn history(app: &App, pages: u32) -> Result<()> {
  let mut loaded = app.history().await?;
  while loaded.len() < pages as usize && !loaded.is_exhausted() {
    loaded = app.history_next().await?;
  }
  let sections = group_view_history(&loaded.pages);
  if sections.is_empty() {
    println!("No history yet");
  }
  print!("{}", render::history(sections.sections(), Utc::now()));
  Ok(())
}
