//! Plain-text rendering of lists, details and history sections.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};

use grimoire_core::{
  character::CharacterAttributes,
  clock::day_start,
  entry::{SavedCharacter, SearchHistoryEntry, ViewHistoryEntry},
  filter::{FilterField, FilterSelection, SortOrder},
  history::HistorySection,
  params::ParameterSet,
  slug::{can_be_slugized, slugize},
};

/// One line of a character list.
pub fn character_row(character: &CharacterAttributes) -> String {
  let mut line = format!("{:<32} {}", character.name, character.slug);
  if let Some(house) = &character.house {
    let _ = write!(line, "  [{house}]");
  }
  line
}

/// The detail view of one character.
pub fn character_details(character: &CharacterAttributes, saved: bool) -> String {
  let mut out = String::new();
  let marker = if saved { "★" } else { "☆" };
  let _ = writeln!(out, "{marker} {}  ({})", character.name, character.slug);

  for (label, value) in field_rows(character) {
    let _ = writeln!(out, "  {label:<15} {value}");
  }

  for (label, values) in [
    ("Aliases", &character.alias_names),
    ("Titles", &character.titles),
    ("Jobs", &character.jobs),
    ("Romances", &character.romances),
    ("Wands", &character.wands),
  ] {
    if !values.is_empty() {
      let _ = writeln!(out, "  {label:<15} {}", values.join("; "));
    }
  }

  if !character.family_members.is_empty() {
    let _ = writeln!(out, "  Family");
    for member in &character.family_members {
      if can_be_slugized(member) {
        let _ = writeln!(out, "    {member}  → grimoire show {}", slugize(member));
      } else {
        let _ = writeln!(out, "    {member}");
      }
    }
  }

  if let Some(wiki) = &character.wiki {
    let _ = writeln!(out, "  {:<15} {wiki}", "Wiki");
  }
  out
}

/// A heading for a history day, relative to `now`.
pub fn day_heading(date: DateTime<Utc>, now: DateTime<Utc>) -> String {
  let today = day_start(now);
  match (today - day_start(date)).num_days() {
    0 => "Today".to_owned(),
    1 => "Yesterday".to_owned(),
    _ => date.format("%A, %B %-d").to_string(),
  }
}

pub fn history(sections: &[HistorySection<ViewHistoryEntry>], now: DateTime<Utc>) -> String {
  let mut out = String::new();
  for section in sections {
    let _ = writeln!(out, "{}", day_heading(section.date, now));
    for entry in &section.items {
      let _ = writeln!(out, "  {:<32} {}", entry.character_name, entry.character_slug);
    }
  }
  out
}

pub fn saved_row(entry: &SavedCharacter) -> String {
  format!(
    "{:<32} {:<32} saved {}",
    entry.character_name,
    entry.character_slug,
    entry.saved_at.format("%Y-%m-%d")
  )
}

pub fn suggestion_row(entry: &SearchHistoryEntry) -> String {
  format!("{:<32} {}", entry.query, entry.used_at.format("%Y-%m-%d %H:%M"))
}

/// The filter screen: every choice with its checkbox, the badge count and
/// the compiled parameters.
pub fn filter_screen(selection: &FilterSelection, params: &ParameterSet) -> String {
  let mut out = String::new();
  let _ = writeln!(out, "Filters ({})", selection.filter_count());

  let _ = writeln!(out, "Sort");
  for sort in [SortOrder::Name, SortOrder::NameReversed] {
    let _ = writeln!(out, "  {} {}", checkbox(selection.sort == Some(sort)), sort.label());
  }

  for field in [
    FilterField::Gender,
    FilterField::House,
    FilterField::BloodStatus,
    FilterField::Species,
  ] {
    let state = selection.field(field);
    let _ = writeln!(out, "{}", field.label());
    for choice in field.choices() {
      let _ = writeln!(out, "  {} {choice}", checkbox(state.contains(choice)));
    }
    let _ = writeln!(out, "  {} None", checkbox(state.is_exclude_all()));
  }

  let _ = writeln!(out, "Parameters");
  for (name, value) in params.iter() {
    let _ = writeln!(out, "  {name}={value}");
  }
  out
}

fn checkbox(checked: bool) -> &'static str { if checked { "[x]" } else { "[ ]" } }

/// Labelled scalar attributes that are present.
fn field_rows(c: &CharacterAttributes) -> impl Iterator<Item = (&'static str, &str)> {
  [
    ("Born", &c.born),
    ("Died", &c.died),
    ("Gender", &c.gender),
    ("Species", &c.species),
    ("House", &c.house),
    ("Blood status", &c.blood_status),
    ("Nationality", &c.nationality),
    ("Marital status", &c.marital_status),
    ("Height", &c.height),
    ("Weight", &c.weight),
    ("Hair colour", &c.hair_color),
    ("Eye colour", &c.eye_color),
    ("Skin colour", &c.skin_color),
    ("Patronus", &c.patronus),
    ("Boggart", &c.boggart),
    ("Animagus", &c.animagus),
  ]
  .into_iter()
  .filter_map(|(label, value)| value.as_deref().map(|v| (label, v)))
}
