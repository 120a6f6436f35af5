//! Composite cache keys.

use std::fmt;

use grimoire_core::filter::FilterSelection;

/// A cache key: a logical resource name followed by its parameters.
///
/// Keys form families by prefix, so `["suggestions"]` names every
/// suggestion query at once.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
  pub const CHARACTER: &'static str = "character";
  pub const CHARACTERS: &'static str = "characters";
  pub const HISTORY: &'static str = "history";
  pub const SUGGESTIONS: &'static str = "suggestions";

  pub fn new<I, S>(parts: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self(parts.into_iter().map(Into::into).collect())
  }

  /// `("character", slug)`
  pub fn character(slug: &str) -> Self { Self::new([Self::CHARACTER, slug]) }

  /// A remote list query. The selection is keyed by its compiled
  /// parameters, so selections that compile alike share an entry. Every
  /// parameter name and value is its own segment.
  pub fn characters(search: &str, selection: &FilterSelection) -> Self {
    let head = [Self::CHARACTERS, "list", search].map(str::to_owned);
    let params = selection.compile();
    let pairs = params
      .iter()
      .flat_map(|(name, value)| [name.to_owned(), value.to_owned()]);
    Self(head.into_iter().chain(pairs).collect())
  }

  /// `("characters", "saved")`
  pub fn saved() -> Self { Self::new(Self::SAVED_PREFIX) }

  pub const SAVED_PREFIX: [&'static str; 2] = [Self::CHARACTERS, "saved"];

  pub fn history() -> Self { Self::new([Self::HISTORY]) }

  pub fn suggestions(text: &str) -> Self { Self::new([Self::SUGGESTIONS, text]) }

  pub fn parts(&self) -> &[String] { &self.0 }

  pub fn starts_with(&self, prefix: &[&str]) -> bool {
    prefix.len() <= self.0.len()
      && self.0.iter().zip(prefix).all(|(part, p)| part == p)
  }
}

impl fmt::Display for QueryKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "[{}]", self.0.join(", "))
  }
}

#[cfg(test)]
mod tests {
  use grimoire_core::filter::FilterField;

  use super::*;

  #[test]
  fn prefix_matching() {
    let key = QueryKey::suggestions("har");
    assert!(key.starts_with(&[QueryKey::SUGGESTIONS]));
    assert!(key.starts_with(&[QueryKey::SUGGESTIONS, "har"]));
    assert!(!key.starts_with(&[QueryKey::SUGGESTIONS, "ha"]));
    assert!(!key.starts_with(&[QueryKey::SUGGESTIONS, "har", "x"]));
    assert!(key.starts_with(&[]));
  }

  #[test]
  fn list_keys_never_fall_in_the_saved_family() {
    let key = QueryKey::characters("saved", &FilterSelection::default());
    assert!(!key.starts_with(&QueryKey::SAVED_PREFIX));
    assert!(QueryKey::saved().starts_with(&QueryKey::SAVED_PREFIX));
  }

  #[test]
  fn list_keys_follow_the_selection() {
    let mut selection = FilterSelection::default();
    let before = QueryKey::characters("harry", &selection);
    selection.toggle(FilterField::House, "Gryffindor");
    assert_ne!(before, QueryKey::characters("harry", &selection));
  }

  #[test]
  fn values_containing_separators_do_not_collide() {
    let mut smuggled = FilterSelection::default();
    smuggled.toggle(FilterField::Gender, "Male&filter[house_in_any][]=Gryffindor");

    let mut separate = FilterSelection::default();
    separate.toggle(FilterField::Gender, "Male");
    separate.toggle(FilterField::House, "Gryffindor");

    assert_ne!(smuggled.compile(), separate.compile());
    assert_ne!(QueryKey::characters("", &smuggled), QueryKey::characters("", &separate));
  }
}
