//! An ordered multiset of query parameters.

use std::fmt;

use serde::Serialize;

/// Query parameters in insertion order. Names may repeat (`filter[x][]`).
///
/// Serialises as a sequence of pairs, which is the shape `reqwest`'s
/// `RequestBuilder::query` expects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct ParameterSet(Vec<(String, String)>);

impl ParameterSet {
  pub fn new() -> Self { Self::default() }

  /// Add a pair, keeping any existing values for `name`.
  pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
    self.0.push((name.into(), value.into()));
  }

  /// Replace every value for `name` with a single `value`.
  pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
    let name = name.into();
    self.0.retain(|(n, _)| *n != name);
    self.0.push((name, value.into()));
  }

  pub fn get(&self, name: &str) -> Option<&str> {
    self
      .0
      .iter()
      .find(|(n, _)| n == name)
      .map(|(_, v)| v.as_str())
  }

  pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
    self
      .0
      .iter()
      .filter(move |(n, _)| n == name)
      .map(|(_, v)| v.as_str())
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
    self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
  }

  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.0.iter().map(|(n, _)| n.as_str())
  }

  pub fn len(&self) -> usize { self.0.len() }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }

  pub fn pairs(&self) -> &[(String, String)] { &self.0 }
}

/// Renders `a=1&b=2` without percent-encoding. Suitable as a cache-key
/// fragment or for display, not for building URLs by hand.
impl fmt::Display for ParameterSet {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (i, (name, value)) in self.0.iter().enumerate() {
      if i > 0 {
        f.write_str("&")?;
      }
      write!(f, "{name}={value}")?;
    }
    Ok(())
  }
}
