//! Filter selection and its compilation into remote query parameters.
//!
//! A [`FilterSelection`] is the transient state of the filter screen. It is
//! compiled into a canonical [`ParameterSet`] for `GET /characters`, and it
//! yields the number shown on the filter badge.
//!
//! Each multi-valued field is a [`FieldFilter`] with three distinct states.
//! Its serde representation is the filter screen's JSON shape: `[]` is
//! unconstrained, `null` is the "None" checkbox (records without a value),
//! and a non-empty array lists accepted values.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator as _};
use tokio::sync::watch;

use crate::{Error, Result, params::ParameterSet};

// ─── Fields ──────────────────────────────────────────────────────────────────

/// A multi-valued attribute the remote resource can be filtered on.
///
/// Declaration order is compilation order.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  AsRefStr,
  Display,
  EnumIter,
  EnumString,
  Serialize,
  Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FilterField {
  Gender,
  House,
  BloodStatus,
  Species,
}

impl FilterField {
  pub fn parse(name: &str) -> Result<Self> {
    name
      .parse()
      .map_err(|_| Error::UnknownFilterField(name.to_owned()))
  }

  /// The remote predicate applied to each listed value.
  ///
  /// `house` matches by exact list membership; every other field matches
  /// when the attribute contains any of the values.
  pub fn predicate(self) -> &'static str {
    match self {
      Self::House => "in_any",
      Self::Gender | Self::BloodStatus | Self::Species => "cont_any",
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      Self::Gender => "Gender",
      Self::House => "House",
      Self::BloodStatus => "Blood status",
      Self::Species => "Species",
    }
  }

  /// Values offered on the filter screen.
  pub fn choices(self) -> &'static [&'static str] {
    match self {
      Self::Gender => &["Male", "Female", "Unknown"],
      Self::House => &["Gryffindor", "Slytherin", "Hufflepuff", "Ravenclaw"],
      Self::BloodStatus => {
        &["Pure-blood", "Half-blood", "Muggle", "Squib", "Half-breed"]
      }
      Self::Species => &[
        "Human",
        "Goblin",
        "Giant",
        "Veela",
        "Troll",
        "Vampire",
        "House-elf",
      ],
    }
  }
}

/// Sort orders accepted by the remote `sort` parameter.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  AsRefStr,
  Display,
  EnumIter,
  EnumString,
  Serialize,
  Deserialize,
)]
pub enum SortOrder {
  #[strum(serialize = "name")]
  #[serde(rename = "name")]
  Name,
  #[strum(serialize = "-name")]
  #[serde(rename = "-name")]
  NameReversed,
}

impl SortOrder {
  pub fn parse(name: &str) -> Result<Self> {
    name.parse().map_err(|_| Error::UnknownSort(name.to_owned()))
  }

  pub fn label(self) -> &'static str {
    match self {
      Self::Name => "Name alphabetical",
      Self::NameReversed => "Name reverse alphabetical",
    }
  }
}

// ─── Field state ─────────────────────────────────────────────────────────────

/// The state of one multi-valued field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Option<Vec<String>>", into = "Option<Vec<String>>")]
pub enum FieldFilter {
  /// No constraint.
  #[default]
  Unconstrained,
  /// Only records with no value for the attribute.
  ExcludeAll,
  /// Records whose attribute matches any of the values. Never empty.
  OneOf(Vec<String>),
}

impl FieldFilter {
  pub fn contains(&self, value: &str) -> bool {
    matches!(self, Self::OneOf(values) if values.iter().any(|v| v == value))
  }

  pub fn is_exclude_all(&self) -> bool { matches!(self, Self::ExcludeAll) }

  /// Contribution of this field to the filter badge.
  pub fn badge_count(&self) -> usize {
    match self {
      Self::Unconstrained => 0,
      Self::ExcludeAll => 1,
      Self::OneOf(values) => values.len(),
    }
  }

  fn toggle(&mut self, value: &str) {
    *self = match std::mem::take(self) {
      Self::Unconstrained | Self::ExcludeAll => Self::OneOf(vec![value.to_owned()]),
      Self::OneOf(mut values) => {
        if let Some(pos) = values.iter().position(|v| v == value) {
          values.remove(pos);
        } else {
          values.push(value.to_owned());
        }
        Self::from(Some(values))
      }
    };
  }

  fn toggle_none(&mut self) {
    *self = match self {
      Self::ExcludeAll => Self::Unconstrained,
      Self::Unconstrained | Self::OneOf(_) => Self::ExcludeAll,
    };
  }
}

impl From<Option<Vec<String>>> for FieldFilter {
  fn from(raw: Option<Vec<String>>) -> Self {
    match raw {
      None => Self::ExcludeAll,
      Some(values) if values.is_empty() => Self::Unconstrained,
      Some(values) => Self::OneOf(values),
    }
  }
}

impl From<FieldFilter> for Option<Vec<String>> {
  fn from(filter: FieldFilter) -> Self {
    match filter {
      FieldFilter::Unconstrained => Some(Vec::new()),
      FieldFilter::ExcludeAll => None,
      FieldFilter::OneOf(values) => Some(values),
    }
  }
}

// ─── Selection ───────────────────────────────────────────────────────────────

/// The complete filter and sort selection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSelection {
  pub sort:         Option<SortOrder>,
  pub gender:       FieldFilter,
  pub house:        FieldFilter,
  pub blood_status: FieldFilter,
  pub species:      FieldFilter,
}

impl FilterSelection {
  pub fn field(&self, field: FilterField) -> &FieldFilter {
    match field {
      FilterField::Gender => &self.gender,
      FilterField::House => &self.house,
      FilterField::BloodStatus => &self.blood_status,
      FilterField::Species => &self.species,
    }
  }

  pub fn field_mut(&mut self, field: FilterField) -> &mut FieldFilter {
    match field {
      FilterField::Gender => &mut self.gender,
      FilterField::House => &mut self.house,
      FilterField::BloodStatus => &mut self.blood_status,
      FilterField::Species => &mut self.species,
    }
  }

  /// Add `value` to the field, or remove it if already present.
  pub fn toggle(&mut self, field: FilterField, value: &str) {
    self.field_mut(field).toggle(value);
  }

  /// Flip the field between "only records without a value" and
  /// unconstrained.
  pub fn toggle_none(&mut self, field: FilterField) {
    self.field_mut(field).toggle_none();
  }

  /// Select `sort`, or clear it if it is already selected.
  pub fn toggle_sort(&mut self, sort: SortOrder) {
    self.sort = if self.sort == Some(sort) { None } else { Some(sort) };
  }

  /// Compile the selection into remote query parameters.
  ///
  /// Search text and page number are not part of the selection; see
  /// [`compile_query`].
  pub fn compile(&self) -> ParameterSet {
    let mut params = ParameterSet::new();

    if let Some(sort) = self.sort {
      params.append("sort", sort.as_ref());
    }

    for field in FilterField::iter() {
      match self.field(field) {
        FieldFilter::Unconstrained => {}
        FieldFilter::ExcludeAll => {
          params.append(format!("filter[{field}_null]"), "true");
        }
        FieldFilter::OneOf(values) => {
          let name = format!("filter[{field}_{}][]", field.predicate());
          for value in values {
            params.append(name.clone(), value.clone());
          }
        }
      }
    }

    params
  }

  /// The number shown on the filter badge.
  ///
  /// A selected sort counts 1; each field contributes
  /// [`FieldFilter::badge_count`]. The "None" state counts 1 while an
  /// unconstrained field counts 0.
  pub fn filter_count(&self) -> usize {
    usize::from(self.sort.is_some())
      + FilterField::iter()
        .map(|field| self.field(field).badge_count())
        .sum::<usize>()
  }
}

/// Compile the full parameter set for a character list query, excluding the
/// page number. `filter[name_cont]` is always present, even when `search` is
/// empty.
pub fn compile_query(search: &str, selection: &FilterSelection) -> ParameterSet {
  let mut params = selection.compile();
  params.set("filter[name_cont]", search);
  params
}

// ─── State container ─────────────────────────────────────────────────────────

/// An owned, shareable filter selection with change notification.
///
/// Clones share the same state. Screens read with [`FilterState::snapshot`]
/// and observe with [`FilterState::subscribe`].
#[derive(Debug, Clone)]
pub struct FilterState {
  tx: Arc<watch::Sender<FilterSelection>>,
}

impl Default for FilterState {
  fn default() -> Self { Self::new(FilterSelection::default()) }
}

impl FilterState {
  pub fn new(initial: FilterSelection) -> Self {
    let (tx, _) = watch::channel(initial);
    Self { tx: Arc::new(tx) }
  }

  pub fn snapshot(&self) -> FilterSelection { self.tx.borrow().clone() }

  pub fn subscribe(&self) -> watch::Receiver<FilterSelection> {
    self.tx.subscribe()
  }

  /// Apply `f` and notify every subscriber.
  pub fn update(&self, f: impl FnOnce(&mut FilterSelection)) {
    self.tx.send_modify(f);
  }

  pub fn toggle(&self, field: FilterField, value: &str) {
    self.update(|s| s.toggle(field, value));
  }

  pub fn toggle_none(&self, field: FilterField) {
    self.update(|s| s.toggle_none(field));
  }

  pub fn toggle_sort(&self, sort: SortOrder) {
    self.update(|s| s.toggle_sort(sort));
  }

  pub fn reset(&self) { self.update(|s| *s = FilterSelection::default()); }

  pub fn compile(&self) -> ParameterSet { self.tx.borrow().compile() }

  pub fn filter_count(&self) -> usize { self.tx.borrow().filter_count() }
}
