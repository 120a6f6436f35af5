//! Date-bucketed view history.
//!
//! The store returns history rows newest first in fixed-size pages. Rows are
//! merged into day sections with a single linear pass; that is only correct
//! because the input is already globally ordered by time, descending.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{clock::day_start, entry::ViewHistoryEntry};

/// Rows per page for local history and saved-list scans.
pub const PAGE_SIZE: usize = 30;

/// The next zero-based page index after a page of `len` rows, or `None` when
/// that page was short and the scan is exhausted.
pub fn next_page_index(last_index: u32, len: usize) -> Option<u32> {
  (len == PAGE_SIZE).then(|| last_index + 1)
}

/// One day of history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistorySection<T> {
  /// Midnight UTC of the day.
  pub date:  DateTime<Utc>,
  pub items: Vec<T>,
}

/// Day sections built incrementally as pages arrive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistorySections<T> {
  sections: Vec<HistorySection<T>>,
}

impl<T> Default for HistorySections<T> {
  fn default() -> Self { Self { sections: Vec::new() } }
}

impl<T> HistorySections<T> {
  pub fn new() -> Self { Self::default() }

  /// Merge `rows` into the sections. `rows` must continue the descending
  /// order of everything merged so far.
  pub fn extend<I, F>(&mut self, rows: I, timestamp: F)
  where
    I: IntoIterator<Item = T>,
    F: Fn(&T) -> DateTime<Utc>,
  {
    for row in rows {
      let date = day_start(timestamp(&row));
      match self.sections.last_mut() {
        Some(section) if section.date == date => section.items.push(row),
        last => {
          debug_assert!(
            last.is_none_or(|section| section.date > date),
            "history rows must arrive newest first"
          );
          self.sections.push(HistorySection { date, items: vec![row] });
        }
      }
    }
  }

  pub fn sections(&self) -> &[HistorySection<T>] { &self.sections }

  pub fn into_sections(self) -> Vec<HistorySection<T>> { self.sections }

  pub fn len(&self) -> usize { self.sections.len() }

  pub fn is_empty(&self) -> bool { self.sections.is_empty() }

  pub fn item_count(&self) -> usize {
    self.sections.iter().map(|s| s.items.len()).sum()
  }
}

/// Group a page stream of view-history rows by day.
pub fn group_view_history<'a, I>(pages: I) -> HistorySections<ViewHistoryEntry>
where
  I: IntoIterator<Item = &'a Vec<ViewHistoryEntry>>,
{
  let mut sections = HistorySections::new();
  for page in pages {
    sections.extend(page.iter().cloned(), |row| row.viewed_at);
  }
  sections
}

#[cfg(test)]
mod tests {
  use chrono::{Duration, TimeZone};

  use super::*;

  fn row(slug: &str, viewed_at: DateTime<Utc>) -> ViewHistoryEntry {
    ViewHistoryEntry {
      character_slug: slug.into(),
      character_name: slug.to_uppercase(),
      viewed_at,
    }
  }

  #[test]
  fn groups_consecutive_days() {
    let day1 = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
    let day2 = day1 + Duration::days(1);

    let page = vec![row("a", day2), row("b", day2), row("c", day1)];
    let sections = group_view_history([&page]).into_sections();

    assert_eq!(sections.len(), 2);
    assert_eq!(sections[0].date, day2);
    assert_eq!(
      sections[0]
        .items
        .iter()
        .map(|r| r.character_slug.as_str())
        .collect::<Vec<_>>(),
      ["a", "b"]
    );
    assert_eq!(sections[1].date, day1);
    assert_eq!(sections[1].items[0].character_slug, "c");
  }

  #[test]
  fn a_day_spanning_two_pages_stays_one_section() {
    let day = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
    let first: Vec<_> = (0..PAGE_SIZE).map(|i| row(&format!("p{i}"), day)).collect();
    let second = vec![row("tail", day), row("older", day - Duration::days(3))];

    let mut sections = HistorySections::new();
    sections.extend(first.iter().cloned(), |r| r.viewed_at);
    assert_eq!(sections.len(), 1);
    sections.extend(second.iter().cloned(), |r| r.viewed_at);

    assert_eq!(sections.len(), 2);
    assert_eq!(sections.sections()[0].items.len(), PAGE_SIZE + 1);
    assert_eq!(sections.item_count(), PAGE_SIZE + 2);
  }

  #[test]
  fn timestamps_are_truncated_to_the_day() {
    let morning = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
    let night = Utc.with_ymd_and_hms(2024, 5, 1, 22, 30, 0).unwrap();

    let mut sections = HistorySections::new();
    sections.extend([night, morning], |at| *at);
    assert_eq!(sections.len(), 1);
    assert_eq!(sections.sections()[0].date, day_start(morning));
  }

  #[test]
  fn pagination_stops_on_a_short_page() {
    assert_eq!(next_page_index(0, PAGE_SIZE), Some(1));
    assert_eq!(next_page_index(4, PAGE_SIZE - 1), None);
    assert_eq!(next_page_index(0, 0), None);
  }
}
