//! Slug derivation for names that appear as free text in character records,
//! such as family members listed as `"Lily Potter (mother)"`.

/// Whether `text` looks like `"<name> (<relation>)"` and so names a
/// character that can be linked by slug.
pub fn can_be_slugized(text: &str) -> bool { text.contains(" (") }

/// Derive a slug from `text`, ignoring any parenthesised suffix.
///
/// Follows Rails' `parameterize`: transliterate common accented letters,
/// lower-case, replace runs of characters outside `[a-z0-9-_]` with `-`,
/// then collapse and trim dashes.
pub fn slugize(text: &str) -> String {
  let name = text.split(" (").next().unwrap_or_default();

  let mut slug = String::with_capacity(name.len());
  let mut in_separator = false;
  for c in name.chars().flat_map(char::to_lowercase).map(transliterate) {
    if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-' {
      if c == '-' {
        in_separator = true;
      } else {
        if in_separator && !slug.is_empty() {
          slug.push('-');
        }
        in_separator = false;
        slug.push(c);
      }
    } else {
      in_separator = true;
    }
  }
  slug
}

fn transliterate(c: char) -> char {
  match c {
    'á' | 'à' | 'ã' | 'â' | 'ä' => 'a',
    'é' | 'è' | 'ê' | 'ë' => 'e',
    'í' | 'ì' | 'î' | 'ï' => 'i',
    'ó' | 'ò' | 'õ' | 'ô' | 'ö' => 'o',
    'ú' | 'ù' | 'û' | 'ü' => 'u',
    'ý' | 'ÿ' => 'y',
    'ñ' => 'n',
    'ç' => 'c',
    other => other,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn strips_relation_suffix() {
    assert!(can_be_slugized("James Potter I (father)"));
    assert_eq!(slugize("James Potter I (father)"), "james-potter-i");
  }

  #[test]
  fn plain_names_are_not_links() {
    assert!(!can_be_slugized("Unnamed grandmother"));
  }

  #[test]
  fn punctuation_collapses_to_single_dashes() {
    assert_eq!(slugize("  Bartemius Crouch Jr.  "), "bartemius-crouch-jr");
    assert_eq!(slugize("Nearly-Headless -- Nick"), "nearly-headless-nick");
    assert_eq!(slugize("O'Flaherty"), "o-flaherty");
  }

  #[test]
  fn transliterates_accents() {
    assert_eq!(slugize("Fleur Delacour-Weasley (wife)"), "fleur-delacour-weasley");
    assert_eq!(slugize("Gabrielle Delacöur"), "gabrielle-delacour");
    assert_eq!(slugize("Señor Ñandú"), "senor-nandu");
  }
}
