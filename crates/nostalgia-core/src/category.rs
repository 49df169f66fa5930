//! Categories: the shared taxonomy linked from every fact-like record.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A named grouping such as "Technology" or "Science". The slug is always
/// present once stored and never changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
  pub category_id: Uuid,
  pub name:        String,
  pub slug:        String,
}

/// Input to [`crate::store::FactStore::add_category`].
#[derive(Debug, Clone)]
pub struct NewCategory {
  pub name: String,
  /// Derived from `name` when absent or blank.
  pub slug: Option<String>,
}

impl NewCategory {
  pub fn named(name: impl Into<String>) -> Self {
    Self { name: name.into(), slug: None }
  }

  /// The slug that will be stored for this category.
  pub fn resolved_slug(&self) -> String {
    match self.slug.as_deref().map(str::trim) {
      Some(s) if !s.is_empty() => s.to_owned(),
      _ => slugify(&self.name),
    }
  }
}

/// Convert `input` to a URL slug: ASCII-lowercase, strip everything except
/// alphanumerics, whitespace, `-` and `_`, then collapse whitespace and hyphen
/// runs into a single `-` and trim leading/trailing `-` and `_`.
pub fn slugify(input: &str) -> String {
  let cleaned: String = input
    .chars()
    .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '-' || *c == '_')
    .flat_map(char::to_lowercase)
    .collect();

  let mut slug = String::with_capacity(cleaned.len());
  let mut pending_dash = false;
  for c in cleaned.chars() {
    if c.is_whitespace() || c == '-' {
      pending_dash = true;
      continue;
    }
    if pending_dash && !slug.is_empty() {
      slug.push('-');
    }
    pending_dash = false;
    slug.push(c);
  }

  slug.trim_matches(|c| c == '-' || c == '_').to_owned()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn slugify_basic() {
    assert_eq!(slugify("Science"), "science");
    assert_eq!(slugify("Pop Culture"), "pop-culture");
    assert_eq!(slugify("  Arts & Entertainment  "), "arts-entertainment");
    assert_eq!(slugify("Sci-Fi -- Fantasy"), "sci-fi-fantasy");
    assert_eq!(slugify("_private_"), "private");
  }

  #[test]
  fn explicit_slug_wins() {
    let c = NewCategory { name: "Technology".into(), slug: Some("tech".into()) };
    assert_eq!(c.resolved_slug(), "tech");

    let blank = NewCategory { name: "Technology".into(), slug: Some("  ".into()) };
    assert_eq!(blank.resolved_slug(), "technology");
  }
}
