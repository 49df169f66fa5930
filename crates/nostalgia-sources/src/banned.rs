//! Authors whose works are never recommended.

/// Names excluded no matter what configuration adds.
pub const DEFAULT_BANNED: &[&str] = &["Unknown Author", "Anonymous"];

/// A case-insensitive list of banned author names.
#[derive(Debug, Clone)]
pub struct BannedAuthors {
  names: Vec<String>,
}

impl Default for BannedAuthors {
  fn default() -> Self { Self::with_extra(std::iter::empty::<String>()) }
}

impl BannedAuthors {
  /// The default list extended by `extra`.
  pub fn with_extra<I, S>(extra: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    let mut names: Vec<String> = DEFAULT_BANNED.iter().map(|n| n.to_lowercase()).collect();
    names.extend(
      extra
        .into_iter()
        .map(|n| n.as_ref().trim().to_lowercase())
        .filter(|n| !n.is_empty()),
    );
    names.sort();
    names.dedup();
    Self { names }
  }

  pub fn is_banned(&self, author: &str) -> bool {
    let author = author.trim().to_lowercase();
    self.names.iter().any(|n| *n == author)
  }

  /// True if any of `authors` is banned.
  pub fn any_banned<'a>(&self, authors: impl IntoIterator<Item = &'a str>) -> bool {
    authors.into_iter().any(|a| self.is_banned(a))
  }
}
