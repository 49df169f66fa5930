//! Error type for `nostalgia-engine`.

use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum Error {
  /// Validation, rate limiting and moderation state errors.
  #[error(transparent)]
  Core(#[from] nostalgia_core::Error),

  /// Any failure from the relational or key-value backend.
  #[error("storage error: {0}")]
  Store(#[source] BoxError),

  #[error("{0} not found")]
  NotFound(String),

  #[error("no categories are available")]
  NoCategories,

  #[error("administrator role required")]
  Forbidden,

  /// Every external source lookup for a refresh failed.
  #[error("external sources unavailable while refreshing {year}")]
  SourcesUnavailable { year: i32 },
}

impl Error {
  pub fn store<E: std::error::Error + Send + Sync + 'static>(e: E) -> Self {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
