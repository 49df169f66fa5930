//! Error types for `nostalgia-core`.

use std::{collections::BTreeMap, fmt};

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("year {year} is outside the accepted range {min}..={max}")]
  YearOutOfRange { year: i32, min: i32, max: i32 },

  #[error("validation failed: {0}")]
  Validation(ValidationErrors),

  #[error("submission limit of {limit} per hour reached")]
  RateLimited { limit: u32 },

  #[error("submission {0} has already been reviewed")]
  AlreadyReviewed(Uuid),

  #[error("submission {0} is not in a reviewable state")]
  NotReviewable(Uuid),

  #[error("unknown moderation status: {0:?}")]
  UnknownStatus(String),

  #[error("unknown role: {0:?}")]
  UnknownRole(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

// ─── Field-level validation messages ─────────────────────────────────────────

/// Validation messages keyed by form field. Every violation found in a single
/// pass is collected so the caller can report them together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
  pub fn new() -> Self { Self::default() }

  pub fn add(&mut self, field: &str, message: impl Into<String>) {
    self.0.entry(field.to_owned()).or_default().push(message.into());
  }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }

  pub fn contains(&self, field: &str) -> bool { self.0.contains_key(field) }

  /// `Ok(())` when nothing was recorded, otherwise [`Error::Validation`].
  pub fn into_result(self) -> Result<()> {
    if self.is_empty() { Ok(()) } else { Err(Error::Validation(self)) }
  }
}

impl fmt::Display for ValidationErrors {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut first = true;
    for (field, messages) in &self.0 {
      if !first {
        f.write_str("; ")?;
      }
      first = false;
      write!(f, "{field}: {}", messages.join(", "))?;
    }
    Ok(())
  }
}
