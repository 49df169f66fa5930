//! Error type for `nostalgia-sources`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
  /// The requested page does not exist.
  #[error("page not found: {0}")]
  NotFound(String),

  /// The title resolves to a disambiguation page.
  #[error("ambiguous title: {0}")]
  Ambiguous(String),

  #[error("http error: {0}")]
  Network(#[from] reqwest::Error),

  #[error("unexpected status {status} from {url}")]
  Status { status: u16, url: String },

  #[error("malformed response: {0}")]
  Malformed(String),
}

impl SourceError {
  /// Misses that exclude one candidate but leave the rest of a lookup intact.
  pub fn is_candidate_miss(&self) -> bool {
    matches!(self, Self::NotFound(_) | Self::Ambiguous(_))
  }
}

pub type Result<T, E = SourceError> = std::result::Result<T, E>;
