//! Error type for `nostalgia-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] nostalgia_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("invalid column value: {0}")]
  InvalidColumn(String),

  /// A write that must return the affected row found nothing.
  #[error("row vanished during write: {0}")]
  RowVanished(uuid::Uuid),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
