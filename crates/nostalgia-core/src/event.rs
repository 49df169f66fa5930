//! Significant historical events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Longest title stored for an event; longer titles are truncated.
pub const MAX_EVENT_TITLE: usize = 200;

/// Unique per `(year, title)`, so repeated imports land on the same row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignificantEvent {
  pub event_id:    Uuid,
  pub title:       String,
  pub description: String,
  pub year:        i32,
  pub impact:      String,
  pub source_url:  Option<String>,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

/// Input to [`crate::store::FactStore::upsert_event`].
#[derive(Debug, Clone)]
pub struct NewSignificantEvent {
  pub title:       String,
  pub description: String,
  pub year:        i32,
  pub impact:      String,
  pub source_url:  Option<String>,
}
