//! Recommended reading.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::category::Category;

/// A book recommendation. Unique per `(title, author, year)`.
///
/// Only books with a non-blank description are ever shown; rows without one
/// are removed by the cleanup sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Book {
  pub book_id:     Uuid,
  pub title:       String,
  pub author:      String,
  pub description: String,
  pub year:        i32,
  pub categories:  Vec<Category>,
  pub relevance:   String,
  pub isbn:        Option<String>,
  pub cover_url:   Option<String>,
  pub source_url:  Option<String>,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

impl Book {
  pub fn is_visible(&self) -> bool { !self.description.trim().is_empty() }
}

/// Input to [`crate::store::FactStore::upsert_book`].
#[derive(Debug, Clone)]
pub struct NewBook {
  pub title:        String,
  pub author:       String,
  pub description:  String,
  pub year:         i32,
  pub category_ids: Vec<Uuid>,
  pub relevance:    String,
  pub isbn:         Option<String>,
  pub cover_url:    Option<String>,
  pub source_url:   Option<String>,
}
