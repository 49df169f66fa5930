//! Fact records: curator-maintained [`InformationItem`]s and
//! externally-sourced [`ApiFact`]s.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::category::Category;

// ─── InformationItem ─────────────────────────────────────────────────────────

/// A curated fact about a year. Items are never deleted automatically;
/// `is_outdated` flips as the world changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InformationItem {
  pub item_id:               Uuid,
  pub title:                 String,
  pub description:           String,
  pub year:                  i32,
  pub categories:            Vec<Category>,
  pub is_outdated:           bool,
  pub current_status:        String,
  pub change_description:    String,
  pub relevance_explanation: String,
  pub source_url:            Option<String>,
  pub submitted_by:          Option<Uuid>,
  pub created_at:            DateTime<Utc>,
  pub updated_at:            DateTime<Utc>,
}

/// Input to [`crate::store::FactStore::add_item`].
#[derive(Debug, Clone, Default)]
pub struct NewInformationItem {
  pub title:                 String,
  pub description:           String,
  pub year:                  i32,
  pub category_ids:          Vec<Uuid>,
  pub is_outdated:           bool,
  pub current_status:        String,
  pub change_description:    String,
  pub relevance_explanation: String,
  pub source_url:            Option<String>,
  pub submitted_by:          Option<Uuid>,
}

/// Curated items of one category, partitioned relative to a graduation year.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryChanges {
  pub category:         Category,
  /// Outdated items from the graduation year or earlier.
  pub outdated_info:    Vec<InformationItem>,
  /// Still-current items from the graduation year or earlier.
  pub relevant_info:    Vec<InformationItem>,
  /// Anything recorded for a year after graduation.
  pub new_developments: Vec<InformationItem>,
}

impl CategoryChanges {
  pub fn partition(
    category: Category,
    items: Vec<InformationItem>,
    grad_year: i32,
  ) -> Self {
    let mut changes = Self {
      category,
      outdated_info: Vec::new(),
      relevant_info: Vec::new(),
      new_developments: Vec::new(),
    };
    for item in items {
      if item.year > grad_year {
        changes.new_developments.push(item);
      } else if item.is_outdated {
        changes.outdated_info.push(item);
      } else {
        changes.relevant_info.push(item);
      }
    }
    changes
  }
}

// ─── ApiFact ─────────────────────────────────────────────────────────────────

/// A fact imported from an external knowledge source. Unique per
/// `(year, title)`; re-enrichment overwrites description and source URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiFact {
  pub fact_id:     Uuid,
  pub year:        i32,
  pub title:       String,
  pub description: String,
  pub source_url:  String,
  pub categories:  Vec<Category>,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

/// Input to [`crate::store::FactStore::upsert_api_fact`].
#[derive(Debug, Clone)]
pub struct NewApiFact {
  pub year:         i32,
  pub title:        String,
  pub description:  String,
  pub source_url:   String,
  /// Linked in addition to any categories the row already has.
  pub category_ids: Vec<Uuid>,
}
