//! ETag computation for results payloads.
//!
//! ETags are SHA-256 hashes over the (id, updated-at) pairs of everything a
//! results payload shows, in display order. Order is part of the hash because
//! reordering changes what a reader sees.

use nostalgia_engine::{FactEntry, ResultsPage};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Compute an ETag for a results payload.
pub fn compute_etag(page: &ResultsPage) -> String {
  let mut pairs: Vec<(Uuid, i64)> = Vec::new();
  pairs.extend(page.facts.items.iter().map(entry_pair));
  pairs.extend(
    page
      .significant_events
      .iter()
      .map(|e| (e.event_id, e.updated_at.timestamp_micros())),
  );
  pairs.extend(
    page
      .recommended_reading
      .iter()
      .map(|b| (b.book_id, b.updated_at.timestamp_micros())),
  );

  let mut hasher = Sha256::new();
  hasher.update(page.grad_year.to_le_bytes());
  hasher.update((page.facts.page as u64).to_le_bytes());
  hasher.update((page.facts.total_items as u64).to_le_bytes());
  if let Some(category) = &page.selected_category {
    hasher.update(category.category_id.as_bytes());
  }
  compute_etag_from_pairs(hasher, &pairs)
}

/// Placeholders carry no timestamp; they hash as `i64::MIN`.
fn entry_pair(entry: &FactEntry) -> (Uuid, i64) {
  match entry {
    FactEntry::UserSubmitted(card) | FactEntry::Api(card) => {
      (card.id, card.updated_at.timestamp_micros())
    }
    FactEntry::Error { id, .. } => (*id, i64::MIN),
  }
}

fn compute_etag_from_pairs(mut hasher: Sha256, pairs: &[(Uuid, i64)]) -> String {
  for (id, ts) in pairs {
    hasher.update(id.as_bytes());
    hasher.update(ts.to_le_bytes());
  }
  format!("\"{}\"", hex::encode(hasher.finalize()))
}

/// Whether an `If-None-Match` header value matches `etag`.
pub fn matches(if_none_match: &str, etag: &str) -> bool {
  if_none_match
    .split(',')
    .map(|t| t.trim().trim_start_matches("W/"))
    .any(|t| t == "*" || t == etag)
}
