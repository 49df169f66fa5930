//! Tunables for the engine. Every field has a production default.

use std::time::Duration as StdDuration;

use chrono::Duration;

use crate::scheduler::RetryPolicy;

/// Minimum record counts below which a cached set counts as thin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
  pub min_facts:  usize,
  pub min_events: usize,
  pub min_books:  usize,
}

impl Default for Thresholds {
  fn default() -> Self { Self { min_facts: 1, min_events: 3, min_books: 1 } }
}

#[derive(Debug, Clone)]
pub struct EngineSettings {
  pub thresholds:            Thresholds,
  /// Candidates fetched per source by background refresh jobs.
  pub backfill_limit:        usize,
  /// Expiry of cached fact, event and book lists.
  pub record_ttl:            Duration,
  /// Expiry of cached combined-view pages.
  pub view_ttl:              Duration,
  /// Upper bound on events and books loaded into one results payload.
  pub display_limit:         usize,
  /// Catalog subject used when a refresh names no category.
  pub default_book_category: String,
  pub submission_limit:      u32,
  pub submission_window:     Duration,
  pub retry:                 RetryPolicy,
  /// How long a claimed job may run before another worker may reclaim it.
  pub job_lease:             Duration,
  /// Age after which finished jobs are pruned.
  pub job_retention:         Duration,
  pub poll_interval:         StdDuration,
  pub cleanup_interval:      StdDuration,
}

impl Default for EngineSettings {
  fn default() -> Self {
    Self {
      thresholds:            Thresholds::default(),
      backfill_limit:        10,
      record_ttl:            Duration::hours(24),
      view_ttl:              Duration::seconds(300),
      display_limit:         50,
      default_book_category: "fiction".to_owned(),
      submission_limit:      5,
      submission_window:     Duration::hours(1),
      retry:                 RetryPolicy::default(),
      job_lease:             Duration::minutes(10),
      job_retention:         Duration::days(7),
      poll_interval:         StdDuration::from_secs(5),
      cleanup_interval:      StdDuration::from_secs(60 * 60),
    }
  }
}
