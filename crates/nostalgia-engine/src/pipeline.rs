//! The enrichment pipeline: external records in, upserted rows out.
//!
//! Every write is an upsert on the record's natural key, so running any of
//! these operations twice leaves the same rows behind.

use std::ops::AddAssign;

use nostalgia_core::{
  book::NewBook,
  category::Category,
  event::NewSignificantEvent,
  fact::NewApiFact,
  job::RefreshRequest,
  store::FactStore,
};
use nostalgia_sources::SourceRecord;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{Engine, Error, Result, Stack};

/// Used when a summary has no second sentence.
pub const IMPACT_UNAVAILABLE: &str = "Impact information not available.";

/// Counts from one pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentReport {
  /// Records returned by the sources.
  pub seen:        usize,
  pub upserted:    usize,
  /// Records rejected before writing.
  pub skipped:     usize,
  /// Source lookups made.
  pub lookups:     usize,
  /// Lookups that came back empty because a source failed.
  pub unavailable: usize,
}

impl EnrichmentReport {
  /// True when lookups were made and every one of them hit a source failure.
  pub fn sources_down(&self) -> bool { self.lookups > 0 && self.unavailable == self.lookups }

  fn record_lookup(&mut self, unavailable: bool) {
    self.lookups += 1;
    self.unavailable += usize::from(unavailable);
  }
}

impl AddAssign for EnrichmentReport {
  fn add_assign(&mut self, rhs: Self) {
    self.seen += rhs.seen;
    self.upserted += rhs.upserted;
    self.skipped += rhs.skipped;
    self.lookups += rhs.lookups;
    self.unavailable += rhs.unavailable;
  }
}

impl<X: Stack> Engine<X> {
  /// Look up one fact per category for `year`, stopping after `limit`
  /// upserts when a limit is given. `category` narrows the run to a single
  /// category; otherwise every category is tried in name order.
  pub async fn enrich_facts(
    &self,
    year: i32,
    category: Option<&Category>,
    limit: Option<usize>,
  ) -> Result<EnrichmentReport> {
    let categories = match category {
      Some(c) => vec![c.clone()],
      None => self.categories().await?,
    };

    let mut report = EnrichmentReport::default();
    for category in &categories {
      if limit.is_some_and(|l| report.upserted >= l) {
        break;
      }
      let lookup = self.sources.fact(year, &category.name).await;
      report.record_lookup(lookup.unavailable);
      let Some(record) = lookup.found else { continue };
      report.seen += 1;
      self
        .store
        .upsert_api_fact(NewApiFact {
          year,
          title: record.title,
          description: record.description,
          source_url: record.source_url,
          category_ids: vec![category.category_id],
        })
        .await
        .map_err(Error::store)?;
      report.upserted += 1;
    }

    info!(year, seen = report.seen, upserted = report.upserted, "fact enrichment finished");
    Ok(report)
  }

  /// Fetch up to `limit` significant events for `year`.
  pub async fn enrich_events(&self, year: i32, limit: usize) -> Result<EnrichmentReport> {
    let lookup = self.sources.events(year, limit).await;
    let records = lookup.found;
    let mut report = EnrichmentReport { seen: records.len(), ..Default::default() };
    report.record_lookup(lookup.unavailable);

    for record in records {
      if record.description.trim().is_empty() {
        report.skipped += 1;
        continue;
      }
      self
        .store
        .upsert_event(NewSignificantEvent {
          impact: record.impact.unwrap_or_else(|| IMPACT_UNAVAILABLE.to_owned()),
          title: record.title,
          description: record.description,
          year,
          source_url: Some(record.source_url),
        })
        .await
        .map_err(Error::store)?;
      report.upserted += 1;
    }

    info!(
      year,
      seen = report.seen,
      upserted = report.upserted,
      skipped = report.skipped,
      "event enrichment finished"
    );
    Ok(report)
  }

  /// Fetch up to `limit` catalog works about `subject` published in `year`
  /// and store those that have a description.
  ///
  /// Books are linked to the category named `subject` and to any existing
  /// category whose name matches one of the work's subject headings.
  pub async fn enrich_books(
    &self,
    year: i32,
    subject: &str,
    limit: usize,
  ) -> Result<EnrichmentReport> {
    let lookup = self.sources.books(year, subject, limit).await;
    let records = lookup.found;
    let mut report = EnrichmentReport { seen: records.len(), ..Default::default() };
    report.record_lookup(lookup.unavailable);
    if records.is_empty() {
      info!(year, subject, "book enrichment found nothing");
      return Ok(report);
    }

    let categories = self.categories().await?;
    for record in records {
      if record.description.trim().is_empty() {
        report.skipped += 1;
        continue;
      }
      let category_ids = book_categories(&categories, subject, &record);
      self
        .store
        .upsert_book(NewBook {
          relevance: format!("Published in {year}; recommended for {subject}."),
          author: record.author.unwrap_or_default(),
          title: record.title,
          description: record.description,
          year,
          category_ids,
          isbn: None,
          cover_url: record.cover_url,
          source_url: Some(record.source_url),
        })
        .await
        .map_err(Error::store)?;
      report.upserted += 1;
    }

    info!(
      year,
      subject,
      seen = report.seen,
      upserted = report.upserted,
      skipped = report.skipped,
      "book enrichment finished"
    );
    Ok(report)
  }

  /// Delete every book without a description.
  pub async fn cleanup_books(&self) -> Result<usize> {
    let removed = self
      .store
      .delete_books_without_description()
      .await
      .map_err(Error::store)?;
    info!(removed, "removed books without descriptions");
    Ok(removed)
  }

  /// The full backfill run by a refresh job.
  ///
  /// Fails with [`Error::SourcesUnavailable`] when every lookup hit a source
  /// failure, so the job is retried rather than marked done.
  pub async fn refresh(&self, request: &RefreshRequest) -> Result<EnrichmentReport> {
    let category = match request.category.as_deref() {
      Some(slug) => Some(self.category(slug).await?),
      None => None,
    };
    let limit = self.settings.backfill_limit;
    let subject = category
      .as_ref()
      .map_or(self.settings.default_book_category.as_str(), |c| c.name.as_str());

    let mut report = self.enrich_facts(request.year, category.as_ref(), None).await?;
    report += self.enrich_events(request.year, limit).await?;
    report += self.enrich_books(request.year, subject, limit).await?;

    if report.sources_down() {
      return Err(Error::SourcesUnavailable { year: request.year });
    }
    Ok(report)
  }
}

/// Ids of existing categories a book record belongs to.
fn book_categories(categories: &[Category], subject: &str, record: &SourceRecord) -> Vec<uuid::Uuid> {
  categories
    .iter()
    .filter(|c| {
      c.name.eq_ignore_ascii_case(subject)
        || record.categories.iter().any(|s| s.eq_ignore_ascii_case(&c.name))
    })
    .map(|c| c.category_id)
    .collect()
}
