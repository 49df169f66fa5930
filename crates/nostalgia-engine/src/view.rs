//! The combined fact view: approved submissions and imported facts on one
//! paginated list.

use chrono::{DateTime, Utc};
use nostalgia_core::{
  category::Category, fact::ApiFact, store::FactStore, submission::UserSubmittedFact,
};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::{Engine, Error, Result, Stack, cache::view_key};

/// Facts per page.
pub const PAGE_SIZE: usize = 10;

// ─── Rendered entries ────────────────────────────────────────────────────────

/// What a reader sees of one fact, regardless of where it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactCard {
  pub id:          Uuid,
  pub year:        i32,
  pub title:       String,
  pub description: String,
  /// Category names.
  pub categories:  Vec<String>,
  pub source_url:  String,
  pub updated_at:  DateTime<Utc>,
}

/// One row of the combined view, tagged with its origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "fact_type", rename_all = "snake_case")]
pub enum FactEntry {
  UserSubmitted(FactCard),
  Api(FactCard),
  /// Stands in for a record that could not be rendered.
  Error { id: Uuid, message: String },
}

impl FactEntry {
  pub fn id(&self) -> Uuid {
    match self {
      Self::UserSubmitted(card) | Self::Api(card) => card.id,
      Self::Error { id, .. } => *id,
    }
  }

  /// Changes whenever the entry would render differently.
  pub fn fingerprint(&self) -> String {
    match self {
      Self::UserSubmitted(card) | Self::Api(card) => {
        format!("{}:{}", card.id, card.updated_at.timestamp_micros())
      }
      Self::Error { id, .. } => format!("{id}:error"),
    }
  }
}

/// A stored record that belongs in the combined view.
#[derive(Debug, Clone)]
pub(crate) enum FactSource {
  UserSubmitted(UserSubmittedFact),
  ApiSourced(ApiFact),
}

impl FactSource {
  fn id(&self) -> Uuid {
    match self {
      Self::UserSubmitted(s) => s.submission_id,
      Self::ApiSourced(f) => f.fact_id,
    }
  }

  fn card(&self) -> Result<FactCard, &'static str> {
    let (id, year, title, description, categories, source_url, updated_at) = match self {
      Self::UserSubmitted(s) => (
        s.submission_id,
        s.year,
        &s.title,
        &s.description,
        &s.categories,
        &s.source_url,
        s.review.map_or(s.submitted_at, |r| r.reviewed_at),
      ),
      Self::ApiSourced(f) => (
        f.fact_id,
        f.year,
        &f.title,
        &f.description,
        &f.categories,
        &f.source_url,
        f.updated_at,
      ),
    };
    if title.trim().is_empty() {
      return Err("missing title");
    }
    if description.trim().is_empty() {
      return Err("missing description");
    }
    Ok(FactCard {
      id,
      year,
      title: title.clone(),
      description: description.clone(),
      categories: categories.iter().map(|c| c.name.clone()).collect(),
      source_url: source_url.clone(),
      updated_at,
    })
  }

  /// Render into an entry. Failures become a placeholder so that one bad
  /// row cannot take the page down.
  pub(crate) fn render(&self) -> FactEntry {
    match (self, self.card()) {
      (Self::UserSubmitted(_), Ok(card)) => FactEntry::UserSubmitted(card),
      (Self::ApiSourced(_), Ok(card)) => FactEntry::Api(card),
      (_, Err(reason)) => {
        let id = self.id();
        warn!(%id, reason, "could not render fact");
        FactEntry::Error { id, message: format!("this fact could not be displayed: {reason}") }
      }
    }
  }
}

// ─── Pagination ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
  pub items:        Vec<T>,
  /// 1-based.
  pub page:         usize,
  pub total_pages:  usize,
  pub total_items:  usize,
  pub has_next:     bool,
  pub has_previous: bool,
}

/// Cut `items` into pages of `size` and render only the requested one.
///
/// A missing or zero page number means the first page; anything past the end
/// means the last page. An empty list still has one (empty) page.
pub fn paginate<T, U>(
  items: Vec<T>,
  page: Option<usize>,
  size: usize,
  render: impl FnMut(T) -> U,
) -> Page<U> {
  let size = size.max(1);
  let total_items = items.len();
  let total_pages = total_items.div_ceil(size).max(1);
  let page = page.unwrap_or(1).clamp(1, total_pages);

  let items = items
    .into_iter()
    .skip((page - 1) * size)
    .take(size)
    .map(render)
    .collect();

  Page {
    items,
    page,
    total_pages,
    total_items,
    has_next: page < total_pages,
    has_previous: page > 1,
  }
}

// ─── Engine ──────────────────────────────────────────────────────────────────

impl<X: Stack> Engine<X> {
  /// Approved submissions, most recently reviewed first, followed by
  /// imported facts in title order.
  pub(crate) async fn combined_sources(
    &self,
    year: i32,
    category: Option<&Category>,
  ) -> Result<Vec<FactSource>> {
    let category_id = category.map(|c| c.category_id);
    let submitted = self
      .store
      .approved_submissions(year, category_id)
      .await
      .map_err(Error::store)?;
    let imported = self.store.api_facts(year, category_id).await.map_err(Error::store)?;

    Ok(
      submitted
        .into_iter()
        .filter(|s| s.status.is_public())
        .map(FactSource::UserSubmitted)
        .chain(imported.into_iter().map(FactSource::ApiSourced))
        .collect(),
    )
  }

  /// One page of the combined view, cached briefly.
  ///
  /// Pages are cached under the page number actually served, so requests
  /// past the last page share one entry with it.
  pub async fn combined_view(
    &self,
    year: i32,
    category: Option<&Category>,
    page: Option<usize>,
  ) -> Result<Page<FactEntry>> {
    let requested = page.unwrap_or(1).max(1);
    let key = view_key(year, category.map(|c| c.slug.as_str()), requested);
    if let Some(cached) = self.cache_get::<Page<FactEntry>>(&key).await {
      return Ok(cached);
    }

    let sources = self.combined_sources(year, category).await?;
    let page = paginate(sources, Some(requested), PAGE_SIZE, |s| s.render());
    let served = view_key(year, category.map(|c| c.slug.as_str()), page.page);
    self.cache_put(&served, &page, self.settings.view_ttl).await;
    Ok(page)
  }
}
