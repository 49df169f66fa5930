//! Normalized lookups over an [`Encyclopedia`] and a [`LibraryCatalog`].
//!
//! Every public method here is infallible from the caller's point of view.
//! A candidate page that is missing or ambiguous is skipped quietly; a
//! candidate that fails for any other reason is logged and skipped. Only a
//! failed search (or catalog query) ends a lookup early. Either way the
//! result says whether the source let the lookup down, so a background
//! refresh can retry later.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
  banned::BannedAuthors,
  catalog::{CatalogWork, LibraryCatalog},
  encyclopedia::{Encyclopedia, EncyclopediaPage},
  text::{first_sentence, first_sentences, mentions_year, second_sentence, with_year_prefix},
};

/// Encyclopedia candidates considered per fact or book-description lookup.
const CANDIDATES: usize = 5;

/// A record ready to be written by the enrichment pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRecord {
  pub title:       String,
  pub description: String,
  pub source_url:  String,
  /// Second summary sentence; only set for events.
  pub impact:      Option<String>,
  /// Authors joined with `, `; only set for books.
  pub author:      Option<String>,
  pub cover_url:   Option<String>,
  /// Candidate category names. Facts carry the category they were found
  /// for; books carry the catalog's subject headings.
  pub categories:  Vec<String>,
}

impl SourceRecord {
  fn from_page(page: EncyclopediaPage, description: String) -> Self {
    Self {
      title: page.title,
      description,
      source_url: page.url,
      impact: None,
      author: None,
      cover_url: None,
      categories: Vec::new(),
    }
  }
}

/// What one lookup produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup<T> {
  pub found:       T,
  /// Nothing was found and at least one source call failed for a reason
  /// other than a missing or ambiguous page.
  pub unavailable: bool,
}

impl<T: Default> Lookup<T> {
  fn unavailable() -> Self { Self { found: T::default(), unavailable: true } }
}

impl<T> Lookup<T> {
  fn found(found: T) -> Self { Self { found, unavailable: false } }
}

/// The external sources the pipeline draws on.
pub struct Sources<E, C> {
  encyclopedia: E,
  catalog:      C,
  banned:       BannedAuthors,
}

impl<E: Encyclopedia, C: LibraryCatalog> Sources<E, C> {
  pub fn new(encyclopedia: E, catalog: C, banned: BannedAuthors) -> Self {
    Self { encyclopedia, catalog, banned }
  }

  // ── Facts ─────────────────────────────────────────────────────────────────

  /// The first `"{year} {category}"` candidate whose page mentions the year.
  ///
  /// The description is the summary's first sentence, prefixed with
  /// `In {year}, ` when it does not already name the year.
  pub async fn fact(&self, year: i32, category: &str) -> Lookup<Option<SourceRecord>> {
    let query = format!("{year} {category}");
    let titles = match self.encyclopedia.search(&query, CANDIDATES).await {
      Ok(titles) => titles,
      Err(e) => {
        warn!(error = %e, year, category, "fact search failed");
        return Lookup::unavailable();
      }
    };

    let mut failed = false;
    for title in titles {
      let Some(page) = self.candidate(&title, &mut failed).await else { continue };
      if !mentions_year(&page.title, &page.summary, year) {
        continue;
      }
      let description = with_year_prefix(first_sentence(&page.summary), year);
      let mut record = SourceRecord::from_page(page, description);
      record.categories.push(category.to_owned());
      return Lookup::found(Some(record));
    }
    Lookup { found: None, unavailable: failed }
  }

  // ── Events ────────────────────────────────────────────────────────────────

  /// Up to `limit` pages found for `"{year} events"`, titled by search hit.
  pub async fn events(&self, year: i32, limit: usize) -> Lookup<Vec<SourceRecord>> {
    let query = format!("{year} events");
    let titles = match self.encyclopedia.search(&query, limit).await {
      Ok(titles) => titles,
      Err(e) => {
        warn!(error = %e, year, "event search failed");
        return Lookup::unavailable();
      }
    };

    let mut failed = false;
    let mut records = Vec::new();
    for title in titles {
      let Some(page) = self.candidate(&title, &mut failed).await else { continue };
      let description = first_sentence(&page.summary).to_owned();
      if description.is_empty() {
        continue;
      }
      let impact = second_sentence(&page.summary).map(str::to_owned);
      let mut record = SourceRecord::from_page(page, description);
      record.title = title;
      record.impact = impact;
      records.push(record);
    }
    let unavailable = failed && records.is_empty();
    Lookup { found: records, unavailable }
  }

  // ── Books ─────────────────────────────────────────────────────────────────

  /// Up to `limit` catalog works for `category` published in `year`, each
  /// with an encyclopedia description. Works by banned authors and works
  /// without a matching encyclopedia page are left out.
  pub async fn books(&self, year: i32, category: &str, limit: usize) -> Lookup<Vec<SourceRecord>> {
    let works = match self.catalog.works(year, category, limit).await {
      Ok(works) => works,
      Err(e) => {
        warn!(error = %e, year, category, "catalog lookup failed");
        return Lookup::unavailable();
      }
    };

    let mut failed = false;
    let mut records = Vec::new();
    for work in works {
      if self.banned.any_banned(work.authors.iter().map(String::as_str)) {
        debug!(title = %work.title, "skipping work by banned author");
        continue;
      }
      match self.book_description(&work, &mut failed).await {
        Some(page) => records.push(book_record(work, page)),
        None => info!(title = %work.title, "excluded book without description"),
      }
    }
    let unavailable = failed && records.is_empty();
    Lookup { found: records, unavailable }
  }

  /// An encyclopedia page whose title contains the work's title.
  async fn book_description(
    &self,
    work: &CatalogWork,
    failed: &mut bool,
  ) -> Option<EncyclopediaPage> {
    let query = format!("{} book by {}", work.title, work.author_line());
    let titles = match self.encyclopedia.search(&query, CANDIDATES).await {
      Ok(titles) => titles,
      Err(e) => {
        warn!(error = %e, title = %work.title, "book description search failed");
        *failed = true;
        return None;
      }
    };

    let wanted = work.title.to_lowercase();
    for title in titles {
      let Some(page) = self.candidate(&title, failed).await else { continue };
      if page.title.to_lowercase().contains(&wanted) && !page.summary.trim().is_empty() {
        return Some(page);
      }
    }
    None
  }

  // ── Shared ────────────────────────────────────────────────────────────────

  /// Fetch a candidate page. Misses are skipped quietly; other failures are
  /// logged, recorded in `failed`, and skipped too.
  async fn candidate(&self, title: &str, failed: &mut bool) -> Option<EncyclopediaPage> {
    match self.encyclopedia.page(title).await {
      Ok(page) => Some(page),
      Err(e) if e.is_candidate_miss() => {
        debug!(error = %e, title, "skipping candidate");
        None
      }
      Err(e) => {
        warn!(error = %e, title, "candidate lookup failed");
        *failed = true;
        None
      }
    }
  }
}

fn book_record(work: CatalogWork, page: EncyclopediaPage) -> SourceRecord {
  SourceRecord {
    description: first_sentences(&page.summary, 2),
    source_url:  page.url,
    impact:      None,
    author:      Some(work.author_line()),
    cover_url:   work.cover_url(),
    categories:  work.subjects,
    title:       work.title,
  }
}
