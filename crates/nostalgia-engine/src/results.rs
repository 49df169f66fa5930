//! Everything shown for one graduation year, assembled in one call.

use nostalgia_core::{
  book::Book,
  category::Category,
  event::SignificantEvent,
  fact::{ApiFact, CategoryChanges},
  job::RefreshRequest,
  store::{BookQuery, FactStore},
  year::validate_year,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::{
  Engine, Error, Result, Stack,
  cache::{books_key, events_key, facts_key},
  view::{FactEntry, Page},
};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResultsQuery {
  pub grad_year: i32,
  /// Category slug.
  pub category:  Option<String>,
  pub page:      Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResultsPage {
  pub grad_year:           i32,
  pub categories:          Vec<Category>,
  pub selected_category:   Option<Category>,
  pub facts:               Page<FactEntry>,
  pub significant_events:  Vec<SignificantEvent>,
  pub recommended_reading: Vec<Book>,
  pub changes:             Option<CategoryChanges>,
  /// A background refresh was queued because some section was thin.
  pub refresh_queued:      bool,
}

impl<X: Stack> Engine<X> {
  pub async fn results(&self, query: ResultsQuery) -> Result<ResultsPage> {
    let year = validate_year(query.grad_year, self.now())?;
    let slug = query.category.as_deref().map(str::trim).filter(|s| !s.is_empty());

    let categories = self.categories().await?;
    if categories.is_empty() {
      return Err(Error::NoCategories);
    }
    let selected = match slug {
      Some(slug) => Some(
        categories
          .iter()
          .find(|c| c.slug == slug)
          .cloned()
          .ok_or_else(|| Error::NotFound(format!("category {slug:?}")))?,
      ),
      None => None,
    };

    let assembled = self.assemble(year, &categories, selected.as_ref(), query.page).await;
    if let Err(e) = &assembled {
      error!(year, category = slug, operation = "results", error = %e, "results assembly failed");
    }
    assembled
  }

  async fn assemble(
    &self,
    year: i32,
    categories: &[Category],
    selected: Option<&Category>,
    page: Option<usize>,
  ) -> Result<ResultsPage> {
    let thresholds = self.settings.thresholds;
    let limit = self.settings.display_limit;
    let slug = selected.map(|c| c.slug.as_str());
    let category_id = selected.map(|c| c.category_id);
    let subject = selected
      .map_or(self.settings.default_book_category.as_str(), |c| c.name.as_str());

    let facts = self
      .get_or_refresh::<ApiFact, _, _, _, _>(
        &facts_key(year, slug),
        thresholds.min_facts,
        || async move { self.store.api_facts(year, category_id).await.map_err(Error::store) },
        |shortfall| async move {
          self.enrich_facts(year, selected, Some(shortfall)).await.map(drop)
        },
      )
      .await?;
    let view = self.combined_view(year, selected, page).await?;

    let events = self
      .get_or_refresh::<SignificantEvent, _, _, _, _>(
        &events_key(year),
        thresholds.min_events,
        || async move { self.store.events_since(year, limit).await.map_err(Error::store) },
        |shortfall| async move { self.enrich_events(year, shortfall).await.map(drop) },
      )
      .await?;

    let book_query = &BookQuery { since_year: year, category_id, limit: Some(limit) };
    let books = self
      .get_or_refresh::<Book, _, _, _, _>(
        &books_key(year, slug),
        thresholds.min_books,
        || async move { self.store.books_since(book_query).await.map_err(Error::store) },
        |shortfall| async move { self.enrich_books(year, subject, shortfall).await.map(drop) },
      )
      .await?;

    let thin = facts.thin || events.thin || books.thin;
    let refresh_queued = if thin {
      let request = RefreshRequest { year, category: slug.map(str::to_owned) };
      self.schedule_refresh(request).await?.is_some()
    } else {
      false
    };

    let changes = match selected {
      Some(category) => Some(self.category_changes(year, category).await?),
      None => None,
    };

    info!(
      year,
      category = slug,
      facts = view.total_items,
      events = events.records.len(),
      books = books.records.len(),
      refresh_queued,
      "results assembled"
    );
    Ok(ResultsPage {
      grad_year: year,
      categories: categories.to_vec(),
      selected_category: selected.cloned(),
      facts: view,
      significant_events: events.records,
      recommended_reading: books.records,
      changes,
      refresh_queued,
    })
  }

  /// Curated items of the category named `slug`, split around `grad_year`.
  pub async fn changes(&self, grad_year: i32, slug: &str) -> Result<CategoryChanges> {
    let year = validate_year(grad_year, self.now())?;
    let category = self.category(slug).await?;
    self.category_changes(year, &category).await
  }

  async fn category_changes(&self, grad_year: i32, category: &Category) -> Result<CategoryChanges> {
    let items = self
      .store
      .items_in_category(category.category_id)
      .await
      .map_err(Error::store)?;
    Ok(CategoryChanges::partition(category.clone(), items, grad_year))
  }
}
