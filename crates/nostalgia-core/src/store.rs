//! The `FactStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g.
//! `nostalgia-store-sqlite`). The engine and API crates depend on this
//! abstraction, not on any concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  book::{Book, NewBook},
  category::{Category, NewCategory},
  event::{NewSignificantEvent, SignificantEvent},
  fact::{ApiFact, InformationItem, NewApiFact, NewInformationItem},
  submission::{ModerationStatus, NewSubmission, ReviewOutcome, UserSubmittedFact},
};

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`FactStore::books_since`].
#[derive(Debug, Clone, Default)]
pub struct BookQuery {
  /// Books published in this year or later.
  pub since_year:  i32,
  /// Restrict to books linked to this category.
  pub category_id: Option<Uuid>,
  pub limit:       Option<usize>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over the relational store.
///
/// Writes of externally-sourced records are upserts on their natural keys:
/// `(year, title)` for events and API facts, `(title, author, year)` for
/// books. Re-running an import therefore never duplicates rows.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait FactStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Categories ────────────────────────────────────────────────────────

  /// Create a category. The slug is derived from the name when not given.
  fn add_category(
    &self,
    input: NewCategory,
  ) -> impl Future<Output = Result<Category, Self::Error>> + Send + '_;

  /// All categories ordered by name.
  fn list_categories(
    &self,
  ) -> impl Future<Output = Result<Vec<Category>, Self::Error>> + Send + '_;

  fn category_by_slug<'a>(
    &'a self,
    slug: &'a str,
  ) -> impl Future<Output = Result<Option<Category>, Self::Error>> + Send + 'a;

  // ── Curated items ─────────────────────────────────────────────────────

  fn add_item(
    &self,
    input: NewInformationItem,
  ) -> impl Future<Output = Result<InformationItem, Self::Error>> + Send + '_;

  /// Items linked to a category, ordered by year.
  fn items_in_category(
    &self,
    category_id: Uuid,
  ) -> impl Future<Output = Result<Vec<InformationItem>, Self::Error>> + Send + '_;

  // ── Events ────────────────────────────────────────────────────────────

  /// Insert or overwrite the event keyed by `(year, title)`.
  fn upsert_event(
    &self,
    input: NewSignificantEvent,
  ) -> impl Future<Output = Result<SignificantEvent, Self::Error>> + Send + '_;

  /// Events in `year` or later, ordered by year then title.
  fn events_since(
    &self,
    year: i32,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<SignificantEvent>, Self::Error>> + Send + '_;

  // ── Books ─────────────────────────────────────────────────────────────

  /// Insert or overwrite the book keyed by `(title, author, year)` and link
  /// the given categories.
  fn upsert_book(
    &self,
    input: NewBook,
  ) -> impl Future<Output = Result<Book, Self::Error>> + Send + '_;

  /// Visible books (non-blank description) matching `query`.
  fn books_since<'a>(
    &'a self,
    query: &'a BookQuery,
  ) -> impl Future<Output = Result<Vec<Book>, Self::Error>> + Send + 'a;

  fn count_books_without_description(
    &self,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  /// Delete every book whose description is blank; returns the count.
  fn delete_books_without_description(
    &self,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  // ── API facts ─────────────────────────────────────────────────────────

  /// Insert or overwrite the fact keyed by `(year, title)`; categories are
  /// added to any already linked.
  fn upsert_api_fact(
    &self,
    input: NewApiFact,
  ) -> impl Future<Output = Result<ApiFact, Self::Error>> + Send + '_;

  /// Facts for exactly `year`, optionally restricted to a category, ordered
  /// by title.
  fn api_facts(
    &self,
    year: i32,
    category_id: Option<Uuid>,
  ) -> impl Future<Output = Result<Vec<ApiFact>, Self::Error>> + Send + '_;

  // ── Submissions ───────────────────────────────────────────────────────

  /// Store a validated submission with status `under_review`.
  fn insert_submission(
    &self,
    input: NewSubmission,
  ) -> impl Future<Output = Result<UserSubmittedFact, Self::Error>> + Send + '_;

  fn get_submission(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<UserSubmittedFact>, Self::Error>> + Send + '_;

  /// Submissions in `status`, newest first.
  fn submissions_with_status(
    &self,
    status: ModerationStatus,
  ) -> impl Future<Output = Result<Vec<UserSubmittedFact>, Self::Error>> + Send + '_;

  /// Approved submissions for exactly `year`, most recently reviewed first.
  fn approved_submissions(
    &self,
    year: i32,
    category_id: Option<Uuid>,
  ) -> impl Future<Output = Result<Vec<UserSubmittedFact>, Self::Error>> + Send + '_;

  /// Apply a moderation outcome in a single conditional write.
  ///
  /// Status, reviewer, review time and notes change together, and only if the
  /// row is still `under_review`. Returns `None` when no row was changed.
  fn record_review(
    &self,
    id: Uuid,
    outcome: ReviewOutcome,
  ) -> impl Future<Output = Result<Option<UserSubmittedFact>, Self::Error>> + Send + '_;
}
