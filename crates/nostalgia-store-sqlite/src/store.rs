//! [`SqliteStore`]: the SQLite implementation of [`FactStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use nostalgia_core::{
  book::{Book, NewBook},
  category::{Category, NewCategory},
  event::{MAX_EVENT_TITLE, NewSignificantEvent, SignificantEvent},
  fact::{ApiFact, InformationItem, NewApiFact, NewInformationItem},
  store::{BookQuery, FactStore},
  submission::{ModerationStatus, NewSubmission, ReviewOutcome, UserSubmittedFact},
};

use crate::{
  Error, Result,
  encode::{
    RawApiFact, RawBook, RawEvent, RawItem, RawSubmission, categories_json,
    decode_uuid, encode_dt, encode_notification, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Nostalgia store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Set a submission's status directly, bypassing the moderation state
  /// machine. This is the data-repair path that produces `undetermined`
  /// rows; it never touches the review columns.
  ///
  /// Returns `false` if no such submission exists.
  pub async fn overwrite_status(
    &self,
    submission_id: Uuid,
    status: ModerationStatus,
  ) -> Result<bool> {
    let id_str = encode_uuid(submission_id);
    let status_str = status.as_str();

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE submissions SET status = ?2 WHERE submission_id = ?1",
          rusqlite::params![id_str, status_str],
        )?)
      })
      .await?;

    Ok(changed > 0)
  }

  async fn get_item(&self, id: String) -> Result<InformationItem> {
    let raw = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(&item_select("WHERE t.item_id = ?1"), [&id], raw_item)?)
      })
      .await?;
    raw.into_item()
  }
}

// ─── SQL builders ────────────────────────────────────────────────────────────

fn item_select(tail: &str) -> String {
  format!(
    "SELECT t.item_id, t.title, t.description, t.year, t.is_outdated,
            t.current_status, t.change_description, t.relevance_explanation,
            t.source_url, t.submitted_by, t.created_at, t.updated_at,
            {} AS categories
       FROM information_items t {tail}",
    categories_json("information_item_categories", "item_id", "t.item_id"),
  )
}

fn event_select(tail: &str) -> String {
  format!(
    "SELECT t.event_id, t.title, t.description, t.year, t.impact, t.source_url,
            t.created_at, t.updated_at
       FROM significant_events t {tail}"
  )
}

fn book_select(tail: &str) -> String {
  format!(
    "SELECT t.book_id, t.title, t.author, t.description, t.year, t.relevance,
            t.isbn, t.cover_url, t.source_url, t.created_at, t.updated_at,
            {} AS categories
       FROM books t {tail}",
    categories_json("book_categories", "book_id", "t.book_id"),
  )
}

fn api_fact_select(tail: &str) -> String {
  format!(
    "SELECT t.fact_id, t.year, t.title, t.description, t.source_url,
            t.created_at, t.updated_at, {} AS categories
       FROM api_facts t {tail}",
    categories_json("api_fact_categories", "fact_id", "t.fact_id"),
  )
}

fn submission_select(tail: &str) -> String {
  format!(
    "SELECT t.submission_id, t.user_id, t.year, t.title, t.description,
            t.source_url, t.status, t.review_notes, t.reviewed_by, t.reviewed_at,
            t.notification, t.submitted_at, {} AS categories
       FROM submissions t {tail}",
    categories_json("submission_categories", "submission_id", "t.submission_id"),
  )
}

/// `EXISTS` filter on a link table; the category id is bound as `?2` and a
/// NULL binding disables the filter.
fn category_filter(link: &str, key: &str) -> String {
  format!(
    "(?2 IS NULL OR EXISTS (SELECT 1 FROM {link} l
                              WHERE l.{key} = t.{key} AND l.category_id = ?2))"
  )
}

// ─── Row mappers ─────────────────────────────────────────────────────────────

fn raw_category(row: &rusqlite::Row<'_>) -> rusqlite::Result<(String, String, String)> {
  Ok((row.get(0)?, row.get(1)?, row.get(2)?))
}

fn raw_item(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawItem> {
  Ok(RawItem {
    item_id:               row.get(0)?,
    title:                 row.get(1)?,
    description:           row.get(2)?,
    year:                  row.get(3)?,
    is_outdated:           row.get(4)?,
    current_status:        row.get(5)?,
    change_description:    row.get(6)?,
    relevance_explanation: row.get(7)?,
    source_url:            row.get(8)?,
    submitted_by:          row.get(9)?,
    created_at:            row.get(10)?,
    updated_at:            row.get(11)?,
    categories:            row.get(12)?,
  })
}

fn raw_event(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawEvent> {
  Ok(RawEvent {
    event_id:    row.get(0)?,
    title:       row.get(1)?,
    description: row.get(2)?,
    year:        row.get(3)?,
    impact:      row.get(4)?,
    source_url:  row.get(5)?,
    created_at:  row.get(6)?,
    updated_at:  row.get(7)?,
  })
}

fn raw_book(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawBook> {
  Ok(RawBook {
    book_id:     row.get(0)?,
    title:       row.get(1)?,
    author:      row.get(2)?,
    description: row.get(3)?,
    year:        row.get(4)?,
    relevance:   row.get(5)?,
    isbn:        row.get(6)?,
    cover_url:   row.get(7)?,
    source_url:  row.get(8)?,
    created_at:  row.get(9)?,
    updated_at:  row.get(10)?,
    categories:  row.get(11)?,
  })
}

fn raw_api_fact(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawApiFact> {
  Ok(RawApiFact {
    fact_id:     row.get(0)?,
    year:        row.get(1)?,
    title:       row.get(2)?,
    description: row.get(3)?,
    source_url:  row.get(4)?,
    created_at:  row.get(5)?,
    updated_at:  row.get(6)?,
    categories:  row.get(7)?,
  })
}

fn raw_submission(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawSubmission> {
  Ok(RawSubmission {
    submission_id: row.get(0)?,
    user_id:       row.get(1)?,
    year:          row.get(2)?,
    title:         row.get(3)?,
    description:   row.get(4)?,
    source_url:    row.get(5)?,
    status:        row.get(6)?,
    review_notes:  row.get(7)?,
    reviewed_by:   row.get(8)?,
    reviewed_at:   row.get(9)?,
    notification:  row.get(10)?,
    submitted_at:  row.get(11)?,
    categories:    row.get(12)?,
  })
}

/// Link `owner` to every category in `category_ids`, keeping existing links.
fn link_categories(
  conn: &rusqlite::Connection,
  link: &str,
  key: &str,
  owner: &str,
  category_ids: &[String],
) -> rusqlite::Result<()> {
  let mut stmt = conn.prepare(&format!(
    "INSERT OR IGNORE INTO {link} ({key}, category_id) VALUES (?1, ?2)"
  ))?;
  for category_id in category_ids {
    stmt.execute(rusqlite::params![owner, category_id])?;
  }
  Ok(())
}

fn encode_ids(ids: &[Uuid]) -> Vec<String> {
  ids.iter().copied().map(encode_uuid).collect()
}

fn truncate_chars(s: &str, max: usize) -> String { s.chars().take(max).collect() }

// ─── FactStore impl ──────────────────────────────────────────────────────────

impl FactStore for SqliteStore {
  type Error = Error;

  // ── Categories ──────────────────────────────────────────────────────────

  async fn add_category(&self, input: NewCategory) -> Result<Category> {
    let category = Category {
      category_id: Uuid::new_v4(),
      slug:        input.resolved_slug(),
      name:        input.name.trim().to_owned(),
    };

    let id_str = encode_uuid(category.category_id);
    let name = category.name.clone();
    let slug = category.slug.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO categories (category_id, name, slug) VALUES (?1, ?2, ?3)",
          rusqlite::params![id_str, name, slug],
        )?;
        Ok(())
      })
      .await?;

    Ok(category)
  }

  async fn list_categories(&self) -> Result<Vec<Category>> {
    let raws = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare("SELECT category_id, name, slug FROM categories ORDER BY name")?;
        let rows = stmt
          .query_map([], raw_category)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(|(id, name, slug)| Ok(Category { category_id: decode_uuid(&id)?, name, slug }))
      .collect()
  }

  async fn category_by_slug(&self, slug: &str) -> Result<Option<Category>> {
    let slug = slug.to_owned();

    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT category_id, name, slug FROM categories WHERE slug = ?1",
              [&slug],
              raw_category,
            )
            .optional()?,
        )
      })
      .await?;

    raw
      .map(|(id, name, slug)| Ok(Category { category_id: decode_uuid(&id)?, name, slug }))
      .transpose()
  }

  // ── Curated items ───────────────────────────────────────────────────────

  async fn add_item(&self, input: NewInformationItem) -> Result<InformationItem> {
    let now = encode_dt(Utc::now());
    let id_str = encode_uuid(Uuid::new_v4());
    let category_ids = encode_ids(&input.category_ids);
    let submitted_by = input.submitted_by.map(encode_uuid);
    let owner = id_str.clone();

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO information_items (
             item_id, title, description, year, is_outdated, current_status,
             change_description, relevance_explanation, source_url, submitted_by,
             created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)",
          rusqlite::params![
            owner,
            input.title,
            input.description,
            input.year,
            input.is_outdated,
            input.current_status,
            input.change_description,
            input.relevance_explanation,
            input.source_url,
            submitted_by,
            now,
          ],
        )?;
        link_categories(&tx, "information_item_categories", "item_id", &owner, &category_ids)?;
        tx.commit()?;
        Ok(())
      })
      .await?;

    self.get_item(id_str).await
  }

  async fn items_in_category(&self, category_id: Uuid) -> Result<Vec<InformationItem>> {
    let cat_str = encode_uuid(category_id);

    let raws = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&item_select(
          "JOIN information_item_categories ic ON ic.item_id = t.item_id
           WHERE ic.category_id = ?1
           ORDER BY t.year, t.title",
        ))?;
        let rows = stmt
          .query_map([&cat_str], raw_item)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawItem::into_item).collect()
  }

  // ── Events ──────────────────────────────────────────────────────────────

  async fn upsert_event(&self, input: NewSignificantEvent) -> Result<SignificantEvent> {
    let now = encode_dt(Utc::now());
    let id_str = encode_uuid(Uuid::new_v4());
    let title = truncate_chars(&input.title, MAX_EVENT_TITLE);

    let raw = self
      .conn
      .call(move |conn| {
        let sql = "INSERT INTO significant_events (
             event_id, title, description, year, impact, source_url,
             created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
           ON CONFLICT (year, title) DO UPDATE SET
             description = excluded.description,
             impact      = excluded.impact,
             source_url  = excluded.source_url,
             updated_at  = excluded.updated_at
           RETURNING event_id, title, description, year, impact, source_url,
                     created_at, updated_at";
        Ok(conn.query_row(
          sql,
          rusqlite::params![
            id_str,
            title,
            input.description,
            input.year,
            input.impact,
            input.source_url,
            now,
          ],
          raw_event,
        )?)
      })
      .await?;

    raw.into_event()
  }

  async fn events_since(&self, year: i32, limit: usize) -> Result<Vec<SignificantEvent>> {
    let limit = limit as i64;

    let raws = self
      .conn
      .call(move |conn| {
        let mut stmt =
          conn.prepare(&event_select("WHERE t.year >= ?1 ORDER BY t.year, t.title LIMIT ?2"))?;
        let rows = stmt
          .query_map(rusqlite::params![year, limit], raw_event)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawEvent::into_event).collect()
  }

  // ── Books ───────────────────────────────────────────────────────────────

  async fn upsert_book(&self, input: NewBook) -> Result<Book> {
    let now = encode_dt(Utc::now());
    let id_str = encode_uuid(Uuid::new_v4());
    let category_ids = encode_ids(&input.category_ids);

    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let book_id: String = tx.query_row(
          "INSERT INTO books (
             book_id, title, author, description, year, relevance, isbn,
             cover_url, source_url, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)
           ON CONFLICT (title, author, year) DO UPDATE SET
             description = excluded.description,
             relevance   = excluded.relevance,
             isbn        = coalesce(excluded.isbn, books.isbn),
             cover_url   = coalesce(excluded.cover_url, books.cover_url),
             source_url  = coalesce(excluded.source_url, books.source_url),
             updated_at  = excluded.updated_at
           RETURNING book_id",
          rusqlite::params![
            id_str,
            input.title,
            input.author,
            input.description,
            input.year,
            input.relevance,
            input.isbn,
            input.cover_url,
            input.source_url,
            now,
          ],
          |r| r.get(0),
        )?;
        link_categories(&tx, "book_categories", "book_id", &book_id, &category_ids)?;
        let raw = tx.query_row(&book_select("WHERE t.book_id = ?1"), [&book_id], raw_book)?;
        tx.commit()?;
        Ok(raw)
      })
      .await?;

    raw.into_book()
  }

  async fn books_since(&self, query: &BookQuery) -> Result<Vec<Book>> {
    let since = query.since_year;
    let cat_str = query.category_id.map(encode_uuid);
    // SQLite treats a negative LIMIT as "no limit".
    let limit = query.limit.map_or(-1, |l| l as i64);

    let raws = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&book_select(&format!(
          "WHERE t.year >= ?1
             AND trim(t.description) <> ''
             AND {}
           ORDER BY t.year, t.title
           LIMIT ?3",
          category_filter("book_categories", "book_id"),
        )))?;
        let rows = stmt
          .query_map(rusqlite::params![since, cat_str, limit], raw_book)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawBook::into_book).collect()
  }

  async fn count_books_without_description(&self) -> Result<usize> {
    let count: i64 = self
      .conn
      .call(|conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*) FROM books WHERE trim(description) = ''",
          [],
          |r| r.get(0),
        )?)
      })
      .await?;
    Ok(count as usize)
  }

  async fn delete_books_without_description(&self) -> Result<usize> {
    let deleted = self
      .conn
      .call(|conn| Ok(conn.execute("DELETE FROM books WHERE trim(description) = ''", [])?))
      .await?;
    Ok(deleted)
  }

  // ── API facts ───────────────────────────────────────────────────────────

  async fn upsert_api_fact(&self, input: NewApiFact) -> Result<ApiFact> {
    let now = encode_dt(Utc::now());
    let id_str = encode_uuid(Uuid::new_v4());
    let category_ids = encode_ids(&input.category_ids);

    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let fact_id: String = tx.query_row(
          "INSERT INTO api_facts (
             fact_id, year, title, description, source_url, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
           ON CONFLICT (year, title) DO UPDATE SET
             description = excluded.description,
             source_url  = excluded.source_url,
             updated_at  = excluded.updated_at
           RETURNING fact_id",
          rusqlite::params![
            id_str,
            input.year,
            input.title,
            input.description,
            input.source_url,
            now,
          ],
          |r| r.get(0),
        )?;
        link_categories(&tx, "api_fact_categories", "fact_id", &fact_id, &category_ids)?;
        let raw =
          tx.query_row(&api_fact_select("WHERE t.fact_id = ?1"), [&fact_id], raw_api_fact)?;
        tx.commit()?;
        Ok(raw)
      })
      .await?;

    raw.into_fact()
  }

  async fn api_facts(&self, year: i32, category_id: Option<Uuid>) -> Result<Vec<ApiFact>> {
    let cat_str = category_id.map(encode_uuid);

    let raws = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&api_fact_select(&format!(
          "WHERE t.year = ?1 AND {} ORDER BY t.title",
          category_filter("api_fact_categories", "fact_id"),
        )))?;
        let rows = stmt
          .query_map(rusqlite::params![year, cat_str], raw_api_fact)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawApiFact::into_fact).collect()
  }

  // ── Submissions ─────────────────────────────────────────────────────────

  async fn insert_submission(&self, input: NewSubmission) -> Result<UserSubmittedFact> {
    let submission_id = Uuid::new_v4();
    let id_str = encode_uuid(submission_id);
    let user_str = encode_uuid(input.user_id);
    let now = encode_dt(Utc::now());
    let notification = encode_notification(input.notification.as_ref())?;
    let category_ids = encode_ids(&input.category_ids);
    let status = ModerationStatus::UnderReview.as_str();

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO submissions (
             submission_id, user_id, year, title, description, source_url,
             status, notification, submitted_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
          rusqlite::params![
            id_str,
            user_str,
            input.year,
            input.title,
            input.description,
            input.source_url,
            status,
            notification,
            now,
          ],
        )?;
        link_categories(&tx, "submission_categories", "submission_id", &id_str, &category_ids)?;
        tx.commit()?;
        Ok(())
      })
      .await?;

    self
      .get_submission(submission_id)
      .await?
      .ok_or(Error::RowVanished(submission_id))
  }

  async fn get_submission(&self, id: Uuid) -> Result<Option<UserSubmittedFact>> {
    let id_str = encode_uuid(id);

    let raw = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &submission_select("WHERE t.submission_id = ?1"),
              [&id_str],
              raw_submission,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawSubmission::into_submission).transpose()
  }

  async fn submissions_with_status(
    &self,
    status: ModerationStatus,
  ) -> Result<Vec<UserSubmittedFact>> {
    let status_str = status.as_str();

    let raws = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&submission_select(
          "WHERE t.status = ?1 ORDER BY t.submitted_at DESC",
        ))?;
        let rows = stmt
          .query_map([status_str], raw_submission)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSubmission::into_submission).collect()
  }

  async fn approved_submissions(
    &self,
    year: i32,
    category_id: Option<Uuid>,
  ) -> Result<Vec<UserSubmittedFact>> {
    let cat_str = category_id.map(encode_uuid);
    let approved = ModerationStatus::Approved.as_str();

    let raws = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&submission_select(&format!(
          "WHERE t.year = ?1 AND t.status = ?3 AND {}
           ORDER BY t.reviewed_at DESC, t.submitted_at DESC",
          category_filter("submission_categories", "submission_id"),
        )))?;
        let rows = stmt
          .query_map(rusqlite::params![year, cat_str, approved], raw_submission)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSubmission::into_submission).collect()
  }

  async fn record_review(
    &self,
    id: Uuid,
    outcome: ReviewOutcome,
  ) -> Result<Option<UserSubmittedFact>> {
    let id_str = encode_uuid(id);
    let status = outcome.status.as_str();
    let reviewer = encode_uuid(outcome.review.reviewed_by);
    let reviewed_at = encode_dt(outcome.review.reviewed_at);
    let notes = outcome.notes;
    let under_review = ModerationStatus::UnderReview.as_str();

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE submissions
              SET status = ?2, reviewed_by = ?3, reviewed_at = ?4, review_notes = ?5
            WHERE submission_id = ?1 AND status = ?6",
          rusqlite::params![id_str, status, reviewer, reviewed_at, notes, under_review],
        )?)
      })
      .await?;

    if changed == 0 {
      return Ok(None);
    }
    self.get_submission(id).await?.ok_or(Error::RowVanished(id)).map(Some)
  }
}
