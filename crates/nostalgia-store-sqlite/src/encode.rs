//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings with a fixed microsecond
//! precision and a `Z` suffix, so lexical order equals chronological order
//! and SQL comparisons on them are sound. UUIDs are stored as hyphenated
//! lowercase strings. Linked categories are read back through a JSON
//! aggregate column.

use chrono::{DateTime, SecondsFormat, Utc};
use nostalgia_core::{
  book::Book,
  category::Category,
  event::SignificantEvent,
  fact::{ApiFact, InformationItem},
  job::{JobStatus, RefreshJob, RefreshRequest},
  submission::{ModerationStatus, NotificationContact, Review, UserSubmittedFact},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Categories ───────────────────────────────────────────────────────────────

/// SQL expression yielding a JSON array of the categories linked to one row.
///
/// `link` is the join table, `key` the owner column in it and `owner` the
/// qualified owner id in the outer query.
pub fn categories_json(link: &str, key: &str, owner: &str) -> String {
  format!(
    "(SELECT json_group_array(json_object(
         'category_id', c.category_id, 'name', c.name, 'slug', c.slug))
       FROM {link} l JOIN categories c ON c.category_id = l.category_id
      WHERE l.{key} = {owner})"
  )
}

pub fn decode_categories(s: &str) -> Result<Vec<Category>> {
  let mut categories: Vec<Category> = serde_json::from_str(s)?;
  categories.sort_by(|a, b| a.name.cmp(&b.name));
  Ok(categories)
}

// ─── Moderation ───────────────────────────────────────────────────────────────

pub fn decode_status(s: &str) -> Result<ModerationStatus> { Ok(s.parse()?) }

pub fn encode_notification(n: Option<&NotificationContact>) -> Result<Option<String>> {
  n.map(serde_json::to_string).transpose().map_err(Error::from)
}

pub fn decode_notification(s: Option<&str>) -> Result<Option<NotificationContact>> {
  s.map(serde_json::from_str).transpose().map_err(Error::from)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from an `information_items` row.
pub struct RawItem {
  pub item_id:               String,
  pub title:                 String,
  pub description:           String,
  pub year:                  i32,
  pub is_outdated:           bool,
  pub current_status:        String,
  pub change_description:    String,
  pub relevance_explanation: String,
  pub source_url:            Option<String>,
  pub submitted_by:          Option<String>,
  pub created_at:            String,
  pub updated_at:            String,
  pub categories:            String,
}

impl RawItem {
  pub fn into_item(self) -> Result<InformationItem> {
    Ok(InformationItem {
      item_id:               decode_uuid(&self.item_id)?,
      title:                 self.title,
      description:           self.description,
      year:                  self.year,
      categories:            decode_categories(&self.categories)?,
      is_outdated:           self.is_outdated,
      current_status:        self.current_status,
      change_description:    self.change_description,
      relevance_explanation: self.relevance_explanation,
      source_url:            self.source_url,
      submitted_by:          self.submitted_by.as_deref().map(decode_uuid).transpose()?,
      created_at:            decode_dt(&self.created_at)?,
      updated_at:            decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw strings read directly from a `significant_events` row.
pub struct RawEvent {
  pub event_id:    String,
  pub title:       String,
  pub description: String,
  pub year:        i32,
  pub impact:      String,
  pub source_url:  Option<String>,
  pub created_at:  String,
  pub updated_at:  String,
}

impl RawEvent {
  pub fn into_event(self) -> Result<SignificantEvent> {
    Ok(SignificantEvent {
      event_id:    decode_uuid(&self.event_id)?,
      title:       self.title,
      description: self.description,
      year:        self.year,
      impact:      self.impact,
      source_url:  self.source_url,
      created_at:  decode_dt(&self.created_at)?,
      updated_at:  decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw strings read directly from a `books` row.
pub struct RawBook {
  pub book_id:     String,
  pub title:       String,
  pub author:      String,
  pub description: String,
  pub year:        i32,
  pub relevance:   String,
  pub isbn:        Option<String>,
  pub cover_url:   Option<String>,
  pub source_url:  Option<String>,
  pub created_at:  String,
  pub updated_at:  String,
  pub categories:  String,
}

impl RawBook {
  pub fn into_book(self) -> Result<Book> {
    Ok(Book {
      book_id:     decode_uuid(&self.book_id)?,
      title:       self.title,
      author:      self.author,
      description: self.description,
      year:        self.year,
      categories:  decode_categories(&self.categories)?,
      relevance:   self.relevance,
      isbn:        self.isbn,
      cover_url:   self.cover_url,
      source_url:  self.source_url,
      created_at:  decode_dt(&self.created_at)?,
      updated_at:  decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw strings read directly from an `api_facts` row.
pub struct RawApiFact {
  pub fact_id:     String,
  pub year:        i32,
  pub title:       String,
  pub description: String,
  pub source_url:  String,
  pub created_at:  String,
  pub updated_at:  String,
  pub categories:  String,
}

impl RawApiFact {
  pub fn into_fact(self) -> Result<ApiFact> {
    Ok(ApiFact {
      fact_id:     decode_uuid(&self.fact_id)?,
      year:        self.year,
      title:       self.title,
      description: self.description,
      source_url:  self.source_url,
      categories:  decode_categories(&self.categories)?,
      created_at:  decode_dt(&self.created_at)?,
      updated_at:  decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw strings read directly from a `submissions` row.
pub struct RawSubmission {
  pub submission_id: String,
  pub user_id:       String,
  pub year:          i32,
  pub title:         String,
  pub description:   String,
  pub source_url:    String,
  pub status:        String,
  pub review_notes:  Option<String>,
  pub reviewed_by:   Option<String>,
  pub reviewed_at:   Option<String>,
  pub notification:  Option<String>,
  pub submitted_at:  String,
  pub categories:    String,
}

impl RawSubmission {
  pub fn into_submission(self) -> Result<UserSubmittedFact> {
    let review = match (self.reviewed_by, self.reviewed_at) {
      (Some(by), Some(at)) => Some(Review {
        reviewed_by: decode_uuid(&by)?,
        reviewed_at: decode_dt(&at)?,
      }),
      (None, None) => None,
      _ => {
        return Err(Error::InvalidColumn(format!(
          "submission {} has a reviewer without a review time or vice versa",
          self.submission_id
        )));
      }
    };

    Ok(UserSubmittedFact {
      submission_id: decode_uuid(&self.submission_id)?,
      user_id: decode_uuid(&self.user_id)?,
      year: self.year,
      title: self.title,
      description: self.description,
      categories: decode_categories(&self.categories)?,
      source_url: self.source_url,
      status: decode_status(&self.status)?,
      review_notes: self.review_notes,
      review,
      notification: decode_notification(self.notification.as_deref())?,
      submitted_at: decode_dt(&self.submitted_at)?,
    })
  }
}

/// Raw strings read directly from a `refresh_jobs` row.
pub struct RawJob {
  pub job_id:       String,
  pub year:         i32,
  pub category:     Option<String>,
  pub status:       String,
  pub attempts:     u32,
  pub available_at: String,
  pub last_error:   Option<String>,
  pub created_at:   String,
}

impl RawJob {
  pub fn into_job(self) -> Result<RefreshJob> {
    Ok(RefreshJob {
      job_id:       decode_uuid(&self.job_id)?,
      request:      RefreshRequest { year: self.year, category: self.category },
      status:       self.status.parse::<JobStatus>()?,
      attempts:     self.attempts,
      available_at: decode_dt(&self.available_at)?,
      last_error:   self.last_error,
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn timestamps_sort_lexically() {
    let a = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    let b = a + chrono::Duration::microseconds(1);
    let c = a + chrono::Duration::seconds(10);
    assert!(encode_dt(a) < encode_dt(b));
    assert!(encode_dt(b) < encode_dt(c));
    assert_eq!(decode_dt(&encode_dt(b)).unwrap(), b);
  }

  #[test]
  fn categories_decode_sorted() {
    let json = r#"[
      {"category_id":"7d5b5b0e-8f3b-4c3c-9a55-1f0e4a1f8c01","name":"Science","slug":"science"},
      {"category_id":"7d5b5b0e-8f3b-4c3c-9a55-1f0e4a1f8c02","name":"Music","slug":"music"}
    ]"#;
    let cats = decode_categories(json).unwrap();
    assert_eq!(cats[0].name, "Music");
    assert_eq!(cats[1].slug, "science");
  }
}
