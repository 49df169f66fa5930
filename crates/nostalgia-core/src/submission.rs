//! User-submitted facts and the moderation state machine.
//!
//! ```text
//!   under_review ──approve──▶ approved
//!        │
//!        └─────deny───────▶ denied
//!
//!   undetermined   (no transitions; legacy rows only)
//! ```
//!
//! Reviewer identity and review time travel together as a single [`Review`],
//! so a row can never carry one without the other.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::{
  Error, Result, ValidationErrors, category::Category, year::validate_year,
};

/// Longest accepted submission title.
pub const MAX_TITLE_LEN: usize = 200;

// ─── Status ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerationStatus {
  UnderReview,
  Approved,
  Denied,
  /// Reachable only through direct data edits. Kept distinct from `Denied`
  /// and excluded from both public output and the review actions.
  Undetermined,
}

impl ModerationStatus {
  pub const ALL: [Self; 4] =
    [Self::UnderReview, Self::Approved, Self::Denied, Self::Undetermined];

  pub fn as_str(self) -> &'static str {
    match self {
      Self::UnderReview => "under_review",
      Self::Approved => "approved",
      Self::Denied => "denied",
      Self::Undetermined => "undetermined",
    }
  }

  /// Only approved submissions reach the public combined view.
  pub fn is_public(self) -> bool { matches!(self, Self::Approved) }

  /// Compute the status that results from applying `decision`.
  ///
  /// Fails without side effects for anything not currently under review.
  pub fn apply(self, submission_id: Uuid, decision: ReviewDecision) -> Result<Self> {
    match self {
      Self::UnderReview => Ok(decision.target()),
      Self::Approved | Self::Denied => Err(Error::AlreadyReviewed(submission_id)),
      Self::Undetermined => Err(Error::NotReviewable(submission_id)),
    }
  }
}

impl FromStr for ModerationStatus {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    Self::ALL
      .into_iter()
      .find(|st| st.as_str() == s)
      .ok_or_else(|| Error::UnknownStatus(s.to_owned()))
  }
}

/// An administrator's verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewDecision {
  Approve,
  Deny,
}

impl ReviewDecision {
  pub fn target(self) -> ModerationStatus {
    match self {
      Self::Approve => ModerationStatus::Approved,
      Self::Deny => ModerationStatus::Denied,
    }
  }
}

/// Who reviewed a submission and when. Always set as a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
  pub reviewed_by: Uuid,
  pub reviewed_at: DateTime<Utc>,
}

/// Everything a moderation action writes, applied in one statement by
/// [`crate::store::FactStore::record_review`].
#[derive(Debug, Clone)]
pub struct ReviewOutcome {
  pub status: ModerationStatus,
  pub review: Review,
  pub notes:  Option<String>,
}

// ─── Notifications ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationChannel {
  Email,
  Phone,
}

/// Where to send the moderation outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "channel", content = "contact", rename_all = "lowercase")]
pub enum NotificationContact {
  Email(String),
  Phone(String),
}

impl NotificationContact {
  pub fn channel(&self) -> NotificationChannel {
    match self {
      Self::Email(_) => NotificationChannel::Email,
      Self::Phone(_) => NotificationChannel::Phone,
    }
  }
}

/// Raw notification fields as submitted.
///
/// `want_notification` gates everything else: when it is set a preference is
/// required, and the contact for the preferred channel must be present and
/// well-formed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationRequest {
  #[serde(default)]
  pub want_notification: bool,
  pub preference:        Option<NotificationChannel>,
  pub email:             Option<String>,
  pub phone:             Option<String>,
}

impl NotificationRequest {
  pub fn opted_out() -> Self { Self::default() }

  pub fn email(address: impl Into<String>) -> Self {
    Self {
      want_notification: true,
      preference:        Some(NotificationChannel::Email),
      email:             Some(address.into()),
      phone:             None,
    }
  }

  pub fn phone(number: impl Into<String>) -> Self {
    Self {
      want_notification: true,
      preference:        Some(NotificationChannel::Phone),
      email:             None,
      phone:             Some(number.into()),
    }
  }

  /// Older form layout with a preference field and no opt-in gate. A present
  /// preference implies the user wants to be notified.
  #[deprecated(note = "use the opt-in form with `want_notification` set explicitly")]
  pub fn from_preference(
    preference: Option<NotificationChannel>,
    email: Option<String>,
    phone: Option<String>,
  ) -> Self {
    Self { want_notification: true, preference, email, phone }
  }

  fn resolve(&self, errors: &mut ValidationErrors) -> Option<NotificationContact> {
    if !self.want_notification {
      return None;
    }

    let email = non_blank(self.email.as_deref());
    let phone = non_blank(self.phone.as_deref());

    match self.preference {
      None => {
        errors.add("notification_preference", "choose email or phone to be notified");
        None
      }
      Some(NotificationChannel::Email) => match email {
        None => {
          errors.add("notification_email", "an email address is required for email notifications");
          None
        }
        Some(e) if !is_valid_email(e) => {
          errors.add("notification_email", "enter a valid email address");
          None
        }
        Some(e) => Some(NotificationContact::Email(e.to_owned())),
      },
      Some(NotificationChannel::Phone) => match phone {
        None => {
          errors.add("notification_phone", "a phone number is required for phone notifications");
          None
        }
        Some(p) if !is_valid_phone(p) => {
          errors.add("notification_phone", "enter a valid phone number");
          None
        }
        Some(p) => Some(NotificationContact::Phone(p.to_owned())),
      },
    }
  }
}

// ─── Submission input ────────────────────────────────────────────────────────

/// The fact submission form, before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionForm {
  pub year:         i32,
  pub title:        String,
  pub description:  String,
  /// Category slugs; every slug must name an existing category.
  pub categories:   Vec<String>,
  pub source_url:   String,
  #[serde(flatten)]
  pub notification: NotificationRequest,
}

impl SubmissionForm {
  /// Validate every field against the known categories and the current date,
  /// returning the insertable record or all violations at once.
  pub fn validate(
    self,
    user_id: Uuid,
    known: &[Category],
    now: DateTime<Utc>,
  ) -> Result<NewSubmission> {
    let mut errors = ValidationErrors::new();

    if let Err(e) = validate_year(self.year, now) {
      errors.add("year", e.to_string());
    }

    let title = self.title.trim();
    if title.is_empty() {
      errors.add("title", "a title is required");
    } else if title.chars().count() > MAX_TITLE_LEN {
      errors.add("title", format!("titles are limited to {MAX_TITLE_LEN} characters"));
    }

    let description = self.description.trim();
    if description.is_empty() {
      errors.add("description", "a description is required");
    }

    let mut category_ids = Vec::new();
    if self.categories.is_empty() {
      errors.add("categories", "select at least one category");
    }
    for slug in &self.categories {
      match known.iter().find(|c| c.slug == *slug) {
        Some(c) if !category_ids.contains(&c.category_id) => category_ids.push(c.category_id),
        Some(_) => {}
        None => errors.add("categories", format!("unknown category {slug:?}")),
      }
    }

    let source_url = self.source_url.trim();
    if !is_http_url(source_url) {
      errors.add("source_url", "enter a valid http(s) URL");
    }

    let notification = self.notification.resolve(&mut errors);

    errors.into_result()?;

    Ok(NewSubmission {
      user_id,
      year: self.year,
      title: title.to_owned(),
      description: description.to_owned(),
      category_ids,
      source_url: source_url.to_owned(),
      notification,
    })
  }
}

/// A validated submission, ready for [`crate::store::FactStore::insert_submission`].
/// The store always assigns `under_review`.
#[derive(Debug, Clone)]
pub struct NewSubmission {
  pub user_id:      Uuid,
  pub year:         i32,
  pub title:        String,
  pub description:  String,
  pub category_ids: Vec<Uuid>,
  pub source_url:   String,
  pub notification: Option<NotificationContact>,
}

// ─── Stored submission ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSubmittedFact {
  pub submission_id: Uuid,
  pub user_id:       Uuid,
  pub year:          i32,
  pub title:         String,
  pub description:   String,
  pub categories:    Vec<Category>,
  pub source_url:    String,
  pub status:        ModerationStatus,
  pub review_notes:  Option<String>,
  pub review:        Option<Review>,
  pub notification:  Option<NotificationContact>,
  pub submitted_at:  DateTime<Utc>,
}

// ─── Field checks ────────────────────────────────────────────────────────────

fn non_blank(s: Option<&str>) -> Option<&str> {
  s.map(str::trim).filter(|s| !s.is_empty())
}

fn is_http_url(s: &str) -> bool {
  Url::parse(s)
    .is_ok_and(|url| matches!(url.scheme(), "http" | "https") && url.host().is_some())
}

fn is_valid_email(s: &str) -> bool {
  if s.chars().any(char::is_whitespace) {
    return false;
  }
  let Some((local, domain)) = s.split_once('@') else {
    return false;
  };
  !local.is_empty()
    && !domain.contains('@')
    && domain.contains('.')
    && domain.split('.').all(|label| !label.is_empty())
}

fn is_valid_phone(s: &str) -> bool {
  if !s
    .chars()
    .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | '(' | ')' | ' '))
  {
    return false;
  }
  let digits = s.chars().filter(char::is_ascii_digit).count();
  (7..=15).contains(&digits)
}
