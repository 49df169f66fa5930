//! Submitting facts and reviewing them.

use nostalgia_core::{
  kv::KeyValueStore,
  store::FactStore,
  submission::{
    ModerationStatus, Review, ReviewDecision, ReviewOutcome, SubmissionForm, UserSubmittedFact,
  },
  user::Actor,
};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{Engine, Error, Result, Stack};

/// Key of the per-user submission counter.
pub fn submission_counter_key(user_id: Uuid) -> String { format!("submissions:{user_id}") }

/// Submissions in one moderation state.
#[derive(Debug, Clone, Serialize)]
pub struct StatusSection {
  pub status:      ModerationStatus,
  pub count:       usize,
  pub submissions: Vec<UserSubmittedFact>,
}

/// Every submission, partitioned by status in [`ModerationStatus::ALL`] order.
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
  pub sections: Vec<StatusSection>,
}

impl Dashboard {
  pub fn section(&self, status: ModerationStatus) -> Option<&StatusSection> {
    self.sections.iter().find(|s| s.status == status)
  }
}

impl<X: Stack> Engine<X> {
  /// Store a new submission for `actor`, subject to the hourly limit.
  ///
  /// A slot is reserved with the store's atomic increment before the form is
  /// validated, so concurrent submissions cannot overshoot the limit. The
  /// slot is handed back when the form is invalid or the insert fails.
  pub async fn submit(&self, actor: &Actor, form: SubmissionForm) -> Result<UserSubmittedFact> {
    let key = submission_counter_key(actor.user_id);
    let limit = self.settings.submission_limit;

    let count = self
      .kv
      .increment(&key, self.settings.submission_window)
      .await
      .map_err(Error::store)?;
    if count > i64::from(limit) {
      self.release_slot(&key).await;
      warn!(user_id = %actor.user_id, limit, "submission rate limit reached");
      return Err(nostalgia_core::Error::RateLimited { limit }.into());
    }

    let stored = match self.store_submission(actor, form).await {
      Ok(stored) => stored,
      Err(e) => {
        self.release_slot(&key).await;
        return Err(e);
      }
    };

    info!(
      submission_id = %stored.submission_id,
      user_id = %actor.user_id,
      year = stored.year,
      count,
      "submission received"
    );
    Ok(stored)
  }

  async fn store_submission(&self, actor: &Actor, form: SubmissionForm) -> Result<UserSubmittedFact> {
    let categories = self.categories().await?;
    let input = form.validate(actor.user_id, &categories, self.now())?;
    self.store.insert_submission(input).await.map_err(Error::store)
  }

  /// Hand back a reserved submission slot. A failure here only costs the
  /// user one slot until the window closes.
  async fn release_slot(&self, key: &str) {
    if let Err(e) = self.kv.decrement(key).await {
      warn!(error = %e, key, "failed to release submission slot");
    }
  }

  /// Approve or deny a submission that is still under review.
  pub async fn review(
    &self,
    actor: &Actor,
    submission_id: Uuid,
    decision: ReviewDecision,
    notes: Option<String>,
  ) -> Result<UserSubmittedFact> {
    if !actor.is_admin() {
      return Err(Error::Forbidden);
    }

    let current = self
      .store
      .get_submission(submission_id)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::NotFound(format!("submission {submission_id}")))?;
    let status = current.status.apply(submission_id, decision)?;

    let outcome = ReviewOutcome {
      status,
      review: Review { reviewed_by: actor.user_id, reviewed_at: self.now() },
      notes: notes.map(|n| n.trim().to_owned()).filter(|n| !n.is_empty()),
    };
    let reviewed = self
      .store
      .record_review(submission_id, outcome)
      .await
      .map_err(Error::store)?
      // Another reviewer got there between the read and the write.
      .ok_or(nostalgia_core::Error::AlreadyReviewed(submission_id))?;

    info!(
      %submission_id,
      reviewer = %actor.user_id,
      status = reviewed.status.as_str(),
      "submission reviewed"
    );
    Ok(reviewed)
  }

  /// A single submission, visible to its author and to administrators.
  pub async fn submission_for(&self, actor: &Actor, submission_id: Uuid) -> Result<UserSubmittedFact> {
    let submission = self
      .store
      .get_submission(submission_id)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::NotFound(format!("submission {submission_id}")))?;
    if submission.user_id != actor.user_id && !actor.is_admin() {
      return Err(Error::Forbidden);
    }
    Ok(submission)
  }

  pub async fn dashboard(&self, actor: &Actor) -> Result<Dashboard> {
    if !actor.is_admin() {
      return Err(Error::Forbidden);
    }
    let mut sections = Vec::with_capacity(ModerationStatus::ALL.len());
    for status in ModerationStatus::ALL {
      let submissions =
        self.store.submissions_with_status(status).await.map_err(Error::store)?;
      sections.push(StatusSection { status, count: submissions.len(), submissions });
    }
    Ok(Dashboard { sections })
  }
}
