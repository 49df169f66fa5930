//! Durable background-refresh jobs.
//!
//! A job asks the enrichment pipeline to backfill one graduation year
//! (optionally narrowed to a category). Jobs are safe to run more than once
//! because every pipeline write is an upsert on a natural key.

use std::{future::Future, str::FromStr};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Error;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RefreshRequest {
  pub year:     i32,
  /// Category slug, or `None` for every category.
  pub category: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
  Pending,
  Running,
  Done,
  /// Retries exhausted; kept for inspection, never picked up again.
  Abandoned,
}

impl JobStatus {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Pending => "pending",
      Self::Running => "running",
      Self::Done => "done",
      Self::Abandoned => "abandoned",
    }
  }
}

impl FromStr for JobStatus {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Error> {
    match s {
      "pending" => Ok(Self::Pending),
      "running" => Ok(Self::Running),
      "done" => Ok(Self::Done),
      "abandoned" => Ok(Self::Abandoned),
      other => Err(Error::UnknownStatus(other.to_owned())),
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshJob {
  pub job_id:       Uuid,
  pub request:      RefreshRequest,
  pub status:       JobStatus,
  /// Number of times the job has been claimed, including the current run.
  pub attempts:     u32,
  /// Earliest time the job may be claimed. While running, this is the end
  /// of the worker's lease.
  pub available_at: DateTime<Utc>,
  pub last_error:   Option<String>,
  pub created_at:   DateTime<Utc>,
}

/// Durable queue consumed by the refresh worker.
pub trait JobQueue: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Queue a refresh. Returns `None` without writing anything if an
  /// identical request is already pending or running.
  fn enqueue_refresh(
    &self,
    request: RefreshRequest,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<RefreshJob>, Self::Error>> + Send + '_;

  /// Move up to `limit` due jobs to `running`, incrementing their attempt
  /// count, and return them. A job is due when it is pending and its
  /// `available_at` has passed, or when it is running and its lease has
  /// expired. Claimed jobs are leased until `now + lease`.
  fn claim_due_jobs(
    &self,
    now: DateTime<Utc>,
    lease: Duration,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<RefreshJob>, Self::Error>> + Send + '_;

  fn complete_job(
    &self,
    job_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Return a failed job to `pending`, not claimable before `retry_at`.
  fn retry_job(
    &self,
    job_id: Uuid,
    retry_at: DateTime<Utc>,
    error: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn abandon_job(
    &self,
    job_id: Uuid,
    error: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Delete done and abandoned jobs created before `before`. Returns the
  /// number of rows removed.
  fn prune_finished_jobs(
    &self,
    before: DateTime<Utc>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  fn jobs_with_status(
    &self,
    status: JobStatus,
  ) -> impl Future<Output = Result<Vec<RefreshJob>, Self::Error>> + Send + '_;
}
