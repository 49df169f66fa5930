//! Background refresh: queueing, running and retrying enrichment jobs.
//!
//! Requests never wait on a refresh. They enqueue a job and move on; the
//! worker loop claims due jobs, runs [`Engine::refresh`] and either completes
//! the job, returns it to the queue after a backoff, or abandons it once the
//! retry policy is exhausted.
//!
//! A claim is a lease. If a worker dies before recording an outcome, the job
//! becomes claimable again once the lease runs out, and the lost run counts
//! as an attempt.

use std::{future::Future, sync::Arc};

use chrono::Duration;
use nostalgia_core::{
  job::{JobQueue, RefreshJob, RefreshRequest},
  kv::KeyValueStore,
};
use tracing::{debug, error, info, warn};

use crate::{Engine, Error, Result, Stack};

/// Jobs claimed per poll.
const CLAIM_BATCH: usize = 4;

/// How often a failing job is retried and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
  /// Total runs allowed, including the first.
  pub max_attempts: u32,
  pub backoff:      Duration,
}

impl Default for RetryPolicy {
  fn default() -> Self { Self { max_attempts: 3, backoff: Duration::seconds(60) } }
}

impl RetryPolicy {
  /// The delay before the next run after `attempts` runs have failed, or
  /// `None` when no attempts remain.
  pub fn next_delay(&self, attempts: u32) -> Option<Duration> {
    (attempts < self.max_attempts).then_some(self.backoff)
  }
}

/// What happened to one claimed job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
  Done,
  Retrying,
  Abandoned,
}

impl<X: Stack> Engine<X> {
  /// Queue a refresh unless an identical one is already pending or running.
  pub async fn schedule_refresh(&self, request: RefreshRequest) -> Result<Option<RefreshJob>> {
    let job = self
      .store
      .enqueue_refresh(request.clone(), self.now())
      .await
      .map_err(Error::store)?;
    match &job {
      Some(job) => info!(job_id = %job.job_id, year = request.year, category = ?request.category, "refresh queued"),
      None => debug!(year = request.year, category = ?request.category, "refresh already queued"),
    }
    Ok(job)
  }

  /// Claim and run every job that is due now, in batches.
  pub async fn run_due_jobs(&self) -> Result<Vec<JobOutcome>> {
    let mut outcomes = Vec::new();
    loop {
      let jobs = self
        .store
        .claim_due_jobs(self.now(), self.settings.job_lease, CLAIM_BATCH)
        .await
        .map_err(Error::store)?;
      if jobs.is_empty() {
        return Ok(outcomes);
      }
      for job in jobs {
        let job_id = job.job_id;
        match self.run_job(job).await {
          Ok(outcome) => outcomes.push(outcome),
          // The job stays leased and is picked up again once the lease ends.
          Err(e) => error!(
            %job_id,
            error = %e,
            operation = "run_job",
            "failed to record refresh job outcome"
          ),
        }
      }
    }
  }

  async fn run_job(&self, job: RefreshJob) -> Result<JobOutcome> {
    let year = job.request.year;
    let category = job.request.category.as_deref();

    // Reclaimed after its final attempt's lease ran out.
    if job.attempts > self.settings.retry.max_attempts {
      error!(
        job_id = %job.job_id,
        year,
        category,
        attempts = job.attempts,
        operation = "refresh",
        "refresh job abandoned after lease expiry"
      );
      self
        .store
        .abandon_job(job.job_id, "lease expired on final attempt".to_owned())
        .await
        .map_err(Error::store)?;
      return Ok(JobOutcome::Abandoned);
    }

    let err = match self.refresh(&job.request).await {
      Ok(report) => {
        self.store.complete_job(job.job_id).await.map_err(Error::store)?;
        info!(
          job_id = %job.job_id,
          year,
          category,
          upserted = report.upserted,
          "refresh job done"
        );
        return Ok(JobOutcome::Done);
      }
      Err(e) => e,
    };

    match self.settings.retry.next_delay(job.attempts) {
      Some(delay) => {
        warn!(
          job_id = %job.job_id,
          year,
          category,
          attempt = job.attempts,
          error = %err,
          "refresh job failed; will retry"
        );
        self
          .store
          .retry_job(job.job_id, self.now() + delay, err.to_string())
          .await
          .map_err(Error::store)?;
        Ok(JobOutcome::Retrying)
      }
      None => {
        error!(
          job_id = %job.job_id,
          year,
          category,
          attempts = job.attempts,
          error = %err,
          operation = "refresh",
          "refresh job abandoned"
        );
        self
          .store
          .abandon_job(job.job_id, err.to_string())
          .await
          .map_err(Error::store)?;
        Ok(JobOutcome::Abandoned)
      }
    }
  }

  /// Hourly housekeeping: books without descriptions, expired key-value
  /// entries and finished jobs past their retention. Failures are logged.
  async fn sweep(&self) {
    if let Err(e) = self.cleanup_books().await {
      warn!(error = %e, "book cleanup sweep failed");
    }
    match self.kv.purge_expired().await {
      Ok(purged) => debug!(purged, "expired cache entries purged"),
      Err(e) => warn!(error = %e, "cache purge failed"),
    }
    let cutoff = self.now() - self.settings.job_retention;
    match self.store.prune_finished_jobs(cutoff).await {
      Ok(pruned) => debug!(pruned, "finished refresh jobs pruned"),
      Err(e) => warn!(error = %e, "job pruning failed"),
    }
  }

  /// Poll the job queue until `shutdown` resolves, sweeping once per cleanup
  /// interval.
  pub async fn run_worker(self: Arc<Self>, shutdown: impl Future<Output = ()>) {
    let poll = self.settings.poll_interval;
    let sweep_every = (self.settings.cleanup_interval.as_millis()
      / poll.as_millis().max(1))
    .max(1) as u64;

    let mut interval = tokio::time::interval(poll);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut loop_count: u64 = 0;
    tokio::pin!(shutdown);

    info!(?poll, "refresh worker started");
    loop {
      tokio::select! {
        () = &mut shutdown => break,
        _ = interval.tick() => {}
      }

      if loop_count.is_multiple_of(sweep_every) {
        self.sweep().await;
      }
      loop_count = loop_count.wrapping_add(1);

      if let Err(e) = self.run_due_jobs().await {
        error!(error = %e, operation = "run_due_jobs", "refresh worker poll failed");
      }
    }
    info!("refresh worker stopped");
  }
}
