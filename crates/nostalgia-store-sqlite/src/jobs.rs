//! [`JobQueue`] over the `refresh_jobs` table.

use chrono::{DateTime, Duration, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use nostalgia_core::job::{JobQueue, JobStatus, RefreshJob, RefreshRequest};

use crate::{
  Error, Result,
  encode::{RawJob, encode_dt, encode_uuid},
  store::SqliteStore,
};

const JOB_COLUMNS: &str =
  "job_id, year, category, status, attempts, available_at, last_error, created_at";

fn raw_job(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawJob> {
  Ok(RawJob {
    job_id:       row.get(0)?,
    year:         row.get(1)?,
    category:     row.get(2)?,
    status:       row.get(3)?,
    attempts:     row.get(4)?,
    available_at: row.get(5)?,
    last_error:   row.get(6)?,
    created_at:   row.get(7)?,
  })
}

impl SqliteStore {
  async fn set_job_state(
    &self,
    job_id: Uuid,
    status: JobStatus,
    available_at: Option<DateTime<Utc>>,
    error: Option<String>,
  ) -> Result<()> {
    let id_str = encode_uuid(job_id);
    let status_str = status.as_str();
    let available_str = available_at.map(encode_dt);
    let now = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE refresh_jobs
              SET status       = ?2,
                  available_at = coalesce(?3, available_at),
                  last_error   = coalesce(?4, last_error),
                  updated_at   = ?5
            WHERE job_id = ?1",
          rusqlite::params![id_str, status_str, available_str, error, now],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

impl JobQueue for SqliteStore {
  type Error = Error;

  async fn enqueue_refresh(
    &self,
    request: RefreshRequest,
    now: DateTime<Utc>,
  ) -> Result<Option<RefreshJob>> {
    let job_id = Uuid::new_v4();
    let id_str = encode_uuid(job_id);
    let now_str = encode_dt(now);
    let pending = JobStatus::Pending.as_str();
    let running = JobStatus::Running.as_str();
    let year = request.year;
    let category = request.category.clone();

    let inserted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let duplicate = tx
          .query_row(
            "SELECT 1 FROM refresh_jobs
              WHERE year = ?1 AND category IS ?2 AND status IN (?3, ?4)",
            rusqlite::params![year, category, pending, running],
            |_| Ok(()),
          )
          .optional()?
          .is_some();
        if duplicate {
          return Ok(false);
        }
        tx.execute(
          "INSERT INTO refresh_jobs (
             job_id, year, category, status, attempts, available_at, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, 0, ?5, ?5, ?5)",
          rusqlite::params![id_str, year, category, pending, now_str],
        )?;
        tx.commit()?;
        Ok(true)
      })
      .await?;

    Ok(inserted.then(|| RefreshJob {
      job_id,
      request,
      status: JobStatus::Pending,
      attempts: 0,
      available_at: now,
      last_error: None,
      created_at: now,
    }))
  }

  async fn claim_due_jobs(
    &self,
    now: DateTime<Utc>,
    lease: Duration,
    limit: usize,
  ) -> Result<Vec<RefreshJob>> {
    let now_str = encode_dt(now);
    let lease_str = encode_dt(now + lease);
    let limit = limit as i64;
    let pending = JobStatus::Pending.as_str();
    let running = JobStatus::Running.as_str();

    let raws = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let ids = {
          let mut stmt = tx.prepare(
            "SELECT job_id FROM refresh_jobs
              WHERE status IN (?1, ?2) AND available_at <= ?3
              ORDER BY available_at, created_at
              LIMIT ?4",
          )?;
          stmt
            .query_map(rusqlite::params![pending, running, now_str, limit], |r| {
              r.get::<_, String>(0)
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };

        let mut claimed = Vec::with_capacity(ids.len());
        for id in ids {
          let raw = tx.query_row(
            &format!(
              "UPDATE refresh_jobs
                  SET status       = ?2,
                      attempts     = attempts + 1,
                      available_at = ?3,
                      updated_at   = ?4
                WHERE job_id = ?1
               RETURNING {JOB_COLUMNS}"
            ),
            rusqlite::params![id, running, lease_str, now_str],
            raw_job,
          )?;
          claimed.push(raw);
        }
        tx.commit()?;
        Ok(claimed)
      })
      .await?;

    raws.into_iter().map(RawJob::into_job).collect()
  }

  async fn complete_job(&self, job_id: Uuid) -> Result<()> {
    self.set_job_state(job_id, JobStatus::Done, None, None).await
  }

  async fn retry_job(&self, job_id: Uuid, retry_at: DateTime<Utc>, error: String) -> Result<()> {
    self
      .set_job_state(job_id, JobStatus::Pending, Some(retry_at), Some(error))
      .await
  }

  async fn abandon_job(&self, job_id: Uuid, error: String) -> Result<()> {
    self.set_job_state(job_id, JobStatus::Abandoned, None, Some(error)).await
  }

  async fn prune_finished_jobs(&self, before: DateTime<Utc>) -> Result<usize> {
    let before_str = encode_dt(before);
    let done = JobStatus::Done.as_str();
    let abandoned = JobStatus::Abandoned.as_str();

    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM refresh_jobs WHERE status IN (?1, ?2) AND created_at < ?3",
          rusqlite::params![done, abandoned, before_str],
        )?)
      })
      .await?;
    Ok(removed)
  }

  async fn jobs_with_status(&self, status: JobStatus) -> Result<Vec<RefreshJob>> {
    let status_str = status.as_str();

    let raws = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {JOB_COLUMNS} FROM refresh_jobs WHERE status = ?1 ORDER BY created_at"
        ))?;
        let rows = stmt
          .query_map([status_str], raw_job)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawJob::into_job).collect()
  }
}
