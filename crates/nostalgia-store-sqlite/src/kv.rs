//! [`KeyValueStore`] over the `kv` table, so cache entries and rate-limit
//! counters survive restarts and are shared between the web and worker
//! processes.

use chrono::{Duration, Utc};
use rusqlite::OptionalExtension as _;

use nostalgia_core::kv::KeyValueStore;

use crate::{Error, Result, encode::encode_dt, store::SqliteStore};

impl KeyValueStore for SqliteStore {
  type Error = Error;

  async fn get(&self, key: &str) -> Result<Option<String>> {
    let key = key.to_owned();
    let now = encode_dt(Utc::now());

    let value = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT value FROM kv WHERE key = ?1 AND expires_at > ?2",
              rusqlite::params![key, now],
              |r| r.get::<_, String>(0),
            )
            .optional()?,
        )
      })
      .await?;
    Ok(value)
  }

  async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
    let key = key.to_owned();
    let expires_at = encode_dt(Utc::now() + ttl);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO kv (key, value, expires_at) VALUES (?1, ?2, ?3)
           ON CONFLICT (key) DO UPDATE SET
             value = excluded.value, expires_at = excluded.expires_at",
          rusqlite::params![key, value, expires_at],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn increment(&self, key: &str, ttl: Duration) -> Result<i64> {
    let key = key.to_owned();
    let now = Utc::now();
    let now_str = encode_dt(now);
    let expires_at = encode_dt(now + ttl);

    // An expired counter restarts at 1 with a fresh window; a live one keeps
    // its original expiry.
    let count = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "INSERT INTO kv (key, value, expires_at) VALUES (?1, '1', ?3)
           ON CONFLICT (key) DO UPDATE SET
             value = CASE WHEN kv.expires_at > ?2
                          THEN CAST(CAST(kv.value AS INTEGER) + 1 AS TEXT)
                          ELSE '1' END,
             expires_at = CASE WHEN kv.expires_at > ?2
                               THEN kv.expires_at
                               ELSE excluded.expires_at END
           RETURNING CAST(value AS INTEGER)",
          rusqlite::params![key, now_str, expires_at],
          |r| r.get::<_, i64>(0),
        )?)
      })
      .await?;
    Ok(count)
  }

  async fn decrement(&self, key: &str) -> Result<()> {
    let key = key.to_owned();
    let now = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE kv
              SET value = CAST(max(CAST(value AS INTEGER) - 1, 0) AS TEXT)
            WHERE key = ?1 AND expires_at > ?2",
          rusqlite::params![key, now],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn purge_expired(&self) -> Result<usize> {
    let now = encode_dt(Utc::now());

    let removed = self
      .conn
      .call(move |conn| Ok(conn.execute("DELETE FROM kv WHERE expires_at <= ?1", [now])?))
      .await?;
    Ok(removed)
  }

  async fn delete(&self, key: &str) -> Result<()> {
    let key = key.to_owned();

    self
      .conn
      .call(move |conn| {
        conn.execute("DELETE FROM kv WHERE key = ?1", [key])?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
