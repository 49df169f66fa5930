//! The shared key-value store behind the staleness cache and the submission
//! rate limiter.
//!
//! Every entry carries a fixed expiry set at write time. Reads never extend
//! it. `increment` only sets the expiry when it creates the key, which gives
//! counters a fixed window starting at the first increment.

use std::{
  collections::HashMap,
  convert::Infallible,
  future::Future,
  sync::{Arc, Mutex},
};

use chrono::{DateTime, Duration, Utc};

use crate::clock::{Clock, SystemClock};

/// Abstraction over a shared cache store with per-key expiry.
pub trait KeyValueStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Return the live value for `key`, or `None` if absent or expired.
  fn get<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send + 'a;

  /// Store `value` under `key`, replacing any previous value and expiry.
  fn set<'a>(
    &'a self,
    key: &'a str,
    value: String,
    ttl: Duration,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Atomically add one to the integer at `key` and return the new value.
  /// A missing or expired key starts at zero and receives `ttl`.
  fn increment<'a>(
    &'a self,
    key: &'a str,
    ttl: Duration,
  ) -> impl Future<Output = Result<i64, Self::Error>> + Send + 'a;

  /// Atomically take one back from a live counter, never going below zero.
  /// The expiry is left untouched; a missing or expired key is a no-op.
  fn decrement<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  fn delete<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Drop every expired entry. Returns how many were removed.
  fn purge_expired(&self) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;
}

// ─── In-memory implementation ────────────────────────────────────────────────

struct Entry {
  value:      String,
  expires_at: DateTime<Utc>,
}

/// A process-local [`KeyValueStore`] driven by an injectable [`Clock`].
pub struct MemoryKv {
  entries: Mutex<HashMap<String, Entry>>,
  clock:   Arc<dyn Clock>,
}

impl Default for MemoryKv {
  fn default() -> Self { Self::new() }
}

impl MemoryKv {
  pub fn new() -> Self { Self::with_clock(Arc::new(SystemClock)) }

  pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
    Self { entries: Mutex::new(HashMap::new()), clock }
  }

  fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, Entry>> {
    self.entries.lock().unwrap_or_else(|p| p.into_inner())
  }
}

impl KeyValueStore for MemoryKv {
  type Error = Infallible;

  async fn get(&self, key: &str) -> Result<Option<String>, Infallible> {
    let now = self.clock.now();
    let mut entries = self.entries();
    let live = entries
      .get(key)
      .filter(|e| e.expires_at > now)
      .map(|e| e.value.clone());
    if live.is_none() {
      entries.remove(key);
    }
    Ok(live)
  }

  async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), Infallible> {
    let expires_at = self.clock.now() + ttl;
    self.entries().insert(key.to_owned(), Entry { value, expires_at });
    Ok(())
  }

  async fn increment(&self, key: &str, ttl: Duration) -> Result<i64, Infallible> {
    let now = self.clock.now();
    let mut entries = self.entries();
    let entry = entries
      .entry(key.to_owned())
      .and_modify(|e| {
        if e.expires_at <= now {
          e.value = "0".into();
          e.expires_at = now + ttl;
        }
      })
      .or_insert_with(|| Entry { value: "0".into(), expires_at: now + ttl });

    let next = entry.value.parse::<i64>().unwrap_or(0) + 1;
    entry.value = next.to_string();
    Ok(next)
  }

  async fn decrement(&self, key: &str) -> Result<(), Infallible> {
    let now = self.clock.now();
    if let Some(entry) = self.entries().get_mut(key).filter(|e| e.expires_at > now) {
      let next = (entry.value.parse::<i64>().unwrap_or(0) - 1).max(0);
      entry.value = next.to_string();
    }
    Ok(())
  }

  async fn delete(&self, key: &str) -> Result<(), Infallible> {
    self.entries().remove(key);
    Ok(())
  }

  async fn purge_expired(&self) -> Result<usize, Infallible> {
    let now = self.clock.now();
    let mut entries = self.entries();
    let before = entries.len();
    entries.retain(|_, e| e.expires_at > now);
    Ok(before - entries.len())
  }
}
