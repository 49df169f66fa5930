//! The staleness cache.
//!
//! Record lists are cached as JSON in the [`KeyValueStore`] with a fixed
//! expiry. A list shorter than its threshold is stale no matter how fresh it
//! is: the caller gets a synchronous top-up bounded to the shortfall, and the
//! returned [`Lookup`] is flagged `thin` so a background refresh can be
//! queued as well.

use std::future::Future;

use chrono::Duration;
use nostalgia_core::kv::KeyValueStore;
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

use crate::{Engine, Result, Stack};

/// Scope part of a cache key: a category slug, or `all`.
pub fn scope(category: Option<&str>) -> &str { category.unwrap_or("all") }

pub fn facts_key(year: i32, category: Option<&str>) -> String {
  format!("facts:{year}:{}", scope(category))
}

pub fn events_key(year: i32) -> String { format!("events:{year}") }

pub fn books_key(year: i32, category: Option<&str>) -> String {
  format!("books:{year}:{}", scope(category))
}

pub fn view_key(year: i32, category: Option<&str>, page: usize) -> String {
  format!("view:{year}:{}:{page}", scope(category))
}

/// The outcome of [`Engine::get_or_refresh`].
#[derive(Debug, Clone)]
pub struct Lookup<T> {
  pub records:    Vec<T>,
  /// The stored set was below its threshold when looked up.
  pub thin:       bool,
  pub from_cache: bool,
}

impl<X: Stack> Engine<X> {
  /// Read a JSON value from the key-value store. Backend failures and
  /// undecodable values are logged and reported as a miss.
  pub(crate) async fn cache_get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
    let raw = match self.kv.get(key).await {
      Ok(raw) => raw?,
      Err(e) => {
        warn!(error = %e, key, "cache read failed");
        return None;
      }
    };
    match serde_json::from_str(&raw) {
      Ok(value) => Some(value),
      Err(e) => {
        warn!(error = %e, key, "discarding undecodable cache entry");
        None
      }
    }
  }

  /// Write a JSON value with a fixed expiry. Failures are logged only.
  pub(crate) async fn cache_put<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
    let encoded = match serde_json::to_string(value) {
      Ok(encoded) => encoded,
      Err(e) => {
        warn!(error = %e, key, "could not encode cache entry");
        return;
      }
    };
    if let Err(e) = self.kv.set(key, encoded, ttl).await {
      warn!(error = %e, key, "cache write failed");
    }
  }

  /// Serve `key` from cache when it holds at least `min_count` records.
  ///
  /// Otherwise reload through `load`; if that is still short, call `top_up`
  /// with the shortfall, reload, and flag the result as thin. The fresh list
  /// is cached with the record TTL either way.
  pub async fn get_or_refresh<T, L, LF, U, UF>(
    &self,
    key: &str,
    min_count: usize,
    load: L,
    top_up: U,
  ) -> Result<Lookup<T>>
  where
    T: Serialize + DeserializeOwned,
    L: Fn() -> LF,
    LF: Future<Output = Result<Vec<T>>>,
    U: FnOnce(usize) -> UF,
    UF: Future<Output = Result<()>>,
  {
    if let Some(records) = self.cache_get::<Vec<T>>(key).await {
      if records.len() >= min_count {
        debug!(key, count = records.len(), "cache hit");
        return Ok(Lookup { records, thin: false, from_cache: true });
      }
      debug!(key, count = records.len(), min_count, "cached set is thin");
    }

    let mut records = load().await?;
    let thin = records.len() < min_count;
    if thin {
      top_up(min_count - records.len()).await?;
      records = load().await?;
    }

    self.cache_put(key, &records, self.settings.record_ttl).await;
    Ok(Lookup { records, thin, from_cache: false })
  }
}

#[cfg(test)]
mod tests {
  use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
  };

  use super::*;
  use crate::testing::{FakeCatalog, FakeEncyclopedia, harness};

  #[test]
  fn keys() {
    assert_eq!(facts_key(1999, None), "facts:1999:all");
    assert_eq!(books_key(1999, Some("science")), "books:1999:science");
    assert_eq!(events_key(2001), "events:2001");
    assert_eq!(view_key(2001, Some("music"), 3), "view:2001:music:3");
  }

  #[tokio::test]
  async fn full_sets_are_cached_and_thin_sets_topped_up() {
    let h = harness(FakeEncyclopedia::default(), FakeCatalog::default()).await;
    let loads = Arc::new(AtomicUsize::new(0));
    let topped = Arc::new(AtomicUsize::new(0));

    let load = || {
      let n = loads.fetch_add(1, Ordering::SeqCst);
      async move { Ok::<_, crate::Error>(if n == 0 { vec![1] } else { vec![1, 2, 3] }) }
    };
    let top_up = |shortfall: usize| {
      topped.store(shortfall, Ordering::SeqCst);
      async { Ok::<_, crate::Error>(()) }
    };

    let first: Lookup<i32> = h.engine.get_or_refresh("k", 3, load, top_up).await.unwrap();
    assert!(first.thin);
    assert!(!first.from_cache);
    assert_eq!(first.records, [1, 2, 3]);
    assert_eq!(topped.load(Ordering::SeqCst), 2);
    topped.store(0, Ordering::SeqCst);

    let second: Lookup<i32> = h.engine.get_or_refresh("k", 3, load, top_up).await.unwrap();
    assert!(second.from_cache);
    assert!(!second.thin);
    assert_eq!(loads.load(Ordering::SeqCst), 2);
    assert_eq!(topped.load(Ordering::SeqCst), 0);
  }

  #[tokio::test]
  async fn entries_expire_after_ttl() {
    let h = harness(FakeEncyclopedia::default(), FakeCatalog::default()).await;
    let load = || async { Ok::<_, crate::Error>(vec!["x".to_owned()]) };
    let top_up = |_| async { Ok::<_, crate::Error>(()) };

    h.engine.get_or_refresh("k", 1, load, top_up).await.unwrap();
    h.clock.advance(Duration::hours(23));
    let hit = h.engine.get_or_refresh("k", 1, load, top_up).await.unwrap();
    assert!(hit.from_cache);

    h.clock.advance(Duration::hours(2));
    let miss = h.engine.get_or_refresh("k", 1, load, top_up).await.unwrap();
    assert!(!miss.from_cache);
  }

  #[tokio::test]
  async fn undecodable_entries_are_misses() {
    let h = harness(FakeEncyclopedia::default(), FakeCatalog::default()).await;
    h.kv().set("k", "not json".into(), Duration::hours(1)).await.unwrap();

    let lookup: Lookup<String> = h
      .engine
      .get_or_refresh(
        "k",
        0,
        || async { Ok::<_, crate::Error>(Vec::new()) },
        |_| async { Ok::<_, crate::Error>(()) },
      )
      .await
      .unwrap();
    assert!(!lookup.from_cache);
  }
}
