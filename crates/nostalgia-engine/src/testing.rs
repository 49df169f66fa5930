//! Shared fixtures for the engine's unit tests.

use std::{
  collections::HashMap,
  sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
  },
};

use chrono::{TimeZone, Utc};
use nostalgia_core::{
  category::{Category, NewCategory},
  clock::ManualClock,
  kv::MemoryKv,
  store::FactStore,
  user::{Actor, Role},
};
use nostalgia_sources::{
  BannedAuthors, CatalogWork, Encyclopedia, EncyclopediaPage, LibraryCatalog, SourceError,
  Sources,
};
use nostalgia_store_sqlite::SqliteStore;
use uuid::Uuid;

use crate::{Engine, EngineSettings, Stack};

pub struct TestStack;

impl Stack for TestStack {
  type Store = SqliteStore;
  type Kv = MemoryKv;
  type Encyclopedia = FakeEncyclopedia;
  type Catalog = FakeCatalog;
}

/// Canned search results and pages. Unknown pages are "not found".
#[derive(Default)]
pub struct FakeEncyclopedia {
  searches: HashMap<String, Vec<String>>,
  pages:    HashMap<String, String>,
  down:     bool,
  calls:    Arc<AtomicUsize>,
}

impl FakeEncyclopedia {
  pub fn with_search(mut self, query: &str, titles: &[&str]) -> Self {
    self
      .searches
      .insert(query.to_owned(), titles.iter().map(|t| (*t).to_owned()).collect());
    self
  }

  pub fn with_page(mut self, title: &str, summary: &str) -> Self {
    self.pages.insert(title.to_owned(), summary.to_owned());
    self
  }

  /// Every call fails as if the service were down.
  pub fn failing(mut self) -> Self {
    self.down = true;
    self
  }
}

fn outage() -> SourceError { SourceError::Status { status: 503, url: "fake".to_owned() } }

impl Encyclopedia for FakeEncyclopedia {
  async fn search(&self, query: &str, limit: usize) -> Result<Vec<String>, SourceError> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    if self.down {
      return Err(outage());
    }
    Ok(
      self
        .searches
        .get(query)
        .map(|t| t.iter().take(limit).cloned().collect())
        .unwrap_or_default(),
    )
  }

  async fn page(&self, title: &str) -> Result<EncyclopediaPage, SourceError> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    if self.down {
      return Err(outage());
    }
    let summary = self
      .pages
      .get(title)
      .ok_or_else(|| SourceError::NotFound(title.to_owned()))?;
    Ok(EncyclopediaPage {
      title:   title.to_owned(),
      summary: summary.clone(),
      url:     format!("https://en.wikipedia.org/wiki/{}", title.replace(' ', "_")),
    })
  }
}

/// Works keyed by `(year, lowercased subject)`.
#[derive(Default)]
pub struct FakeCatalog {
  works: HashMap<(i32, String), Vec<CatalogWork>>,
  down:  bool,
  calls: Arc<AtomicUsize>,
}

impl FakeCatalog {
  pub fn with_work(
    mut self,
    year: i32,
    subject: &str,
    title: &str,
    authors: &[&str],
    subjects: &[&str],
  ) -> Self {
    self.works.entry((year, subject.to_lowercase())).or_default().push(CatalogWork {
      title:    title.to_owned(),
      authors:  authors.iter().map(|a| (*a).to_owned()).collect(),
      subjects: subjects.iter().map(|s| (*s).to_owned()).collect(),
      cover_id: None,
    });
    self
  }

  pub fn failing(mut self) -> Self {
    self.down = true;
    self
  }
}

impl LibraryCatalog for FakeCatalog {
  async fn works(
    &self,
    year: i32,
    subject: &str,
    limit: usize,
  ) -> Result<Vec<CatalogWork>, SourceError> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    if self.down {
      return Err(outage());
    }
    Ok(
      self
        .works
        .get(&(year, subject.to_lowercase()))
        .map(|w| w.iter().take(limit).cloned().collect())
        .unwrap_or_default(),
    )
  }
}

pub struct Harness {
  pub engine: Engine<TestStack>,
  pub clock:  Arc<ManualClock>,
  calls:      Arc<AtomicUsize>,
}

impl Harness {
  /// Total calls made to either source so far.
  pub fn source_calls(&self) -> usize { self.calls.load(Ordering::SeqCst) }

  pub fn kv(&self) -> &MemoryKv { &self.engine.kv }
}

pub async fn harness(mut wiki: FakeEncyclopedia, mut catalog: FakeCatalog) -> Harness {
  let calls = Arc::new(AtomicUsize::new(0));
  wiki.calls = calls.clone();
  catalog.calls = calls.clone();

  let clock = Arc::new(ManualClock::new(
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
  ));
  let store = SqliteStore::open_in_memory().await.expect("in-memory store");
  let kv = MemoryKv::with_clock(clock.clone());
  let sources = Sources::new(wiki, catalog, BannedAuthors::default());

  let engine =
    Engine::new(store, kv, sources, EngineSettings::default()).with_clock(clock.clone());
  Harness { engine, clock, calls }
}

pub async fn seed_categories(engine: &Engine<TestStack>, names: &[&str]) -> Vec<Category> {
  let mut out = Vec::new();
  for name in names {
    out.push(engine.store().add_category(NewCategory::named(*name)).await.unwrap());
  }
  out
}

pub fn member() -> Actor {
  Actor { user_id: Uuid::new_v4(), username: "grad".into(), role: Role::Member }
}

pub fn admin() -> Actor {
  Actor { user_id: Uuid::new_v4(), username: "mod".into(), role: Role::Administrator }
}
