//! The [`Engine`] and the [`Stack`] that picks its backends.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use nostalgia_core::{
  category::Category,
  clock::{Clock, SystemClock},
  job::JobQueue,
  kv::KeyValueStore,
  store::FactStore,
};
use nostalgia_sources::{Encyclopedia, LibraryCatalog, Sources};

use crate::{Error, Result, settings::EngineSettings};

/// The set of backend types an [`Engine`] runs on.
///
/// The server uses SQLite for both stores and HTTP clients for the sources;
/// tests substitute in-memory and fake implementations.
pub trait Stack: Send + Sync + 'static {
  type Store: FactStore + JobQueue + 'static;
  type Kv: KeyValueStore + 'static;
  type Encyclopedia: Encyclopedia + 'static;
  type Catalog: LibraryCatalog + 'static;
}

pub struct Engine<X: Stack> {
  pub(crate) store:    X::Store,
  pub(crate) kv:       X::Kv,
  pub(crate) sources:  Sources<X::Encyclopedia, X::Catalog>,
  pub(crate) clock:    Arc<dyn Clock>,
  pub(crate) settings: EngineSettings,
}

impl<X: Stack> Engine<X> {
  pub fn new(
    store: X::Store,
    kv: X::Kv,
    sources: Sources<X::Encyclopedia, X::Catalog>,
    settings: EngineSettings,
  ) -> Self {
    Self { store, kv, sources, clock: Arc::new(SystemClock), settings }
  }

  /// Replace the wall clock, e.g. with a `ManualClock` in tests.
  pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
    self.clock = clock;
    self
  }

  pub fn store(&self) -> &X::Store { &self.store }

  pub fn settings(&self) -> &EngineSettings { &self.settings }

  pub(crate) fn now(&self) -> DateTime<Utc> { self.clock.now() }

  /// All categories ordered by name.
  pub async fn categories(&self) -> Result<Vec<Category>> {
    self.store.list_categories().await.map_err(Error::store)
  }

  pub async fn category(&self, slug: &str) -> Result<Category> {
    self
      .store
      .category_by_slug(slug)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::NotFound(format!("category {slug:?}")))
  }
}
