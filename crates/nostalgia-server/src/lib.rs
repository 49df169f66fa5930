//! The Nostalgia HTTP server: configuration, authentication and wiring of
//! the production backends.

pub mod auth;
pub mod settings;

use std::sync::Arc;

use axum::{Router, middleware};
use nostalgia_engine::{Engine, Stack};
use nostalgia_sources::{BannedAuthors, OpenLibraryClient, Sources, WikipediaClient};
use nostalgia_store_sqlite::SqliteStore;
use tower_http::trace::TraceLayer;

use auth::Accounts;
pub use settings::{Account, ServerConfig, expand_tilde};

/// SQLite for both stores, live HTTP clients for the sources.
pub struct SqliteStack;

impl Stack for SqliteStack {
  type Store = SqliteStore;
  type Kv = SqliteStore;
  type Encyclopedia = WikipediaClient;
  type Catalog = OpenLibraryClient;
}

/// Build the production engine around an opened `store`.
pub fn build_engine(
  store: SqliteStore,
  config: &ServerConfig,
) -> Result<Engine<SqliteStack>, nostalgia_sources::SourceError> {
  let sources = Sources::new(
    WikipediaClient::new(&config.encyclopedia_url, &config.user_agent)?,
    OpenLibraryClient::new(&config.catalog_url, &config.user_agent)?,
    BannedAuthors::with_extra(&config.banned_authors),
  );
  Ok(Engine::new(store.clone(), store, sources, config.engine_settings()))
}

/// The full application: API routes under `/api`, behind Basic auth and
/// request tracing.
pub fn app<X: Stack>(engine: Arc<Engine<X>>, accounts: Accounts) -> Router {
  Router::new()
    .nest("/api", nostalgia_api::api_router(engine))
    .layer(middleware::from_fn_with_state(Arc::new(accounts), auth::authenticate))
    .layer(TraceLayer::new_for_http())
}
