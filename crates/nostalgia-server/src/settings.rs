//! Server configuration, deserialised from `config.toml` and `NOSTALGIA_*`
//! environment variables.

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use nostalgia_core::user::Role;
use nostalgia_engine::{EngineSettings, Thresholds};
use nostalgia_sources::DEFAULT_USER_AGENT;
use serde::Deserialize;
use uuid::Uuid;

/// A login accepted by the Basic-auth layer.
#[derive(Debug, Deserialize, Clone)]
pub struct Account {
  pub username:      String,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash: String,
  pub user_id:       Uuid,
  #[serde(default)]
  pub role:          Role,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  pub host:             String,
  pub port:             u16,
  pub store_path:       PathBuf,
  #[serde(default = "default_encyclopedia_url")]
  pub encyclopedia_url: String,
  #[serde(default = "default_catalog_url")]
  pub catalog_url:      String,
  #[serde(default = "default_user_agent")]
  pub user_agent:       String,
  #[serde(default)]
  pub banned_authors:   Vec<String>,
  #[serde(default = "default_true")]
  pub run_worker:       bool,
  #[serde(default = "default_poll_secs")]
  pub worker_poll_secs: u64,
  #[serde(default = "default_min_facts")]
  pub min_facts:        usize,
  #[serde(default = "default_min_events")]
  pub min_events:       usize,
  #[serde(default = "default_min_books")]
  pub min_books:        usize,
  #[serde(default = "default_backfill_limit")]
  pub backfill_limit:   usize,
  #[serde(default)]
  pub accounts:         Vec<Account>,
}

fn default_encyclopedia_url() -> String { "https://en.wikipedia.org".into() }
fn default_catalog_url() -> String { "https://openlibrary.org".into() }
fn default_user_agent() -> String { DEFAULT_USER_AGENT.into() }
fn default_true() -> bool { true }
fn default_poll_secs() -> u64 { 5 }
fn default_min_facts() -> usize { Thresholds::default().min_facts }
fn default_min_events() -> usize { Thresholds::default().min_events }
fn default_min_books() -> usize { Thresholds::default().min_books }
fn default_backfill_limit() -> usize { EngineSettings::default().backfill_limit }

impl ServerConfig {
  /// Engine tunables, with everything not configurable left at its default.
  pub fn engine_settings(&self) -> EngineSettings {
    EngineSettings {
      thresholds: Thresholds {
        min_facts:  self.min_facts,
        min_events: self.min_events,
        min_books:  self.min_books,
      },
      backfill_limit: self.backfill_limit,
      poll_interval: Duration::from_secs(self.worker_poll_secs.max(1)),
      ..EngineSettings::default()
    }
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
