//! SQLite backend for the Nostalgia fact service.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. One [`SqliteStore`] implements the
//! relational store, the shared key-value store and the refresh job queue, so
//! the web process and a separate worker process can share a single file.

mod encode;
mod jobs;
mod kv;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
