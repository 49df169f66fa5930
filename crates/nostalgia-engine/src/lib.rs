//! The Nostalgia service layer.
//!
//! [`Engine`] ties a relational store, a key-value store and the external
//! sources together. It owns every behavior that sits between the HTTP
//! surface and storage: the enrichment pipeline, the staleness cache, the
//! background refresh queue, moderation and the paginated combined view.
//!
//! The concrete backends are chosen once through a [`Stack`]; tests plug in
//! an in-memory SQLite store, [`MemoryKv`](nostalgia_core::kv::MemoryKv) and
//! fake sources.

pub mod cache;
pub mod engine;
pub mod error;
pub mod moderation;
pub mod pipeline;
pub mod results;
pub mod scheduler;
pub mod settings;
pub mod view;

pub use engine::{Engine, Stack};
pub use error::{Error, Result};
pub use moderation::Dashboard;
pub use pipeline::EnrichmentReport;
pub use results::{ResultsPage, ResultsQuery};
pub use scheduler::{JobOutcome, RetryPolicy};
pub use settings::{EngineSettings, Thresholds};
pub use view::{FactCard, FactEntry, Page};

#[cfg(test)]
mod testing;
