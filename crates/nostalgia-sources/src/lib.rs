//! External knowledge sources for the Nostalgia fact service.
//!
//! Two narrow traits describe what the enrichment pipeline needs from the
//! outside world: an [`Encyclopedia`] (search plus page summaries) and a
//! [`LibraryCatalog`] (works published in a year for a subject). Concrete
//! HTTP clients talk to MediaWiki and Open Library. [`Sources`] sits on top
//! and turns raw lookups into normalized [`SourceRecord`]s. Failures are
//! logged rather than propagated; a [`Lookup`] only reports whether the
//! source was unavailable.

#![allow(async_fn_in_trait)]

pub mod adapter;
pub mod banned;
pub mod catalog;
pub mod encyclopedia;
pub mod error;
pub mod text;

mod http;

pub use adapter::{Lookup, SourceRecord, Sources};
pub use banned::BannedAuthors;
pub use catalog::{CatalogWork, LibraryCatalog, OpenLibraryClient};
pub use encyclopedia::{Encyclopedia, EncyclopediaPage, WikipediaClient};
pub use error::{Result, SourceError};
pub use http::DEFAULT_USER_AGENT;
