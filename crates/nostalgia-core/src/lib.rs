//! Core types and trait definitions for the Nostalgia fact service.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod book;
pub mod category;
pub mod clock;
pub mod error;
pub mod event;
pub mod fact;
pub mod job;
pub mod kv;
pub mod store;
pub mod submission;
pub mod user;
pub mod year;

pub use error::{Error, Result, ValidationErrors};
