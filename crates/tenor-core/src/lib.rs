//! Core types and trait definitions for the tenor review pipeline.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod assignment;
pub mod config;
pub mod error;
pub mod partition;
pub mod review;
pub mod store;
pub mod summary;

pub use error::{Error, Result};
