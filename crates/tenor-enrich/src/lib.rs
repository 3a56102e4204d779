//! The tenor enrichment pipeline.
//!
//! Raw collector records go in one end; classified, themed and summarised
//! reviews come out the other and land in a [`tenor_core::store::ReviewStore`].
//! Each stage lives in its own module and can be driven on its own; the
//! [`pipeline`] module wires them together.

pub mod aggregate;
pub mod error;
pub mod keywords;
pub mod normalize;
pub mod pipeline;
pub mod sentiment;
pub mod text;
pub mod themes;

pub use error::{Error, Result};
pub use pipeline::{Pipeline, RunReport};

#[cfg(test)]
mod testing;
