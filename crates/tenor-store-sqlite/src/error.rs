//! Error type for `tenor-store-sqlite`.

use thiserror::Error;

/// Infrastructure failures. Rows that merely violate a constraint are not
/// errors; they come back as rejections in the write outcome.
#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] tenor_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  /// A stored value could not be read back into its domain type.
  #[error("decode error: {0}")]
  Decode(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
