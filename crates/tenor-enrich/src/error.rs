//! Error type for `tenor-enrich`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Core(#[from] tenor_core::Error),

  /// The primary model answered, but not in a usable way.
  #[error("model error: {0}")]
  Model(String),

  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  /// A blocking worker running CPU-bound stage work panicked or was cancelled.
  #[error("worker task failed: {0}")]
  Worker(#[from] tokio::task::JoinError),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub(crate) fn store(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Error::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
