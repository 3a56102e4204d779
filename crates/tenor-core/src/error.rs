//! Error types for `tenor-core`.

use thiserror::Error;

/// Run-level failures. Per-record problems never surface here; they are
/// counted in the stage reports instead.
#[derive(Debug, Error)]
pub enum Error {
  #[error("input contains no review records")]
  EmptyInput,

  #[error("input is structurally unreadable: {0}")]
  UnreadableInput(String),

  #[error("review {review_id} reached the classifier with empty text")]
  EmptyText { review_id: String },

  #[error("no sentiment strategy available: {0}")]
  ClassifierUnavailable(String),

  #[error("invalid configuration: {0}")]
  InvalidConfig(String),

  #[error("rating out of range: {0}")]
  RatingOutOfRange(i64),

  #[error("unknown sentiment label: {0:?}")]
  UnknownSentimentLabel(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
