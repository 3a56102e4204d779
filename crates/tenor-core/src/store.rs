//! The `ReviewStore` trait and its write-report types.
//!
//! The trait is implemented by storage backends (e.g. `tenor-store-sqlite`).
//! The pipeline depends on this abstraction, not on any concrete backend.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::{
  assignment::{KeywordAssignment, ThemeAssignment},
  partition::Partition,
  review::ClassifiedReview,
  summary::{SentimentSummary, ThemeSummary},
};

// ─── Write reports ───────────────────────────────────────────────────────────

/// The six persisted entity kinds.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Entity {
  Partition,
  Review,
  ThemeAssignment,
  KeywordAssignment,
  SentimentSummary,
  ThemeSummary,
}

/// A row the store refused because it violated a constraint. The rest of the
/// batch is still written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowRejection {
  pub entity: Entity,
  /// Human-readable identity of the row, e.g. `Dashen Bank/abc123`.
  pub key:    String,
  pub reason: String,
}

/// Outcome of one batched write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteOutcome {
  pub entity:   Entity,
  pub written:  usize,
  pub rejected: Vec<RowRejection>,
}

impl WriteOutcome {
  pub fn new(entity: Entity) -> Self { Self { entity, written: 0, rejected: Vec::new() } }
}

/// The source-of-truth sets, as read back from a store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Corpus {
  pub reviews: Vec<ClassifiedReview>,
  pub themes:  Vec<ThemeAssignment>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a relational review store.
///
/// Every write is an idempotent upsert: replaying the same input leaves the
/// store unchanged. Rows violating a constraint are reported in the returned
/// [`WriteOutcome`] and skipped; only infrastructure failures are errors.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes.
pub trait ReviewStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Partitions ────────────────────────────────────────────────────────

  /// Insert partitions by name, refreshing metadata of existing ones.
  fn upsert_partitions<'a>(
    &'a self,
    partitions: &'a [Partition],
  ) -> impl Future<Output = Result<WriteOutcome, Self::Error>> + Send + 'a;

  fn list_partitions(
    &self,
  ) -> impl Future<Output = Result<Vec<Partition>, Self::Error>> + Send + '_;

  /// Remove a partition and, by cascade, everything that references it.
  /// Returns `false` if no such partition existed.
  fn delete_partition<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  // ── Reviews and assignments ───────────────────────────────────────────

  /// Insert reviews keyed by `(partition, review_id)`; enrichment fields of
  /// existing reviews are overwritten. Reviews whose partition does not exist
  /// are rejected.
  fn upsert_reviews<'a>(
    &'a self,
    reviews: &'a [ClassifiedReview],
  ) -> impl Future<Output = Result<WriteOutcome, Self::Error>> + Send + 'a;

  /// Replace the theme set of every review mentioned in `assignments`.
  fn replace_theme_assignments<'a>(
    &'a self,
    assignments: &'a [ThemeAssignment],
  ) -> impl Future<Output = Result<WriteOutcome, Self::Error>> + Send + 'a;

  /// Replace the keyword set of every review in `reviews` (and of any other
  /// review mentioned in `assignments`). A review with no assignments ends up
  /// with no keywords, since a rerun can push its terms out of the top
  /// vocabulary.
  fn replace_keyword_assignments<'a>(
    &'a self,
    reviews: &'a [ClassifiedReview],
    assignments: &'a [KeywordAssignment],
  ) -> impl Future<Output = Result<WriteOutcome, Self::Error>> + Send + 'a;

  /// All reviews of one partition, ordered by review id.
  fn list_reviews<'a>(
    &'a self,
    partition: &'a str,
  ) -> impl Future<Output = Result<Vec<ClassifiedReview>, Self::Error>> + Send + 'a;

  /// Theme assignments of one partition, ordered by review id then theme.
  fn theme_assignments<'a>(
    &'a self,
    partition: &'a str,
  ) -> impl Future<Output = Result<Vec<ThemeAssignment>, Self::Error>> + Send + 'a;

  /// Keyword assignments of one partition, ordered by review id then keyword.
  fn keyword_assignments<'a>(
    &'a self,
    partition: &'a str,
  ) -> impl Future<Output = Result<Vec<KeywordAssignment>, Self::Error>> + Send + 'a;

  /// Every review and theme assignment in the store.
  fn load_corpus(
    &self,
  ) -> impl Future<Output = Result<Corpus, Self::Error>> + Send + '_;

  // ── Summaries ─────────────────────────────────────────────────────────

  /// Overwrite the sentiment summaries of every partition present in
  /// `summaries`.
  fn replace_sentiment_summaries<'a>(
    &'a self,
    summaries: &'a [SentimentSummary],
  ) -> impl Future<Output = Result<WriteOutcome, Self::Error>> + Send + 'a;

  /// Overwrite the theme summaries of every partition present in `summaries`.
  fn replace_theme_summaries<'a>(
    &'a self,
    summaries: &'a [ThemeSummary],
  ) -> impl Future<Output = Result<WriteOutcome, Self::Error>> + Send + 'a;

  /// Sentiment summaries ordered by partition then rating; all partitions when
  /// `partition` is `None`.
  fn sentiment_summaries<'a>(
    &'a self,
    partition: Option<&'a str>,
  ) -> impl Future<Output = Result<Vec<SentimentSummary>, Self::Error>> + Send + 'a;

  /// Theme summaries ordered by partition then theme.
  fn theme_summaries<'a>(
    &'a self,
    partition: Option<&'a str>,
  ) -> impl Future<Output = Result<Vec<ThemeSummary>, Self::Error>> + Send + 'a;
}
