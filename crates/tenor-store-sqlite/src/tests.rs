//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::NaiveDate;
use tenor_core::{
  assignment::{KeywordAssignment, ThemeAssignment},
  partition::Partition,
  review::{ClassifiedReview, Rating, Review, Sentiment, SentimentLabel},
  store::{Entity, ReviewStore},
  summary::{SentimentSummary, ThemeInsight, ThemeSummary},
};

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

async fn store_with(partitions: &[&str]) -> SqliteStore {
  let s = store().await;
  let partitions: Vec<Partition> = partitions.iter().map(|n| Partition::named(*n)).collect();
  s.upsert_partitions(&partitions).await.unwrap();
  s
}

fn review(partition: &str, id: &str, rating: u8, label: SentimentLabel) -> ClassifiedReview {
  ClassifiedReview {
    review:    Review {
      review_id:  id.into(),
      partition:  partition.into(),
      content:    format!("review {id}"),
      rating:     Rating::new(rating.into()).unwrap(),
      date:       NaiveDate::from_ymd_opt(2024, 5, 17).unwrap(),
      engagement: Some(3),
      author:     None,
      source:     "google_play".into(),
    },
    sentiment: Sentiment { label, score: 0.8, source: "lexicon".into() },
  }
}

fn theme(partition: &str, id: &str, theme: &str) -> ThemeAssignment {
  ThemeAssignment { partition: partition.into(), review_id: id.into(), theme: theme.into() }
}

fn sentiment_summary(partition: &str, rating: u8, count: u32) -> SentimentSummary {
  SentimentSummary {
    partition:      partition.into(),
    rating:         Rating::new(rating.into()).unwrap(),
    review_count:   count,
    positive_count: count,
    neutral_count:  0,
    negative_count: 0,
    positive_pct:   100.0,
    neutral_pct:    0.0,
    negative_pct:   0.0,
    mean_score:     0.8,
  }
}

fn theme_summary(partition: &str, theme: &str) -> ThemeSummary {
  ThemeSummary {
    partition:          partition.into(),
    theme:              theme.into(),
    review_count:       2,
    mean_rating:        1.5,
    positive_pct:       0.0,
    neutral_pct:        0.0,
    negative_pct:       100.0,
    exemplar_review_id: "r1".into(),
    exemplar:           "review r1".into(),
    insight:            ThemeInsight::InsufficientData,
  }
}

// ─── Partitions ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn partitions_upsert_by_name() {
  let s = store().await;
  let mut dashen = Partition::named("Dashen Bank");
  dashen.code = Some("dashen".into());

  s.upsert_partitions(&[dashen.clone(), Partition::named("CBE")]).await.unwrap();
  // Re-upserting without metadata keeps what was there.
  let outcome = s.upsert_partitions(&[Partition::named("Dashen Bank")]).await.unwrap();
  assert_eq!(outcome.written, 1);

  let all = s.list_partitions().await.unwrap();
  assert_eq!(all.len(), 2);
  assert_eq!(all[0].name, "CBE");
  assert_eq!(all[1], dashen);
}

#[tokio::test]
async fn empty_partition_name_is_rejected() {
  let s = store().await;
  let outcome = s.upsert_partitions(&[Partition::named(""), Partition::named("X")]).await.unwrap();
  assert_eq!(outcome.written, 1);
  assert_eq!(outcome.rejected.len(), 1);
  assert_eq!(outcome.rejected[0].entity, Entity::Partition);
}

// ─── Reviews ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn reviews_round_trip() {
  let s = store_with(&["X"]).await;
  let r = review("X", "r1", 4, SentimentLabel::Positive);
  s.upsert_reviews(&[r.clone()]).await.unwrap();

  let back = s.list_reviews("X").await.unwrap();
  assert_eq!(back, vec![r]);
}

#[tokio::test]
async fn review_upsert_is_idempotent_and_overwrites_enrichment() {
  let s = store_with(&["X"]).await;
  let r = review("X", "r1", 2, SentimentLabel::Neutral);
  s.upsert_reviews(&[r.clone()]).await.unwrap();
  s.upsert_reviews(&[r.clone()]).await.unwrap();
  assert_eq!(s.list_reviews("X").await.unwrap().len(), 1);

  let mut relabelled = r;
  relabelled.sentiment =
    Sentiment { label: SentimentLabel::Negative, score: 0.1, source: "model:m".into() };
  s.upsert_reviews(&[relabelled.clone()]).await.unwrap();
  assert_eq!(s.list_reviews("X").await.unwrap(), vec![relabelled]);
}

#[tokio::test]
async fn same_review_id_in_two_partitions_is_two_reviews() {
  let s = store_with(&["X", "Y"]).await;
  s.upsert_reviews(&[
    review("X", "r1", 5, SentimentLabel::Positive),
    review("Y", "r1", 1, SentimentLabel::Negative),
  ])
  .await
  .unwrap();
  assert_eq!(s.list_reviews("X").await.unwrap().len(), 1);
  assert_eq!(s.list_reviews("Y").await.unwrap().len(), 1);
}

#[tokio::test]
async fn reviews_for_unknown_partition_are_rejected_not_fatal() {
  let s = store_with(&["X"]).await;
  let outcome = s
    .upsert_reviews(&[
      review("X", "r1", 5, SentimentLabel::Positive),
      review("Nowhere", "r2", 5, SentimentLabel::Positive),
    ])
    .await
    .unwrap();
  assert_eq!(outcome.written, 1);
  assert_eq!(outcome.rejected.len(), 1);
  assert_eq!(outcome.rejected[0].key, "Nowhere/r2");
}

#[tokio::test]
async fn out_of_range_score_is_rejected() {
  let s = store_with(&["X"]).await;
  let mut bad = review("X", "r1", 3, SentimentLabel::Neutral);
  bad.sentiment.score = 1.5;
  let outcome = s.upsert_reviews(&[bad]).await.unwrap();
  assert_eq!(outcome.written, 0);
  assert_eq!(outcome.rejected.len(), 1);
}

// ─── Assignments ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn theme_assignments_replace_per_review() {
  let s = store_with(&["X"]).await;
  s.upsert_reviews(&[
    review("X", "r1", 1, SentimentLabel::Negative),
    review("X", "r2", 1, SentimentLabel::Negative),
  ])
  .await
  .unwrap();

  s.replace_theme_assignments(&[
    theme("X", "r1", "Access & Login"),
    theme("X", "r1", "Performance & Reliability"),
    theme("X", "r2", "General Feedback"),
  ])
  .await
  .unwrap();
  // r1 re-tagged: its old set goes, r2 is untouched.
  s.replace_theme_assignments(&[theme("X", "r1", "Transactions & Payments")])
    .await
    .unwrap();

  let themes = s.theme_assignments("X").await.unwrap();
  assert_eq!(themes, vec![
    theme("X", "r1", "Transactions & Payments"),
    theme("X", "r2", "General Feedback"),
  ]);
}

#[tokio::test]
async fn duplicate_assignments_collapse() {
  let s = store_with(&["X"]).await;
  s.upsert_reviews(&[review("X", "r1", 1, SentimentLabel::Negative)]).await.unwrap();
  let outcome = s
    .replace_theme_assignments(&[
      theme("X", "r1", "Access & Login"),
      theme("X", "r1", "Access & Login"),
    ])
    .await
    .unwrap();
  assert_eq!(outcome.written, 1);
  assert!(outcome.rejected.is_empty());
  assert_eq!(s.theme_assignments("X").await.unwrap().len(), 1);
}

#[tokio::test]
async fn assignments_to_missing_reviews_are_rejected() {
  let s = store_with(&["X"]).await;
  let outcome = s.replace_theme_assignments(&[theme("X", "ghost", "General Feedback")]).await.unwrap();
  assert_eq!(outcome.written, 0);
  assert_eq!(outcome.rejected.len(), 1);
  assert_eq!(outcome.rejected[0].entity, Entity::ThemeAssignment);
}

#[tokio::test]
async fn keyword_assignments_round_trip() {
  let s = store_with(&["X"]).await;
  s.upsert_reviews(&[review("X", "r1", 1, SentimentLabel::Negative)]).await.unwrap();
  let kw = |k: &str| KeywordAssignment {
    partition: "X".into(),
    review_id: "r1".into(),
    keyword:   k.into(),
  };
  s.replace_keyword_assignments(&[], &[kw("transfer"), kw("transfer fail")]).await.unwrap();
  assert_eq!(s.keyword_assignments("X").await.unwrap(), vec![
    kw("transfer"),
    kw("transfer fail")
  ]);
}

#[tokio::test]
async fn keyword_replace_clears_reviews_left_without_keywords() {
  let s = store_with(&["X"]).await;
  let reviews = vec![
    review("X", "r1", 1, SentimentLabel::Negative),
    review("X", "r2", 1, SentimentLabel::Negative),
  ];
  s.upsert_reviews(&reviews).await.unwrap();
  let kw = |id: &str, k: &str| KeywordAssignment {
    partition: "X".into(),
    review_id: id.into(),
    keyword:   k.into(),
  };

  s.replace_keyword_assignments(&reviews, &[kw("r1", "error"), kw("r2", "error")])
    .await
    .unwrap();
  s.replace_keyword_assignments(&reviews, &[kw("r2", "payment")]).await.unwrap();

  assert_eq!(s.keyword_assignments("X").await.unwrap(), vec![kw("r2", "payment")]);
}

#[tokio::test]
async fn load_corpus_reads_everything() {
  let s = store_with(&["X", "Y"]).await;
  s.upsert_reviews(&[
    review("Y", "r1", 5, SentimentLabel::Positive),
    review("X", "r2", 1, SentimentLabel::Negative),
  ])
  .await
  .unwrap();
  s.replace_theme_assignments(&[theme("X", "r2", "Access & Login")]).await.unwrap();

  let corpus = s.load_corpus().await.unwrap();
  assert_eq!(corpus.reviews.len(), 2);
  assert_eq!(corpus.reviews[0].review.partition, "X");
  assert_eq!(corpus.themes, vec![theme("X", "r2", "Access & Login")]);
}

// ─── Summaries ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn summaries_are_overwritten_per_partition() {
  let s = store_with(&["X", "Y"]).await;
  s.replace_sentiment_summaries(&[
    sentiment_summary("X", 1, 4),
    sentiment_summary("X", 5, 2),
    sentiment_summary("Y", 3, 1),
  ])
  .await
  .unwrap();

  // X recomputed with a single rating; Y keeps its row.
  s.replace_sentiment_summaries(&[sentiment_summary("X", 5, 7)]).await.unwrap();

  let all = s.sentiment_summaries(None).await.unwrap();
  assert_eq!(all, vec![sentiment_summary("X", 5, 7), sentiment_summary("Y", 3, 1)]);
  assert_eq!(s.sentiment_summaries(Some("Y")).await.unwrap().len(), 1);
}

#[tokio::test]
async fn theme_summaries_round_trip() {
  let s = store_with(&["X"]).await;
  let summary = theme_summary("X", "Performance & Reliability");
  s.replace_theme_summaries(&[summary.clone()]).await.unwrap();
  s.replace_theme_summaries(&[summary.clone()]).await.unwrap();
  assert_eq!(s.theme_summaries(Some("X")).await.unwrap(), vec![summary]);
}

#[tokio::test]
async fn summaries_for_unknown_partition_are_rejected() {
  let s = store_with(&["X"]).await;
  let outcome = s.replace_theme_summaries(&[theme_summary("Nowhere", "General Feedback")]).await.unwrap();
  assert_eq!(outcome.rejected.len(), 1);
  assert!(s.theme_summaries(None).await.unwrap().is_empty());
}

// ─── Cascade ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn deleting_a_partition_cascades() {
  let s = store_with(&["X", "Y"]).await;
  s.upsert_reviews(&[
    review("X", "r1", 1, SentimentLabel::Negative),
    review("Y", "r1", 5, SentimentLabel::Positive),
  ])
  .await
  .unwrap();
  s.replace_theme_assignments(&[theme("X", "r1", "Access & Login")]).await.unwrap();
  s.replace_sentiment_summaries(&[sentiment_summary("X", 1, 1)]).await.unwrap();

  assert!(s.delete_partition("X").await.unwrap());
  assert!(!s.delete_partition("X").await.unwrap());

  assert!(s.list_reviews("X").await.unwrap().is_empty());
  assert!(s.theme_assignments("X").await.unwrap().is_empty());
  assert!(s.sentiment_summaries(Some("X")).await.unwrap().is_empty());
  assert_eq!(s.list_reviews("Y").await.unwrap().len(), 1);
}

#[tokio::test]
async fn file_backed_store_persists_across_opens() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("tenor.db");
  {
    let s = SqliteStore::open(&path).await.unwrap();
    s.upsert_partitions(&[Partition::named("X")]).await.unwrap();
    s.upsert_reviews(&[review("X", "r1", 4, SentimentLabel::Positive)]).await.unwrap();
  }
  let s = SqliteStore::open(&path).await.unwrap();
  assert_eq!(s.list_reviews("X").await.unwrap().len(), 1);
}
