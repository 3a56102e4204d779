//! Sentiment classification.
//!
//! A [`Classifier`] drives one [`SentimentStrategy`] over the canonical
//! reviews in fixed-size batches. The strategy is chosen once per run by
//! [`Strategy::select`]: the primary polarity model when it answers its probe,
//! otherwise the lexicon scorer (if fallback is allowed).
//!
//! Batches only bound throughput. Every strategy scores texts independently,
//! so the batch size never changes a label.

mod lexicon;
mod model;
mod remote;

use std::{collections::BTreeMap, future::Future, time::Duration};

use futures::{StreamExt, stream};
use serde::{Deserialize, Serialize};
use tenor_core::{
  config::SentimentConfig,
  review::{ClassifiedReview, Review, Sentiment, SentimentLabel},
};
use tracing::{debug, info, warn};

pub use lexicon::LexiconStrategy;
pub use model::{ModelStrategy, Polarity, PolarityModel};
pub use remote::RemoteModel;

use crate::Result;

// ─── Strategy ────────────────────────────────────────────────────────────────

/// Something that turns review texts into sentiments.
pub trait SentimentStrategy: Send + Sync {
  /// Tag written into every [`Sentiment::source`] this strategy produces.
  fn source(&self) -> &str;

  /// Classify `texts`, returning one sentiment per text in the same order.
  fn classify_batch<'a>(
    &'a self,
    texts: &'a [String],
  ) -> impl Future<Output = Result<Vec<Sentiment>>> + Send + 'a;
}

/// The strategy in force for a run.
pub enum Strategy<M> {
  Model(ModelStrategy<M>),
  Lexicon(LexiconStrategy),
}

impl<M: PolarityModel> Strategy<M> {
  /// Pick the strategy for the whole run.
  ///
  /// The model is probed once; if it is absent or fails the probe the lexicon
  /// strategy stands in, unless fallback is disabled.
  pub async fn select(model: Option<M>, config: &SentimentConfig) -> Result<Self> {
    let unavailable = match model {
      Some(model) => match model.probe().await {
        Ok(()) => {
          info!(model = model.name(), "using primary sentiment model");
          return Ok(Strategy::Model(ModelStrategy::new(
            model,
            config.model_neutral_threshold,
          )));
        }
        Err(e) => format!("model {} failed its probe: {e}", model.name()),
      },
      None => "no sentiment model configured".to_owned(),
    };

    if !config.allow_fallback {
      return Err(tenor_core::Error::ClassifierUnavailable(unavailable).into());
    }
    warn!(reason = %unavailable, "falling back to lexicon sentiment");
    Ok(Strategy::Lexicon(LexiconStrategy::new(config.lexicon_neutral_threshold)))
  }
}

impl<M: PolarityModel> SentimentStrategy for Strategy<M> {
  fn source(&self) -> &str {
    match self {
      Strategy::Model(s) => s.source(),
      Strategy::Lexicon(s) => s.source(),
    }
  }

  async fn classify_batch(&self, texts: &[String]) -> Result<Vec<Sentiment>> {
    match self {
      Strategy::Model(s) => s.classify_batch(texts).await,
      Strategy::Lexicon(s) => s.classify_batch(texts).await,
    }
  }
}

// ─── Report ──────────────────────────────────────────────────────────────────

/// A review that could not be classified within the run's time budget. It is
/// left out of every later stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageGap {
  pub partition: String,
  pub review_id: String,
  pub reason:    String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentReport {
  pub source:        String,
  pub classified:    usize,
  pub label_counts:  BTreeMap<SentimentLabel, usize>,
  pub coverage_gaps: Vec<CoverageGap>,
}

#[derive(Debug, Clone)]
pub struct Classified {
  pub reviews: Vec<ClassifiedReview>,
  pub report:  SentimentReport,
}

// ─── Classifier ──────────────────────────────────────────────────────────────

pub struct Classifier<S> {
  strategy:    S,
  batch_size:  usize,
  concurrency: usize,
  timeout:     Duration,
}

impl<S: SentimentStrategy> Classifier<S> {
  pub fn new(strategy: S, config: &SentimentConfig) -> Self {
    Self {
      strategy,
      batch_size: config.batch_size.max(1),
      concurrency: config.concurrency.max(1),
      timeout: Duration::from_secs(config.batch_timeout_secs),
    }
  }

  pub fn strategy(&self) -> &S { &self.strategy }

  /// Attach exactly one sentiment to every review.
  ///
  /// A review with empty content is a hard error. A batch that times out or
  /// fails leaves its reviews out of the result and lists them as coverage
  /// gaps.
  pub async fn classify(&self, reviews: Vec<Review>) -> Result<Classified> {
    if let Some(r) = reviews.iter().find(|r| r.content.trim().is_empty()) {
      return Err(tenor_core::Error::EmptyText { review_id: r.review_id.clone() }.into());
    }

    let outcomes: Vec<Result<Vec<Sentiment>, String>> = stream::iter(reviews.chunks(self.batch_size))
      .enumerate()
      .map(|(index, chunk)| async move {
        let texts: Vec<String> = chunk.iter().map(|r| r.content.clone()).collect();
        debug!(batch = index, size = texts.len(), "classifying batch");
        match tokio::time::timeout(self.timeout, self.strategy.classify_batch(&texts)).await {
          Ok(Ok(sentiments)) if sentiments.len() == texts.len() => Ok(sentiments),
          Ok(Ok(sentiments)) => Err(format!(
            "strategy returned {} results for {} texts",
            sentiments.len(),
            texts.len()
          )),
          Ok(Err(e)) => Err(e.to_string()),
          Err(_) => Err(format!("timed out after {}s", self.timeout.as_secs())),
        }
      })
      .buffered(self.concurrency)
      .collect()
      .await;

    let mut report = SentimentReport {
      source: self.strategy.source().to_owned(),
      ..Default::default()
    };
    let mut classified = Vec::with_capacity(reviews.len());
    for (chunk, outcome) in reviews.chunks(self.batch_size).zip(outcomes) {
      match outcome {
        Ok(sentiments) => {
          for (review, sentiment) in chunk.iter().zip(sentiments) {
            *report.label_counts.entry(sentiment.label).or_default() += 1;
            classified.push(ClassifiedReview { review: review.clone(), sentiment });
          }
        }
        Err(reason) => {
          warn!(size = chunk.len(), %reason, "sentiment batch not classified");
          report.coverage_gaps.extend(chunk.iter().map(|r| CoverageGap {
            partition: r.partition.clone(),
            review_id: r.review_id.clone(),
            reason:    reason.clone(),
          }));
        }
      }
    }
    report.classified = classified.len();

    info!(
      source = %report.source,
      classified = report.classified,
      gaps = report.coverage_gaps.len(),
      "classified reviews"
    );
    Ok(Classified { reviews: classified, report })
  }
}

/// Map a model polarity with a confidence onto the three-way label. The
/// neutral zone includes the threshold itself.
pub(crate) fn label_for(positive: bool, confidence: f64, threshold: f64) -> SentimentLabel {
  if confidence <= threshold {
    SentimentLabel::Neutral
  } else if positive {
    SentimentLabel::Positive
  } else {
    SentimentLabel::Negative
  }
}
