//! The primary strategy: a binary polarity model with a neutral zone.

use std::future::Future;

use tenor_core::review::Sentiment;

use super::{SentimentStrategy, label_for};
use crate::{Error, Result};

/// One model verdict: which pole won, and how sure the model is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Polarity {
  pub positive:   bool,
  /// In `[0, 1]`.
  pub confidence: f64,
}

/// A pretrained binary text classifier.
pub trait PolarityModel: Send + Sync {
  fn name(&self) -> &str;

  /// Succeeds only if the model is ready to serve predictions.
  fn probe(&self) -> impl Future<Output = Result<()>> + Send + '_;

  /// One polarity per text, in order.
  fn predict<'a>(
    &'a self,
    texts: &'a [String],
  ) -> impl Future<Output = Result<Vec<Polarity>>> + Send + 'a;
}

pub struct ModelStrategy<M> {
  model:     M,
  threshold: f64,
  source:    String,
}

impl<M: PolarityModel> ModelStrategy<M> {
  pub fn new(model: M, neutral_threshold: f64) -> Self {
    let source = format!("model:{}", model.name());
    Self { model, threshold: neutral_threshold, source }
  }

  pub fn model(&self) -> &M { &self.model }

  fn sentiment(&self, polarity: Polarity) -> Result<Sentiment> {
    if !(0.0..=1.0).contains(&polarity.confidence) {
      return Err(Error::Model(format!(
        "confidence {} outside [0, 1]",
        polarity.confidence
      )));
    }
    Ok(Sentiment {
      label:  label_for(polarity.positive, polarity.confidence, self.threshold),
      score:  polarity.confidence,
      source: self.source.clone(),
    })
  }
}

impl<M: PolarityModel> SentimentStrategy for ModelStrategy<M> {
  fn source(&self) -> &str { &self.source }

  async fn classify_batch(&self, texts: &[String]) -> Result<Vec<Sentiment>> {
    let predictions = self.model.predict(texts).await?;
    predictions.into_iter().map(|p| self.sentiment(p)).collect()
  }
}
