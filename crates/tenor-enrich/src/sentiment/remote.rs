//! [`RemoteModel`] — a polarity model served over HTTP.
//!
//! Speaks the text-classification JSON used by Hugging Face inference
//! endpoints and text-embeddings-inference: the request is
//! `{"inputs": [text, ...]}` and the response holds, per input, either the
//! top `{label, score}` or the full ranked list.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tenor_core::config::RemoteModelConfig;
use tracing::debug;

use super::{Polarity, PolarityModel};
use crate::{Error, Result};

/// Sent once at selection time to check the endpoint answers sensibly.
const PROBE_TEXT: &str = "The app works.";

/// HTTP client for one model endpoint.
///
/// Cheap to clone — the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct RemoteModel {
  client:    Client,
  endpoint:  String,
  name:      String,
  api_token: Option<String>,
}

#[derive(Serialize)]
struct Request<'a> {
  inputs: &'a [String],
}

#[derive(Debug, Deserialize)]
struct LabelScore {
  label: String,
  score: f64,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Prediction {
  Ranked(Vec<LabelScore>),
  Top(LabelScore),
}

impl RemoteModel {
  pub fn new(config: &RemoteModelConfig, timeout: Duration) -> Result<Self> {
    let client = Client::builder().timeout(timeout).build()?;
    Ok(Self {
      client,
      endpoint: config.endpoint.clone(),
      name: config.model_name.clone(),
      api_token: config.api_token.clone(),
    })
  }
}

impl PolarityModel for RemoteModel {
  fn name(&self) -> &str { &self.name }

  async fn probe(&self) -> Result<()> {
    let sample = [PROBE_TEXT.to_owned()];
    let out = self.predict(&sample).await?;
    debug!(model = %self.name, ?out, "model probe answered");
    Ok(())
  }

  async fn predict(&self, texts: &[String]) -> Result<Vec<Polarity>> {
    let mut req = self.client.post(&self.endpoint).json(&Request { inputs: texts });
    if let Some(token) = &self.api_token {
      req = req.bearer_auth(token);
    }
    let resp = req.send().await?;
    if !resp.status().is_success() {
      let status = resp.status();
      let body = resp.text().await.unwrap_or_default();
      return Err(Error::Model(format!("POST {} → {status}: {body}", self.endpoint)));
    }
    let predictions: Vec<Prediction> = resp.json().await?;
    parse_predictions(predictions, texts.len())
  }
}

/// Reduce the endpoint's answer to one polarity per input.
fn parse_predictions(predictions: Vec<Prediction>, expected: usize) -> Result<Vec<Polarity>> {
  // A single input may come back as a flat ranked list.
  let predictions = if expected == 1
    && predictions.len() > 1
    && predictions.iter().all(|p| matches!(p, Prediction::Top(_)))
  {
    let ranked = predictions
      .into_iter()
      .filter_map(|p| match p {
        Prediction::Top(ls) => Some(ls),
        Prediction::Ranked(_) => None,
      })
      .collect();
    vec![Prediction::Ranked(ranked)]
  } else {
    predictions
  };

  if predictions.len() != expected {
    return Err(Error::Model(format!(
      "expected {expected} predictions, got {}",
      predictions.len()
    )));
  }

  predictions
    .into_iter()
    .map(|p| {
      let best = match p {
        Prediction::Top(ls) => ls,
        Prediction::Ranked(list) => list
          .into_iter()
          .max_by(|a, b| a.score.total_cmp(&b.score))
          .ok_or_else(|| Error::Model("empty label list".into()))?,
      };
      Ok(Polarity { positive: is_positive(&best.label)?, confidence: best.score })
    })
    .collect()
}

fn is_positive(label: &str) -> Result<bool> {
  match label.to_ascii_uppercase().as_str() {
    "POSITIVE" | "POS" | "LABEL_1" => Ok(true),
    "NEGATIVE" | "NEG" | "LABEL_0" => Ok(false),
    other => Err(Error::Model(format!("unexpected label {other:?}"))),
  }
}
