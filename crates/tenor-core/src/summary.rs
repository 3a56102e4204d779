//! Derived summary views.
//!
//! Summaries are never authoritative: they are recomputed wholesale from the
//! review and theme-assignment sets and overwrite whatever was stored before.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::review::Rating;

// ─── Sentiment by rating ─────────────────────────────────────────────────────

/// Sentiment breakdown for one `(partition, rating)` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentSummary {
  pub partition:      String,
  pub rating:         Rating,
  pub review_count:   u32,
  pub positive_count: u32,
  pub neutral_count:  u32,
  pub negative_count: u32,
  pub positive_pct:   f64,
  pub neutral_pct:    f64,
  pub negative_pct:   f64,
  pub mean_score:     f64,
}

// ─── Theme summary ───────────────────────────────────────────────────────────

/// How a theme is surfaced in downstream reporting.
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
  strum::EnumString,
  strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ThemeInsight {
  /// Mostly positive and highly rated; something users value.
  Driver,
  /// Frequently negative and poorly rated.
  PainPoint,
  /// Enough data, but neither a driver nor a pain point.
  Unremarkable,
  /// Fewer reviews than the minimum sample size.
  InsufficientData,
}

/// Statistics for one `(partition, theme)` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeSummary {
  pub partition:          String,
  pub theme:              String,
  pub review_count:       u32,
  pub mean_rating:        f64,
  pub positive_pct:       f64,
  pub neutral_pct:        f64,
  pub negative_pct:       f64,
  /// The review chosen to illustrate the theme.
  pub exemplar_review_id: String,
  /// Excerpt of the exemplar's content.
  pub exemplar:           String,
  pub insight:            ThemeInsight,
}

// ─── Reporting views (not persisted) ─────────────────────────────────────────

/// Review count and mean rating for a combination of co-occurring themes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeSummary {
  pub partition:    String,
  /// Sorted theme names joined with `|`.
  pub key:          String,
  pub review_count: u32,
  pub mean_rating:  f64,
}

/// Headline figures for one partition, used to compare organisations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionOverview {
  pub partition:           String,
  pub review_count:        u32,
  pub mean_rating:         f64,
  pub positive_pct:        f64,
  pub negative_pct:        f64,
  pub rating_distribution: BTreeMap<u8, u32>,
  /// Most frequent themes, most frequent first.
  pub top_themes:          Vec<(String, u32)>,
}
