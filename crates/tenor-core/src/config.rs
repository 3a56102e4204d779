//! Pipeline configuration.
//!
//! Every tunable the stages consume lives here as an immutable value passed
//! into stage constructors. All structs deserialise with per-field defaults so
//! a partial TOML file (or none at all) yields a working configuration.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── Bundle ──────────────────────────────────────────────────────────────────

/// Configuration for every stage of the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
  pub normalizer:  NormalizerConfig,
  pub sentiment:   SentimentConfig,
  pub themes:      ThemeTaxonomy,
  pub keywords:    KeywordConfig,
  pub aggregation: AggregationConfig,
}

impl PipelineConfig {
  /// Check cross-field invariants once, before any stage is built.
  pub fn validate(&self) -> Result<()> {
    self.normalizer.validate()?;
    self.sentiment.validate()?;
    self.themes.validate()?;
    self.keywords.validate()?;
    self.aggregation.validate()?;
    Ok(())
  }
}

fn invalid(msg: impl Into<String>) -> Error { Error::InvalidConfig(msg.into()) }

// ─── Normalizer ──────────────────────────────────────────────────────────────

/// An inclusive range of Unicode scalar values belonging to a script whose
/// text is excluded from the dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptRange {
  pub name:  String,
  pub start: u32,
  pub end:   u32,
}

impl ScriptRange {
  pub fn contains(&self, c: char) -> bool { (self.start..=self.end).contains(&(c as u32)) }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
  /// Text containing any character from these ranges is not target-language.
  pub excluded_scripts: Vec<ScriptRange>,
  /// Used when a record carries no `source`.
  pub default_source:   String,
}

impl Default for NormalizerConfig {
  fn default() -> Self {
    Self {
      excluded_scripts: vec![ScriptRange {
        name:  "Ethiopic".into(),
        start: 0x1200,
        end:   0x137F,
      }],
      default_source:   "google_play".into(),
    }
  }
}

impl NormalizerConfig {
  fn validate(&self) -> Result<()> {
    if let Some(r) = self.excluded_scripts.iter().find(|r| r.start > r.end) {
      return Err(invalid(format!("script range {:?} has start > end", r.name)));
    }
    Ok(())
  }
}

// ─── Sentiment ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SentimentConfig {
  /// Model confidence at or below this value yields `neutral`.
  pub model_neutral_threshold:   f64,
  /// Lexicon compound magnitude at or below this value yields `neutral`.
  pub lexicon_neutral_threshold: f64,
  pub batch_size:                usize,
  /// A batch that has not returned after this many seconds is abandoned and
  /// its reviews recorded as coverage gaps.
  pub batch_timeout_secs:        u64,
  /// Number of batches in flight at once.
  pub concurrency:               usize,
  /// Whether the lexicon strategy may stand in for an unavailable model.
  pub allow_fallback:            bool,
  /// Primary model endpoint; without one the lexicon strategy is used.
  pub model:                     Option<RemoteModelConfig>,
}

impl Default for SentimentConfig {
  fn default() -> Self {
    Self {
      model_neutral_threshold:   0.6,
      lexicon_neutral_threshold: 0.05,
      batch_size:                32,
      batch_timeout_secs:        60,
      concurrency:               4,
      allow_fallback:            true,
      model:                     None,
    }
  }
}

impl SentimentConfig {
  fn validate(&self) -> Result<()> {
    if !(0.0..=1.0).contains(&self.model_neutral_threshold) {
      return Err(invalid("model_neutral_threshold must be within [0, 1]"));
    }
    if !(0.0..=1.0).contains(&self.lexicon_neutral_threshold) {
      return Err(invalid("lexicon_neutral_threshold must be within [0, 1]"));
    }
    if self.batch_size == 0 {
      return Err(invalid("batch_size must be positive"));
    }
    if self.concurrency == 0 {
      return Err(invalid("concurrency must be positive"));
    }
    if self.batch_timeout_secs == 0 {
      return Err(invalid("batch_timeout_secs must be positive"));
    }
    Ok(())
  }
}

/// A text-classification inference endpoint serving a binary polarity model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteModelConfig {
  pub endpoint:   String,
  #[serde(default = "default_model_name")]
  pub model_name: String,
  #[serde(default)]
  pub api_token:  Option<String>,
}

fn default_model_name() -> String {
  "distilbert-base-uncased-finetuned-sst-2-english".into()
}

// ─── Themes ──────────────────────────────────────────────────────────────────

/// One theme and the keyword forms that trigger it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeRule {
  pub name:     String,
  pub keywords: Vec<String>,
}

/// The ordered theme taxonomy plus the label given to reviews matching none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeTaxonomy {
  pub rules:         Vec<ThemeRule>,
  pub default_theme: String,
}

impl Default for ThemeTaxonomy {
  fn default() -> Self {
    let rule = |name: &str, keywords: &[&str]| ThemeRule {
      name:     name.into(),
      keywords: keywords.iter().map(|k| (*k).to_owned()).collect(),
    };
    Self {
      rules:         vec![
        rule("Access & Login", &[
          "login",
          "password",
          "pin",
          "otp",
          "credential",
          "access",
        ]),
        rule("Performance & Reliability", &[
          "crash", "freeze", "slow", "error", "bug", "hang", "lag",
        ]),
        rule("Transactions & Payments", &[
          "transfer",
          "payment",
          "transaction",
          "bill",
          "send",
          "receive",
          "cash",
        ]),
        rule("User Experience", &[
          "interface",
          "design",
          "navigation",
          "ui",
          "ux",
          "layout",
        ]),
        rule("Customer Support", &[
          "support", "help", "service", "assist", "agent", "call",
        ]),
        rule("Features & Functionality", &[
          "feature",
          "update",
          "option",
          "statement",
          "notification",
          "limit",
        ]),
      ],
      default_theme: "General Feedback".into(),
    }
  }
}

impl ThemeTaxonomy {
  fn validate(&self) -> Result<()> {
    if self.default_theme.trim().is_empty() {
      return Err(invalid("default_theme must not be empty"));
    }
    let mut seen = std::collections::BTreeSet::new();
    for rule in &self.rules {
      if rule.name.trim().is_empty() {
        return Err(invalid("theme names must not be empty"));
      }
      if rule.name.contains('|') {
        return Err(invalid(format!("theme {:?} contains the composite delimiter", rule.name)));
      }
      if rule.name == self.default_theme {
        return Err(invalid(format!("theme {:?} shadows the default theme", rule.name)));
      }
      if !seen.insert(rule.name.as_str()) {
        return Err(invalid(format!("duplicate theme {:?}", rule.name)));
      }
      if rule.keywords.is_empty() {
        return Err(invalid(format!("theme {:?} has no keywords", rule.name)));
      }
      if let Some(k) = rule.keywords.iter().find(|k| !k.chars().any(char::is_alphabetic)) {
        return Err(invalid(format!("theme {:?} has keyword {k:?} with no words", rule.name)));
      }
    }
    Ok(())
  }
}

// ─── Keywords ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordConfig {
  /// Shortest n-gram extracted.
  pub ngram_min:    usize,
  /// Longest n-gram extracted.
  pub ngram_max:    usize,
  /// Vocabulary cap per partition, by term frequency.
  pub max_features: usize,
  /// Minimum number of a partition's reviews a term must appear in.
  pub min_df:       usize,
  /// Terms reported per partition.
  pub top_n:        usize,
}

impl Default for KeywordConfig {
  fn default() -> Self {
    Self { ngram_min: 1, ngram_max: 2, max_features: 500, min_df: 2, top_n: 15 }
  }
}

impl KeywordConfig {
  fn validate(&self) -> Result<()> {
    if self.ngram_min == 0 || self.ngram_min > self.ngram_max {
      return Err(invalid("n-gram span must satisfy 1 <= ngram_min <= ngram_max"));
    }
    if self.max_features == 0 || self.top_n == 0 || self.min_df == 0 {
      return Err(invalid("max_features, top_n and min_df must be positive"));
    }
    Ok(())
  }
}

// ─── Aggregation ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
  /// A theme needs at least this many reviews to be a driver or pain point.
  pub min_sample_size:     u32,
  pub driver_positive_pct: f64,
  pub driver_min_rating:   f64,
  pub pain_negative_pct:   f64,
  /// Pain points have a mean rating strictly below this.
  pub pain_max_rating:     f64,
  /// Exemplar excerpts are cut to this many characters.
  pub exemplar_max_chars:  usize,
  /// Themes listed per partition in the overview.
  pub overview_top_themes: usize,
}

impl Default for AggregationConfig {
  fn default() -> Self {
    Self {
      min_sample_size:     10,
      driver_positive_pct: 60.0,
      driver_min_rating:   4.0,
      pain_negative_pct:   30.0,
      pain_max_rating:     3.0,
      exemplar_max_chars:  200,
      overview_top_themes: 5,
    }
  }
}

impl AggregationConfig {
  fn validate(&self) -> Result<()> {
    for (name, pct) in [
      ("driver_positive_pct", self.driver_positive_pct),
      ("pain_negative_pct", self.pain_negative_pct),
    ] {
      if !(0.0..=100.0).contains(&pct) {
        return Err(invalid(format!("{name} must be within [0, 100]")));
      }
    }
    if self.exemplar_max_chars == 0 {
      return Err(invalid("exemplar_max_chars must be positive"));
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_are_valid() {
    let cfg = PipelineConfig::default();
    cfg.validate().unwrap();
    assert_eq!(cfg.sentiment.model_neutral_threshold, 0.6);
    assert_eq!(cfg.sentiment.lexicon_neutral_threshold, 0.05);
    assert_eq!(cfg.sentiment.batch_size, 32);
    assert_eq!(cfg.keywords, KeywordConfig {
      ngram_min:    1,
      ngram_max:    2,
      max_features: 500,
      min_df:       2,
      top_n:        15,
    });
    assert_eq!(cfg.themes.rules.len(), 6);
    assert_eq!(cfg.themes.default_theme, "General Feedback");
  }

  #[test]
  fn partial_toml_keeps_remaining_defaults() {
    let cfg: PipelineConfig = toml::from_str(
      "[sentiment]\nbatch_size = 8\n\n[keywords]\ntop_n = 5\n",
    )
    .unwrap();
    assert_eq!(cfg.sentiment.batch_size, 8);
    assert_eq!(cfg.sentiment.model_neutral_threshold, 0.6);
    assert_eq!(cfg.keywords.top_n, 5);
    assert_eq!(cfg.keywords.min_df, 2);
  }

  #[test]
  fn rejects_bad_thresholds_and_spans() {
    let mut cfg = PipelineConfig::default();
    cfg.sentiment.model_neutral_threshold = 1.5;
    assert!(cfg.validate().is_err());

    let mut cfg = PipelineConfig::default();
    cfg.keywords.ngram_min = 3;
    assert!(cfg.validate().is_err());

    let mut cfg = PipelineConfig::default();
    cfg.sentiment.batch_size = 0;
    assert!(cfg.validate().is_err());
  }

  #[test]
  fn rejects_duplicate_and_delimited_theme_names() {
    let mut cfg = PipelineConfig::default();
    let dup = cfg.themes.rules[0].clone();
    cfg.themes.rules.push(dup);
    assert!(cfg.validate().is_err());

    let mut cfg = PipelineConfig::default();
    cfg.themes.rules[0].name = "A|B".into();
    assert!(cfg.validate().is_err());
  }

  #[test]
  fn rejects_keywords_without_words() {
    let mut cfg = PipelineConfig::default();
    cfg.themes.rules[0].keywords.push("  ".into());
    assert!(cfg.validate().is_err());

    let mut cfg = PipelineConfig::default();
    cfg.themes.rules[0].keywords = vec!["404".into()];
    assert!(cfg.validate().is_err());

    let mut cfg = PipelineConfig::default();
    cfg.themes.rules[0].keywords = vec!["down".into()];
    assert!(cfg.validate().is_ok());
  }

  #[test]
  fn ethiopic_range_matches_amharic_letters() {
    let cfg = NormalizerConfig::default();
    assert!(cfg.excluded_scripts[0].contains('ሰ'));
    assert!(!cfg.excluded_scripts[0].contains('a'));
  }
}
