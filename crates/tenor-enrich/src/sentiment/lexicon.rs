//! The fallback strategy: a valence-lexicon scorer.
//!
//! Each word found in the lexicon contributes its valence (roughly −4..4),
//! adjusted by preceding boosters and negations, ALL-CAPS emphasis, contrast
//! around "but" and trailing exclamation marks. The sum is squashed into a
//! compound polarity in `[-1, 1]`, and reported as a `[0, 1]` score.

use std::{
  collections::HashMap,
  sync::{Arc, LazyLock},
};

use rayon::prelude::*;
use regex::Regex;
use tenor_core::review::{Sentiment, SentimentLabel};

use super::SentimentStrategy;
use crate::{Result, text::Lemmatizer};

pub const SOURCE: &str = "lexicon";

/// Normalisation constant of the compound score.
const ALPHA: f64 = 15.0;
const BOOSTER_INCR: f64 = 0.293;
const CAPS_INCR: f64 = 0.733;
const NEGATION_SCALAR: f64 = -0.74;
const EXCLAMATION_INCR: f64 = 0.292;
const MAX_EXCLAMATIONS: usize = 4;
/// How far back a booster or negation reaches, and its decay per step.
const MODIFIER_DECAY: [f64; 3] = [1.0, 0.95, 0.9];

static TOKEN: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"[A-Za-z]+(?:['’][A-Za-z]+)*|!").expect("token pattern is valid")
});

const VALENCE: &[(&str, f64)] = &[
  // positive
  ("amazing", 2.8),
  ("appreciate", 1.7),
  ("awesome", 3.1),
  ("best", 3.2),
  ("better", 1.9),
  ("brilliant", 2.8),
  ("convenient", 1.6),
  ("cool", 1.3),
  ("easy", 1.9),
  ("efficient", 1.8),
  ("enjoy", 2.2),
  ("excellent", 2.7),
  ("fantastic", 2.6),
  ("fast", 1.4),
  ("fine", 0.8),
  ("friendly", 2.2),
  ("glad", 2.0),
  ("good", 1.9),
  ("great", 3.1),
  ("happy", 2.7),
  ("helpful", 1.8),
  ("impressive", 2.3),
  ("love", 3.2),
  ("nice", 1.8),
  ("ok", 0.9),
  ("okay", 0.9),
  ("perfect", 2.7),
  ("quick", 1.2),
  ("recommend", 1.5),
  ("reliable", 1.8),
  ("safe", 1.9),
  ("satisfy", 1.8),
  ("secure", 1.4),
  ("simple", 0.8),
  ("smooth", 1.5),
  ("super", 2.9),
  ("thank", 1.5),
  ("useful", 1.9),
  ("wonderful", 2.7),
  ("wow", 2.3),
  // negative
  ("angry", -2.3),
  ("annoy", -1.7),
  ("awful", -2.0),
  ("bad", -2.5),
  ("broken", -1.8),
  ("bug", -1.5),
  ("buggy", -1.8),
  ("complicate", -1.2),
  ("confuse", -1.3),
  ("crash", -1.7),
  ("delay", -1.2),
  ("difficult", -1.5),
  ("disappoint", -2.0),
  ("error", -1.7),
  ("expensive", -0.9),
  ("fail", -2.3),
  ("failure", -2.3),
  ("fraud", -2.5),
  ("freeze", -1.2),
  ("frustrate", -2.1),
  ("garbage", -1.9),
  ("glitch", -1.3),
  ("hate", -2.7),
  ("horrible", -2.5),
  ("issue", -0.6),
  ("lag", -1.0),
  ("laggy", -1.3),
  ("lose", -1.3),
  ("pathetic", -2.0),
  ("poor", -2.1),
  ("problem", -1.7),
  ("ridiculous", -1.6),
  ("rubbish", -1.8),
  ("sad", -2.1),
  ("scam", -2.2),
  ("slow", -1.4),
  ("steal", -2.2),
  ("stuck", -1.4),
  ("suck", -1.5),
  ("terrible", -2.1),
  ("unreliable", -1.8),
  ("useless", -1.8),
  ("waste", -1.8),
  ("worry", -1.2),
  ("worse", -2.1),
  ("worst", -3.1),
];

const BOOSTERS: &[(&str, f64)] = &[
  ("absolutely", BOOSTER_INCR),
  ("completely", BOOSTER_INCR),
  ("extremely", BOOSTER_INCR),
  ("highly", BOOSTER_INCR),
  ("incredibly", BOOSTER_INCR),
  ("really", BOOSTER_INCR),
  ("so", BOOSTER_INCR),
  ("super", BOOSTER_INCR),
  ("too", BOOSTER_INCR),
  ("totally", BOOSTER_INCR),
  ("very", BOOSTER_INCR),
  ("barely", -BOOSTER_INCR),
  ("kinda", -BOOSTER_INCR),
  ("slightly", -BOOSTER_INCR),
  ("somewhat", -BOOSTER_INCR),
];

const NEGATIONS: &[&str] = &[
  "cannot", "never", "neither", "no", "nobody", "none", "nor", "not", "nothing",
  "nowhere", "without",
];

/// Cloning shares the tables.
#[derive(Clone)]
pub struct LexiconStrategy {
  threshold:  f64,
  valence:    Arc<HashMap<&'static str, f64>>,
  boosters:   Arc<HashMap<&'static str, f64>>,
  lemmatizer: Arc<Lemmatizer>,
}

impl LexiconStrategy {
  pub fn new(neutral_threshold: f64) -> Self {
    Self {
      threshold:  neutral_threshold,
      valence:    Arc::new(VALENCE.iter().copied().collect()),
      boosters:   Arc::new(BOOSTERS.iter().copied().collect()),
      lemmatizer: Arc::new(
        Lemmatizer::default().with_vocabulary(VALENCE.iter().map(|(w, _)| *w)),
      ),
    }
  }

  /// Compound polarity of `text` in `[-1, 1]`.
  pub fn polarity(&self, text: &str) -> f64 {
    let tokens: Vec<&str> = TOKEN.find_iter(text).map(|m| m.as_str()).collect();
    let exclamations = tokens.iter().filter(|t| **t == "!").count();
    let words: Vec<&str> = tokens.into_iter().filter(|t| *t != "!").collect();
    if words.is_empty() {
      return 0.0;
    }
    let lower: Vec<String> =
      words.iter().map(|w| w.to_lowercase().replace('’', "'")).collect();

    let shouting = words.iter().filter(|w| is_shouted(w)).count();
    let caps_emphasis = shouting > 0 && shouting < words.len();

    let mut valences: Vec<f64> = (0..words.len())
      .map(|i| self.word_valence(&words, &lower, i, caps_emphasis))
      .collect();

    if let Some(pivot) = lower.iter().position(|w| w == "but") {
      for (i, v) in valences.iter_mut().enumerate() {
        if i < pivot {
          *v *= 0.5;
        } else if i > pivot {
          *v *= 1.5;
        }
      }
    }

    let mut sum: f64 = valences.iter().sum();
    if sum != 0.0 {
      sum += sum.signum() * exclamations.min(MAX_EXCLAMATIONS) as f64 * EXCLAMATION_INCR;
    }
    (sum / (sum * sum + ALPHA).sqrt()).clamp(-1.0, 1.0)
  }

  pub fn sentiment(&self, text: &str) -> Sentiment {
    let compound = self.polarity(text);
    let label = if compound.abs() <= self.threshold {
      SentimentLabel::Neutral
    } else if compound > 0.0 {
      SentimentLabel::Positive
    } else {
      SentimentLabel::Negative
    };
    Sentiment { label, score: (compound + 1.0) / 2.0, source: SOURCE.to_owned() }
  }

  fn lookup(&self, word: &str) -> Option<f64> {
    if let Some(v) = self.valence.get(word) {
      return Some(*v);
    }
    self.valence.get(self.lemmatizer.lemma(word).as_str()).copied()
  }

  fn word_valence(&self, words: &[&str], lower: &[String], i: usize, caps: bool) -> f64 {
    let word = lower[i].as_str();
    // A booster is not a sentiment word in its own right ("super fast").
    if self.boosters.contains_key(word) && i + 1 < lower.len() {
      return 0.0;
    }
    let Some(mut valence) = self.lookup(word) else {
      return 0.0;
    };
    if caps && is_shouted(words[i]) {
      valence += valence.signum() * CAPS_INCR;
    }

    let mut negated = false;
    for (step, decay) in MODIFIER_DECAY.iter().enumerate() {
      let Some(j) = i.checked_sub(step + 1) else { break };
      let prev = lower[j].as_str();
      if let Some(b) = self.boosters.get(prev) {
        valence += valence.signum() * b * decay;
      }
      if is_negation(prev) {
        negated = true;
      }
    }
    if negated {
      valence *= NEGATION_SCALAR;
    }
    valence
  }
}

fn is_negation(word: &str) -> bool { NEGATIONS.contains(&word) || word.ends_with("n't") }

fn is_shouted(word: &str) -> bool {
  word.chars().count() > 1 && word.chars().all(|c| c.is_uppercase())
}

impl SentimentStrategy for LexiconStrategy {
  fn source(&self) -> &str { SOURCE }

  async fn classify_batch(&self, texts: &[String]) -> Result<Vec<Sentiment>> {
    let scorer = self.clone();
    let texts = texts.to_vec();
    let scored = tokio::task::spawn_blocking(move || {
      texts.par_iter().map(|t| scorer.sentiment(t)).collect::<Vec<_>>()
    })
    .await?;
    Ok(scored)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn lexicon() -> LexiconStrategy { LexiconStrategy::new(0.05) }

  #[test]
  fn short_praise_is_positive() {
    let s = lexicon().sentiment("fast and easy");
    assert_eq!(s.label, SentimentLabel::Positive);
    assert!(s.score > 0.5 && s.score <= 1.0);
    assert_eq!(s.source, "lexicon");
  }

  #[test]
  fn complaints_are_negative() {
    let lex = lexicon();
    for text in ["slow transfer failed", "app crashes constantly", "worst app ever"] {
      assert_eq!(lex.sentiment(text).label, SentimentLabel::Negative, "{text}");
    }
  }

  #[test]
  fn zero_compound_maps_to_neutral_midpoint() {
    let s = lexicon().sentiment("I opened the app today");
    assert_eq!(s.label, SentimentLabel::Neutral);
    assert_eq!(s.score, 0.5);
  }

  #[test]
  fn negation_flips_polarity() {
    let lex = lexicon();
    assert!(lex.polarity("not good") < 0.0);
    assert!(lex.polarity("it doesn't work well, not reliable") < 0.0);
    assert!(lex.polarity("never had a problem") > 0.0);
  }

  #[test]
  fn modifiers_and_emphasis_strengthen() {
    let lex = lexicon();
    assert!(lex.polarity("very good") > lex.polarity("good"));
    assert!(lex.polarity("good!!!") > lex.polarity("good"));
    assert!(lex.polarity("GREAT app") > lex.polarity("great app"));
    assert!(lex.polarity("slightly slow") > lex.polarity("slow"));
  }

  #[test]
  fn contrast_weights_the_clause_after_but() {
    assert!(lexicon().polarity("good design but slow") < 0.0);
  }

  #[test]
  fn scores_stay_in_unit_interval() {
    let lex = lexicon();
    for text in [
      "LOVE LOVE LOVE best best best!!!!!!",
      "worst worst terrible horrible awful scam fraud",
      "",
    ] {
      let s = lex.sentiment(text);
      assert!((0.0..=1.0).contains(&s.score), "{text}: {}", s.score);
    }
  }
}
