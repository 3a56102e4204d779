//! Theme tagger: multi-label keyword rules over lemmatised review text.
//!
//! Taxonomy keywords are run through the same analyzer as the reviews, so
//! `crashes`, `crashed` and `crash` all meet at one lemma. A single-word
//! keyword matches an equal lemma; a multi-word keyword matches a contiguous
//! run of lemmas. Tagging is a pure function of the text, evaluated per review
//! in parallel.

use std::collections::BTreeSet;

use rayon::prelude::*;
use tenor_core::{
  assignment::ThemeAssignment,
  config::ThemeTaxonomy,
  review::ClassifiedReview,
};
use tracing::info;

use crate::text::{Lemmatizer, TextAnalyzer};

/// Delimiter between theme names in a composite key.
pub const COMPOSITE_DELIMITER: char = '|';

struct CompiledRule {
  name:     String,
  /// Each keyword as its lemma sequence.
  keywords: Vec<Vec<String>>,
}

impl CompiledRule {
  fn matches(&self, lemmas: &[String]) -> bool {
    self.keywords.iter().any(|kw| match kw.as_slice() {
      [single] => lemmas.iter().any(|l| l == single),
      seq => lemmas.windows(seq.len()).any(|w| w == seq),
    })
  }
}

pub struct ThemeTagger {
  rules:         Vec<CompiledRule>,
  default_theme: String,
  analyzer:      TextAnalyzer,
}

impl ThemeTagger {
  pub fn new(taxonomy: &ThemeTaxonomy) -> Self {
    let lemmatizer = Lemmatizer::default()
      .with_vocabulary(taxonomy.rules.iter().flat_map(|r| r.keywords.iter()));
    let analyzer = TextAnalyzer::new(lemmatizer)
      .with_kept_words(taxonomy.rules.iter().flat_map(|r| r.keywords.iter()));

    let rules = taxonomy
      .rules
      .iter()
      .map(|rule| CompiledRule {
        name:     rule.name.clone(),
        keywords: rule
          .keywords
          .iter()
          .map(|k| analyzer.lemmas(k))
          .filter(|lemmas| !lemmas.is_empty())
          .collect(),
      })
      .collect();

    Self { rules, default_theme: taxonomy.default_theme.clone(), analyzer }
  }

  /// The analyzer whose vocabulary is seeded with this taxonomy.
  pub fn analyzer(&self) -> &TextAnalyzer { &self.analyzer }

  pub fn default_theme(&self) -> &str { &self.default_theme }

  /// Themes matched by `text`, in taxonomy order; the default theme alone if
  /// nothing matches.
  pub fn themes_for(&self, text: &str) -> Vec<String> {
    let lemmas = self.analyzer.lemmas(text);
    let matched: Vec<String> = self
      .rules
      .iter()
      .filter(|rule| rule.matches(&lemmas))
      .map(|rule| rule.name.clone())
      .collect();
    if matched.is_empty() { vec![self.default_theme.clone()] } else { matched }
  }

  /// One assignment per matched theme of every review.
  pub fn tag(&self, reviews: &[ClassifiedReview]) -> Vec<ThemeAssignment> {
    let assignments: Vec<ThemeAssignment> = reviews
      .par_iter()
      .flat_map_iter(|cr| {
        let review = &cr.review;
        self.themes_for(&review.content).into_iter().map(|theme| ThemeAssignment {
          partition: review.partition.clone(),
          review_id: review.review_id.clone(),
          theme,
        })
      })
      .collect();

    let defaulted = assignments.iter().filter(|a| a.theme == self.default_theme).count();
    info!(
      reviews = reviews.len(),
      assignments = assignments.len(),
      defaulted,
      "tagged themes"
    );
    assignments
  }
}

/// Grouping key for a combination of themes: names sorted, deduplicated and
/// joined with [`COMPOSITE_DELIMITER`]. Independent of discovery order.
pub fn composite_key<S: AsRef<str>>(themes: &[S]) -> String {
  let sorted: BTreeSet<&str> = themes.iter().map(|t| t.as_ref()).collect();
  let mut key = String::new();
  for (i, theme) in sorted.into_iter().enumerate() {
    if i > 0 {
      key.push(COMPOSITE_DELIMITER);
    }
    key.push_str(theme);
  }
  key
}
