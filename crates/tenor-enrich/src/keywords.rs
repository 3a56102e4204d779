//! Keyword extractor: TF-IDF salience per partition.
//!
//! Documents are the lemma n-grams of each review. Inverse document
//! frequency is smoothed and computed over the reviews of *all* partitions,
//! so terms every organisation's users mention (`app`, `bank`) sink below the
//! ones that set a partition apart:
//!
//! ```text
//! idf(t) = ln((1 + N) / (1 + df(t))) + 1
//! ```
//!
//! Each document's tf·idf row is L2-normalised; a term's weight is the sum of
//! its row values across the partition.

use std::collections::{BTreeMap, HashMap, HashSet};

use rayon::prelude::*;
use tenor_core::{
  assignment::{KeywordAssignment, PartitionKeywords, WeightedTerm},
  config::KeywordConfig,
  review::ClassifiedReview,
};
use tracing::{debug, info};

use crate::text::TextAnalyzer;

/// Output of [`KeywordExtractor::extract`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extracted {
  /// One ranking per partition, ordered by partition name.
  pub rankings:    Vec<PartitionKeywords>,
  /// Links from each review to the top-ranked terms it contains.
  pub assignments: Vec<KeywordAssignment>,
}

pub struct KeywordExtractor<'a> {
  config:   &'a KeywordConfig,
  analyzer: &'a TextAnalyzer,
}

/// A review reduced to its n-gram counts.
struct Document<'r> {
  review_id: &'r str,
  terms:     HashMap<String, usize>,
}

impl<'a> KeywordExtractor<'a> {
  pub fn new(config: &'a KeywordConfig, analyzer: &'a TextAnalyzer) -> Self {
    Self { config, analyzer }
  }

  /// Lemma n-grams of `text`, n within the configured span.
  pub fn ngrams(&self, text: &str) -> Vec<String> {
    let lemmas = self.analyzer.lemmas(text);
    let mut grams = Vec::new();
    for n in self.config.ngram_min..=self.config.ngram_max {
      grams.extend(lemmas.windows(n).map(|w| w.join(" ")));
    }
    grams
  }

  pub fn extract(&self, reviews: &[ClassifiedReview]) -> Extracted {
    let docs: Vec<(&str, Document<'_>)> = reviews
      .par_iter()
      .map(|cr| {
        let mut terms = HashMap::new();
        for gram in self.ngrams(&cr.review.content) {
          *terms.entry(gram).or_default() += 1;
        }
        (cr.review.partition.as_str(), Document { review_id: &cr.review.review_id, terms })
      })
      .collect();

    let total_docs = docs.len();
    let mut corpus_df: HashMap<&str, usize> = HashMap::new();
    for (_, doc) in &docs {
      for term in doc.terms.keys() {
        *corpus_df.entry(term.as_str()).or_default() += 1;
      }
    }
    let idf = |term: &str| -> f64 {
      let df = corpus_df.get(term).copied().unwrap_or(0);
      ((1.0 + total_docs as f64) / (1.0 + df as f64)).ln() + 1.0
    };

    let mut by_partition: BTreeMap<&str, Vec<&Document<'_>>> = BTreeMap::new();
    for (partition, doc) in &docs {
      by_partition.entry(*partition).or_default().push(doc);
    }

    let per_partition: Vec<(PartitionKeywords, Vec<KeywordAssignment>)> = by_partition
      .into_iter()
      .collect::<Vec<_>>()
      .into_par_iter()
      .map(|(partition, docs)| self.rank_partition(partition, &docs, &idf))
      .collect();

    let mut out = Extracted::default();
    for (ranking, assignments) in per_partition {
      debug!(
        partition = %ranking.partition,
        terms = ranking.terms.len(),
        "ranked partition keywords"
      );
      out.rankings.push(ranking);
      out.assignments.extend(assignments);
    }
    info!(
      partitions = out.rankings.len(),
      assignments = out.assignments.len(),
      "extracted keywords"
    );
    out
  }

  fn rank_partition(
    &self,
    partition: &str,
    docs: &[&Document<'_>],
    idf: &(impl Fn(&str) -> f64 + Sync),
  ) -> (PartitionKeywords, Vec<KeywordAssignment>) {
    // Partition document and term frequencies.
    let mut df: HashMap<&str, usize> = HashMap::new();
    let mut tf: HashMap<&str, usize> = HashMap::new();
    for doc in docs {
      for (term, count) in &doc.terms {
        *df.entry(term.as_str()).or_default() += 1;
        *tf.entry(term.as_str()).or_default() += count;
      }
    }

    let mut candidates: Vec<(&str, usize)> = tf
      .into_iter()
      .filter(|(term, _)| df[term] >= self.config.min_df)
      .collect();
    candidates.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    candidates.truncate(self.config.max_features);
    let vocabulary: HashSet<&str> = candidates.into_iter().map(|(t, _)| t).collect();

    let mut weights: HashMap<&str, f64> = HashMap::new();
    for doc in docs {
      let mut row: Vec<(&str, f64)> = doc
        .terms
        .iter()
        .filter(|(term, _)| vocabulary.contains(term.as_str()))
        .map(|(term, count)| (term.as_str(), *count as f64 * idf(term.as_str())))
        .collect();
      // Fixed summation order keeps weights bit-identical across runs.
      row.sort_by(|a, b| a.0.cmp(b.0));
      let norm = row.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();
      if norm == 0.0 {
        continue;
      }
      for (term, value) in row {
        *weights.entry(term).or_default() += value / norm;
      }
    }

    let mut ranked: Vec<(&str, f64)> = weights.into_iter().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked.truncate(self.config.top_n);

    let top: HashSet<&str> = ranked.iter().map(|(t, _)| *t).collect();
    let mut assignments: Vec<KeywordAssignment> = docs
      .iter()
      .flat_map(|doc| {
        doc
          .terms
          .keys()
          .filter(|term| top.contains(term.as_str()))
          .map(|term| KeywordAssignment {
            partition: partition.to_owned(),
            review_id: doc.review_id.to_owned(),
            keyword:   term.clone(),
          })
      })
      .collect();
    assignments.sort();

    let ranking = PartitionKeywords {
      partition: partition.to_owned(),
      terms:     ranked
        .into_iter()
        .map(|(term, weight)| WeightedTerm { term: term.to_owned(), weight })
        .collect(),
    };
    (ranking, assignments)
  }
}

#[cfg(test)]
mod tests {
  use tenor_core::review::SentimentLabel;

  use super::*;
  use crate::testing::classified;

  fn extract(config: &KeywordConfig, docs: &[(&str, &str)]) -> Extracted {
    let reviews: Vec<ClassifiedReview> = docs
      .iter()
      .enumerate()
      .map(|(i, (p, text))| classified(p, &format!("r{i}"), text, 3, SentimentLabel::Neutral))
      .collect();
    let analyzer = TextAnalyzer::default();
    KeywordExtractor::new(config, &analyzer).extract(&reviews)
  }

  fn terms(ranking: &PartitionKeywords) -> Vec<&str> {
    ranking.terms.iter().map(|t| t.term.as_str()).collect()
  }

  #[test]
  fn ngrams_cover_unigrams_and_bigrams() {
    let config = KeywordConfig::default();
    let analyzer = TextAnalyzer::default();
    let ex = KeywordExtractor::new(&config, &analyzer);
    assert_eq!(ex.ngrams("The transfer failed again"), vec![
      "transfer",
      "fail",
      "transfer fail"
    ]);
  }

  #[test]
  fn idf_spans_all_partitions() {
    let out = extract(&KeywordConfig::default(), &[
      ("A", "transfer failed"),
      ("A", "transfer failed"),
      ("B", "transfer fast"),
      ("B", "transfer fast"),
    ]);
    assert_eq!(out.rankings.len(), 2);
    let a = &out.rankings[0];
    assert_eq!(a.partition, "A");
    // `fail` and `transfer fail` tie and are ordered lexicographically;
    // `transfer` is shared with B and ranks last.
    assert_eq!(terms(a), vec!["fail", "transfer fail", "transfer"]);
    assert!((a.terms[0].weight - a.terms[1].weight).abs() < 1e-12);
    assert!(a.terms[1].weight > a.terms[2].weight);
  }

  #[test]
  fn min_df_filters_one_off_terms() {
    let out = extract(&KeywordConfig::default(), &[
      ("A", "login error"),
      ("A", "login slow"),
      ("A", "typo zzzq"),
    ]);
    assert_eq!(terms(&out.rankings[0]), vec!["login"]);
  }

  #[test]
  fn small_partitions_yield_short_lists() {
    let out = extract(&KeywordConfig::default(), &[("A", "only one review here")]);
    assert_eq!(out.rankings.len(), 1);
    assert!(out.rankings[0].terms.is_empty());
    assert!(out.assignments.is_empty());
  }

  #[test]
  fn cutoff_and_vocabulary_cap_apply() {
    let config = KeywordConfig { top_n: 2, max_features: 3, ..Default::default() };
    let out = extract(&config, &[
      ("A", "otp otp otp pin pin password"),
      ("A", "otp pin password"),
    ]);
    let a = &out.rankings[0];
    assert_eq!(a.terms.len(), 2);
    assert_eq!(terms(a)[0], "otp");
  }

  #[test]
  fn assignments_link_reviews_to_top_terms_they_contain() {
    let out = extract(&KeywordConfig::default(), &[
      ("A", "transfer failed"),
      ("A", "transfer failed"),
      ("A", "transfer ok"),
    ]);
    let for_r2: Vec<&str> = out
      .assignments
      .iter()
      .filter(|a| a.review_id == "r2")
      .map(|a| a.keyword.as_str())
      .collect();
    assert_eq!(for_r2, vec!["transfer"]);
    assert!(out.assignments.iter().any(|a| a.review_id == "r0" && a.keyword == "transfer fail"));
  }
}
