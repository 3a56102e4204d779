//! Many-to-many links from a review to its themes and keywords.
//!
//! Both link types are unique per `(review, label)`; a review may carry any
//! number of distinct labels.

use serde::{Deserialize, Serialize};

/// A review tagged with one theme from the taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ThemeAssignment {
  pub partition: String,
  pub review_id: String,
  pub theme:     String,
}

/// A review linked to one of its partition's top-ranked keywords.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct KeywordAssignment {
  pub partition: String,
  pub review_id: String,
  pub keyword:   String,
}

/// A salience-weighted term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedTerm {
  pub term:   String,
  pub weight: f64,
}

/// The ranked keyword list for one partition, highest weight first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionKeywords {
  pub partition: String,
  pub terms:     Vec<WeightedTerm>,
}
