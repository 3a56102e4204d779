//! Partition — the organisation a review belongs to (here, a bank's app).

use serde::{Deserialize, Serialize};

/// An organisation against which reviews, keywords and summaries are grouped.
/// The name is the partition's identity and is unique in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
  pub name:     String,
  /// Short identifier used in file names and reports, e.g. `dashen`.
  #[serde(default)]
  pub code:     Option<String>,
  /// Store listing identifier, e.g. `com.dashen.dashensuperapp`.
  #[serde(default)]
  pub app_id:   Option<String>,
  #[serde(default)]
  pub app_name: Option<String>,
}

impl Partition {
  /// A partition known only by name.
  pub fn named(name: impl Into<String>) -> Self {
    Self { name: name.into(), code: None, app_id: None, app_name: None }
  }
}
