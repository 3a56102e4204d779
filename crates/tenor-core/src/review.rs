//! Review types — from the collector's raw feed to a classified record.
//!
//! A review moves through three shapes: [`RawReview`] (untrusted, every field
//! optional), [`Review`] (canonical, validated by the normalizer) and
//! [`ClassifiedReview`] (a review with exactly one [`Sentiment`] attached).
//! Themes and keywords are held in separate assignment sets, see
//! [`crate::assignment`].

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── Raw input ───────────────────────────────────────────────────────────────

/// A record as produced by the collector. Nothing is trusted: every field is
/// optional and numeric fields arrive as text.
///
/// Field names follow the collector's CSV header (`review`, `bank`, ...), with
/// aliases for the canonical names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawReview {
  #[serde(default, deserialize_with = "lenient::opt_string")]
  pub review_id:  Option<String>,
  #[serde(
    default,
    alias = "content",
    alias = "review_text",
    deserialize_with = "lenient::opt_string"
  )]
  pub review:     Option<String>,
  #[serde(default, deserialize_with = "lenient::opt_string")]
  pub rating:     Option<String>,
  #[serde(default, alias = "review_date", deserialize_with = "lenient::opt_string")]
  pub date:       Option<String>,
  #[serde(default, alias = "partition", deserialize_with = "lenient::opt_string")]
  pub bank:       Option<String>,
  #[serde(default, deserialize_with = "lenient::opt_string")]
  pub app_id:     Option<String>,
  #[serde(default, deserialize_with = "lenient::opt_string")]
  pub user_name:  Option<String>,
  #[serde(default, alias = "engagement", deserialize_with = "lenient::opt_string")]
  pub thumbs_up:  Option<String>,
  #[serde(default, deserialize_with = "lenient::opt_string")]
  pub source:     Option<String>,
}

/// Deserialisers that accept strings, numbers or nulls and normalise blank
/// text to `None`.
mod lenient {
  use std::fmt;

  use serde::{Deserializer, de};

  struct OptString;

  impl<'de> de::Visitor<'de> for OptString {
    type Value = Option<String>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
      f.write_str("a string, a number or null")
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> { Ok(None) }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> { Ok(None) }

    fn visit_some<D: Deserializer<'de>>(
      self,
      d: D,
    ) -> Result<Self::Value, D::Error> {
      d.deserialize_any(self)
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
      Ok(Some(v.to_string()))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
      Ok(Some(v.to_string()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
      Ok(Some(v.to_string()))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
      if v.is_nan() {
        return Ok(None);
      }
      Ok(Some(v.to_string()))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
      let trimmed = v.trim();
      if trimmed.is_empty() {
        Ok(None)
      } else {
        Ok(Some(trimmed.to_owned()))
      }
    }
  }

  pub fn opt_string<'de, D: Deserializer<'de>>(
    d: D,
  ) -> Result<Option<String>, D::Error> {
    d.deserialize_option(OptString)
  }
}

// ─── Rating ──────────────────────────────────────────────────────────────────

/// A star rating. Always within `1..=5`; construction outside that range is
/// impossible.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
  pub const MIN: u8 = 1;
  pub const MAX: u8 = 5;

  pub fn new(value: i64) -> Result<Self> {
    if (i64::from(Self::MIN)..=i64::from(Self::MAX)).contains(&value) {
      Ok(Self(value as u8))
    } else {
      Err(Error::RatingOutOfRange(value))
    }
  }

  pub fn get(self) -> u8 { self.0 }

  /// All five ratings in ascending order.
  pub fn all() -> impl Iterator<Item = Rating> { (Self::MIN..=Self::MAX).map(Rating) }
}

impl TryFrom<u8> for Rating {
  type Error = Error;

  fn try_from(value: u8) -> Result<Self> { Self::new(i64::from(value)) }
}

impl From<Rating> for u8 {
  fn from(r: Rating) -> u8 { r.0 }
}

impl std::fmt::Display for Rating {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

// ─── Canonical review ────────────────────────────────────────────────────────

/// A validated review in canonical form. Created once by the normalizer and
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
  /// Unique within `partition`. Either the collector's id or a content hash.
  pub review_id:  String,
  pub partition:  String,
  /// Trimmed review text; never empty.
  pub content:    String,
  pub rating:     Rating,
  pub date:       NaiveDate,
  /// Helpful-vote count from the store listing.
  pub engagement: Option<u32>,
  pub author:     Option<String>,
  /// Where the review was collected from, e.g. `google_play`.
  pub source:     String,
}

impl Review {
  pub fn year(&self) -> i32 { self.date.year() }

  pub fn month(&self) -> u32 { self.date.month() }

  /// Length of the content in characters (not bytes).
  pub fn length(&self) -> usize { self.content.chars().count() }
}

// ─── Sentiment ───────────────────────────────────────────────────────────────

/// The three-way sentiment label.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::AsRefStr,
  strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SentimentLabel {
  Positive,
  Neutral,
  Negative,
}

impl SentimentLabel {
  /// Parse a stored label, mapping failures into the core error type.
  pub fn parse(s: &str) -> Result<Self> {
    s.parse()
      .map_err(|_| Error::UnknownSentimentLabel(s.to_owned()))
  }
}

/// The classifier's verdict for one review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sentiment {
  pub label:  SentimentLabel,
  /// Always in `[0, 1]`, whichever strategy produced it.
  pub score:  f64,
  /// Identifier of the strategy, e.g. `model:distilbert-...` or `lexicon`.
  pub source: String,
}

/// A canonical review with its sentiment attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedReview {
  pub review:    Review,
  pub sentiment: Sentiment,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn rating_bounds_are_inclusive() {
    assert!(Rating::new(0).is_err());
    assert_eq!(Rating::new(1).unwrap().get(), 1);
    assert_eq!(Rating::new(5).unwrap().get(), 5);
    assert!(Rating::new(6).is_err());
    assert_eq!(Rating::all().count(), 5);
  }

  #[test]
  fn rating_deserialisation_rejects_out_of_range() {
    assert!(serde_json::from_str::<Rating>("3").is_ok());
    assert!(serde_json::from_str::<Rating>("9").is_err());
  }

  #[test]
  fn sentiment_label_string_forms() {
    assert_eq!(SentimentLabel::Negative.to_string(), "negative");
    assert_eq!(SentimentLabel::parse("neutral").unwrap(), SentimentLabel::Neutral);
    assert!(SentimentLabel::parse("meh").is_err());
  }

  #[test]
  fn raw_review_accepts_numbers_and_blanks() {
    let raw: RawReview = serde_json::from_str(
      r#"{"review": "  works fine ", "rating": 4, "date": "2024-03-01",
          "bank": "Dashen Bank", "thumbs_up": null, "user_name": "  "}"#,
    )
    .unwrap();
    assert_eq!(raw.review.as_deref(), Some("works fine"));
    assert_eq!(raw.rating.as_deref(), Some("4"));
    assert_eq!(raw.thumbs_up, None);
    assert_eq!(raw.user_name, None);
    assert_eq!(raw.review_id, None);
  }

  #[test]
  fn raw_review_canonical_aliases() {
    let raw: RawReview = serde_json::from_str(
      r#"{"content": "ok", "partition": "X", "engagement": "3"}"#,
    )
    .unwrap();
    assert_eq!(raw.review.as_deref(), Some("ok"));
    assert_eq!(raw.bank.as_deref(), Some("X"));
    assert_eq!(raw.thumbs_up.as_deref(), Some("3"));
  }

  #[test]
  fn derived_fields() {
    let review = Review {
      review_id:  "r1".into(),
      partition:  "X".into(),
      content:    "héllo".into(),
      rating:     Rating::new(3).unwrap(),
      date:       NaiveDate::from_ymd_opt(2024, 7, 9).unwrap(),
      engagement: None,
      author:     None,
      source:     "google_play".into(),
    };
    assert_eq!(review.year(), 2024);
    assert_eq!(review.month(), 7);
    assert_eq!(review.length(), 5);
  }
}
