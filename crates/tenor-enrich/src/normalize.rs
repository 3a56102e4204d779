//! Normalizer: untrusted collector records in, canonical reviews out.
//!
//! Every record is validated independently (in parallel), then duplicates are
//! removed in input order so the first occurrence wins. Nothing here is
//! fatal except an input with no records at all; every dropped or repaired
//! record is counted in the [`QualityReport`].

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tenor_core::{
  config::NormalizerConfig,
  review::{Rating, RawReview, Review},
};
use tracing::{info, warn};

use crate::Result;

// ─── Report ──────────────────────────────────────────────────────────────────

/// Why a raw record did not become a review.
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
)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
  MissingPartition,
  MissingContent,
  MissingRating,
  MissingDate,
  InvalidRating,
  InvalidDate,
  NonTargetLanguage,
  Duplicate,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionCounts {
  pub input:    usize,
  pub retained: usize,
}

/// What the normalizer did to one batch of raw records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
  pub input_records:        usize,
  pub output_records:       usize,
  /// Records removed, by the first check they failed.
  pub dropped:              BTreeMap<DropReason, usize>,
  /// Percentage of raw records with each field absent or blank.
  pub missing_pct:          BTreeMap<String, f64>,
  /// Reviews kept with an unusable engagement count removed.
  pub engagement_cleared:   usize,
  pub partitions:           BTreeMap<String, PartitionCounts>,
  /// Rating distribution of the retained reviews.
  pub rating_distribution:  BTreeMap<u8, usize>,
  pub retention_pct:        f64,
}

impl QualityReport {
  pub fn dropped_total(&self) -> usize { self.dropped.values().sum() }

  pub fn dropped_for(&self, reason: DropReason) -> usize {
    self.dropped.get(&reason).copied().unwrap_or(0)
  }
}

/// Output of [`Normalizer::normalize`].
#[derive(Debug, Clone)]
pub struct Normalized {
  pub reviews: Vec<Review>,
  pub report:  QualityReport,
}

// ─── Normalizer ──────────────────────────────────────────────────────────────

pub struct Normalizer<'a> {
  config: &'a NormalizerConfig,
}

/// Result of validating a single record, before deduplication.
struct Checked {
  review:             Review,
  engagement_cleared: bool,
}

impl<'a> Normalizer<'a> {
  pub fn new(config: &'a NormalizerConfig) -> Self { Self { config } }

  pub fn normalize(&self, raw: &[RawReview]) -> Result<Normalized> {
    if raw.is_empty() {
      return Err(tenor_core::Error::EmptyInput.into());
    }

    let checked: Vec<Result<Checked, DropReason>> =
      raw.par_iter().map(|r| self.check(r)).collect();

    let mut report = QualityReport {
      input_records: raw.len(),
      missing_pct: missing_pct(raw),
      ..Default::default()
    };
    for r in raw {
      if let Some(bank) = r.bank.as_deref().map(str::trim).filter(|b| !b.is_empty()) {
        report.partitions.entry(bank.to_owned()).or_default().input += 1;
      }
    }

    let mut seen = HashSet::new();
    let mut reviews = Vec::with_capacity(raw.len());
    for outcome in checked {
      let reason = match outcome {
        Ok(c) => {
          if seen.insert((c.review.partition.clone(), c.review.review_id.clone())) {
            if c.engagement_cleared {
              report.engagement_cleared += 1;
            }
            reviews.push(c.review);
            continue;
          }
          DropReason::Duplicate
        }
        Err(reason) => reason,
      };
      *report.dropped.entry(reason).or_default() += 1;
    }

    for review in &reviews {
      report.partitions.entry(review.partition.clone()).or_default().retained += 1;
      *report.rating_distribution.entry(review.rating.get()).or_default() += 1;
    }
    report.output_records = reviews.len();
    report.retention_pct = pct(reviews.len(), raw.len());

    info!(
      input = report.input_records,
      output = report.output_records,
      retention_pct = report.retention_pct,
      "normalized reviews"
    );
    for (reason, count) in &report.dropped {
      warn!(?reason, count, "dropped raw records");
    }
    if report.engagement_cleared > 0 {
      warn!(count = report.engagement_cleared, "cleared invalid engagement counts");
    }

    Ok(Normalized { reviews, report })
  }

  fn check(&self, raw: &RawReview) -> Result<Checked, DropReason> {
    let partition = present(&raw.bank).ok_or(DropReason::MissingPartition)?;
    let content = present(&raw.review).ok_or(DropReason::MissingContent)?;
    let rating = present(&raw.rating).ok_or(DropReason::MissingRating)?;
    let date = present(&raw.date).ok_or(DropReason::MissingDate)?;

    let rating = parse_rating(rating).ok_or(DropReason::InvalidRating)?;
    let date = parse_date(date).ok_or(DropReason::InvalidDate)?;
    if !self.is_target_language(content) {
      return Err(DropReason::NonTargetLanguage);
    }

    let (engagement, engagement_cleared) = match present(&raw.thumbs_up) {
      None => (None, false),
      Some(text) => match parse_count(text) {
        Some(n) => (Some(n), false),
        None => (None, true),
      },
    };

    let review_id = match present(&raw.review_id) {
      Some(id) => id.to_owned(),
      None => derived_id(partition, content, date, rating),
    };

    Ok(Checked {
      review: Review {
        review_id,
        partition: partition.to_owned(),
        content: content.to_owned(),
        rating,
        date,
        engagement,
        author: present(&raw.user_name).map(str::to_owned),
        source: present(&raw.source)
          .unwrap_or(&self.config.default_source)
          .to_owned(),
      },
      engagement_cleared,
    })
  }

  /// Text is target-language unless it contains a character from one of
  /// the excluded scripts.
  pub fn is_target_language(&self, text: &str) -> bool {
    !text
      .chars()
      .any(|c| self.config.excluded_scripts.iter().any(|r| r.contains(c)))
  }
}

// ─── Field parsing ───────────────────────────────────────────────────────────

fn present(field: &Option<String>) -> Option<&str> {
  field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Integer text, or a float with no fractional part (`"4.0"`).
fn parse_integer(text: &str) -> Option<i64> {
  if let Ok(n) = text.parse::<i64>() {
    return Some(n);
  }
  let f = text.parse::<f64>().ok()?;
  (f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15).then_some(f as i64)
}

fn parse_rating(text: &str) -> Option<Rating> {
  parse_integer(text).and_then(|n| Rating::new(n).ok())
}

fn parse_count(text: &str) -> Option<u32> {
  parse_integer(text).and_then(|n| u32::try_from(n).ok())
}

/// Calendar date from the formats collectors emit. Time-of-day and offsets
/// are discarded.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
  for fmt in ["%Y-%m-%d", "%Y/%m/%d"] {
    if let Ok(d) = NaiveDate::parse_from_str(text, fmt) {
      return Some(d);
    }
  }
  for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt) {
      return Some(dt.date());
    }
  }
  DateTime::parse_from_rfc3339(text).ok().map(|dt| dt.date_naive())
}

/// Stable identity for records the collector sent without one.
fn derived_id(partition: &str, content: &str, date: NaiveDate, rating: Rating) -> String {
  let date = date.format("%Y-%m-%d").to_string();
  let rating = rating.to_string();
  let mut hasher = Sha256::new();
  for part in [partition, content, date.as_str(), rating.as_str()] {
    hasher.update(part.as_bytes());
    hasher.update([0x1f]);
  }
  hex::encode(&hasher.finalize()[..16])
}

fn pct(part: usize, whole: usize) -> f64 {
  if whole == 0 { 0.0 } else { part as f64 * 100.0 / whole as f64 }
}

const RAW_FIELDS: [&str; 9] = [
  "review_id", "review", "rating", "date", "bank", "app_id", "user_name", "thumbs_up", "source",
];

fn raw_field<'r>(r: &'r RawReview, name: &str) -> &'r Option<String> {
  match name {
    "review_id" => &r.review_id,
    "review" => &r.review,
    "rating" => &r.rating,
    "date" => &r.date,
    "bank" => &r.bank,
    "app_id" => &r.app_id,
    "user_name" => &r.user_name,
    "thumbs_up" => &r.thumbs_up,
    _ => &r.source,
  }
}

fn missing_pct(raw: &[RawReview]) -> BTreeMap<String, f64> {
  RAW_FIELDS
    .iter()
    .map(|name| {
      let missing = raw.iter().filter(|r| present(raw_field(r, name)).is_none()).count();
      ((*name).to_owned(), pct(missing, raw.len()))
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn raw(content: &str, rating: &str, date: &str) -> RawReview {
    RawReview {
      review: Some(content.into()),
      rating: Some(rating.into()),
      date: Some(date.into()),
      bank: Some("Dashen Bank".into()),
      ..Default::default()
    }
  }

  fn run(records: &[RawReview]) -> Normalized {
    let config = NormalizerConfig::default();
    Normalizer::new(&config).normalize(records).unwrap()
  }

  #[test]
  fn empty_input_is_fatal() {
    let config = NormalizerConfig::default();
    let err = Normalizer::new(&config).normalize(&[]).unwrap_err();
    assert!(matches!(err, crate::Error::Core(tenor_core::Error::EmptyInput)));
  }

  #[test]
  fn canonicalises_a_valid_record() {
    let mut record = raw("  Great app  ", "4.0", "2024-05-06 10:11:12");
    record.thumbs_up = Some("7".into());
    record.user_name = Some("Abebe".into());
    let out = run(&[record]);

    let review = &out.reviews[0];
    assert_eq!(review.content, "Great app");
    assert_eq!(review.rating.get(), 4);
    assert_eq!(review.date, NaiveDate::from_ymd_opt(2024, 5, 6).unwrap());
    assert_eq!(review.engagement, Some(7));
    assert_eq!(review.author.as_deref(), Some("Abebe"));
    assert_eq!(review.source, "google_play");
    assert_eq!(review.review_id.len(), 32);
    assert_eq!(out.report.retention_pct, 100.0);
  }

  #[test]
  fn drops_malformed_records_and_counts_them() {
    let mut no_bank = raw("ok", "3", "2024-01-01");
    no_bank.bank = None;
    let records = vec![
      raw("fine", "5", "2024-01-01"),
      raw("   ", "5", "2024-01-01"),
      raw("too high", "6", "2024-01-01"),
      raw("fractional", "2.5", "2024-01-01"),
      raw("bad date", "3", "01/02/2024x"),
      raw("ጥሩ ነው", "4", "2024-01-01"),
      no_bank,
    ];
    let out = run(&records);
    let report = &out.report;

    assert_eq!(out.reviews.len(), 1);
    assert_eq!(report.input_records, 7);
    assert_eq!(report.output_records, 1);
    assert_eq!(report.dropped_for(DropReason::MissingContent), 1);
    assert_eq!(report.dropped_for(DropReason::InvalidRating), 2);
    assert_eq!(report.dropped_for(DropReason::InvalidDate), 1);
    assert_eq!(report.dropped_for(DropReason::NonTargetLanguage), 1);
    assert_eq!(report.dropped_for(DropReason::MissingPartition), 1);
    assert_eq!(report.dropped_total() + report.output_records, report.input_records);
    assert_eq!(report.partitions["Dashen Bank"], PartitionCounts { input: 6, retained: 1 });
  }

  #[test]
  fn duplicates_keep_the_first_occurrence() {
    let first = raw("same text", "2", "2024-02-02");
    let out = run(&[first.clone(), first.clone(), raw("other", "2", "2024-02-02")]);
    assert_eq!(out.reviews.len(), 2);
    assert_eq!(out.report.dropped_for(DropReason::Duplicate), 1);

    let mut a = raw("first", "5", "2024-02-02");
    a.review_id = Some("abc".into());
    let mut b = raw("second", "1", "2024-02-03");
    b.review_id = Some("abc".into());
    let out = run(&[a, b]);
    assert_eq!(out.reviews.len(), 1);
    assert_eq!(out.reviews[0].content, "first");
  }

  #[test]
  fn invalid_engagement_is_cleared_not_dropped() {
    let mut record = raw("meh", "3", "2024-03-03");
    record.thumbs_up = Some("-4".into());
    let out = run(&[record]);
    assert_eq!(out.reviews.len(), 1);
    assert_eq!(out.reviews[0].engagement, None);
    assert_eq!(out.report.engagement_cleared, 1);
  }

  #[test]
  fn missing_field_percentages_cover_raw_input() {
    let mut record = raw("x", "3", "2024-03-03");
    record.user_name = Some("someone".into());
    let out = run(&[record, raw("y", "3", "2024-03-03")]);
    assert_eq!(out.report.missing_pct["user_name"], 50.0);
    assert_eq!(out.report.missing_pct["review"], 0.0);
    assert_eq!(out.report.missing_pct["review_id"], 100.0);
  }

  #[test]
  fn accepted_date_formats() {
    let expected = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();
    for text in [
      "2023-12-31",
      "2023/12/31",
      "2023-12-31 23:59:59",
      "2023-12-31T08:00:00.123",
      "2023-12-31T08:00:00+03:00",
    ] {
      assert_eq!(parse_date(text), Some(expected), "{text}");
    }
    assert_eq!(parse_date("31-12-2023"), None);
  }
}
