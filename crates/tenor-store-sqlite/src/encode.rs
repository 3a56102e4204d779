//! Encoding and decoding helpers between domain types and the plain values
//! stored in SQLite columns.
//!
//! Dates are stored as `%Y-%m-%d` text, enums as their snake_case names and
//! ratings as integers.

use chrono::NaiveDate;
use tenor_core::{
  review::{ClassifiedReview, Rating, Review, Sentiment, SentimentLabel},
  summary::{SentimentSummary, ThemeInsight, ThemeSummary},
};

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn encode_date(d: NaiveDate) -> String { d.format(DATE_FORMAT).to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, DATE_FORMAT)
    .map_err(|e| Error::Decode(format!("date {s:?}: {e}")))
}

pub fn decode_rating(v: i64) -> Result<Rating> { Ok(Rating::new(v)?) }

fn decode_count(column: &str, v: i64) -> Result<u32> {
  u32::try_from(v).map_err(|_| Error::Decode(format!("{column} out of range: {v}")))
}

pub fn decode_insight(s: &str) -> Result<ThemeInsight> {
  s.parse()
    .map_err(|_| Error::Decode(format!("unknown theme insight: {s:?}")))
}

/// Human-readable row key used in rejection reports.
pub fn row_key(partition: &str, rest: &str) -> String { format!("{partition}/{rest}") }

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read from a `reviews` row joined with its partition name.
pub struct RawReviewRow {
  pub partition:        String,
  pub review_id:        String,
  pub content:          String,
  pub rating:           i64,
  pub review_date:      String,
  pub engagement:       Option<i64>,
  pub author:           Option<String>,
  pub source:           String,
  pub sentiment_label:  String,
  pub sentiment_score:  f64,
  pub sentiment_source: String,
}

impl RawReviewRow {
  /// Column list matching [`RawReviewRow::from_row`].
  pub const COLUMNS: &'static str = "p.name, r.review_id, r.content, r.rating, r.review_date,
     r.engagement, r.author, r.source,
     r.sentiment_label, r.sentiment_score, r.sentiment_source";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      partition:        row.get(0)?,
      review_id:        row.get(1)?,
      content:          row.get(2)?,
      rating:           row.get(3)?,
      review_date:      row.get(4)?,
      engagement:       row.get(5)?,
      author:           row.get(6)?,
      source:           row.get(7)?,
      sentiment_label:  row.get(8)?,
      sentiment_score:  row.get(9)?,
      sentiment_source: row.get(10)?,
    })
  }

  pub fn into_classified(self) -> Result<ClassifiedReview> {
    let engagement = self
      .engagement
      .map(|v| decode_count("engagement", v))
      .transpose()?;

    Ok(ClassifiedReview {
      review:    Review {
        review_id: self.review_id,
        partition: self.partition,
        content: self.content,
        rating: decode_rating(self.rating)?,
        date: decode_date(&self.review_date)?,
        engagement,
        author: self.author,
        source: self.source,
      },
      sentiment: Sentiment {
        label:  SentimentLabel::parse(&self.sentiment_label)?,
        score:  self.sentiment_score,
        source: self.sentiment_source,
      },
    })
  }
}

/// Raw values read from a `sentiment_summary` row.
pub struct RawSentimentSummary {
  pub partition:      String,
  pub rating:         i64,
  pub review_count:   i64,
  pub positive_count: i64,
  pub neutral_count:  i64,
  pub negative_count: i64,
  pub positive_pct:   f64,
  pub neutral_pct:    f64,
  pub negative_pct:   f64,
  pub mean_score:     f64,
}

impl RawSentimentSummary {
  pub fn into_summary(self) -> Result<SentimentSummary> {
    Ok(SentimentSummary {
      partition:      self.partition,
      rating:         decode_rating(self.rating)?,
      review_count:   decode_count("review_count", self.review_count)?,
      positive_count: decode_count("positive_count", self.positive_count)?,
      neutral_count:  decode_count("neutral_count", self.neutral_count)?,
      negative_count: decode_count("negative_count", self.negative_count)?,
      positive_pct:   self.positive_pct,
      neutral_pct:    self.neutral_pct,
      negative_pct:   self.negative_pct,
      mean_score:     self.mean_score,
    })
  }
}

/// Raw values read from a `theme_summary` row.
pub struct RawThemeSummary {
  pub partition:          String,
  pub theme:              String,
  pub review_count:       i64,
  pub mean_rating:        f64,
  pub positive_pct:       f64,
  pub neutral_pct:        f64,
  pub negative_pct:       f64,
  pub exemplar_review_id: String,
  pub exemplar:           String,
  pub insight:            String,
}

impl RawThemeSummary {
  pub fn into_summary(self) -> Result<ThemeSummary> {
    Ok(ThemeSummary {
      partition:          self.partition,
      theme:              self.theme,
      review_count:       decode_count("review_count", self.review_count)?,
      mean_rating:        self.mean_rating,
      positive_pct:       self.positive_pct,
      neutral_pct:        self.neutral_pct,
      negative_pct:       self.negative_pct,
      exemplar_review_id: self.exemplar_review_id,
      exemplar:           self.exemplar,
      insight:            decode_insight(&self.insight)?,
    })
  }
}
