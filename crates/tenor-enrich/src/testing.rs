//! Fixtures shared by unit tests.

use chrono::NaiveDate;
use tenor_core::review::{ClassifiedReview, Rating, Review, Sentiment, SentimentLabel};

pub fn classified(
  partition: &str,
  id: &str,
  content: &str,
  rating: u8,
  label: SentimentLabel,
) -> ClassifiedReview {
  let score = match label {
    SentimentLabel::Positive => 0.9,
    SentimentLabel::Neutral => 0.5,
    SentimentLabel::Negative => 0.1,
  };
  ClassifiedReview {
    review:    Review {
      review_id:  id.into(),
      partition:  partition.into(),
      content:    content.into(),
      rating:     Rating::new(i64::from(rating)).unwrap(),
      date:       NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
      engagement: None,
      author:     None,
      source:     "google_play".into(),
    },
    sentiment: Sentiment { label, score, source: "lexicon".into() },
  }
}
