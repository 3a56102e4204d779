//! Aggregator: summary views recomputed from reviews and theme assignments.
//!
//! Everything here is a pure function of its inputs with ordered maps
//! throughout, so re-aggregating the same sets yields identical rows.

use std::{
  cmp::Ordering,
  collections::{BTreeMap, BTreeSet, HashMap},
};

use serde::{Deserialize, Serialize};
use tenor_core::{
  assignment::ThemeAssignment,
  config::AggregationConfig,
  review::{ClassifiedReview, Rating, SentimentLabel},
  summary::{CompositeSummary, PartitionOverview, SentimentSummary, ThemeInsight, ThemeSummary},
};
use tracing::{debug, info};

use crate::themes::composite_key;

/// All summary views of one aggregation pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Aggregates {
  pub sentiment:  Vec<SentimentSummary>,
  pub themes:     Vec<ThemeSummary>,
  pub composites: Vec<CompositeSummary>,
  pub overviews:  Vec<PartitionOverview>,
}

pub struct Aggregator<'a> {
  config: &'a AggregationConfig,
}

/// Label counts and running sums for a group of reviews.
#[derive(Default)]
struct Tally {
  count:      u32,
  positive:   u32,
  neutral:    u32,
  negative:   u32,
  rating_sum: u64,
  score_sum:  f64,
}

impl Tally {
  fn add(&mut self, cr: &ClassifiedReview) {
    self.count += 1;
    match cr.sentiment.label {
      SentimentLabel::Positive => self.positive += 1,
      SentimentLabel::Neutral => self.neutral += 1,
      SentimentLabel::Negative => self.negative += 1,
    }
    self.rating_sum += u64::from(cr.review.rating.get());
    self.score_sum += cr.sentiment.score;
  }

  fn pct(&self, n: u32) -> f64 { pct(n, self.count) }

  fn mean_rating(&self) -> f64 {
    if self.count == 0 { 0.0 } else { round(self.rating_sum as f64 / f64::from(self.count), 2) }
  }

  fn mean_score(&self) -> f64 {
    if self.count == 0 { 0.0 } else { round(self.score_sum / f64::from(self.count), 4) }
  }
}

fn round(value: f64, places: i32) -> f64 {
  let factor = 10f64.powi(places);
  (value * factor).round() / factor
}

fn pct(part: u32, whole: u32) -> f64 {
  if whole == 0 { 0.0 } else { round(f64::from(part) * 100.0 / f64::from(whole), 2) }
}

type ReviewKey<'r> = (&'r str, &'r str);

impl<'a> Aggregator<'a> {
  pub fn new(config: &'a AggregationConfig) -> Self { Self { config } }

  pub fn aggregate(&self, reviews: &[ClassifiedReview], themes: &[ThemeAssignment]) -> Aggregates {
    let out = Aggregates {
      sentiment:  self.sentiment_summaries(reviews),
      themes:     self.theme_summaries(reviews, themes),
      composites: self.composites(reviews, themes),
      overviews:  self.overviews(reviews, themes),
    };
    info!(
      sentiment_rows = out.sentiment.len(),
      theme_rows = out.themes.len(),
      composites = out.composites.len(),
      partitions = out.overviews.len(),
      "aggregated summaries"
    );
    out
  }

  /// One row per `(partition, rating)` present in `reviews`.
  pub fn sentiment_summaries(&self, reviews: &[ClassifiedReview]) -> Vec<SentimentSummary> {
    let mut groups: BTreeMap<(&str, Rating), Tally> = BTreeMap::new();
    for cr in reviews {
      groups.entry((cr.review.partition.as_str(), cr.review.rating)).or_default().add(cr);
    }
    groups
      .into_iter()
      .map(|((partition, rating), t)| SentimentSummary {
        partition: partition.to_owned(),
        rating,
        review_count: t.count,
        positive_count: t.positive,
        neutral_count: t.neutral,
        negative_count: t.negative,
        positive_pct: t.pct(t.positive),
        neutral_pct: t.pct(t.neutral),
        negative_pct: t.pct(t.negative),
        mean_score: t.mean_score(),
      })
      .collect()
  }

  /// One row per `(partition, theme)` with at least one known review.
  pub fn theme_summaries(
    &self,
    reviews: &[ClassifiedReview],
    themes: &[ThemeAssignment],
  ) -> Vec<ThemeSummary> {
    let index = index_reviews(reviews);
    let mut groups: BTreeMap<(&str, &str), BTreeSet<&str>> = BTreeMap::new();
    for a in themes {
      if index.contains_key(&(a.partition.as_str(), a.review_id.as_str())) {
        groups
          .entry((a.partition.as_str(), a.theme.as_str()))
          .or_default()
          .insert(a.review_id.as_str());
      } else {
        debug!(partition = %a.partition, review_id = %a.review_id, "theme assignment without review");
      }
    }

    groups
      .into_iter()
      .filter_map(|((partition, theme), ids)| {
        let members: Vec<&ClassifiedReview> =
          ids.iter().map(|id| index[&(partition, *id)]).collect();
        let mut t = Tally::default();
        members.iter().for_each(|cr| t.add(cr));
        let exemplar = members.iter().copied().min_by(|a, b| exemplar_order(a, b))?;

        let (positive_pct, neutral_pct, negative_pct) =
          (t.pct(t.positive), t.pct(t.neutral), t.pct(t.negative));
        let mean_rating = t.mean_rating();
        Some(ThemeSummary {
          partition: partition.to_owned(),
          theme: theme.to_owned(),
          review_count: t.count,
          mean_rating,
          positive_pct,
          neutral_pct,
          negative_pct,
          exemplar_review_id: exemplar.review.review_id.clone(),
          exemplar: excerpt(&exemplar.review.content, self.config.exemplar_max_chars),
          insight: self.insight(t.count, positive_pct, negative_pct, mean_rating),
        })
      })
      .collect()
  }

  /// Classify a theme for reporting. Below the minimum sample size nothing is
  /// concluded.
  pub fn insight(
    &self,
    count: u32,
    positive_pct: f64,
    negative_pct: f64,
    mean_rating: f64,
  ) -> ThemeInsight {
    let c = self.config;
    if count < c.min_sample_size {
      ThemeInsight::InsufficientData
    } else if positive_pct >= c.driver_positive_pct && mean_rating >= c.driver_min_rating {
      ThemeInsight::Driver
    } else if negative_pct >= c.pain_negative_pct && mean_rating < c.pain_max_rating {
      ThemeInsight::PainPoint
    } else {
      ThemeInsight::Unremarkable
    }
  }

  /// Review count and mean rating per co-occurring theme combination.
  pub fn composites(
    &self,
    reviews: &[ClassifiedReview],
    themes: &[ThemeAssignment],
  ) -> Vec<CompositeSummary> {
    let by_review = themes_by_review(themes);
    let mut groups: BTreeMap<(&str, String), Tally> = BTreeMap::new();
    for cr in reviews {
      let key = (cr.review.partition.as_str(), cr.review.review_id.as_str());
      let Some(names) = by_review.get(&key) else { continue };
      let names: Vec<&str> = names.iter().copied().collect();
      groups.entry((key.0, composite_key(&names))).or_default().add(cr);
    }
    groups
      .into_iter()
      .map(|((partition, key), t)| CompositeSummary {
        partition: partition.to_owned(),
        key,
        review_count: t.count,
        mean_rating: t.mean_rating(),
      })
      .collect()
  }

  /// Headline figures per partition.
  pub fn overviews(
    &self,
    reviews: &[ClassifiedReview],
    themes: &[ThemeAssignment],
  ) -> Vec<PartitionOverview> {
    let index = index_reviews(reviews);
    let mut tallies: BTreeMap<&str, (Tally, BTreeMap<u8, u32>)> = BTreeMap::new();
    for cr in reviews {
      let (t, dist) = tallies.entry(cr.review.partition.as_str()).or_default();
      t.add(cr);
      *dist.entry(cr.review.rating.get()).or_default() += 1;
    }

    let mut theme_counts: BTreeMap<&str, BTreeMap<&str, BTreeSet<&str>>> = BTreeMap::new();
    for a in themes {
      if index.contains_key(&(a.partition.as_str(), a.review_id.as_str())) {
        theme_counts
          .entry(a.partition.as_str())
          .or_default()
          .entry(a.theme.as_str())
          .or_default()
          .insert(a.review_id.as_str());
      }
    }

    tallies
      .into_iter()
      .map(|(partition, (t, rating_distribution))| {
        let mut top: Vec<(String, u32)> = theme_counts
          .get(partition)
          .map(|counts| {
            counts
              .iter()
              .map(|(theme, ids)| ((*theme).to_owned(), ids.len() as u32))
              .collect()
          })
          .unwrap_or_default();
        top.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        top.truncate(self.config.overview_top_themes);

        PartitionOverview {
          partition: partition.to_owned(),
          review_count: t.count,
          mean_rating: t.mean_rating(),
          positive_pct: t.pct(t.positive),
          negative_pct: t.pct(t.negative),
          rating_distribution,
          top_themes: top,
        }
      })
      .collect()
  }
}

fn index_reviews(reviews: &[ClassifiedReview]) -> HashMap<ReviewKey<'_>, &ClassifiedReview> {
  reviews
    .iter()
    .map(|cr| ((cr.review.partition.as_str(), cr.review.review_id.as_str()), cr))
    .collect()
}

fn themes_by_review(themes: &[ThemeAssignment]) -> HashMap<ReviewKey<'_>, BTreeSet<&str>> {
  let mut map: HashMap<ReviewKey<'_>, BTreeSet<&str>> = HashMap::new();
  for a in themes {
    map
      .entry((a.partition.as_str(), a.review_id.as_str()))
      .or_default()
      .insert(a.theme.as_str());
  }
  map
}

/// Exemplar preference: most engagement, then longest text, then earliest
/// date, then smallest id. `Less` means preferred.
fn exemplar_order(a: &ClassifiedReview, b: &ClassifiedReview) -> Ordering {
  let (a, b) = (&a.review, &b.review);
  b.engagement
    .unwrap_or(0)
    .cmp(&a.engagement.unwrap_or(0))
    .then_with(|| b.length().cmp(&a.length()))
    .then_with(|| a.date.cmp(&b.date))
    .then_with(|| a.review_id.cmp(&b.review_id))
}

/// The first `max_chars` characters of `text`.
fn excerpt(text: &str, max_chars: usize) -> String {
  match text.char_indices().nth(max_chars) {
    Some((end, _)) => text[..end].to_owned(),
    None => text.to_owned(),
  }
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;
  use tenor_core::review::SentimentLabel::{Negative, Neutral, Positive};

  use super::*;
  use crate::testing::classified;

  fn assign(partition: &str, id: &str, theme: &str) -> ThemeAssignment {
    ThemeAssignment { partition: partition.into(), review_id: id.into(), theme: theme.into() }
  }

  fn scenario() -> (Vec<ClassifiedReview>, Vec<ThemeAssignment>) {
    let reviews = vec![
      classified("X", "a", "fast and easy", 5, Positive),
      classified("X", "b", "slow transfer failed", 1, Negative),
      classified("X", "c", "app crashes constantly", 1, Negative),
    ];
    let themes = vec![
      assign("X", "a", "General Feedback"),
      assign("X", "b", "Performance & Reliability"),
      assign("X", "b", "Transactions & Payments"),
      assign("X", "c", "Performance & Reliability"),
    ];
    (reviews, themes)
  }

  #[test]
  fn sentiment_summary_per_rating() {
    let config = AggregationConfig::default();
    let (reviews, _) = scenario();
    let rows = Aggregator::new(&config).sentiment_summaries(&reviews);
    assert_eq!(rows.len(), 2);
    let one_star = &rows[0];
    assert_eq!(one_star.rating.get(), 1);
    assert_eq!(one_star.review_count, 2);
    assert_eq!(one_star.negative_pct, 100.0);
    assert_eq!(one_star.mean_score, 0.1);
    assert_eq!(rows[1].positive_count, 1);
  }

  #[test]
  fn theme_summary_counts_and_mean_rating() {
    let config = AggregationConfig::default();
    let (reviews, themes) = scenario();
    let rows = Aggregator::new(&config).theme_summaries(&reviews, &themes);
    let perf = rows
      .iter()
      .find(|r| r.theme == "Performance & Reliability")
      .unwrap();
    assert_eq!(perf.review_count, 2);
    assert_eq!(perf.mean_rating, 1.0);
    assert_eq!(perf.negative_pct, 100.0);
    assert_eq!(perf.insight, ThemeInsight::InsufficientData);
    // Equal engagement: the longer text wins.
    assert_eq!(perf.exemplar_review_id, "c");
  }

  #[test]
  fn exemplar_tie_breaks() {
    let mut quiet = classified("X", "q", "a much longer review text here", 2, Neutral);
    quiet.review.engagement = Some(1);
    let mut loud = classified("X", "l", "short", 2, Neutral);
    loud.review.engagement = Some(9);
    let mut early = classified("X", "e", "short", 2, Neutral);
    early.review.engagement = Some(9);
    early.review.date = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();

    assert_eq!(exemplar_order(&loud, &quiet), Ordering::Less);
    assert_eq!(exemplar_order(&early, &loud), Ordering::Less);
    let twin = classified("X", "m", "short", 2, Neutral);
    let other = classified("X", "n", "short", 2, Neutral);
    assert_eq!(exemplar_order(&twin, &other), Ordering::Less);
  }

  #[test]
  fn exemplar_excerpt_respects_char_boundaries() {
    assert_eq!(excerpt("héllo wörld", 4), "héll");
    assert_eq!(excerpt("short", 200), "short");
  }

  #[test]
  fn insights_follow_thresholds() {
    let config = AggregationConfig::default();
    let agg = Aggregator::new(&config);
    assert_eq!(agg.insight(9, 100.0, 0.0, 5.0), ThemeInsight::InsufficientData);
    assert_eq!(agg.insight(10, 60.0, 10.0, 4.0), ThemeInsight::Driver);
    assert_eq!(agg.insight(10, 20.0, 30.0, 2.99), ThemeInsight::PainPoint);
    assert_eq!(agg.insight(10, 20.0, 30.0, 3.0), ThemeInsight::Unremarkable);
    assert_eq!(agg.insight(50, 59.9, 10.0, 4.5), ThemeInsight::Unremarkable);
  }

  #[test]
  fn composite_buckets_ignore_assignment_order() {
    let config = AggregationConfig::default();
    let reviews = vec![
      classified("X", "a", "slow transfer", 1, Negative),
      classified("X", "b", "transfer slow", 3, Negative),
    ];
    let themes = vec![
      assign("X", "a", "Performance & Reliability"),
      assign("X", "a", "Transactions & Payments"),
      assign("X", "b", "Transactions & Payments"),
      assign("X", "b", "Performance & Reliability"),
    ];
    let rows = Aggregator::new(&config).composites(&reviews, &themes);
    assert_eq!(rows, vec![CompositeSummary {
      partition:    "X".into(),
      key:          "Performance & Reliability|Transactions & Payments".into(),
      review_count: 2,
      mean_rating:  2.0,
    }]);
  }

  #[test]
  fn overview_lists_top_themes() {
    let config = AggregationConfig { overview_top_themes: 1, ..Default::default() };
    let (reviews, themes) = scenario();
    let rows = Aggregator::new(&config).overviews(&reviews, &themes);
    assert_eq!(rows.len(), 1);
    let x = &rows[0];
    assert_eq!(x.review_count, 3);
    assert_eq!(x.mean_rating, 2.33);
    assert_eq!(x.rating_distribution, BTreeMap::from([(1, 2), (5, 1)]));
    assert_eq!(x.top_themes, vec![("Performance & Reliability".to_owned(), 2)]);
  }

  #[test]
  fn unknown_reviews_are_ignored_and_output_is_stable() {
    let config = AggregationConfig::default();
    let (reviews, mut themes) = scenario();
    themes.push(assign("X", "ghost", "Customer Support"));
    let agg = Aggregator::new(&config);
    let first = agg.aggregate(&reviews, &themes);
    assert!(first.themes.iter().all(|t| t.theme != "Customer Support"));
    assert_eq!(first, agg.aggregate(&reviews, &themes));
  }
}
