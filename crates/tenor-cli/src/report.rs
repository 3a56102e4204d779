//! Plain-text rendering of run reports and stored summaries.

use std::fmt::Write as _;

use tenor_core::{
  assignment::PartitionKeywords,
  summary::{PartitionOverview, SentimentSummary, ThemeSummary},
};
use tenor_enrich::{
  RunReport,
  normalize::QualityReport,
  pipeline::PersistReport,
  sentiment::SentimentReport,
};

pub fn run(report: &RunReport) -> String {
  let mut out = String::new();
  let _ = writeln!(out, "run {}", report.run_id);
  out.push_str(&quality(&report.quality));
  out.push_str(&sentiment(&report.sentiment));
  out.push_str(&persist(&report.persist));
  out.push_str(&overviews(&report.aggregates.overviews));
  out.push_str(&keywords(&report.keywords));
  out.push_str(&theme_summaries(&report.aggregates.themes));
  out
}

pub fn quality(q: &QualityReport) -> String {
  let mut out = String::new();
  let _ = writeln!(out, "\n== Data quality ==");
  let _ = writeln!(
    out,
    "records: {} in, {} kept ({:.1}%)",
    q.input_records, q.output_records, q.retention_pct
  );
  for (reason, n) in &q.dropped {
    let _ = writeln!(out, "  dropped {:<20} {n}", format!("{reason:?}"));
  }
  if q.engagement_cleared > 0 {
    let _ = writeln!(out, "  engagement cleared   {}", q.engagement_cleared);
  }
  for (field, pct) in &q.missing_pct {
    if *pct > 0.0 {
      let _ = writeln!(out, "  missing {field:<20} {pct:.1}%");
    }
  }
  for (partition, counts) in &q.partitions {
    let _ = writeln!(out, "  {partition:<28} {} → {}", counts.input, counts.retained);
  }
  out
}

pub fn sentiment(s: &SentimentReport) -> String {
  let mut out = String::new();
  let _ = writeln!(out, "\n== Sentiment ({}) ==", s.source);
  for (label, n) in &s.label_counts {
    let _ = writeln!(out, "  {:<10} {n}", label.to_string());
  }
  if !s.coverage_gaps.is_empty() {
    let _ = writeln!(out, "  {} reviews left unclassified:", s.coverage_gaps.len());
    for gap in &s.coverage_gaps {
      let _ = writeln!(out, "    {}/{}: {}", gap.partition, gap.review_id, gap.reason);
    }
  }
  out
}

pub fn persist(p: &PersistReport) -> String {
  let mut out = String::new();
  let _ = writeln!(out, "\n== Store ==");
  for o in &p.outcomes {
    let _ = writeln!(
      out,
      "  {:<20} {:>6} written {:>4} rejected",
      o.entity.to_string(),
      o.written,
      o.rejected.len()
    );
  }
  for r in p.rejected() {
    let _ = writeln!(out, "  rejected {} {}: {}", r.entity, r.key, r.reason);
  }
  out
}

pub fn overviews(overviews: &[PartitionOverview]) -> String {
  let mut out = String::new();
  let _ = writeln!(out, "\n== Partitions ==");
  let _ = writeln!(
    out,
    "  {:<28} {:>7} {:>6} {:>6} {:>6}",
    "partition", "reviews", "mean", "pos%", "neg%"
  );
  for o in overviews {
    let _ = writeln!(
      out,
      "  {:<28} {:>7} {:>6.2} {:>6.1} {:>6.1}",
      o.partition, o.review_count, o.mean_rating, o.positive_pct, o.negative_pct
    );
    let themes: Vec<String> = o.top_themes.iter().map(|(t, n)| format!("{t} ({n})")).collect();
    let _ = writeln!(out, "    top themes: {}", themes.join(", "));
  }
  out
}

pub fn keywords(rankings: &[PartitionKeywords]) -> String {
  let mut out = String::new();
  let _ = writeln!(out, "\n== Keywords ==");
  for r in rankings {
    let terms: Vec<&str> = r.terms.iter().map(|t| t.term.as_str()).collect();
    let _ = writeln!(out, "  {}: {}", r.partition, terms.join(", "));
  }
  out
}

pub fn sentiment_summaries(rows: &[SentimentSummary]) -> String {
  let mut out = String::new();
  let _ = writeln!(out, "\n== Sentiment by rating ==");
  let _ = writeln!(
    out,
    "  {:<28} {:>6} {:>7} {:>6} {:>6} {:>6} {:>6}",
    "partition", "rating", "reviews", "pos%", "neu%", "neg%", "score"
  );
  for s in rows {
    let _ = writeln!(
      out,
      "  {:<28} {:>6} {:>7} {:>6.1} {:>6.1} {:>6.1} {:>6.3}",
      s.partition,
      s.rating.get(),
      s.review_count,
      s.positive_pct,
      s.neutral_pct,
      s.negative_pct,
      s.mean_score
    );
  }
  out
}

pub fn theme_summaries(rows: &[ThemeSummary]) -> String {
  let mut out = String::new();
  let _ = writeln!(out, "\n== Themes ==");
  for t in rows {
    let _ = writeln!(
      out,
      "  {} / {}: {} reviews, mean {:.2}, {:.0}% negative [{}]",
      t.partition, t.theme, t.review_count, t.mean_rating, t.negative_pct, t.insight
    );
    let _ = writeln!(out, "    \"{}\"", t.exemplar);
  }
  out
}
