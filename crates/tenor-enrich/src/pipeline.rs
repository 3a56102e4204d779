//! [`Pipeline`] — sequences the stages and hands the result to a store.
//!
//! Stages run strictly forward, each consuming its predecessor's full output:
//! normalize → classify → (tag ‖ extract) → aggregate. Nothing is written
//! until every stage has finished, so abandoning a run at any stage boundary
//! leaves the store untouched.

use std::{collections::BTreeMap, sync::Arc};

use serde::{Deserialize, Serialize};
use tenor_core::{
  assignment::{PartitionKeywords, ThemeAssignment},
  config::{AggregationConfig, PipelineConfig},
  partition::Partition,
  review::{ClassifiedReview, RawReview},
  store::{Entity, ReviewStore, RowRejection, WriteOutcome},
};
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

use crate::{
  Error, Result,
  aggregate::{Aggregates, Aggregator},
  keywords::{Extracted, KeywordExtractor},
  normalize::{Normalizer, QualityReport},
  sentiment::{Classifier, SentimentReport, SentimentStrategy},
  themes::ThemeTagger,
};

// ─── Reports ─────────────────────────────────────────────────────────────────

/// The enriched data set of one run, before anything is written.
#[derive(Debug, Clone)]
pub struct Enriched {
  pub reviews:    Vec<ClassifiedReview>,
  pub themes:     Vec<ThemeAssignment>,
  pub keywords:   Extracted,
  pub aggregates: Aggregates,
  pub quality:    QualityReport,
  pub sentiment:  SentimentReport,
}

/// What the store accepted, entity by entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistReport {
  pub outcomes: Vec<WriteOutcome>,
}

impl PersistReport {
  fn record(&mut self, outcome: WriteOutcome) {
    for r in &outcome.rejected {
      warn!(entity = %r.entity, key = %r.key, reason = %r.reason, "row rejected");
    }
    self.outcomes.push(outcome);
  }

  pub fn written(&self, entity: Entity) -> usize {
    self.outcomes.iter().filter(|o| o.entity == entity).map(|o| o.written).sum()
  }

  pub fn rejected(&self) -> impl Iterator<Item = &RowRejection> {
    self.outcomes.iter().flat_map(|o| o.rejected.iter())
  }
}

/// Everything a completed run reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
  pub run_id:     Uuid,
  pub quality:    QualityReport,
  pub sentiment:  SentimentReport,
  pub keywords:   Vec<PartitionKeywords>,
  /// Summaries as stored, recomputed from the store after the write.
  pub aggregates: Aggregates,
  pub persist:    PersistReport,
}

// ─── Pipeline ────────────────────────────────────────────────────────────────

pub struct Pipeline<'c, S> {
  config:     &'c PipelineConfig,
  classifier: Classifier<S>,
  tagger:     Arc<ThemeTagger>,
  run_id:     Uuid,
}

impl<'c, S: SentimentStrategy> Pipeline<'c, S> {
  /// Validate `config` and build every stage. `strategy` is fixed for the
  /// whole run.
  pub fn new(config: &'c PipelineConfig, strategy: S) -> Result<Self> {
    config.validate()?;
    Ok(Self {
      config,
      classifier: Classifier::new(strategy, &config.sentiment),
      tagger: Arc::new(ThemeTagger::new(&config.themes)),
      run_id: Uuid::new_v4(),
    })
  }

  pub fn run_id(&self) -> Uuid { self.run_id }

  /// Run every stage in memory.
  pub async fn enrich(&self, raw: &[RawReview]) -> Result<Enriched> {
    let span = info_span!("enrich", run_id = %self.run_id);
    async move {
      let normalized = Normalizer::new(&self.config.normalizer).normalize(raw)?;
      let classified = self.classifier.classify(normalized.reviews).await?;

      // Tagging and extraction are CPU-bound; keep them off the async workers.
      let tagger = Arc::clone(&self.tagger);
      let keyword_config = self.config.keywords.clone();
      let reviews = classified.reviews;
      let (reviews, themes, keywords) = tokio::task::spawn_blocking(move || {
        let extractor = KeywordExtractor::new(&keyword_config, tagger.analyzer());
        let (themes, keywords) =
          rayon::join(|| tagger.tag(&reviews), || extractor.extract(&reviews));
        (reviews, themes, keywords)
      })
      .await?;

      let aggregates = Aggregator::new(&self.config.aggregation).aggregate(&reviews, &themes);

      Ok(Enriched {
        reviews,
        themes,
        keywords,
        aggregates,
        quality: normalized.report,
        sentiment: classified.report,
      })
    }
    .instrument(span)
    .await
  }

  /// Enrich `raw` and write the result into `store`.
  ///
  /// `partitions` supplies metadata; partitions seen in the data but not
  /// listed are created by name.
  pub async fn run<St: ReviewStore>(
    &self,
    raw: &[RawReview],
    partitions: &[Partition],
    store: &St,
  ) -> Result<RunReport> {
    let enriched = self.enrich(raw).await?;
    let (aggregates, persist) = self
      .persist(&enriched, partitions, store)
      .instrument(info_span!("persist", run_id = %self.run_id))
      .await?;
    Ok(RunReport {
      run_id: self.run_id,
      quality: enriched.quality,
      sentiment: enriched.sentiment,
      keywords: enriched.keywords.rankings,
      aggregates,
      persist,
    })
  }

  /// Upsert entities, then rebuild summaries from what the store now holds.
  pub async fn persist<St: ReviewStore>(
    &self,
    enriched: &Enriched,
    partitions: &[Partition],
    store: &St,
  ) -> Result<(Aggregates, PersistReport)> {
    let mut report = PersistReport::default();

    let mut known: BTreeMap<&str, Partition> =
      partitions.iter().map(|p| (p.name.as_str(), p.clone())).collect();
    for cr in &enriched.reviews {
      known
        .entry(cr.review.partition.as_str())
        .or_insert_with(|| Partition::named(&cr.review.partition));
    }
    let partitions: Vec<Partition> = known.into_values().collect();

    report.record(store.upsert_partitions(&partitions).await.map_err(Error::store)?);
    report.record(store.upsert_reviews(&enriched.reviews).await.map_err(Error::store)?);
    report.record(
      store
        .replace_theme_assignments(&enriched.themes)
        .await
        .map_err(Error::store)?,
    );
    report.record(
      store
        .replace_keyword_assignments(&enriched.reviews, &enriched.keywords.assignments)
        .await
        .map_err(Error::store)?,
    );

    let (aggregates, summaries) = reaggregate(store, &self.config.aggregation).await?;
    report.outcomes.extend(summaries.outcomes);

    info!(
      reviews = report.written(Entity::Review),
      rejected = report.rejected().count(),
      "persisted run"
    );
    Ok((aggregates, report))
  }
}

/// Recompute every summary from the store's reviews and theme assignments
/// and overwrite the stored summaries.
pub async fn reaggregate<St: ReviewStore>(
  store: &St,
  config: &AggregationConfig,
) -> Result<(Aggregates, PersistReport)> {
  let corpus = store.load_corpus().await.map_err(Error::store)?;
  let aggregates = Aggregator::new(config).aggregate(&corpus.reviews, &corpus.themes);

  let mut report = PersistReport::default();
  report.record(
    store
      .replace_sentiment_summaries(&aggregates.sentiment)
      .await
      .map_err(Error::store)?,
  );
  report.record(
    store
      .replace_theme_summaries(&aggregates.themes)
      .await
      .map_err(Error::store)?,
  );
  Ok((aggregates, report))
}
