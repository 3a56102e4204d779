//! [`SqliteStore`] — the SQLite implementation of [`ReviewStore`].

use std::{collections::BTreeSet, path::Path};

use rusqlite::{ErrorCode, params};
use tenor_core::{
  assignment::{KeywordAssignment, ThemeAssignment},
  partition::Partition,
  review::ClassifiedReview,
  store::{Corpus, Entity, ReviewStore, RowRejection, WriteOutcome},
  summary::{SentimentSummary, ThemeSummary},
};
use tracing::debug;

use crate::{
  Result,
  encode::{
    RawReviewRow, RawSentimentSummary, RawThemeSummary, encode_date, row_key,
  },
  schema::SCHEMA,
};

/// Resolves a partition name bound to `?1` to its surrogate key. Yields NULL
/// for unknown names, which the NOT NULL constraints then reject.
const PARTITION_ID: &str = "(SELECT partition_id FROM partitions WHERE name = ?1)";

// ─── Store ───────────────────────────────────────────────────────────────────

/// A tenor review store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── Write helpers ───────────────────────────────────────────────────────────

/// The message of a constraint violation, or `None` for any other error.
fn constraint_violation(e: &rusqlite::Error) -> Option<String> {
  match e {
    rusqlite::Error::SqliteFailure(f, msg) if f.code == ErrorCode::ConstraintViolation => {
      Some(msg.clone().unwrap_or_else(|| f.to_string()))
    }
    _ => None,
  }
}

/// Run `sql` once per row. Rows that violate a constraint are recorded as
/// rejections and the rest of the batch carries on.
fn write_rows<T>(
  conn: &rusqlite::Connection,
  entity: Entity,
  sql: &str,
  rows: &[T],
  key: impl Fn(&T) -> String,
  execute: impl Fn(&mut rusqlite::Statement<'_>, &T) -> rusqlite::Result<usize>,
) -> rusqlite::Result<WriteOutcome> {
  let mut stmt = conn.prepare(sql)?;
  let mut outcome = WriteOutcome::new(entity);
  for row in rows {
    match execute(&mut stmt, row) {
      Ok(n) => outcome.written += n,
      Err(e) => match constraint_violation(&e) {
        Some(reason) => outcome.rejected.push(RowRejection { entity, key: key(row), reason }),
        None => return Err(e),
      },
    }
  }
  Ok(outcome)
}

/// Distinct `(partition, review_id)` pairs, in order.
fn review_keys<'a>(
  pairs: impl Iterator<Item = (&'a String, &'a String)>,
) -> Vec<(String, String)> {
  pairs
    .map(|(p, r)| (p.clone(), r.clone()))
    .collect::<BTreeSet<_>>()
    .into_iter()
    .collect()
}

fn partitions_of<'a>(names: impl Iterator<Item = &'a String>) -> Vec<String> {
  names.cloned().collect::<BTreeSet<_>>().into_iter().collect()
}

// ─── ReviewStore impl ────────────────────────────────────────────────────────

impl ReviewStore for SqliteStore {
  type Error = crate::Error;

  // ── Partitions ────────────────────────────────────────────────────────────

  async fn upsert_partitions(&self, partitions: &[Partition]) -> Result<WriteOutcome> {
    let partitions = partitions.to_vec();
    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let outcome = write_rows(
          &tx,
          Entity::Partition,
          "INSERT INTO partitions (name, code, app_id, app_name)
           VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT (name) DO UPDATE SET
             code     = COALESCE(excluded.code, partitions.code),
             app_id   = COALESCE(excluded.app_id, partitions.app_id),
             app_name = COALESCE(excluded.app_name, partitions.app_name)",
          &partitions,
          |p| p.name.clone(),
          |stmt, p| stmt.execute(params![p.name, p.code, p.app_id, p.app_name]),
        )?;
        tx.commit()?;
        Ok(outcome)
      })
      .await?;
    Ok(outcome)
  }

  async fn list_partitions(&self) -> Result<Vec<Partition>> {
    let partitions = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare("SELECT name, code, app_id, app_name FROM partitions ORDER BY name")?;
        let rows = stmt
          .query_map([], |row| {
            Ok(Partition {
              name:     row.get(0)?,
              code:     row.get(1)?,
              app_id:   row.get(2)?,
              app_name: row.get(3)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(partitions)
  }

  async fn delete_partition(&self, name: &str) -> Result<bool> {
    let name = name.to_owned();
    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM partitions WHERE name = ?1", params![name])?)
      })
      .await?;
    Ok(deleted > 0)
  }

  // ── Reviews and assignments ───────────────────────────────────────────────

  async fn upsert_reviews(&self, reviews: &[ClassifiedReview]) -> Result<WriteOutcome> {
    let reviews = reviews.to_vec();
    let sql = format!(
      "INSERT INTO reviews (
         partition_id, review_id, content, rating, review_date,
         engagement, author, source,
         sentiment_label, sentiment_score, sentiment_source
       ) VALUES ({PARTITION_ID}, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
       ON CONFLICT (partition_id, review_id) DO UPDATE SET
         content          = excluded.content,
         rating           = excluded.rating,
         review_date      = excluded.review_date,
         engagement       = excluded.engagement,
         author           = excluded.author,
         source           = excluded.source,
         sentiment_label  = excluded.sentiment_label,
         sentiment_score  = excluded.sentiment_score,
         sentiment_source = excluded.sentiment_source"
    );

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let outcome = write_rows(
          &tx,
          Entity::Review,
          &sql,
          &reviews,
          |cr| row_key(&cr.review.partition, &cr.review.review_id),
          |stmt, cr| {
            let r = &cr.review;
            stmt.execute(params![
              r.partition,
              r.review_id,
              r.content,
              r.rating.get(),
              encode_date(r.date),
              r.engagement,
              r.author,
              r.source,
              cr.sentiment.label.as_ref(),
              cr.sentiment.score,
              cr.sentiment.source,
            ])
          },
        )?;
        tx.commit()?;
        Ok(outcome)
      })
      .await?;

    debug!(written = outcome.written, rejected = outcome.rejected.len(), "upserted reviews");
    Ok(outcome)
  }

  async fn replace_theme_assignments(
    &self,
    assignments: &[ThemeAssignment],
  ) -> Result<WriteOutcome> {
    let keys = review_keys(assignments.iter().map(|a| (&a.partition, &a.review_id)));
    let assignments = assignments.to_vec();
    let delete = format!("DELETE FROM review_themes WHERE partition_id = {PARTITION_ID} AND review_id = ?2");
    let insert = format!(
      "INSERT INTO review_themes (partition_id, review_id, theme)
       VALUES ({PARTITION_ID}, ?2, ?3)
       ON CONFLICT DO NOTHING"
    );

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        {
          let mut stmt = tx.prepare(&delete)?;
          for (partition, review_id) in &keys {
            stmt.execute(params![partition, review_id])?;
          }
        }
        let outcome = write_rows(
          &tx,
          Entity::ThemeAssignment,
          &insert,
          &assignments,
          |a| row_key(&a.partition, &format!("{}/{}", a.review_id, a.theme)),
          |stmt, a| stmt.execute(params![a.partition, a.review_id, a.theme]),
        )?;
        tx.commit()?;
        Ok(outcome)
      })
      .await?;
    Ok(outcome)
  }

  async fn replace_keyword_assignments(
    &self,
    reviews: &[ClassifiedReview],
    assignments: &[KeywordAssignment],
  ) -> Result<WriteOutcome> {
    let keys = review_keys(
      reviews
        .iter()
        .map(|cr| (&cr.review.partition, &cr.review.review_id))
        .chain(assignments.iter().map(|a| (&a.partition, &a.review_id))),
    );
    let assignments = assignments.to_vec();
    let delete = format!("DELETE FROM review_keywords WHERE partition_id = {PARTITION_ID} AND review_id = ?2");
    let insert = format!(
      "INSERT INTO review_keywords (partition_id, review_id, keyword)
       VALUES ({PARTITION_ID}, ?2, ?3)
       ON CONFLICT DO NOTHING"
    );

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        {
          let mut stmt = tx.prepare(&delete)?;
          for (partition, review_id) in &keys {
            stmt.execute(params![partition, review_id])?;
          }
        }
        let outcome = write_rows(
          &tx,
          Entity::KeywordAssignment,
          &insert,
          &assignments,
          |a| row_key(&a.partition, &format!("{}/{}", a.review_id, a.keyword)),
          |stmt, a| stmt.execute(params![a.partition, a.review_id, a.keyword]),
        )?;
        tx.commit()?;
        Ok(outcome)
      })
      .await?;
    Ok(outcome)
  }

  async fn list_reviews(&self, partition: &str) -> Result<Vec<ClassifiedReview>> {
    let partition = partition.to_owned();
    let raws: Vec<RawReviewRow> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {}
           FROM reviews r JOIN partitions p USING (partition_id)
           WHERE p.name = ?1
           ORDER BY r.review_id",
          RawReviewRow::COLUMNS
        ))?;
        let rows = stmt
          .query_map(params![partition], RawReviewRow::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawReviewRow::into_classified).collect()
  }

  async fn theme_assignments(&self, partition: &str) -> Result<Vec<ThemeAssignment>> {
    let partition = partition.to_owned();
    let rows = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT p.name, t.review_id, t.theme
           FROM review_themes t JOIN partitions p USING (partition_id)
           WHERE p.name = ?1
           ORDER BY t.review_id, t.theme",
        )?;
        let rows = stmt
          .query_map(params![partition], |row| {
            Ok(ThemeAssignment {
              partition: row.get(0)?,
              review_id: row.get(1)?,
              theme:     row.get(2)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(rows)
  }

  async fn keyword_assignments(&self, partition: &str) -> Result<Vec<KeywordAssignment>> {
    let partition = partition.to_owned();
    let rows = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT p.name, k.review_id, k.keyword
           FROM review_keywords k JOIN partitions p USING (partition_id)
           WHERE p.name = ?1
           ORDER BY k.review_id, k.keyword",
        )?;
        let rows = stmt
          .query_map(params![partition], |row| {
            Ok(KeywordAssignment {
              partition: row.get(0)?,
              review_id: row.get(1)?,
              keyword:   row.get(2)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(rows)
  }

  async fn load_corpus(&self) -> Result<Corpus> {
    let (raws, themes): (Vec<RawReviewRow>, Vec<ThemeAssignment>) = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {}
           FROM reviews r JOIN partitions p USING (partition_id)
           ORDER BY p.name, r.review_id",
          RawReviewRow::COLUMNS
        ))?;
        let reviews = stmt
          .query_map([], RawReviewRow::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stmt = conn.prepare(
          "SELECT p.name, t.review_id, t.theme
           FROM review_themes t JOIN partitions p USING (partition_id)
           ORDER BY p.name, t.review_id, t.theme",
        )?;
        let themes = stmt
          .query_map([], |row| {
            Ok(ThemeAssignment {
              partition: row.get(0)?,
              review_id: row.get(1)?,
              theme:     row.get(2)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok((reviews, themes))
      })
      .await?;

    let reviews = raws
      .into_iter()
      .map(RawReviewRow::into_classified)
      .collect::<Result<Vec<_>>>()?;
    Ok(Corpus { reviews, themes })
  }

  // ── Summaries ─────────────────────────────────────────────────────────────

  async fn replace_sentiment_summaries(
    &self,
    summaries: &[SentimentSummary],
  ) -> Result<WriteOutcome> {
    let partitions = partitions_of(summaries.iter().map(|s| &s.partition));
    let summaries = summaries.to_vec();
    let delete = format!("DELETE FROM sentiment_summary WHERE partition_id = {PARTITION_ID}");
    let insert = format!(
      "INSERT INTO sentiment_summary (
         partition_id, rating, review_count,
         positive_count, neutral_count, negative_count,
         positive_pct, neutral_pct, negative_pct, mean_score
       ) VALUES ({PARTITION_ID}, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
    );

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        {
          let mut stmt = tx.prepare(&delete)?;
          for partition in &partitions {
            stmt.execute(params![partition])?;
          }
        }
        let outcome = write_rows(
          &tx,
          Entity::SentimentSummary,
          &insert,
          &summaries,
          |s| row_key(&s.partition, &s.rating.to_string()),
          |stmt, s| {
            stmt.execute(params![
              s.partition,
              s.rating.get(),
              s.review_count,
              s.positive_count,
              s.neutral_count,
              s.negative_count,
              s.positive_pct,
              s.neutral_pct,
              s.negative_pct,
              s.mean_score,
            ])
          },
        )?;
        tx.commit()?;
        Ok(outcome)
      })
      .await?;
    Ok(outcome)
  }

  async fn replace_theme_summaries(&self, summaries: &[ThemeSummary]) -> Result<WriteOutcome> {
    let partitions = partitions_of(summaries.iter().map(|s| &s.partition));
    let summaries = summaries.to_vec();
    let delete = format!("DELETE FROM theme_summary WHERE partition_id = {PARTITION_ID}");
    let insert = format!(
      "INSERT INTO theme_summary (
         partition_id, theme, review_count, mean_rating,
         positive_pct, neutral_pct, negative_pct,
         exemplar_review_id, exemplar, insight
       ) VALUES ({PARTITION_ID}, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
    );

    let outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        {
          let mut stmt = tx.prepare(&delete)?;
          for partition in &partitions {
            stmt.execute(params![partition])?;
          }
        }
        let outcome = write_rows(
          &tx,
          Entity::ThemeSummary,
          &insert,
          &summaries,
          |s| row_key(&s.partition, &s.theme),
          |stmt, s| {
            stmt.execute(params![
              s.partition,
              s.theme,
              s.review_count,
              s.mean_rating,
              s.positive_pct,
              s.neutral_pct,
              s.negative_pct,
              s.exemplar_review_id,
              s.exemplar,
              s.insight.as_ref(),
            ])
          },
        )?;
        tx.commit()?;
        Ok(outcome)
      })
      .await?;
    Ok(outcome)
  }

  async fn sentiment_summaries(&self, partition: Option<&str>) -> Result<Vec<SentimentSummary>> {
    let partition = partition.map(str::to_owned);
    let raws: Vec<RawSentimentSummary> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT p.name, s.rating, s.review_count,
                  s.positive_count, s.neutral_count, s.negative_count,
                  s.positive_pct, s.neutral_pct, s.negative_pct, s.mean_score
           FROM sentiment_summary s JOIN partitions p USING (partition_id)
           WHERE ?1 IS NULL OR p.name = ?1
           ORDER BY p.name, s.rating",
        )?;
        let rows = stmt
          .query_map(params![partition], |row| {
            Ok(RawSentimentSummary {
              partition:      row.get(0)?,
              rating:         row.get(1)?,
              review_count:   row.get(2)?,
              positive_count: row.get(3)?,
              neutral_count:  row.get(4)?,
              negative_count: row.get(5)?,
              positive_pct:   row.get(6)?,
              neutral_pct:    row.get(7)?,
              negative_pct:   row.get(8)?,
              mean_score:     row.get(9)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSentimentSummary::into_summary).collect()
  }

  async fn theme_summaries(&self, partition: Option<&str>) -> Result<Vec<ThemeSummary>> {
    let partition = partition.map(str::to_owned);
    let raws: Vec<RawThemeSummary> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT p.name, t.theme, t.review_count, t.mean_rating,
                  t.positive_pct, t.neutral_pct, t.negative_pct,
                  t.exemplar_review_id, t.exemplar, t.insight
           FROM theme_summary t JOIN partitions p USING (partition_id)
           WHERE ?1 IS NULL OR p.name = ?1
           ORDER BY p.name, t.theme",
        )?;
        let rows = stmt
          .query_map(params![partition], |row| {
            Ok(RawThemeSummary {
              partition:          row.get(0)?,
              theme:              row.get(1)?,
              review_count:       row.get(2)?,
              mean_rating:        row.get(3)?,
              positive_pct:       row.get(4)?,
              neutral_pct:        row.get(5)?,
              negative_pct:       row.get(6)?,
              exemplar_review_id: row.get(7)?,
              exemplar:           row.get(8)?,
              insight:            row.get(9)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawThemeSummary::into_summary).collect()
  }
}
