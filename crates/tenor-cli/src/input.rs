//! Reading the collector's snapshot.
//!
//! CSV rows are keyed by header name and go through the same lenient
//! deserialisation as JSON records, so `rating` may be `4` or `"4.0"` and
//! blank cells count as missing.

use std::path::Path;

use anyhow::Context as _;
use clap::ValueEnum;
use serde_json::{Map, Value};
use tenor_core::review::RawReview;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
  Csv,
  Json,
}

impl Format {
  /// Guess from the file extension; anything but `.json` is CSV.
  pub fn detect(path: &Path) -> Self {
    match path.extension().and_then(|e| e.to_str()) {
      Some(ext) if ext.eq_ignore_ascii_case("json") => Format::Json,
      _ => Format::Csv,
    }
  }
}

/// Read every record in `path`. Fails only when the file as a whole cannot
/// be read; bad records are left for the normalizer to drop.
pub fn read(path: &Path, format: Option<Format>) -> anyhow::Result<Vec<RawReview>> {
  let format = format.unwrap_or_else(|| Format::detect(path));
  let records = match format {
    Format::Csv => read_csv(path),
    Format::Json => read_json(path),
  }
  .with_context(|| format!("failed to read {}", path.display()))?;
  tracing::info!(records = records.len(), ?format, "read input");
  Ok(records)
}

fn unreadable(e: impl std::fmt::Display) -> tenor_core::Error {
  tenor_core::Error::UnreadableInput(e.to_string())
}

fn read_csv(path: &Path) -> tenor_core::Result<Vec<RawReview>> {
  let mut reader = csv::ReaderBuilder::new()
    .flexible(true)
    .from_path(path)
    .map_err(unreadable)?;
  let headers: Vec<String> = reader
    .headers()
    .map_err(unreadable)?
    .iter()
    .map(|h| h.trim().to_owned())
    .collect();

  let mut records = Vec::new();
  for row in reader.records() {
    let row = row.map_err(unreadable)?;
    let object: Map<String, Value> = headers
      .iter()
      .zip(row.iter())
      .map(|(h, v)| (h.clone(), Value::String(v.to_owned())))
      .collect();
    records.push(serde_json::from_value(Value::Object(object))?);
  }
  Ok(records)
}

fn read_json(path: &Path) -> tenor_core::Result<Vec<RawReview>> {
  let text = std::fs::read_to_string(path).map_err(unreadable)?;
  serde_json::from_str(&text).map_err(unreadable)
}
