//! Layered settings: optional TOML file, then `TENOR_*` environment.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Deserialize;
use tenor_core::{config::PipelineConfig, partition::Partition};

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
  /// SQLite database file. A leading `~/` is expanded.
  #[serde(default = "default_store_path")]
  pub store_path: PathBuf,

  /// Metadata for known partitions. Partitions found in the data but not
  /// listed here are created by name.
  #[serde(default)]
  pub partitions: Vec<Partition>,

  #[serde(default)]
  pub pipeline: PipelineConfig,
}

fn default_store_path() -> PathBuf { PathBuf::from("tenor.db") }

impl Settings {
  /// Read `path` (if it exists) and overlay `TENOR_` variables, e.g.
  /// `TENOR_PIPELINE__SENTIMENT__BATCH_SIZE=64`.
  pub fn load(path: &Path) -> anyhow::Result<Self> { Self::load_with_env(path, None) }

  /// As [`Settings::load`], reading variables from `env` instead of the
  /// process environment when given.
  fn load_with_env(path: &Path, env: Option<config::Map<String, String>>) -> anyhow::Result<Self> {
    let raw = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("TENOR")
          .prefix_separator("_")
          .separator("__")
          .try_parsing(true)
          .source(env),
      )
      .build()
      .with_context(|| format!("failed to read config file {}", path.display()))?;

    let mut settings: Settings = raw
      .try_deserialize()
      .context("failed to deserialise settings")?;
    settings.store_path = expand_tilde(&settings.store_path);
    settings
      .pipeline
      .validate()
      .context("invalid pipeline configuration")?;
    Ok(settings)
  }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
