//! `tenor` — enrich a snapshot of app-store reviews and store the results.
//!
//! # Usage
//!
//! ```
//! tenor run reviews.csv
//! tenor --config ~/.config/tenor/tenor.toml run reviews.json --report run.json
//! tenor reaggregate
//! tenor summaries --partition "Dashen Bank"
//! ```

mod input;
mod report;
mod settings;

use std::{path::PathBuf, time::Duration};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use settings::Settings;
use tenor_core::store::ReviewStore;
use tenor_enrich::{
  Pipeline,
  pipeline::reaggregate,
  sentiment::{RemoteModel, Strategy},
};
use tenor_store_sqlite::SqliteStore;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Review enrichment pipeline")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "tenor.toml", env = "TENOR_CONFIG")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Enrich a collector snapshot and write it to the store.
  Run {
    /// CSV or JSON file of raw review records.
    input: PathBuf,

    /// Input format; detected from the extension when omitted.
    #[arg(long, value_enum)]
    format: Option<input::Format>,

    /// Also write the full run report as JSON to this file.
    #[arg(long = "report", value_name = "FILE")]
    report_path: Option<PathBuf>,
  },

  /// Recompute every stored summary from the stored reviews.
  Reaggregate,

  /// Print stored summaries.
  Summaries {
    #[arg(long)]
    partition: Option<String>,
  },

  /// Delete a partition together with its reviews and summaries.
  DeletePartition { name: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let settings = Settings::load(&cli.config)?;

  let store = SqliteStore::open(&settings.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", settings.store_path))?;

  match cli.command {
    Command::Run { input, format, report_path } => {
      let raw = input::read(&input, format)?;
      let strategy = select_strategy(&settings).await?;
      let pipeline = Pipeline::new(&settings.pipeline, strategy)?;

      let outcome = pipeline
        .run(&raw, &settings.partitions, &store)
        .await
        .context("pipeline run failed")?;
      print!("{}", report::run(&outcome));

      if let Some(path) = report_path {
        let json = serde_json::to_string_pretty(&outcome)?;
        std::fs::write(&path, json)
          .with_context(|| format!("failed to write report to {}", path.display()))?;
      }
    }

    Command::Reaggregate => {
      let (aggregates, persisted) = reaggregate(&store, &settings.pipeline.aggregation)
        .await
        .context("re-aggregation failed")?;
      print!("{}", report::persist(&persisted));
      print!("{}", report::overviews(&aggregates.overviews));
    }

    Command::Summaries { partition } => {
      let partition = partition.as_deref();
      let sentiment = store.sentiment_summaries(partition).await?;
      let themes = store.theme_summaries(partition).await?;
      print!("{}", report::sentiment_summaries(&sentiment));
      print!("{}", report::theme_summaries(&themes));
    }

    Command::DeletePartition { name } => {
      if store.delete_partition(&name).await? {
        tracing::info!(partition = %name, "partition deleted");
      } else {
        anyhow::bail!("no partition named {name:?}");
      }
    }
  }

  Ok(())
}

/// Build the configured primary model, if any, and probe it.
async fn select_strategy(settings: &Settings) -> anyhow::Result<Strategy<RemoteModel>> {
  let sentiment = &settings.pipeline.sentiment;
  let model = sentiment
    .model
    .as_ref()
    .map(|m| RemoteModel::new(m, Duration::from_secs(sentiment.batch_timeout_secs)))
    .transpose()
    .context("failed to build model client")?;
  Ok(Strategy::select(model, sentiment).await?)
}
