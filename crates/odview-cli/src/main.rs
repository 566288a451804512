//! `odview-cli` — administrative commands for the odview database.
//!
//! The derived table is never written by the server; these commands are the
//! only writers, run out of band:
//!
//! ```
//! odview-cli --database od-deaths.sqlite import \
//!     --deaths VSRR_Provisional_Drug_Overdose_Death_Counts.csv \
//!     --population population.csv
//! odview-cli --database od-deaths.sqlite rebuild
//! odview-cli --database od-deaths.sqlite drop-derived
//! ```
//!
//! `import` replaces the normalized tables from the CSV extracts and
//! rebuilds the derived table; `rebuild` regenerates the derived table from
//! the normalized tables as they stand. Both leave the derived table absent
//! if anything fails, so a half-updated database is never served.

mod import;

use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use odview_store_sqlite::SqliteStore;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Administrative commands for the odview database")]
struct Cli {
  /// Path to the SQLite database file (created if absent).
  #[arg(short, long)]
  database: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Replace the normalized tables from the CSV extracts and rebuild the
  /// derived table.
  Import {
    /// CDC VSRR provisional drug-overdose death-counts CSV.
    #[arg(long)]
    deaths: PathBuf,

    /// Census annual population estimates CSV (one column per year).
    #[arg(long)]
    population: PathBuf,
  },

  /// Rebuild the derived table from the current normalized tables.
  Rebuild,

  /// Drop the derived table without rebuilding it.
  DropDerived,
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

  let store = SqliteStore::open(&cli.database)
    .await
    .with_context(|| format!("failed to open database at {:?}", cli.database))?;

  match cli.command {
    Command::Import { deaths, population } => {
      let dataset = import::load_dataset(&deaths, &population)?;
      tracing::info!(
        locations = dataset.locations.len(),
        observations = dataset.death_counts.len(),
        anchors = dataset.populations.len(),
        "parsed source extracts"
      );
      let report = store
        .rebuild(Some(dataset))
        .await
        .context("import failed")?;
      println!("imported; derived table holds {} rows", report.derived_rows);
    }
    Command::Rebuild => {
      let report = store.rebuild(None).await.context("rebuild failed")?;
      println!("derived table rebuilt with {} rows", report.derived_rows);
    }
    Command::DropDerived => {
      store.drop_derived().await.context("drop failed")?;
      println!("derived table dropped");
    }
  }

  Ok(())
}
