//! The rebuild orchestrator: drop → repopulate normalized → rebuild derived.
//!
//! The derived table must never be observable in a partially-rebuilt state.
//! Each step runs in its own transaction:
//!
//! 1. `DroppingDerived` — drop the derived table (idempotent no-op if
//!    absent).
//! 2. `RebuildingNormalized` — replace the normalized tables from a
//!    caller-supplied dataset under foreign-key constraints; any violation
//!    rolls the whole replacement back.
//! 3. `RebuildingDerived` — snapshot the normalized tables, run the pure
//!    builder, and create + fill the derived table in one transaction.
//!
//! A failure in any step aborts the rest and leaves the derived table
//! absent — a visible, unambiguous state — rather than stale or half
//! written. Readers concurrent with a rebuild see the old table (before
//! step 1 commits), no table, or the new table; never an intermediate row
//! count.
//!
//! Not designed for concurrent invocation: the rebuild is an out-of-band
//! administrative action that assumes exclusive write access.

use std::fmt;

use odview_core::{data::Dataset, derive::build_derived};

use crate::{
  schema::{DERIVED_SCHEMA, DROP_DERIVED},
  Error, Result, SqliteStore,
};

/// The step of the rebuild state machine that was executing when a failure
/// occurred. Success passes through all three in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildStep {
  DroppingDerived,
  RebuildingNormalized,
  RebuildingDerived,
}

impl fmt::Display for RebuildStep {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      RebuildStep::DroppingDerived => "dropping-derived",
      RebuildStep::RebuildingNormalized => "rebuilding-normalized",
      RebuildStep::RebuildingDerived => "rebuilding-derived",
    };
    f.write_str(name)
  }
}

/// What a successful rebuild produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RebuildReport {
  pub derived_rows: usize,
}

impl SqliteStore {
  /// Drop the derived table. Idempotent; also exposed as its own
  /// administrative command.
  pub async fn drop_derived(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(DROP_DERIVED)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run the full rebuild sequence. With `update`, the normalized tables
  /// are replaced by its content before the derived table is rebuilt;
  /// without it, the derived table is rebuilt from the normalized tables as
  /// they stand.
  pub async fn rebuild(&self, update: Option<Dataset>) -> Result<RebuildReport> {
    tracing::info!(step = %RebuildStep::DroppingDerived, "rebuild");
    self
      .drop_derived()
      .await
      .map_err(|e| Error::aborted(RebuildStep::DroppingDerived, e))?;

    if let Some(dataset) = update {
      tracing::info!(step = %RebuildStep::RebuildingNormalized, "rebuild");
      self
        .replace_normalized(dataset)
        .await
        .map_err(|e| Error::aborted(RebuildStep::RebuildingNormalized, e))?;
    }

    tracing::info!(step = %RebuildStep::RebuildingDerived, "rebuild");
    let report = self
      .rebuild_derived()
      .await
      .map_err(|e| Error::aborted(RebuildStep::RebuildingDerived, e))?;

    tracing::info!(rows = report.derived_rows, "derived table rebuilt");
    Ok(report)
  }

  /// Replace the content of the normalized tables in one transaction.
  async fn replace_normalized(&self, dataset: Dataset) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        // Delete children before parents so foreign keys stay satisfied.
        tx.execute("DELETE FROM death_counts", [])?;
        tx.execute("DELETE FROM populations", [])?;
        tx.execute("DELETE FROM locations", [])?;
        tx.execute("DELETE FROM od_types", [])?;

        {
          let mut stmt =
            tx.prepare("INSERT INTO locations (abbr, name) VALUES (?1, ?2)")?;
          for location in &dataset.locations {
            stmt.execute(rusqlite::params![location.abbr, location.name])?;
          }
        }
        {
          let mut stmt = tx.prepare(
            "INSERT INTO od_types (indicator, od_type) VALUES (?1, ?2)",
          )?;
          for mapping in &dataset.od_types {
            stmt.execute(rusqlite::params![mapping.indicator, mapping.od_type])?;
          }
        }
        {
          let mut stmt = tx.prepare(
            "INSERT INTO death_counts
               (location_abbr, year, month, indicator, death_count)
             VALUES (?1, ?2, ?3, ?4, ?5)",
          )?;
          for obs in &dataset.death_counts {
            stmt.execute(rusqlite::params![
              obs.location_abbr,
              obs.date.year,
              obs.date.month,
              obs.indicator,
              obs.deaths,
            ])?;
          }
        }
        {
          let mut stmt = tx.prepare(
            "INSERT INTO populations (location_abbr, year, population)
             VALUES (?1, ?2, ?3)",
          )?;
          for anchor in &dataset.populations {
            stmt.execute(rusqlite::params![
              anchor.location_abbr,
              anchor.year,
              anchor.population,
            ])?;
          }
        }

        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Snapshot the normalized tables, run the pure builder, and publish the
  /// derived table atomically.
  async fn rebuild_derived(&self) -> Result<RebuildReport> {
    let dataset = self.load_dataset().await?;
    let rows = build_derived(&dataset)?;
    let count = rows.len();
    tracing::debug!(rows = count, "writing derived table");

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute_batch(DERIVED_SCHEMA)?;
        {
          let mut stmt = tx.prepare(
            "INSERT INTO derived_data
               (location_abbr, year, month, indicator, od_type,
                death_count, per_capita, percent_change)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          )?;
          for row in &rows {
            stmt.execute(rusqlite::params![
              row.location_abbr,
              row.date.year,
              row.date.month,
              row.indicator,
              row.od_type,
              row.death_count,
              row.per_capita,
              row.percent_change,
            ])?;
          }
        }
        tx.commit()?;
        Ok(())
      })
      .await?;

    Ok(RebuildReport { derived_rows: count })
  }
}
