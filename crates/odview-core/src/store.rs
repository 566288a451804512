//! The `StatsStore` trait — the read API the query layer is built on.
//!
//! Implemented by storage backends (e.g. `odview-store-sqlite`). The HTTP
//! layer depends on this abstraction, not on any concrete backend. Writes
//! are deliberately absent: the derived table has exactly one writer, the
//! rebuild orchestrator, which is a backend-specific administrative
//! operation.

use std::future::Future;

use crate::{
  data::{DeathCountRow, Location, MapPeriod, MapValue, PopulationRow, Statistic, TimePoint},
  month::MonthDate,
};

/// Abstraction over a mortality-statistics store backend.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (tokio with `axum`).
pub trait StatsStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// All locations, sorted by display name with the national aggregate
  /// first.
  fn locations(
    &self,
  ) -> impl Future<Output = Result<Vec<Location>, Self::Error>> + Send + '_;

  /// Distinct OD types with derived data for a location.
  fn od_types_for_location<'a>(
    &'a self,
    abbr: &'a str,
  ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + 'a;

  /// Periods selectable for the map plot, chronological, with
  /// percent-change availability flags.
  fn map_periods(
    &self,
  ) -> impl Future<Output = Result<Vec<MapPeriod>, Self::Error>> + Send + '_;

  /// Per-state values of one statistic in one period (all-drug-overdose
  /// category, national aggregate excluded).
  fn map_values(
    &self,
    statistic: Statistic,
    period: MonthDate,
  ) -> impl Future<Output = Result<Vec<MapValue>, Self::Error>> + Send + '_;

  /// Time series of one statistic for one location, restricted to the given
  /// OD types. Values aggregate over the indicators of each type.
  fn time_series<'a>(
    &'a self,
    abbr: &'a str,
    statistic: Statistic,
    od_types: &'a [String],
  ) -> impl Future<Output = Result<Vec<TimePoint>, Self::Error>> + Send + 'a;

  /// The raw death-count table, for the data-table view.
  fn death_count_rows(
    &self,
  ) -> impl Future<Output = Result<Vec<DeathCountRow>, Self::Error>> + Send + '_;

  /// The raw population table, for the data-table view.
  fn population_rows(
    &self,
  ) -> impl Future<Output = Result<Vec<PopulationRow>, Self::Error>> + Send + '_;
}
