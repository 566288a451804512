//! Domain model: normalized source records, the derived statistic row, and
//! the view rows served to the query layer.
//!
//! The normalized records mirror the source tables one-to-one. They are
//! reference/fact data with natural keys; nothing here carries surrogate ids.

use serde::{Deserialize, Serialize};

use crate::month::MonthDate;

/// Abbreviation of the national aggregate row. Map plots exclude it; the
/// location list pins it first.
pub const NATIONAL_ABBR: &str = "US";

// ─── Normalized records ──────────────────────────────────────────────────────

/// A reporting location: a two-letter state code (or [`NATIONAL_ABBR`]) plus
/// the display name. Immutable reference data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
  pub abbr: String,
  pub name: String,
}

/// Maps a raw reporting indicator (an ICD-10-cause string) to the coarser
/// overdose-type label used for plotting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryMapping {
  pub indicator: String,
  pub od_type:   String,
}

/// A reported death count for one (location, month, indicator) cell.
///
/// Combinations absent from the source data are reporting gaps; absence is
/// meaningful and is never treated as zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeathCount {
  pub location_abbr: String,
  pub date:          MonthDate,
  pub indicator:     String,
  pub deaths:        i64,
}

/// An annual census population estimate, anchored at July 1 of its year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopulationAnchor {
  pub location_abbr: String,
  pub year:          i32,
  pub population:    i64,
}

/// The full content of the normalized tables: the input to the derived-data
/// builder, and the payload of a source-data update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
  pub locations:     Vec<Location>,
  pub od_types:      Vec<CategoryMapping>,
  pub death_counts:  Vec<DeathCount>,
  pub populations:   Vec<PopulationAnchor>,
}

// ─── Derived data ────────────────────────────────────────────────────────────

/// One materialized statistic row, keyed on the death-count observation
/// grain. Wholly owned by the rebuild pipeline; regenerable at any time from
/// the normalized tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedRow {
  pub location_abbr:  String,
  pub date:           MonthDate,
  pub indicator:      String,
  pub od_type:        String,
  pub death_count:    i64,
  /// Deaths per unit population ([`crate::derive::UNIT_POPULATION`]).
  /// `None` when no population estimate exists for the cell's month.
  pub per_capita:     Option<f64>,
  /// Percent change against the same cell one year earlier. `None` when the
  /// prior-year count is absent or zero.
  pub percent_change: Option<f64>,
}

/// The statistic kinds the query layer can ask for. Serialized forms are the
/// wire values used in query strings: `death_count`,
/// `normalized_death_count`, `percent_change`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Statistic {
  DeathCount,
  NormalizedDeathCount,
  PercentChange,
}

// ─── Query-layer views ───────────────────────────────────────────────────────

/// One state's value for a map plot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapValue {
  pub location_abbr: String,
  pub location:      String,
  pub value:         f64,
}

/// A period selectable for the map plot, with a flag for whether the
/// percent-change statistic is available in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapPeriod {
  pub period:                   String,
  pub includes_percent_change:  bool,
}

/// One point of a time-series plot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimePoint {
  pub period:  String,
  pub od_type: String,
  pub value:   f64,
}

/// A raw death-count row for the data-table view (location name expanded).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeathCountRow {
  pub location:    String,
  pub year:        i32,
  pub month:       u32,
  pub indicator:   String,
  pub death_count: i64,
}

/// A raw population row for the data-table view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopulationRow {
  pub location:   String,
  pub year:       i32,
  pub population: i64,
}
