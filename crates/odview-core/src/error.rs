//! Error types for `odview-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A death-count observation references a location with no `locations` row.
  #[error("unknown location: {0:?}")]
  UnknownLocation(String),

  /// A death-count observation references an indicator with no category
  /// mapping.
  #[error("unknown indicator: {0:?}")]
  UnknownIndicator(String),

  /// Two observations share the same (location, year, month, indicator) key.
  #[error("duplicate observation for {location_abbr} {year}-{month:02} {indicator:?}")]
  DuplicateObservation {
    location_abbr: String,
    year:          i32,
    month:         u32,
    indicator:     String,
  },

  /// A month number outside 1–12, or a year-month chrono rejects.
  #[error("invalid month date: {year}-{month}")]
  InvalidMonth { year: i32, month: u32 },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
