//! Linear interpolation of annual population estimates.
//!
//! The census provides one population value per location per year, dated
//! July 1. Time-series plots of deaths per unit population need a value for
//! every month; interpolating between the annual anchors avoids spurious
//! jumps at year boundaries. Months outside the range spanned by a
//! location's anchors get no estimate at all — extrapolation would introduce
//! trend artifacts at the data's edges.

use chrono::{Datelike, NaiveDate};

use crate::month::MonthDate;

/// Month and day the census anchors its annual estimates to.
const ANCHOR_MONTH: u32 = 7;
const ANCHOR_DAY: u32 = 1;

/// One location's annual population anchors, ready for interpolation.
#[derive(Debug, Clone)]
pub struct PopulationSeries {
  /// (day offset, population) points, sorted by day offset.
  anchors: Vec<(i64, f64)>,
}

impl PopulationSeries {
  /// Build a series from (year, population) observations in any order.
  pub fn new(mut observations: Vec<(i32, i64)>) -> Self {
    observations.sort_by_key(|&(year, _)| year);
    let anchors = observations
      .into_iter()
      .filter_map(|(year, population)| {
        NaiveDate::from_ymd_opt(year, ANCHOR_MONTH, ANCHOR_DAY)
          .map(|d| (day_offset(d), population as f64))
      })
      .collect();
    Self { anchors }
  }

  pub fn len(&self) -> usize {
    self.anchors.len()
  }

  pub fn is_empty(&self) -> bool {
    self.anchors.is_empty()
  }

  /// Estimate the population at the first day of `date`.
  ///
  /// Returns `None` when interpolation is undefined: fewer than two anchors,
  /// or a target outside the range spanned by the outermost anchors. A
  /// target exactly at an anchor returns the anchor value with no floating
  /// drift. Interior targets are interpolated linearly on a day axis and
  /// rounded to a whole count of persons.
  pub fn estimate(&self, date: MonthDate) -> Option<f64> {
    if self.anchors.len() < 2 {
      return None;
    }
    let target = day_offset(date.first_day()?);

    let (first, _) = *self.anchors.first()?;
    let (last, _) = *self.anchors.last()?;
    if target < first || target > last {
      return None;
    }

    // Index of the first anchor strictly past the target; >= 1 because the
    // target is not before the first anchor.
    let idx = self.anchors.partition_point(|&(t, _)| t <= target);
    let (t0, v0) = self.anchors[idx - 1];
    if target == t0 {
      return Some(v0);
    }
    let (t1, v1) = self.anchors[idx];

    let f = (target - t0) as f64 / (t1 - t0) as f64;
    Some((v0 + f * (v1 - v0)).round())
  }
}

fn day_offset(date: NaiveDate) -> i64 {
  i64::from(date.num_days_from_ce())
}
