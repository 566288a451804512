//! Year-month dates — the time grain of the mortality data.
//!
//! Observations are reported per calendar month, so the domain never needs a
//! full date; a (year, month) pair is the key everywhere. The wire format for
//! a month is the ISO-style period string `YYYY-MM`, e.g. `2015-04`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Month names as they appear in the source CSV extracts, in calendar order.
pub const MONTH_NAMES: [&str; 12] = [
  "January",
  "February",
  "March",
  "April",
  "May",
  "June",
  "July",
  "August",
  "September",
  "October",
  "November",
  "December",
];

/// A calendar month. Derived `Ord` is chronological (year, then month).
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct MonthDate {
  pub year:  i32,
  /// 1-based month number.
  pub month: u32,
}

impl MonthDate {
  pub fn new(year: i32, month: u32) -> Result<Self> {
    if !(1..=12).contains(&month) {
      return Err(Error::InvalidMonth { year, month });
    }
    Ok(Self { year, month })
  }

  /// The first day of the month, the point on the day axis this month maps
  /// to for interpolation. `None` if the fields do not form a valid date.
  pub fn first_day(self) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(self.year, self.month, 1)
  }

  /// The same month one year earlier.
  pub fn prior_year(self) -> Self {
    Self { year: self.year - 1, month: self.month }
  }

  /// ISO-style period string, e.g. `2015-04`.
  pub fn period(self) -> String {
    format!("{:04}-{:02}", self.year, self.month)
  }

  /// Parse a `YYYY-MM` period string.
  pub fn parse_period(s: &str) -> Option<Self> {
    let (year, month) = s.split_once('-')?;
    let year: i32 = year.parse().ok()?;
    let month: u32 = month.parse().ok()?;
    Self::new(year, month).ok()
  }
}

/// Month number (1-based) for a month name as found in the source CSVs.
/// Case-insensitive.
pub fn month_number(name: &str) -> Option<u32> {
  MONTH_NAMES
    .iter()
    .position(|m| m.eq_ignore_ascii_case(name))
    .map(|i| i as u32 + 1)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn period_round_trip() {
    let date = MonthDate::new(2015, 4).unwrap();
    assert_eq!(date.period(), "2015-04");
    assert_eq!(MonthDate::parse_period("2015-04"), Some(date));
  }

  #[test]
  fn parse_rejects_garbage() {
    assert_eq!(MonthDate::parse_period("2015"), None);
    assert_eq!(MonthDate::parse_period("2015-13"), None);
    assert_eq!(MonthDate::parse_period("2015-00"), None);
    assert_eq!(MonthDate::parse_period("abcd-ef"), None);
  }

  #[test]
  fn ordering_is_chronological() {
    let a = MonthDate::new(2015, 12).unwrap();
    let b = MonthDate::new(2016, 1).unwrap();
    assert!(a < b);
  }

  #[test]
  fn month_numbers() {
    assert_eq!(month_number("January"), Some(1));
    assert_eq!(month_number("december"), Some(12));
    assert_eq!(month_number("Smarch"), None);
  }
}
