//! Parse the source CSV extracts into a normalized [`Dataset`].
//!
//! Two inputs: the CDC VSRR provisional drug-overdose death counts, and a
//! census extract of annual population estimates (one column per year,
//! values dated July 1). Rows the dashboard cannot use are dropped here so
//! the database only ever holds clean, classifiable observations.

use std::{
  collections::BTreeMap,
  path::Path,
};

use anyhow::{bail, Context as _};
use odview_core::{
  data::{CategoryMapping, Dataset, DeathCount, Location, PopulationAnchor},
  month::{month_number, MonthDate},
};
use serde::Deserialize;

/// Reporting jurisdictions excluded from the dashboard (the District of
/// Columbia and New York City report separately from the states).
const EXCLUDED_ABBRS: [&str; 2] = ["DC", "YC"];

/// One row of the VSRR death-counts extract, as shipped by the CDC.
#[derive(Debug, Deserialize)]
struct VsrrRecord {
  #[serde(rename = "State")]
  state:      String,
  #[serde(rename = "Year")]
  year:       i32,
  #[serde(rename = "Month")]
  month:      String,
  #[serde(rename = "Indicator")]
  indicator:  String,
  #[serde(rename = "Data Value")]
  data_value: Option<String>,
  #[serde(rename = "State Name")]
  state_name: String,
}

/// Classify a reporting indicator into the OD type shown in the interface,
/// or `None` for indicators the dashboard does not use.
///
/// The check order matters: the combined-opioids indicator names the whole
/// ICD-10 range `T40.0-T40.4,T40.6`, so its `T40.0` substring must win
/// before the single-code checks run.
fn classify_indicator(indicator: &str) -> Option<&'static str> {
  if indicator.contains("incl. methadone") {
    return None;
  }
  let od_type = if indicator.contains("T40.0") {
    "all_opioids"
  } else if indicator.contains("T40.1") {
    "heroin"
  } else if indicator.contains("T40.2") {
    "prescription_opioids"
  } else if indicator.contains("T40.3") || indicator.contains("T40.4") {
    "synthetic_opioids"
  } else if indicator.contains("T40.5") {
    "cocaine"
  } else if indicator.contains("T43") {
    "other_stimulants"
  } else if indicator.contains("Drug Overdose") {
    "all_drug_od"
  } else {
    return None;
  };
  Some(od_type)
}

/// Parse a count that may carry thousands separators, e.g. `52,404`.
fn parse_count(raw: &str) -> Option<i64> {
  let cleaned: String = raw.chars().filter(|c| *c != ',').collect();
  let cleaned = cleaned.trim();
  if cleaned.is_empty() {
    return None;
  }
  cleaned.parse::<f64>().ok().map(|v| v.round() as i64)
}

/// Load both extracts and assemble the complete normalized dataset.
pub fn load_dataset(deaths_path: &Path, population_path: &Path) -> anyhow::Result<Dataset> {
  let (locations, od_types, death_counts) = load_death_counts(deaths_path)?;

  let name_to_abbr: BTreeMap<&str, &str> = locations
    .iter()
    .map(|l| (l.name.as_str(), l.abbr.as_str()))
    .collect();
  let populations = load_populations(population_path, &name_to_abbr)?;

  Ok(Dataset { locations, od_types, death_counts, populations })
}

fn load_death_counts(
  path: &Path,
) -> anyhow::Result<(Vec<Location>, Vec<CategoryMapping>, Vec<DeathCount>)> {
  let mut reader = csv::Reader::from_path(path)
    .with_context(|| format!("failed to open death-counts extract {path:?}"))?;

  let mut locations: BTreeMap<String, String> = BTreeMap::new();
  let mut od_types: BTreeMap<String, &'static str> = BTreeMap::new();
  let mut death_counts = Vec::new();
  let mut skipped = 0usize;

  for (index, record) in reader.deserialize().enumerate() {
    let record: VsrrRecord = record
      .with_context(|| format!("malformed death-counts row {}", index + 2))?;

    if EXCLUDED_ABBRS.contains(&record.state.as_str()) {
      continue;
    }
    let Some(od_type) = classify_indicator(&record.indicator) else {
      continue;
    };
    // A missing count is a reporting gap, not a zero.
    let Some(deaths) = record.data_value.as_deref().and_then(parse_count) else {
      skipped += 1;
      continue;
    };
    let Some(month) = month_number(&record.month) else {
      bail!("unrecognised month {:?} in row {}", record.month, index + 2);
    };

    locations.insert(record.state.clone(), record.state_name);
    od_types.insert(record.indicator.clone(), od_type);
    death_counts.push(DeathCount {
      location_abbr: record.state,
      date:          MonthDate::new(record.year, month)?,
      indicator:     record.indicator,
      deaths,
    });
  }

  tracing::debug!(
    kept = death_counts.len(),
    skipped,
    "parsed death-counts extract"
  );

  let locations = locations
    .into_iter()
    .map(|(abbr, name)| Location { abbr, name })
    .collect();
  let od_types = od_types
    .into_iter()
    .map(|(indicator, od_type)| CategoryMapping { indicator, od_type: od_type.into() })
    .collect();
  Ok((locations, od_types, death_counts))
}

/// The population extract is wide: a location-name column followed by one
/// column per year. Melt it into (location, year, population) anchors.
fn load_populations(
  path: &Path,
  name_to_abbr: &BTreeMap<&str, &str>,
) -> anyhow::Result<Vec<PopulationAnchor>> {
  let mut reader = csv::Reader::from_path(path)
    .with_context(|| format!("failed to open population extract {path:?}"))?;

  let years: Vec<i32> = reader
    .headers()
    .context("population extract has no header row")?
    .iter()
    .skip(1)
    .map(|h| {
      h.trim()
        .parse::<i32>()
        .with_context(|| format!("population column {h:?} is not a year"))
    })
    .collect::<anyhow::Result<_>>()?;

  let mut populations = Vec::new();
  for (index, record) in reader.records().enumerate() {
    let record = record
      .with_context(|| format!("malformed population row {}", index + 2))?;
    let name = record.get(0).unwrap_or("").trim();
    let Some(&abbr) = name_to_abbr.get(name) else {
      bail!("population row {} names unknown location {name:?}", index + 2);
    };
    for (column, year) in years.iter().enumerate() {
      let raw = record.get(column + 1).unwrap_or("");
      let Some(population) = parse_count(raw) else {
        bail!("missing population for {name:?} in {year}");
      };
      populations.push(PopulationAnchor {
        location_abbr: abbr.to_owned(),
        year:          *year,
        population,
      });
    }
  }
  Ok(populations)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn classification_covers_the_vsrr_indicators() {
    let cases = [
      ("Number of Drug Overdose Deaths", Some("all_drug_od")),
      ("Opioids (T40.0-T40.4,T40.6)", Some("all_opioids")),
      ("Heroin (T40.1)", Some("heroin")),
      ("Natural & semi-synthetic opioids (T40.2)", Some("prescription_opioids")),
      ("Methadone (T40.3)", Some("synthetic_opioids")),
      ("Synthetic opioids, excl. methadone (T40.4)", Some("synthetic_opioids")),
      ("Cocaine (T40.5)", Some("cocaine")),
      ("Psychostimulants with abuse potential (T43.6)", Some("other_stimulants")),
      // Overlapping roll-ups the dashboard does not display.
      (
        "Natural, semi-synthetic, & synthetic opioids, incl. methadone (T40.2, T40.3, T40.4)",
        None,
      ),
      ("Number of Deaths", None),
      ("Percent with drugs specified", None),
    ];
    for (indicator, expected) in cases {
      assert_eq!(classify_indicator(indicator), expected, "{indicator}");
    }
  }

  #[test]
  fn counts_with_thousands_separators_parse() {
    assert_eq!(parse_count("52,404"), Some(52_404));
    assert_eq!(parse_count("17"), Some(17));
    assert_eq!(parse_count(" "), None);
    assert_eq!(parse_count("n/a"), None);
  }
}
