//! The derived-data builder.
//!
//! A pure function from a snapshot of the normalized tables to the complete
//! set of derived statistic rows. All persistence belongs to the rebuild
//! orchestrator in the store crate; keeping the computation pure keeps it
//! trivially testable and makes repeated rebuilds produce identical output.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::{
  data::{Dataset, DerivedRow},
  interpolate::PopulationSeries,
  month::MonthDate,
  Error, Result,
};

/// Unit population for normalized death counts: rates are deaths per
/// 100,000 people.
pub const UNIT_POPULATION: f64 = 100_000.0;

/// Build the full derived table content from a normalized-data snapshot.
///
/// One output row per death-count observation; no row is synthesized for
/// cells with no underlying observation. Rows come out sorted by
/// (location, year, month, indicator), so two builds over the same snapshot
/// are row-for-row identical.
///
/// Fails if any observation references a location or indicator missing from
/// the reference tables, or if two observations share a key.
pub fn build_derived(dataset: &Dataset) -> Result<Vec<DerivedRow>> {
  let known_locations: HashSet<&str> =
    dataset.locations.iter().map(|l| l.abbr.as_str()).collect();
  let od_types: HashMap<&str, &str> = dataset
    .od_types
    .iter()
    .map(|m| (m.indicator.as_str(), m.od_type.as_str()))
    .collect();

  // Observations keyed by the composite tuple, so "missing" stays
  // structurally distinct from "zero" and prior-year lookups are direct.
  let mut counts: BTreeMap<(&str, MonthDate, &str), i64> = BTreeMap::new();
  for obs in &dataset.death_counts {
    if !known_locations.contains(obs.location_abbr.as_str()) {
      return Err(Error::UnknownLocation(obs.location_abbr.clone()));
    }
    if !od_types.contains_key(obs.indicator.as_str()) {
      return Err(Error::UnknownIndicator(obs.indicator.clone()));
    }
    let key = (obs.location_abbr.as_str(), obs.date, obs.indicator.as_str());
    if counts.insert(key, obs.deaths).is_some() {
      return Err(Error::DuplicateObservation {
        location_abbr: obs.location_abbr.clone(),
        year:          obs.date.year,
        month:         obs.date.month,
        indicator:     obs.indicator.clone(),
      });
    }
  }

  let populations = population_series(dataset);

  let mut rows = Vec::with_capacity(counts.len());
  for (&(abbr, date, indicator), &deaths) in &counts {
    let per_capita = populations
      .get(abbr)
      .and_then(|series| series.estimate(date))
      .filter(|population| *population > 0.0)
      .map(|population| deaths as f64 * UNIT_POPULATION / population);

    let percent_change = counts
      .get(&(abbr, date.prior_year(), indicator))
      .and_then(|&prior| {
        // Zero prior leaves the change undefined, not infinite.
        (prior != 0).then(|| (deaths - prior) as f64 * 100.0 / prior as f64)
      });

    rows.push(DerivedRow {
      location_abbr: abbr.to_owned(),
      date,
      indicator: indicator.to_owned(),
      od_type: od_types[indicator].to_owned(),
      death_count: deaths,
      per_capita,
      percent_change,
    });
  }
  Ok(rows)
}

/// One interpolation series per location that has population anchors.
fn population_series(dataset: &Dataset) -> HashMap<&str, PopulationSeries> {
  let mut by_location: HashMap<&str, Vec<(i32, i64)>> = HashMap::new();
  for anchor in &dataset.populations {
    by_location
      .entry(anchor.location_abbr.as_str())
      .or_default()
      .push((anchor.year, anchor.population));
  }
  by_location
    .into_iter()
    .map(|(abbr, observations)| (abbr, PopulationSeries::new(observations)))
    .collect()
}
