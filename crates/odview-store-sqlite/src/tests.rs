//! Integration tests for `SqliteStore` against an in-memory database.

use odview_core::{
  data::{
    CategoryMapping, Dataset, DeathCount, Location, PopulationAnchor,
    Statistic,
  },
  month::MonthDate,
  store::StatsStore,
};

use crate::{Error, RebuildStep, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn month(year: i32, month: u32) -> MonthDate {
  MonthDate::new(year, month).unwrap()
}

fn observation(abbr: &str, date: MonthDate, indicator: &str, deaths: i64) -> DeathCount {
  DeathCount {
    location_abbr: abbr.into(),
    date,
    indicator: indicator.into(),
    deaths,
  }
}

fn anchors(abbr: &str, population: i64) -> Vec<PopulationAnchor> {
  (2016..=2019)
    .map(|year| PopulationAnchor {
      location_abbr: abbr.into(),
      year,
      population,
    })
    .collect()
}

const ALL_DRUG: &str = "Number of Drug Overdose Deaths";
const HEROIN: &str = "Heroin (T40.1)";
const METHADONE: &str = "Methadone (T40.3)";
const SYNTH: &str = "Synthetic opioids, excl. methadone (T40.4)";

/// US + two states; CA has a prior-year count for percent change, TX does
/// not; TX has no population anchors at all.
fn dataset() -> Dataset {
  let mut death_counts = vec![
    observation("CA", month(2016, 6), ALL_DRUG, 100),
    observation("CA", month(2017, 6), ALL_DRUG, 150),
    observation("TX", month(2017, 6), ALL_DRUG, 80),
    observation("US", month(2017, 6), ALL_DRUG, 500),
    observation("CA", month(2017, 6), HEROIN, 30),
    observation("CA", month(2017, 6), METHADONE, 10),
    observation("CA", month(2017, 6), SYNTH, 20),
  ];
  death_counts.sort_by(|a, b| a.location_abbr.cmp(&b.location_abbr));

  let mut populations = anchors("CA", 39_000_000);
  populations.extend(anchors("US", 300_000_000));

  Dataset {
    locations: vec![
      Location { abbr: "US".into(), name: "United States".into() },
      Location { abbr: "CA".into(), name: "California".into() },
      Location { abbr: "TX".into(), name: "Texas".into() },
    ],
    od_types: vec![
      CategoryMapping { indicator: ALL_DRUG.into(), od_type: "all_drug_od".into() },
      CategoryMapping { indicator: HEROIN.into(), od_type: "heroin".into() },
      CategoryMapping { indicator: METHADONE.into(), od_type: "synthetic_opioids".into() },
      CategoryMapping { indicator: SYNTH.into(), od_type: "synthetic_opioids".into() },
    ],
    death_counts,
    populations,
  }
}

async fn rebuilt_store() -> SqliteStore {
  let s = store().await;
  s.rebuild(Some(dataset())).await.expect("rebuild");
  s
}

// ─── Rebuild ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn rebuild_produces_one_row_per_observation() {
  let s = rebuilt_store().await;
  let rows = s.derived_rows().await.unwrap();
  assert_eq!(rows.len(), dataset().death_counts.len());
}

#[tokio::test]
async fn rebuild_is_idempotent() {
  let s = rebuilt_store().await;
  let first = s.derived_rows().await.unwrap();
  s.rebuild(None).await.unwrap();
  let second = s.derived_rows().await.unwrap();
  assert_eq!(first, second);
}

#[tokio::test]
async fn rebuild_without_update_uses_existing_normalized_tables() {
  let s = store().await;
  s.rebuild(Some(dataset())).await.unwrap();
  s.drop_derived().await.unwrap();
  let report = s.rebuild(None).await.unwrap();
  assert_eq!(report.derived_rows, dataset().death_counts.len());
}

#[tokio::test]
async fn drop_derived_is_idempotent() {
  let s = store().await;
  s.drop_derived().await.unwrap();
  s.drop_derived().await.unwrap();
  assert!(!s.derived_exists().await.unwrap());
}

#[tokio::test]
async fn reads_before_any_rebuild_report_missing_derived_table() {
  let s = store().await;
  let err = s.map_periods().await.unwrap_err();
  assert!(matches!(err, Error::DerivedDataMissing));
}

#[tokio::test]
async fn bad_update_aborts_and_leaves_derived_absent() {
  let s = rebuilt_store().await;

  // An observation referencing a location with no `locations` row.
  let mut bad = dataset();
  bad.death_counts.push(observation("ZZ", month(2017, 6), ALL_DRUG, 1));

  let err = s.rebuild(Some(bad)).await.unwrap_err();
  match err {
    Error::RebuildAborted { step, source } => {
      assert_eq!(step, RebuildStep::RebuildingNormalized);
      assert!(matches!(*source, Error::ReferentialIntegrity(_)));
    }
    other => panic!("unexpected error: {other}"),
  }

  // Failed mid-sequence: derived gone, not stale and not partial.
  assert!(!s.derived_exists().await.unwrap());

  // The normalized replacement rolled back wholesale, so a plain rebuild
  // following the failure still works from the previous data.
  let report = s.rebuild(None).await.unwrap();
  assert_eq!(report.derived_rows, dataset().death_counts.len());
}

#[tokio::test]
async fn derived_rows_match_pure_builder_output() {
  let s = rebuilt_store().await;
  let stored = s.derived_rows().await.unwrap();
  let built = odview_core::derive::build_derived(&dataset()).unwrap();
  assert_eq!(stored, built);
}

// ─── Derived statistics ──────────────────────────────────────────────────────

#[tokio::test]
async fn percent_change_present_iff_prior_exists_and_nonzero() {
  let s = rebuilt_store().await;
  let rows = s.derived_rows().await.unwrap();

  let ca_2017 = rows
    .iter()
    .find(|r| r.location_abbr == "CA" && r.date == month(2017, 6) && r.indicator == ALL_DRUG)
    .unwrap();
  assert_eq!(ca_2017.percent_change, Some(50.0));

  let ca_2016 = rows
    .iter()
    .find(|r| r.location_abbr == "CA" && r.date == month(2016, 6))
    .unwrap();
  assert_eq!(ca_2016.percent_change, None);

  let tx_2017 = rows.iter().find(|r| r.location_abbr == "TX").unwrap();
  assert_eq!(tx_2017.percent_change, None);
}

#[tokio::test]
async fn per_capita_present_iff_population_estimate_exists() {
  let s = rebuilt_store().await;
  let rows = s.derived_rows().await.unwrap();

  // CA sits on flat 39M anchors: 150 deaths -> 150 per 390 hundred-thousands.
  let ca_2017 = rows
    .iter()
    .find(|r| r.location_abbr == "CA" && r.date == month(2017, 6) && r.indicator == ALL_DRUG)
    .unwrap();
  let rate = ca_2017.per_capita.unwrap();
  assert!((rate - 150.0 / 390.0).abs() < 1e-9, "got {rate}");

  // TX has no population anchors.
  let tx_2017 = rows.iter().find(|r| r.location_abbr == "TX").unwrap();
  assert_eq!(tx_2017.per_capita, None);
}

// ─── Query layer ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn locations_puts_national_aggregate_first_then_names() {
  let s = rebuilt_store().await;
  let locations = s.locations().await.unwrap();
  let abbrs: Vec<&str> = locations.iter().map(|l| l.abbr.as_str()).collect();
  assert_eq!(abbrs, ["US", "CA", "TX"]);
}

#[tokio::test]
async fn od_types_for_location() {
  let s = rebuilt_store().await;
  let types = s.od_types_for_location("CA").await.unwrap();
  assert_eq!(types, ["all_drug_od", "heroin", "synthetic_opioids"]);

  let types = s.od_types_for_location("TX").await.unwrap();
  assert_eq!(types, ["all_drug_od"]);
}

#[tokio::test]
async fn map_values_exclude_the_national_row() {
  let s = rebuilt_store().await;
  let values = s
    .map_values(Statistic::DeathCount, month(2017, 6))
    .await
    .unwrap();
  let abbrs: Vec<&str> = values.iter().map(|v| v.location_abbr.as_str()).collect();
  assert_eq!(abbrs, ["CA", "TX"]);
  assert_eq!(values[0].value, 150.0);
  assert_eq!(values[0].location, "California");
  assert_eq!(values[1].value, 80.0);
}

#[tokio::test]
async fn map_values_percent_change_needs_a_prior_year() {
  let s = rebuilt_store().await;
  let values = s
    .map_values(Statistic::PercentChange, month(2017, 6))
    .await
    .unwrap();
  // Only CA has a 2016 count to compare against.
  assert_eq!(values.len(), 1);
  assert_eq!(values[0].location_abbr, "CA");
  assert_eq!(values[0].value, 50.0);
}

#[tokio::test]
async fn map_periods_flag_percent_change_availability() {
  let s = rebuilt_store().await;
  let periods = s.map_periods().await.unwrap();
  assert_eq!(periods.len(), 2);
  assert_eq!(periods[0].period, "2016-06");
  assert!(!periods[0].includes_percent_change);
  assert_eq!(periods[1].period, "2017-06");
  assert!(periods[1].includes_percent_change);
}

#[tokio::test]
async fn time_series_sums_indicators_within_a_type() {
  let s = rebuilt_store().await;
  let od_types = vec!["synthetic_opioids".to_owned()];
  let points = s
    .time_series("CA", Statistic::DeathCount, &od_types)
    .await
    .unwrap();
  // Methadone (10) + other synthetics (20) collapse into one point.
  assert_eq!(points.len(), 1);
  assert_eq!(points[0].period, "2017-06");
  assert_eq!(points[0].value, 30.0);
}

#[tokio::test]
async fn time_series_selects_multiple_types() {
  let s = rebuilt_store().await;
  let od_types = vec!["all_drug_od".to_owned(), "heroin".to_owned()];
  let points = s
    .time_series("CA", Statistic::DeathCount, &od_types)
    .await
    .unwrap();
  let types: Vec<&str> = points.iter().map(|p| p.od_type.as_str()).collect();
  assert_eq!(types, ["all_drug_od", "all_drug_od", "heroin"]);
}

#[tokio::test]
async fn time_series_percent_change_recomputes_from_count_sums() {
  let s = rebuilt_store().await;
  let od_types = vec!["all_drug_od".to_owned()];
  let points = s
    .time_series("CA", Statistic::PercentChange, &od_types)
    .await
    .unwrap();
  assert_eq!(points.len(), 1);
  assert_eq!(points[0].period, "2017-06");
  assert_eq!(points[0].value, 50.0);
}

#[tokio::test]
async fn time_series_normalized_skips_cells_without_population() {
  let s = rebuilt_store().await;
  let od_types = vec!["all_drug_od".to_owned()];
  let points = s
    .time_series("TX", Statistic::NormalizedDeathCount, &od_types)
    .await
    .unwrap();
  assert!(points.is_empty());

  // CA's June 2016 cell predates its first (July 2016) population anchor,
  // so only the 2017 point carries a rate.
  let points = s
    .time_series("CA", Statistic::NormalizedDeathCount, &od_types)
    .await
    .unwrap();
  assert_eq!(points.len(), 1);
  assert_eq!(points[0].period, "2017-06");
  assert!((points[0].value - 150.0 / 390.0).abs() < 1e-9);
}

#[tokio::test]
async fn time_series_with_no_types_is_empty() {
  let s = rebuilt_store().await;
  let points = s
    .time_series("CA", Statistic::DeathCount, &[])
    .await
    .unwrap();
  assert!(points.is_empty());
}

// ─── Raw tables ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn raw_tables_expand_location_names() {
  let s = rebuilt_store().await;

  let deaths = s.death_count_rows().await.unwrap();
  assert_eq!(deaths.len(), dataset().death_counts.len());
  assert!(deaths.iter().any(|r| r.location == "California" && r.death_count == 150));

  let populations = s.population_rows().await.unwrap();
  assert_eq!(populations.len(), 8);
  assert!(populations.iter().all(|r| r.location != "Texas"));
}
