//! [`SqliteStore`] — the SQLite implementation of [`StatsStore`].

use std::path::Path;

use odview_core::{
  data::{
    CategoryMapping, Dataset, DeathCount, DeathCountRow, Location, MapPeriod,
    MapValue, PopulationAnchor, PopulationRow, Statistic, TimePoint,
    NATIONAL_ABBR,
  },
  month::MonthDate,
  store::StatsStore,
};
use rusqlite::OptionalExtension as _;

use crate::{schema::SCHEMA, Error, Result};

// ─── Store ───────────────────────────────────────────────────────────────────

/// An odview statistics store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Whether the derived table currently exists.
  pub async fn derived_exists(&self) -> Result<bool> {
    let exists: bool = self
      .conn
      .call(|conn| {
        let exists = conn
          .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'derived_data'",
            [],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        Ok(exists)
      })
      .await?;
    Ok(exists)
  }

  /// Bail out with [`Error::DerivedDataMissing`] unless a rebuild has
  /// published the derived table.
  async fn require_derived(&self) -> Result<()> {
    if self.derived_exists().await? {
      Ok(())
    } else {
      Err(Error::DerivedDataMissing)
    }
  }

  /// Read the complete content of the normalized tables.
  pub async fn load_dataset(&self) -> Result<Dataset> {
    let dataset = self
      .conn
      .call(|conn| {
        let locations = conn
          .prepare("SELECT abbr, name FROM locations ORDER BY abbr")?
          .query_map([], |row| {
            Ok(Location { abbr: row.get(0)?, name: row.get(1)? })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let od_types = conn
          .prepare("SELECT indicator, od_type FROM od_types ORDER BY indicator")?
          .query_map([], |row| {
            Ok(CategoryMapping { indicator: row.get(0)?, od_type: row.get(1)? })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let death_counts = conn
          .prepare(
            "SELECT location_abbr, year, month, indicator, death_count
             FROM death_counts
             ORDER BY location_abbr, year, month, indicator",
          )?
          .query_map([], |row| {
            Ok(DeathCount {
              location_abbr: row.get(0)?,
              date:          MonthDate { year: row.get(1)?, month: row.get(2)? },
              indicator:     row.get(3)?,
              deaths:        row.get(4)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let populations = conn
          .prepare(
            "SELECT location_abbr, year, population
             FROM populations
             ORDER BY location_abbr, year",
          )?
          .query_map([], |row| {
            Ok(PopulationAnchor {
              location_abbr: row.get(0)?,
              year:          row.get(1)?,
              population:    row.get(2)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(Dataset { locations, od_types, death_counts, populations })
      })
      .await?;
    Ok(dataset)
  }

  /// Read the full derived table in key order. Mainly for tests and the
  /// idempotence contract; the query layer uses the targeted reads below.
  pub async fn derived_rows(&self) -> Result<Vec<odview_core::data::DerivedRow>> {
    self.require_derived().await?;
    let rows = self
      .conn
      .call(|conn| {
        let rows = conn
          .prepare(
            "SELECT location_abbr, year, month, indicator, od_type,
                    death_count, per_capita, percent_change
             FROM derived_data
             ORDER BY location_abbr, year, month, indicator",
          )?
          .query_map([], |row| {
            Ok(odview_core::data::DerivedRow {
              location_abbr:  row.get(0)?,
              date:           MonthDate { year: row.get(1)?, month: row.get(2)? },
              indicator:      row.get(3)?,
              od_type:        row.get(4)?,
              death_count:    row.get(5)?,
              per_capita:     row.get(6)?,
              percent_change: row.get(7)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(rows)
  }
}

// ─── Query SQL ───────────────────────────────────────────────────────────────

// Type-level aggregation: death counts sum over the indicators of a type,
// and per-capita rates sum too (every indicator row of a cell shares the
// same population denominator). Percent change cannot be summed row-wise,
// so it is recomputed from current and prior-year count sums, preserving
// the null-on-zero-prior rule.

const TIME_SQL_DEATH_COUNT: &str = "
  SELECT printf('%04d-%02d', year, month) AS period, od_type,
         CAST(SUM(death_count) AS REAL) AS value
  FROM derived_data
  WHERE location_abbr = ?1 AND od_type IN (__OD_TYPES__)
  GROUP BY year, month, od_type
  ORDER BY year, month, od_type";

const TIME_SQL_NORMALIZED: &str = "
  SELECT printf('%04d-%02d', year, month) AS period, od_type,
         SUM(per_capita) AS value
  FROM derived_data
  WHERE location_abbr = ?1 AND od_type IN (__OD_TYPES__)
    AND per_capita IS NOT NULL
  GROUP BY year, month, od_type
  ORDER BY year, month, od_type";

const TIME_SQL_PERCENT_CHANGE: &str = "
  WITH agg AS (
    SELECT year, month, od_type, SUM(death_count) AS deaths
    FROM derived_data
    WHERE location_abbr = ?1
    GROUP BY year, month, od_type
  )
  SELECT printf('%04d-%02d', cur.year, cur.month) AS period, cur.od_type,
         (cur.deaths - prior.deaths) * 100.0 / prior.deaths AS value
  FROM agg AS cur
  JOIN agg AS prior
    ON prior.year = cur.year - 1
   AND prior.month = cur.month
   AND prior.od_type = cur.od_type
  WHERE prior.deaths <> 0 AND cur.od_type IN (__OD_TYPES__)
  ORDER BY cur.year, cur.month, cur.od_type";

const MAP_SQL_DEATH_COUNT: &str = "
  SELECT d.location_abbr, l.name, CAST(SUM(d.death_count) AS REAL) AS value
  FROM derived_data AS d
  JOIN locations AS l ON l.abbr = d.location_abbr
  WHERE d.od_type = ?1 AND d.year = ?2 AND d.month = ?3
    AND d.location_abbr <> ?4
  GROUP BY d.location_abbr
  ORDER BY d.location_abbr";

const MAP_SQL_NORMALIZED: &str = "
  SELECT d.location_abbr, l.name, SUM(d.per_capita) AS value
  FROM derived_data AS d
  JOIN locations AS l ON l.abbr = d.location_abbr
  WHERE d.od_type = ?1 AND d.year = ?2 AND d.month = ?3
    AND d.location_abbr <> ?4 AND d.per_capita IS NOT NULL
  GROUP BY d.location_abbr
  ORDER BY d.location_abbr";

const MAP_SQL_PERCENT_CHANGE: &str = "
  WITH agg AS (
    SELECT location_abbr, year, month, SUM(death_count) AS deaths
    FROM derived_data
    WHERE od_type = ?1
    GROUP BY location_abbr, year, month
  )
  SELECT cur.location_abbr, l.name,
         (cur.deaths - prior.deaths) * 100.0 / prior.deaths AS value
  FROM agg AS cur
  JOIN agg AS prior
    ON prior.location_abbr = cur.location_abbr
   AND prior.year = cur.year - 1
   AND prior.month = cur.month
  JOIN locations AS l ON l.abbr = cur.location_abbr
  WHERE cur.year = ?2 AND cur.month = ?3 AND cur.location_abbr <> ?4
    AND prior.deaths <> 0
  ORDER BY cur.location_abbr";

/// The OD type shown on the map: every death-count observation, one bucket.
const MAP_OD_TYPE: &str = "all_drug_od";

/// Replace the `__OD_TYPES__` marker with numbered placeholders `?2..?n`.
/// SQLite cannot bind a series as a single parameter.
fn expand_od_types(sql: &str, count: usize) -> String {
  let placeholders: Vec<String> =
    (0..count).map(|i| format!("?{}", i + 2)).collect();
  sql.replace("__OD_TYPES__", &placeholders.join(", "))
}

// ─── StatsStore impl ─────────────────────────────────────────────────────────

impl StatsStore for SqliteStore {
  type Error = Error;

  async fn locations(&self) -> Result<Vec<Location>> {
    let rows = self
      .conn
      .call(|conn| {
        let rows = conn
          .prepare(
            "SELECT abbr, name FROM locations
             ORDER BY (abbr <> ?1), name",
          )?
          .query_map(rusqlite::params![NATIONAL_ABBR], |row| {
            Ok(Location { abbr: row.get(0)?, name: row.get(1)? })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(rows)
  }

  async fn od_types_for_location<'a>(&'a self, abbr: &'a str) -> Result<Vec<String>> {
    self.require_derived().await?;
    let abbr = abbr.to_owned();
    let rows = self
      .conn
      .call(move |conn| {
        let rows = conn
          .prepare(
            "SELECT DISTINCT od_type FROM derived_data
             WHERE location_abbr = ?1
             ORDER BY od_type",
          )?
          .query_map(rusqlite::params![abbr], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(rows)
  }

  async fn map_periods(&self) -> Result<Vec<MapPeriod>> {
    self.require_derived().await?;
    let rows = self
      .conn
      .call(|conn| {
        let rows = conn
          .prepare(
            "SELECT printf('%04d-%02d', year, month) AS period,
                    MAX(percent_change IS NOT NULL) AS includes_percent_change
             FROM derived_data
             WHERE od_type = ?1
             GROUP BY year, month
             ORDER BY year, month",
          )?
          .query_map(rusqlite::params![MAP_OD_TYPE], |row| {
            Ok(MapPeriod {
              period:                  row.get(0)?,
              includes_percent_change: row.get(1)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(rows)
  }

  async fn map_values(
    &self,
    statistic: Statistic,
    period: MonthDate,
  ) -> Result<Vec<MapValue>> {
    self.require_derived().await?;
    let sql = match statistic {
      Statistic::DeathCount => MAP_SQL_DEATH_COUNT,
      Statistic::NormalizedDeathCount => MAP_SQL_NORMALIZED,
      Statistic::PercentChange => MAP_SQL_PERCENT_CHANGE,
    };
    let rows = self
      .conn
      .call(move |conn| {
        let rows = conn
          .prepare(sql)?
          .query_map(
            rusqlite::params![MAP_OD_TYPE, period.year, period.month, NATIONAL_ABBR],
            |row| {
              Ok(MapValue {
                location_abbr: row.get(0)?,
                location:      row.get(1)?,
                value:         row.get(2)?,
              })
            },
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(rows)
  }

  async fn time_series<'a>(
    &'a self,
    abbr: &'a str,
    statistic: Statistic,
    od_types: &'a [String],
  ) -> Result<Vec<TimePoint>> {
    self.require_derived().await?;
    if od_types.is_empty() {
      return Ok(Vec::new());
    }
    let sql = match statistic {
      Statistic::DeathCount => TIME_SQL_DEATH_COUNT,
      Statistic::NormalizedDeathCount => TIME_SQL_NORMALIZED,
      Statistic::PercentChange => TIME_SQL_PERCENT_CHANGE,
    };
    let sql = expand_od_types(sql, od_types.len());
    let params: Vec<String> = std::iter::once(abbr.to_owned())
      .chain(od_types.iter().cloned())
      .collect();

    let rows = self
      .conn
      .call(move |conn| {
        let rows = conn
          .prepare(&sql)?
          .query_map(rusqlite::params_from_iter(params), |row| {
            Ok(TimePoint {
              period:  row.get(0)?,
              od_type: row.get(1)?,
              value:   row.get(2)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(rows)
  }

  async fn death_count_rows(&self) -> Result<Vec<DeathCountRow>> {
    let rows = self
      .conn
      .call(|conn| {
        let rows = conn
          .prepare(
            "SELECT l.name, d.year, d.month, d.indicator, d.death_count
             FROM death_counts AS d
             JOIN locations AS l ON l.abbr = d.location_abbr
             ORDER BY l.name, d.year, d.month, d.indicator",
          )?
          .query_map([], |row| {
            Ok(DeathCountRow {
              location:    row.get(0)?,
              year:        row.get(1)?,
              month:       row.get(2)?,
              indicator:   row.get(3)?,
              death_count: row.get(4)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(rows)
  }

  async fn population_rows(&self) -> Result<Vec<PopulationRow>> {
    let rows = self
      .conn
      .call(|conn| {
        let rows = conn
          .prepare(
            "SELECT l.name, p.year, p.population
             FROM populations AS p
             JOIN locations AS l ON l.abbr = p.location_abbr
             ORDER BY l.name, p.year",
          )?
          .query_map([], |row| {
            Ok(PopulationRow {
              location:   row.get(0)?,
              year:       row.get(1)?,
              population: row.get(2)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(rows)
  }
}
