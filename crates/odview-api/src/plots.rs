//! Handlers for `/plots` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/plots/map` | `?statistic=S&period=YYYY-MM` |
//! | `GET`  | `/plots/map/periods` | Selectable periods + percent-change flags |
//! | `GET`  | `/plots/time` | `?location=ABBR&statistic=S&od_types=a,b,c` |
//!
//! `statistic` takes the wire values `death_count`, `normalized_death_count`
//! and `percent_change`.

use std::sync::Arc;

use axum::{
  extract::{Query, State},
  Json,
};
use odview_core::{
  data::{MapPeriod, MapValue, Statistic, TimePoint},
  month::MonthDate,
  store::StatsStore,
};
use serde::Deserialize;

use crate::error::ApiError;

// ─── Map plot ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct MapParams {
  pub statistic: Statistic,
  /// ISO-style period, e.g. `2018-03`.
  pub period:    String,
}

/// `GET /plots/map?statistic=<s>&period=<YYYY-MM>`
pub async fn map_values<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<MapParams>,
) -> Result<Json<Vec<MapValue>>, ApiError>
where
  S: StatsStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let period = MonthDate::parse_period(&params.period)
    .ok_or_else(|| ApiError::BadRequest(format!("invalid period: {:?}", params.period)))?;

  let values = store
    .map_values(params.statistic, period)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(values))
}

/// `GET /plots/map/periods`
pub async fn map_periods<S>(
  State(store): State<Arc<S>>,
) -> Result<Json<Vec<MapPeriod>>, ApiError>
where
  S: StatsStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let periods = store
    .map_periods()
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(periods))
}

// ─── Time-series plot ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TimeParams {
  pub location:  String,
  pub statistic: Statistic,
  /// Comma-separated OD type selection, e.g. `heroin,cocaine`.
  pub od_types:  String,
}

/// `GET /plots/time?location=<abbr>&statistic=<s>&od_types=<a,b,c>`
pub async fn time_series<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<TimeParams>,
) -> Result<Json<Vec<TimePoint>>, ApiError>
where
  S: StatsStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let od_types: Vec<String> = params
    .od_types
    .split(',')
    .map(str::trim)
    .filter(|t| !t.is_empty())
    .map(str::to_owned)
    .collect();
  if od_types.is_empty() {
    return Err(ApiError::BadRequest("od_types must name at least one type".into()));
  }

  let points = store
    .time_series(&params.location, params.statistic, &od_types)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(points))
}
