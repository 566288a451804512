//! Handlers for reference data and the raw data-table views.

use std::sync::Arc;

use axum::{
  extract::{Query, State},
  Json,
};
use odview_core::{
  data::{DeathCountRow, Location, PopulationRow},
  store::StatsStore,
};
use serde::Deserialize;

use crate::error::ApiError;

/// `GET /locations` — national aggregate first, then states by name.
pub async fn locations<S>(
  State(store): State<Arc<S>>,
) -> Result<Json<Vec<Location>>, ApiError>
where
  S: StatsStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let locations = store
    .locations()
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(locations))
}

#[derive(Debug, Deserialize)]
pub struct OdTypesParams {
  pub location: String,
}

/// `GET /od-types?location=<abbr>` — OD types with data for a location.
pub async fn od_types<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<OdTypesParams>,
) -> Result<Json<Vec<String>>, ApiError>
where
  S: StatsStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let types = store
    .od_types_for_location(&params.location)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(types))
}

/// `GET /tables/death-counts` — the raw death-count table.
pub async fn death_counts<S>(
  State(store): State<Arc<S>>,
) -> Result<Json<Vec<DeathCountRow>>, ApiError>
where
  S: StatsStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let rows = store
    .death_count_rows()
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(rows))
}

/// `GET /tables/populations` — the raw population table.
pub async fn populations<S>(
  State(store): State<Arc<S>>,
) -> Result<Json<Vec<PopulationRow>>, ApiError>
where
  S: StatsStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let rows = store
    .population_rows()
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(rows))
}
