//! JSON REST API for odview.
//!
//! Exposes an axum [`Router`] backed by any [`odview_core::store::StatsStore`].
//! Chart rendering and templating are the front end's responsibility; this
//! layer only serves the data behind the plots and tables.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", odview_api::api_router(store.clone()))
//! ```

pub mod error;
pub mod plots;
pub mod tables;

use std::sync::Arc;

use axum::{routing::get, Router};
use odview_core::store::StatsStore;

pub use error::ApiError;

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: StatsStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  Router::new()
    // Reference data
    .route("/locations", get(tables::locations::<S>))
    .route("/od-types", get(tables::od_types::<S>))
    // Plot data
    .route("/plots/map", get(plots::map_values::<S>))
    .route("/plots/map/periods", get(plots::map_periods::<S>))
    .route("/plots/time", get(plots::time_series::<S>))
    // Raw data tables
    .route("/tables/death-counts", get(tables::death_counts::<S>))
    .route("/tables/populations", get(tables::populations::<S>))
    .with_state(store)
}
