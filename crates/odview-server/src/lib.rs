//! HTTP layer for the odview dashboard.
//!
//! Thin wiring: configuration, request tracing, and the mounted JSON API.
//! The front end (charts, tables, templates) consumes `/api` and is built
//! and served separately.

use std::{path::PathBuf, sync::Arc};

use axum::Router;
use odview_core::store::StatsStore;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

/// Runtime server configuration, deserialised from `config.toml` with
/// `ODVIEW_`-prefixed environment overrides.
#[derive(Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
  pub host:          String,
  pub port:          u16,
  pub database_path: PathBuf,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:          "127.0.0.1".into(),
      port:          8080,
      database_path: PathBuf::from("od-deaths.sqlite"),
    }
  }
}

/// Build the server [`Router`]: the JSON API under `/api`, with request
/// tracing.
pub fn router<S>(store: Arc<S>) -> Router
where
  S: StatsStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  Router::new()
    .nest("/api", odview_api::api_router(store))
    .layer(TraceLayer::new_for_http())
}
