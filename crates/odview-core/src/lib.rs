//! Core types and the derived-data pipeline for the odview dashboard.
//!
//! This crate is deliberately free of HTTP and database dependencies. It
//! holds the domain model (locations, death-count observations, population
//! anchors), the population interpolator, and the pure derived-data builder.
//! All other crates depend on it; it depends on nothing proprietary.

pub mod data;
pub mod derive;
pub mod error;
pub mod interpolate;
pub mod month;
pub mod store;

pub use error::{Error, Result};
