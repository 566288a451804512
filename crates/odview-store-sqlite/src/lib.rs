//! SQLite backend for the odview statistics store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated
//! thread without blocking the async runtime. The normalized tables are
//! created at open; the derived table is owned entirely by the rebuild
//! pipeline in [`rebuild`].

mod schema;
mod store;

pub mod error;
pub mod rebuild;

pub use error::{Error, Result};
pub use rebuild::{RebuildReport, RebuildStep};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
