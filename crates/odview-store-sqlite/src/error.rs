//! Error type for `odview-store-sqlite`.

use thiserror::Error;

use crate::rebuild::RebuildStep;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] odview_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  /// A normalized-table write referenced a nonexistent location or
  /// indicator, or violated a primary key. The enclosing transaction was
  /// rolled back.
  #[error("referential integrity violation: {0}")]
  ReferentialIntegrity(String),

  /// A read against the derived table found it absent. A rebuild has not
  /// run, or the last one failed.
  #[error("derived data table is missing; run a rebuild")]
  DerivedDataMissing,

  /// A rebuild step failed; the derived table is absent, never partial.
  #[error("rebuild aborted during {step}: {source}")]
  RebuildAborted {
    step:   RebuildStep,
    #[source]
    source: Box<Error>,
  },
}

impl Error {
  /// Wrap a step failure, lifting constraint violations into
  /// [`Error::ReferentialIntegrity`] so callers can tell a bad update apart
  /// from an I/O failure.
  pub(crate) fn aborted(step: RebuildStep, source: Error) -> Self {
    Error::RebuildAborted { step, source: Box::new(source.classify()) }
  }

  fn classify(self) -> Self {
    match self {
      Error::Database(tokio_rusqlite::Error::Rusqlite(
        rusqlite::Error::SqliteFailure(failure, message),
      )) if failure.code == rusqlite::ErrorCode::ConstraintViolation => {
        Error::ReferentialIntegrity(
          message.unwrap_or_else(|| failure.to_string()),
        )
      }
      other => other,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
