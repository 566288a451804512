//! SQL schema for the odview SQLite store.
//!
//! The normalized tables are executed once at connection startup and are
//! idempotent. The derived table is deliberately NOT part of the startup
//! schema: it is dropped and recreated wholesale by the rebuild pipeline,
//! and its absence is a defined, visible state (a rebuild failed or has not
//! run yet).

/// Normalized-table DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS locations (
    abbr TEXT PRIMARY KEY,
    name TEXT NOT NULL
);

-- Maps a raw reporting indicator to the coarser OD type used for plotting.
CREATE TABLE IF NOT EXISTS od_types (
    indicator TEXT PRIMARY KEY,
    od_type   TEXT NOT NULL
);

-- Reported death counts. Missing (location, year, month, indicator)
-- combinations are reporting gaps, never zeros.
CREATE TABLE IF NOT EXISTS death_counts (
    location_abbr TEXT    NOT NULL REFERENCES locations(abbr),
    year          INTEGER NOT NULL,
    month         INTEGER NOT NULL CHECK (month BETWEEN 1 AND 12),
    indicator     TEXT    NOT NULL REFERENCES od_types(indicator),
    death_count   INTEGER NOT NULL,
    PRIMARY KEY (location_abbr, year, month, indicator)
);

-- Annual census estimates, one per location per year, anchored at July 1.
CREATE TABLE IF NOT EXISTS populations (
    location_abbr TEXT    NOT NULL REFERENCES locations(abbr),
    year          INTEGER NOT NULL,
    population    INTEGER NOT NULL,
    PRIMARY KEY (location_abbr, year)
);

PRAGMA user_version = 1;
";

/// Derived-table DDL. No `IF NOT EXISTS`: the rebuild drops the table first,
/// so hitting an existing one means the orchestration was violated.
pub const DERIVED_SCHEMA: &str = "
CREATE TABLE derived_data (
    location_abbr  TEXT    NOT NULL REFERENCES locations(abbr),
    year           INTEGER NOT NULL,
    month          INTEGER NOT NULL,
    indicator      TEXT    NOT NULL,
    od_type        TEXT    NOT NULL,
    death_count    INTEGER NOT NULL,
    per_capita     REAL,
    percent_change REAL,
    PRIMARY KEY (location_abbr, year, month, indicator)
);

CREATE INDEX derived_od_type_idx ON derived_data(od_type);
";

/// Idempotent: dropping a nonexistent derived table is a no-op.
pub const DROP_DERIVED: &str = "DROP TABLE IF EXISTS derived_data;";
