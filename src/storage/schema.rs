//! Database schema definitions for the run history.

/// SQL schema for creating all database tables.
pub const SCHEMA: &str = r#"
-- One row per completed pipeline run
CREATE TABLE IF NOT EXISTS history (
    id TEXT PRIMARY KEY,
    created_at TEXT NOT NULL,
    source_name TEXT NOT NULL,
    weight_kg REAL NOT NULL,
    vo2max REAL NOT NULL,
    plateau_reached INTEGER NOT NULL,
    key_metrics_json TEXT NOT NULL,
    stats_json TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_history_created_at ON history(created_at);
"#;

/// Schema version tracking table
pub const SCHEMA_VERSION_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
);
"#;

/// Current schema version
pub const CURRENT_VERSION: i32 = 1;

/// Ordered schema steps, keyed by the version they produce.
pub const MIGRATIONS: &[(i32, &str)] = &[(1, SCHEMA)];
