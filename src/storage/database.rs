//! Database operations using rusqlite.

use crate::storage::history::{HistoryRecord, HistoryRepository};
use crate::storage::schema::{MIGRATIONS, SCHEMA_VERSION_TABLE};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Result as SqliteResult};
use std::path::Path;
use thiserror::Error;
use uuid::Uuid;

/// SQLite-backed run history.
pub struct SqliteHistory {
    conn: Connection,
}

impl SqliteHistory {
    /// Open or create a database at the given path.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| DatabaseError::IoError(e.to_string()))?;
        }
        Self::with_connection(Connection::open(path))
    }

    /// Open a history that lives only as long as the value.
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        Self::with_connection(Connection::open_in_memory())
    }

    fn with_connection(conn: SqliteResult<Connection>) -> Result<Self, DatabaseError> {
        let mut conn = conn.map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;
        apply_migrations(&mut conn)?;
        Ok(Self { conn })
    }

    /// Highest schema version applied to this database.
    pub fn schema_version(&self) -> Result<i32, DatabaseError> {
        applied_version(&self.conn).map_err(|e| DatabaseError::QueryFailed(e.to_string()))
    }

    /// Get a single record by id.
    pub fn get(&self, id: Uuid) -> Result<Option<HistoryRecord>, DatabaseError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, created_at, source_name, weight_kg, key_metrics_json, stats_json
                 FROM history WHERE id = ?1",
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        let result = stmt.query_row(params![id.to_string()], HistoryRow::from_sql);

        match result {
            Ok(row) => Ok(Some(row.into_record()?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(DatabaseError::QueryFailed(e.to_string())),
        }
    }
}

impl HistoryRepository for SqliteHistory {
    fn append(&mut self, record: HistoryRecord) -> Result<Uuid, DatabaseError> {
        let key_metrics_json = serde_json::to_string(&record.key_metrics)
            .map_err(|e| DatabaseError::SerializationError(e.to_string()))?;
        let stats_json = serde_json::to_string(&record.stats)
            .map_err(|e| DatabaseError::SerializationError(e.to_string()))?;

        self.conn
            .execute(
                "INSERT INTO history (id, created_at, source_name, weight_kg, vo2max,
                 plateau_reached, key_metrics_json, stats_json)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    record.id.to_string(),
                    record.created_at.to_rfc3339(),
                    record.source_name,
                    record.weight_kg,
                    record.key_metrics.vo2max,
                    record.key_metrics.plateau_reached,
                    key_metrics_json,
                    stats_json,
                ],
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        tracing::debug!("Saved history record {} ({})", record.id, record.source_name);

        Ok(record.id)
    }

    fn list(&self) -> Result<Vec<HistoryRecord>, DatabaseError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, created_at, source_name, weight_kg, key_metrics_json, stats_json
                 FROM history ORDER BY rowid",
            )
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        let rows = stmt
            .query_map([], HistoryRow::from_sql)
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        let mut records = Vec::new();
        for row in rows {
            let row = row.map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;
            records.push(row.into_record()?);
        }

        Ok(records)
    }

    fn delete(&mut self, id: Uuid) -> Result<bool, DatabaseError> {
        let deleted = self
            .conn
            .execute("DELETE FROM history WHERE id = ?1", params![id.to_string()])
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        Ok(deleted > 0)
    }

    fn clear(&mut self) -> Result<(), DatabaseError> {
        self.conn
            .execute("DELETE FROM history", [])
            .map_err(|e| DatabaseError::QueryFailed(e.to_string()))?;

        Ok(())
    }
}

fn applied_version(conn: &Connection) -> SqliteResult<i32> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )
}

fn migration_failed(e: rusqlite::Error) -> DatabaseError {
    DatabaseError::MigrationFailed(e.to_string())
}

/// Apply every entry of [`MIGRATIONS`] newer than the stored version.
///
/// Each step runs in its own transaction together with its version row.
fn apply_migrations(conn: &mut Connection) -> Result<(), DatabaseError> {
    conn.execute_batch(SCHEMA_VERSION_TABLE)
        .map_err(migration_failed)?;
    let applied = applied_version(conn).map_err(migration_failed)?;

    for &(version, sql) in MIGRATIONS.iter().filter(|(v, _)| *v > applied) {
        let tx = conn.transaction().map_err(migration_failed)?;
        tx.execute_batch(sql).map_err(migration_failed)?;
        tx.execute(
            "INSERT INTO schema_version (version, applied_at) VALUES (?1, ?2)",
            params![version, Utc::now().to_rfc3339()],
        )
        .map_err(migration_failed)?;
        tx.commit().map_err(migration_failed)?;

        tracing::info!("History schema at version {}", version);
    }

    Ok(())
}

/// Raw history row as stored.
struct HistoryRow {
    id: String,
    created_at: String,
    source_name: String,
    weight_kg: f64,
    key_metrics_json: String,
    stats_json: String,
}

impl HistoryRow {
    fn from_sql(row: &rusqlite::Row<'_>) -> SqliteResult<Self> {
        Ok(Self {
            id: row.get(0)?,
            created_at: row.get(1)?,
            source_name: row.get(2)?,
            weight_kg: row.get(3)?,
            key_metrics_json: row.get(4)?,
            stats_json: row.get(5)?,
        })
    }

    fn into_record(self) -> Result<HistoryRecord, DatabaseError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| DatabaseError::DeserializationError(format!("Invalid UUID: {}", e)))?;

        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                DatabaseError::DeserializationError(format!("Invalid created date: {}", e))
            })?;

        let key_metrics = serde_json::from_str(&self.key_metrics_json)
            .map_err(|e| DatabaseError::DeserializationError(e.to_string()))?;
        let stats = serde_json::from_str(&self.stats_json)
            .map_err(|e| DatabaseError::DeserializationError(e.to_string()))?;

        Ok(HistoryRecord {
            id,
            created_at,
            source_name: self.source_name,
            weight_kg: self.weight_kg,
            key_metrics,
            stats,
        })
    }
}

/// Database errors.
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Record not found: {0}")]
    NotFound(Uuid),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Deserialization error: {0}")]
    DeserializationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleaning::CleaningStats;
    use crate::metrics::key_metrics::KeyMetrics;
    use crate::storage::schema::CURRENT_VERSION;

    fn create_test_record(name: &str) -> HistoryRecord {
        HistoryRecord {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            source_name: name.to_string(),
            weight_kg: 70.0,
            key_metrics: KeyMetrics {
                vo2max: 3.25,
                hrmax: 181.0,
                ..KeyMetrics::default()
            },
            stats: CleaningStats {
                outliers_removed: 2,
                points_interpolated: 5,
                values_restored: 1,
            },
        }
    }

    #[test]
    fn test_create_in_memory_database() {
        let db = SqliteHistory::open_in_memory().expect("Failed to create database");
        assert_eq!(db.schema_version().unwrap(), CURRENT_VERSION);
    }

    #[test]
    fn test_tables_created() {
        let db = SqliteHistory::open_in_memory().expect("Failed to create database");

        let tables: Vec<String> = db
            .conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        assert!(tables.contains(&"history".to_string()));
        assert!(tables.contains(&"schema_version".to_string()));
    }

    #[test]
    fn test_append_and_get() {
        let mut db = SqliteHistory::open_in_memory().unwrap();
        let record = create_test_record("test01.csv");
        let id = db.append(record.clone()).unwrap();

        let loaded = db.get(id).unwrap().expect("record should exist");
        assert_eq!(loaded.source_name, "test01.csv");
        assert_eq!(loaded.created_at, record.created_at);
        assert_eq!(loaded.key_metrics.vo2max, 3.25);
        assert_eq!(loaded.stats, record.stats);

        assert!(db.get(Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn test_reopen_keeps_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("history.db");

        {
            let mut db = SqliteHistory::open(&path).unwrap();
            db.append(create_test_record("a.csv")).unwrap();
        }

        let db = SqliteHistory::open(&path).unwrap();
        assert_eq!(db.list().unwrap().len(), 1);
        assert_eq!(db.schema_version().unwrap(), CURRENT_VERSION);

        let version_rows: i64 = db
            .conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version_rows, MIGRATIONS.len() as i64);
    }

    #[test]
    fn test_migrations_end_at_current_version() {
        let versions: Vec<i32> = MIGRATIONS.iter().map(|(v, _)| *v).collect();
        assert!(versions.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(versions.last(), Some(&CURRENT_VERSION));
    }
}
