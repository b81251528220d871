//! Processing history.
//!
//! A record is appended once a pipeline run has fully completed. The
//! pipeline itself never touches a repository; callers inject one.

use crate::cleaning::CleaningStats;
use crate::metrics::key_metrics::KeyMetrics;
use crate::pipeline::PipelineRun;
use crate::storage::database::DatabaseError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Summary of one completed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    /// File or label the series came from
    pub source_name: String,
    pub weight_kg: f64,
    pub key_metrics: KeyMetrics,
    pub stats: CleaningStats,
}

impl HistoryRecord {
    /// Build a record from a finished run.
    pub fn from_run(source_name: impl Into<String>, run: &PipelineRun) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            source_name: source_name.into(),
            weight_kg: run.weight_kg,
            key_metrics: run.key_metrics.clone(),
            stats: run.stats,
        }
    }
}

/// Append-only store of completed runs.
pub trait HistoryRepository {
    /// Store a record, returning its id.
    fn append(&mut self, record: HistoryRecord) -> Result<Uuid, DatabaseError>;

    /// All records, oldest first.
    fn list(&self) -> Result<Vec<HistoryRecord>, DatabaseError>;

    /// Delete one record. Returns false when no record had that id.
    fn delete(&mut self, id: Uuid) -> Result<bool, DatabaseError>;

    /// Delete everything.
    fn clear(&mut self) -> Result<(), DatabaseError>;
}

/// Volatile repository, used in tests and when no data directory is available.
#[derive(Debug, Default)]
pub struct InMemoryHistory {
    records: Vec<HistoryRecord>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HistoryRepository for InMemoryHistory {
    fn append(&mut self, record: HistoryRecord) -> Result<Uuid, DatabaseError> {
        let id = record.id;
        self.records.push(record);
        Ok(id)
    }

    fn list(&self) -> Result<Vec<HistoryRecord>, DatabaseError> {
        Ok(self.records.clone())
    }

    fn delete(&mut self, id: Uuid) -> Result<bool, DatabaseError> {
        let before = self.records.len();
        self.records.retain(|r| r.id != id);
        Ok(self.records.len() != before)
    }

    fn clear(&mut self) -> Result<(), DatabaseError> {
        self.records.clear();
        Ok(())
    }
}
