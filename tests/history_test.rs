//! History repository tests against both implementations.

mod common;

use common::noisy_incremental_test;
use cpetlab::storage::{InMemoryHistory, SqliteHistory};
use cpetlab::{run_pipeline, AnalysisSettings, HistoryRecord, HistoryRepository};
use uuid::Uuid;

fn completed_record(name: &str) -> HistoryRecord {
    let run = run_pipeline(&noisy_incremental_test(), 70.0, None, &AnalysisSettings::default())
        .expect("pipeline run");
    HistoryRecord::from_run(name, &run)
}

fn exercise_repository(repo: &mut dyn HistoryRepository) {
    assert!(repo.list().unwrap().is_empty());

    let first = completed_record("first.csv");
    let first_id = repo.append(first.clone()).unwrap();
    assert_eq!(first_id, first.id);
    repo.append(completed_record("second.csv")).unwrap();
    repo.append(completed_record("third.csv")).unwrap();

    let records = repo.list().unwrap();
    let names: Vec<&str> = records.iter().map(|r| r.source_name.as_str()).collect();
    assert_eq!(names, vec!["first.csv", "second.csv", "third.csv"]);
    assert_eq!(records[0].stats, first.stats);
    assert_eq!(records[0].key_metrics.plateau_reached, first.key_metrics.plateau_reached);
    assert!((records[0].key_metrics.vo2max - first.key_metrics.vo2max).abs() < 1e-9);

    assert!(repo.delete(first_id).unwrap());
    assert!(!repo.delete(first_id).unwrap());
    assert!(!repo.delete(Uuid::new_v4()).unwrap());
    assert_eq!(repo.list().unwrap().len(), 2);

    repo.clear().unwrap();
    assert!(repo.list().unwrap().is_empty());
}

#[test]
fn test_in_memory_history() {
    let mut repo = InMemoryHistory::new();
    exercise_repository(&mut repo);
}

#[test]
fn test_sqlite_history_in_memory() {
    let mut repo = SqliteHistory::open_in_memory().unwrap();
    exercise_repository(&mut repo);
}

#[test]
fn test_sqlite_history_persists() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.db");
    let record = completed_record("persisted.csv");

    {
        let mut repo = SqliteHistory::open(&path).unwrap();
        repo.append(record.clone()).unwrap();
    }

    let repo = SqliteHistory::open(&path).unwrap();
    let records = repo.list().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, record.id);
    assert_eq!(records[0].created_at, record.created_at);
    assert_eq!(records[0].weight_kg, 70.0);
}
