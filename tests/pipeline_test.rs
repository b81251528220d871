//! End-to-end pipeline tests.

mod common;

use common::{constant_rows, noisy_incremental_test};
use cpetlab::metrics::AnalysisError;
use cpetlab::series::exporter_csv::{export_audit_csv, export_rows_csv, export_summary_csv};
use cpetlab::series::{parse_csv, SeriesError};
use cpetlab::{
    load_batch, run_batch, run_pipeline, AnalysisSettings, AuditAction, BatchInput, Channel,
};

#[test]
fn test_constant_series_through_pipeline() {
    let rows = constant_rows(10, Channel::Vo2, 2.0);
    let run = run_pipeline(&rows, 70.0, None, &AnalysisSettings::default()).unwrap();

    assert!((run.key_metrics.vo2max - 2.0).abs() < 1e-9);
    assert!((run.key_metrics.vo2max_kg - 28.57).abs() < 0.01);
    assert!(!run.key_metrics.plateau_reached);
    assert!(run.key_metrics.is_peak);
    assert!(run.audit_log.is_empty());
}

#[test]
fn test_pipeline_is_deterministic() {
    let rows = noisy_incremental_test();
    let settings = AnalysisSettings::default();

    let first = run_pipeline(&rows, 72.0, None, &settings).unwrap();
    let second = run_pipeline(&rows, 72.0, None, &settings).unwrap();

    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn test_stages_keep_independent_copies() {
    let rows = noisy_incremental_test();
    let run = run_pipeline(&rows, 70.0, None, &AnalysisSettings::default()).unwrap();

    // the raw copy keeps the spike, the cleaned copy has it interpolated
    assert_eq!(run.raw[40].ve, Some(500.0));
    assert_ne!(run.cleaned[40].ve, Some(500.0));
    assert_eq!(rows[40].ve, Some(500.0));

    // smoothing did not write back into the cleaned series
    assert_ne!(run.cleaned[50].vo2, run.smoothed[50].vo2);

    assert!(run
        .audit_log
        .iter()
        .any(|e| e.index == 40 && e.action == AuditAction::Interpolated));
}

#[test]
fn test_key_metrics_come_from_smoothed_series() {
    let rows = noisy_incremental_test();
    let run = run_pipeline(&rows, 70.0, None, &AnalysisSettings::default()).unwrap();

    let smoothed_max = run
        .smoothed
        .iter()
        .filter_map(|r| r.vo2)
        .fold(0.0_f64, f64::max);
    assert_eq!(run.key_metrics.vo2max, smoothed_max);
    assert!(run.key_metrics.plateau_reached);
    assert_eq!(run.key_metrics.vo2_label(), "VO2max");
}

#[test]
fn test_auc_on_run() {
    let rows = noisy_incremental_test();
    let run = run_pipeline(&rows, 70.0, None, &AnalysisSettings::default()).unwrap();

    let auc = run.auc(50.0, 80.0).unwrap().expect("bracket is spanned");
    assert!(auc.liters > 0.0);
    assert!(auc.end_time > auc.start_time);

    assert!(matches!(
        run.auc(80.0, 50.0),
        Err(AnalysisError::InvalidInput(_))
    ));
}

#[test]
fn test_invalid_weight_rejected() {
    let rows = constant_rows(10, Channel::Vo2, 2.0);
    let result = run_pipeline(&rows, 0.0, None, &AnalysisSettings::default());
    assert!(matches!(result, Err(AnalysisError::InvalidInput(_))));
}

#[test]
fn test_batch_runs_are_independent() {
    let inputs = vec![
        BatchInput {
            name: "noisy".to_string(),
            rows: noisy_incremental_test(),
            weight_kg: 70.0,
            duration: None,
        },
        BatchInput {
            name: "no weight".to_string(),
            rows: noisy_incremental_test(),
            weight_kg: 0.0,
            duration: None,
        },
        BatchInput {
            name: "flat".to_string(),
            rows: constant_rows(10, Channel::Vo2, 2.0),
            weight_kg: 70.0,
            duration: None,
        },
    ];

    let results = run_batch(&inputs, &AnalysisSettings::default());
    let single = run_pipeline(&inputs[0].rows, 70.0, None, &AnalysisSettings::default()).unwrap();

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].1.as_ref().unwrap(), &single);
    assert!(results[1].1.is_err());
    assert!(results[2].1.is_ok());
}

#[test]
fn test_csv_in_csv_out() {
    let mut content = String::from("Time,VO2,VCO2,VE,HR,VT,BF\n");
    for row in noisy_incremental_test() {
        let cell = |v: Option<f64>| v.map_or(String::new(), |v| v.to_string());
        content.push_str(&format!(
            "{},{},{},{},{},{},{}\n",
            row.time_label,
            cell(row.vo2),
            cell(row.vco2),
            cell(row.ve),
            cell(row.hr),
            cell(row.vt),
            cell(row.bf),
        ));
    }

    let rows = parse_csv(&content, 70.0).unwrap();
    assert_eq!(rows.len(), 100);
    assert_eq!(rows[22].vo2, None);

    let settings = AnalysisSettings::default();
    let run = run_pipeline(&rows, 70.0, None, &settings).unwrap();
    let direct = run_pipeline(&noisy_incremental_test(), 70.0, None, &settings).unwrap();
    assert_eq!(run, direct);

    let cleaned = export_rows_csv(&run.cleaned, 3).unwrap();
    assert_eq!(cleaned.lines().count(), 101);
    assert!(cleaned.lines().nth(23).unwrap().starts_with("3:40,220,"));

    let audit = export_audit_csv(&run.audit_log, 3).unwrap();
    assert_eq!(audit.lines().count(), run.audit_log.len() + 1);

    let summary = export_summary_csv(&run.key_metrics, &run.stats).unwrap();
    assert!(summary.lines().nth(1).unwrap().contains("VO2max"));
}

#[test]
fn test_unreadable_files_do_not_stop_batch() {
    let dir = tempfile::tempdir().unwrap();
    let good = dir.path().join("good.csv");
    std::fs::write(&good, "Time,VO2\n0:10,1.5\n0:20,1.6\n").unwrap();
    let no_time = dir.path().join("no_time.csv");
    std::fs::write(&no_time, "VO2\n1.5\n").unwrap();
    let missing = dir.path().join("missing.csv");
    let later = dir.path().join("later.csv");
    std::fs::write(&later, "Time,VO2\n0:10,2.0\n").unwrap();

    let paths = vec![good.clone(), no_time, missing, later.clone()];
    let (inputs, failures) = load_batch(&paths, 70.0, None);

    let names: Vec<String> = inputs.iter().map(|i| i.name.clone()).collect();
    assert_eq!(
        names,
        vec![good.display().to_string(), later.display().to_string()]
    );
    assert_eq!(failures.len(), 2);
    assert!(matches!(failures[0].1, SeriesError::MissingColumn(_)));
    assert!(matches!(failures[1].1, SeriesError::Io(_)));

    let results = run_batch(&inputs, &AnalysisSettings::default());
    assert!(results.iter().all(|(_, r)| r.is_ok()));
}

#[test]
fn test_oversized_duration_rejected() {
    let rows = noisy_incremental_test();
    let result = run_pipeline(&rows, 70.0, Some(1e20), &AnalysisSettings::default());
    assert!(matches!(result, Err(AnalysisError::InvalidInput(_))));
}
