//! Integration tests for smoothing, key metrics, percentiles and AUC.

mod common;

use common::{constant_rows, incremental_test, label};
use cpetlab::metrics::{
    calculate_key_metrics, extract_percentiles, integrate_vo2, smooth_series, SMOOTHED_CHANNELS,
};
use cpetlab::series::derived::recompute_all;
use cpetlab::{Channel, Row};

#[test]
fn test_constant_short_series_is_peak() {
    let rows = recompute_all(&constant_rows(10, Channel::Vo2, 2.0), 70.0);
    let metrics = calculate_key_metrics(&rows, None);

    assert!((metrics.vo2max - 2.0).abs() < 1e-9);
    assert!((metrics.vo2max_kg - 28.57).abs() < 0.01);
    assert!(!metrics.plateau_reached);
    assert!(metrics.is_peak);
    assert_eq!(metrics.plateau_stage_summary.as_ref().map(|s| s.len()), Some(1));
}

#[test]
fn test_auc_upper_threshold_never_reached() {
    // peaks at 2.5 L/min, thresholds are 2.0 and 2.8
    let rows: Vec<Row> = (0..=25)
        .map(|i| Row::new(label(i * 10), (i * 10) as f64).with(Channel::Vo2, i as f64 / 10.0))
        .collect();

    assert!(integrate_vo2(&rows, 4.0, 50.0, 70.0).is_none());
}

#[test]
fn test_auc_within_bracket() {
    let rows: Vec<Row> = (0..=40)
        .map(|i| Row::new(label(i * 10), (i * 10) as f64).with(Channel::Vo2, i as f64 / 10.0))
        .collect();

    let result = integrate_vo2(&rows, 4.0, 50.0, 70.0).unwrap();
    assert!((result.start_vo2 - 2.0).abs() < 1e-9);
    assert!((result.end_vo2 - 2.8).abs() < 1e-9);
    // trapezoids over a straight line: mean 2.4 L/min for 80 s
    assert!((result.liters - 3.2).abs() < 1e-9);
}

#[test]
fn test_smoother_window_exact() {
    let rows = recompute_all(&incremental_test(40), 70.0);
    let smoothed = smooth_series(&rows, 70.0);

    assert_eq!(smoothed.len(), rows.len());
    for channel in SMOOTHED_CHANNELS {
        for i in 0..2 {
            assert_eq!(smoothed[i].get(channel), rows[i].get(channel));
        }
        for i in 2..rows.len() {
            let (a, b, c) = (
                rows[i - 2].get(channel).unwrap(),
                rows[i - 1].get(channel).unwrap(),
                rows[i].get(channel).unwrap(),
            );
            assert_eq!(smoothed[i].get(channel), Some((a + b + c) / 3.0));
        }
    }
}

#[test]
fn test_derived_channels_idempotent() {
    let rows = incremental_test(30);
    let once = recompute_all(&rows, 70.0);
    let twice = recompute_all(&once, 70.0);
    assert_eq!(once, twice);
}

#[test]
fn test_plateau_consistency() {
    let rows = smooth_series(&recompute_all(&incremental_test(100), 70.0), 70.0);
    let metrics = calculate_key_metrics(&rows, None);

    assert!(metrics.plateau_reached);
    let summary = metrics.plateau_stage_summary.as_ref().unwrap();
    assert!(summary.len() >= 2);
    let last = summary.last().unwrap();
    assert!(last.delta.unwrap() < 0.15);
    assert!(metrics.plateau_comparison.is_some());
    assert!(metrics.plateau_time.is_some());
}

#[test]
fn test_duration_override_changes_staging() {
    let rows = recompute_all(&incremental_test(100), 70.0);
    let natural = calculate_key_metrics(&rows, None);
    let extended = calculate_key_metrics(&rows, Some(1800.0));

    assert_eq!(natural.plateau_stage_summary.as_ref().unwrap().len(), 6);
    assert_eq!(extended.plateau_stage_summary.as_ref().unwrap().len(), 10);
    assert_eq!(extended.duration, Some(1800.0));
}

#[test]
fn test_percentile_ordering() {
    let rows = smooth_series(&recompute_all(&incremental_test(100), 70.0), 70.0);
    let metrics = calculate_key_metrics(&rows, None);
    let percentiles = extract_percentiles(&rows, metrics.vo2max);

    assert!(!percentiles.is_empty());
    assert_eq!(percentiles.last().and_then(|r| r.percentage), Some(100));
    for pair in percentiles.windows(2) {
        assert!(pair[0].percentage < pair[1].percentage);
        assert!(pair[0].time_seconds < pair[1].time_seconds);
    }
    for row in &percentiles {
        let threshold = metrics.vo2max * row.percentage.unwrap() as f64 / 100.0;
        assert!(row.vo2.unwrap() >= threshold);
    }
}

#[test]
fn test_oversized_duration_override_yields_no_stages() {
    let rows = recompute_all(&incremental_test(30), 70.0);
    let metrics = calculate_key_metrics(&rows, Some(1e20));

    assert!(metrics.plateau_stage_summary.is_none());
    assert!(!metrics.plateau_reached);
    assert!(metrics.vo2max > 0.0);
}

#[test]
fn test_percentiles_skip_repeated_timestamps() {
    let mut rows = recompute_all(&incremental_test(40), 70.0);
    let repeated = rows[20].clone().with(Channel::Vo2, rows[20].vo2.unwrap() + 0.05);
    rows.insert(21, repeated);
    let peak = rows.iter().filter_map(|r| r.vo2).fold(0.0_f64, f64::max);

    let percentiles = extract_percentiles(&rows, peak);
    for pair in percentiles.windows(2) {
        assert!(pair[0].time_seconds < pair[1].time_seconds);
    }
}
