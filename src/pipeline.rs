//! End-to-end processing of one CPET series.
//!
//! raw rows -> cleaned rows (+ audit log, stats) -> smoothed rows ->
//! key metrics -> percentile rows. Every stage receives its own copy of the
//! previous stage's output, so all intermediate series stay inspectable in the
//! returned [`PipelineRun`].

use crate::cleaning::{clean_series, AuditLogEntry, CleaningStats};
use crate::metrics::auc::{integrate_vo2, AucResult};
use crate::metrics::error::{AnalysisError, AnalysisResult};
use crate::metrics::key_metrics::{calculate_key_metrics_with, KeyMetrics};
use crate::metrics::percentiles::extract_percentiles_with_step;
use crate::metrics::smoothing::smooth_series_with;
use crate::series::derived::recompute_all;
use crate::series::import_csv::read_csv;
use crate::series::stages::MAX_TIME_STAGES;
use crate::series::types::{Row, SeriesError};
use crate::storage::config::{validate_weight, AnalysisSettings};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// All outputs of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRun {
    /// Body weight the run was computed with (kg)
    pub weight_kg: f64,
    /// Input series with derived channels computed
    pub raw: Vec<Row>,
    /// Series after outlier rejection and gap interpolation
    pub cleaned: Vec<Row>,
    pub audit_log: Vec<AuditLogEntry>,
    pub stats: CleaningStats,
    /// Three-point smoothed series
    pub smoothed: Vec<Row>,
    pub key_metrics: KeyMetrics,
    /// Rows where VO2 first reaches each percentage of the peak
    pub percentiles: Vec<Row>,
}

impl PipelineRun {
    /// O2 volume on the smoothed series between two percentages of the peak.
    ///
    /// Fails for a pair outside 0-100 or not strictly increasing. `Ok(None)`
    /// means the series never spans the requested bracket.
    pub fn auc(&self, start_percent: f64, end_percent: f64) -> AnalysisResult<Option<AucResult>> {
        let in_range = |p: f64| (0.0..=100.0).contains(&p);
        if !in_range(start_percent) || !in_range(end_percent) {
            return Err(AnalysisError::InvalidInput(format!(
                "AUC bounds must lie within 0-100%, got {}-{}",
                start_percent, end_percent
            )));
        }
        if start_percent >= end_percent {
            return Err(AnalysisError::InvalidInput(format!(
                "AUC start {}% must be below end {}%",
                start_percent, end_percent
            )));
        }

        Ok(integrate_vo2(
            &self.smoothed,
            self.key_metrics.vo2max,
            start_percent,
            end_percent,
        ))
    }
}

/// Run the full pipeline on one series.
///
/// `duration` overrides the elapsed test time used for stage segmentation.
pub fn run_pipeline(
    rows: &[Row],
    weight_kg: f64,
    duration: Option<f64>,
    settings: &AnalysisSettings,
) -> AnalysisResult<PipelineRun> {
    if !validate_weight(weight_kg) {
        return Err(AnalysisError::InvalidInput(format!(
            "Body weight must be a positive number of kilograms, got {}",
            weight_kg
        )));
    }
    if let Some(d) = duration {
        if !(d > 0.0) || !d.is_finite() {
            return Err(AnalysisError::InvalidInput(format!(
                "Test duration must be positive, got {}",
                d
            )));
        }
        if d / settings.metrics_stage_secs > MAX_TIME_STAGES as f64 {
            return Err(AnalysisError::InvalidInput(format!(
                "Test duration {} s exceeds {} stages of {} s",
                d, MAX_TIME_STAGES, settings.metrics_stage_secs
            )));
        }
    }

    let raw = recompute_all(rows, weight_kg);

    let cleaning = clean_series(&raw, weight_kg, settings);
    let smoothed = smooth_series_with(&cleaning.rows, weight_kg, settings);
    let key_metrics = calculate_key_metrics_with(&smoothed, duration, settings);
    let percentiles =
        extract_percentiles_with_step(&smoothed, key_metrics.vo2max, settings.percentile_step);

    tracing::info!(
        "Pipeline complete: {} rows, {} removed, {} interpolated, {} {:.3} L/min",
        raw.len(),
        cleaning.stats.outliers_removed,
        cleaning.stats.points_interpolated,
        key_metrics.vo2_label(),
        key_metrics.vo2max
    );

    Ok(PipelineRun {
        weight_kg,
        raw,
        cleaned: cleaning.rows,
        audit_log: cleaning.audit_log,
        stats: cleaning.stats,
        smoothed,
        key_metrics,
        percentiles,
    })
}

/// One series queued for batch processing.
#[derive(Debug, Clone)]
pub struct BatchInput {
    /// Label reported with the result, usually the file name
    pub name: String,
    pub rows: Vec<Row>,
    pub weight_kg: f64,
    pub duration: Option<f64>,
}

/// Read CSV files into batch inputs.
///
/// Unreadable files are returned next to the inputs instead of stopping the
/// batch, keyed by the same display name the inputs carry.
pub fn load_batch(
    paths: &[PathBuf],
    weight_kg: f64,
    duration: Option<f64>,
) -> (Vec<BatchInput>, Vec<(String, SeriesError)>) {
    let mut inputs = Vec::with_capacity(paths.len());
    let mut failures = Vec::new();

    for path in paths {
        let name = path.display().to_string();
        match read_csv(path, weight_kg) {
            Ok(rows) => inputs.push(BatchInput {
                name,
                rows,
                weight_kg,
                duration,
            }),
            Err(e) => {
                tracing::debug!("Could not read {}: {}", name, e);
                failures.push((name, e));
            }
        }
    }

    (inputs, failures)
}

/// Run independent pipelines over several series.
///
/// A failing input yields an error in its own slot and does not affect the others.
pub fn run_batch(
    inputs: &[BatchInput],
    settings: &AnalysisSettings,
) -> Vec<(String, AnalysisResult<PipelineRun>)> {
    inputs
        .iter()
        .map(|input| {
            let result = run_pipeline(&input.rows, input.weight_kg, input.duration, settings);
            if let Err(e) = &result {
                tracing::warn!("Batch input {} failed: {}", input.name, e);
            }
            (input.name.clone(), result)
        })
        .collect()
}
