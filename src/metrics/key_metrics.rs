//! Peak values and VO2 plateau determination.
//!
//! The series is cut into fixed-duration stages. Each stage is summarised by
//! the mean VO2 over its terminal window, and a plateau is declared when the
//! last stage-over-stage rise falls below `plateau_threshold`. Without a
//! plateau the reported maximum is a peak value rather than a true VO2max.

use crate::series::stages::{time_stages, TimeStage};
use crate::series::types::Row;
use crate::storage::config::AnalysisSettings;
use serde::{Deserialize, Serialize};

/// Summary of one fixed-duration stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlateauStageSummary {
    /// One-based stage number
    pub stage: usize,
    /// Actual stage duration (s)
    pub duration_secs: f64,
    /// Mean VO2 over the terminal window (L/min)
    pub average_vo2: Option<f64>,
    /// Rise over the previous stage's average (L/min)
    pub delta: Option<f64>,
    /// The whole stage was averaged because it was too short for a terminal window
    pub partial_window: bool,
}

/// The two stage averages compared for the plateau decision.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlateauComparison {
    pub previous: f64,
    pub last: f64,
}

/// Headline metrics of a test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyMetrics {
    /// Highest VO2 (L/min)
    pub vo2max: f64,
    /// Highest relative VO2 (ml/kg/min)
    pub vo2max_kg: f64,
    /// Highest ventilation (L/min)
    pub vemax: f64,
    /// Highest heart rate (bpm)
    pub hrmax: f64,
    /// Highest respiratory exchange ratio
    pub rermax: f64,
    pub plateau_reached: bool,
    /// No plateau: the maximum is a peak value
    pub is_peak: bool,
    /// Time label where the plateau criterion was met
    pub plateau_time: Option<String>,
    pub plateau_comparison: Option<PlateauComparison>,
    pub plateau_stage_summary: Option<Vec<PlateauStageSummary>>,
    /// Externally supplied test duration (s)
    pub duration: Option<f64>,
}

impl Default for KeyMetrics {
    fn default() -> Self {
        Self {
            vo2max: 0.0,
            vo2max_kg: 0.0,
            vemax: 0.0,
            hrmax: 0.0,
            rermax: 0.0,
            plateau_reached: false,
            is_peak: true,
            plateau_time: None,
            plateau_comparison: None,
            plateau_stage_summary: None,
            duration: None,
        }
    }
}

impl KeyMetrics {
    /// Label for the headline value.
    pub fn vo2_label(&self) -> &'static str {
        if self.is_peak {
            "VO2peak"
        } else {
            "VO2max"
        }
    }
}

/// Result of the plateau procedure.
#[derive(Debug, Clone, PartialEq, Default)]
struct PlateauOutcome {
    reached: bool,
    time: Option<String>,
    comparison: Option<PlateauComparison>,
    summary: Vec<PlateauStageSummary>,
}

/// Key metrics with default settings.
pub fn calculate_key_metrics(rows: &[Row], duration: Option<f64>) -> KeyMetrics {
    calculate_key_metrics_with(rows, duration, &AnalysisSettings::default())
}

/// Compute maxima and the plateau decision.
///
/// `duration` overrides the elapsed time used for staging.
pub fn calculate_key_metrics_with(
    rows: &[Row],
    duration: Option<f64>,
    settings: &AnalysisSettings,
) -> KeyMetrics {
    if rows.is_empty() {
        return KeyMetrics {
            duration,
            ..Default::default()
        };
    }

    let plateau = plateau_analysis(rows, duration, settings);

    let metrics = KeyMetrics {
        vo2max: max_of(rows, |r| r.vo2),
        vo2max_kg: max_of(rows, |r| r.derived.vo2_kg),
        vemax: max_of(rows, |r| r.ve),
        hrmax: max_of(rows, |r| r.hr),
        rermax: max_of(rows, |r| r.derived.rer),
        plateau_reached: plateau.reached,
        is_peak: !plateau.reached,
        plateau_time: plateau.time,
        plateau_comparison: plateau.comparison,
        plateau_stage_summary: if plateau.summary.is_empty() {
            None
        } else {
            Some(plateau.summary)
        },
        duration,
    };

    tracing::info!(
        "{} {:.3} L/min ({:.1} ml/kg/min), plateau: {}",
        metrics.vo2_label(),
        metrics.vo2max,
        metrics.vo2max_kg,
        metrics.plateau_reached
    );

    metrics
}

/// Largest finite value of a channel, 0 when there is none.
fn max_of(rows: &[Row], value: impl Fn(&Row) -> Option<f64>) -> f64 {
    rows.iter()
        .filter_map(value)
        .filter(|v| v.is_finite())
        .fold(None, |max: Option<f64>, v| Some(max.map_or(v, |m| m.max(v))))
        .unwrap_or(0.0)
}

fn plateau_analysis(
    rows: &[Row],
    duration: Option<f64>,
    settings: &AnalysisSettings,
) -> PlateauOutcome {
    let stages = time_stages(rows, settings.metrics_stage_secs, duration);
    if stages.is_empty() {
        return PlateauOutcome::default();
    }

    let mut summary: Vec<PlateauStageSummary> = Vec::with_capacity(stages.len());
    for stage in &stages {
        let (average_vo2, partial_window) = terminal_average(rows, stage, settings);

        let delta = match (summary.last().and_then(|s| s.average_vo2), average_vo2) {
            (Some(previous), Some(current)) if previous > 0.0 && current > 0.0 => {
                Some(current - previous)
            }
            _ => None,
        };

        summary.push(PlateauStageSummary {
            stage: stage.index + 1,
            duration_secs: stage.duration_secs(),
            average_vo2,
            delta,
            partial_window,
        });
    }

    let mut outcome = PlateauOutcome::default();

    if summary.len() >= 2 {
        let last = &summary[summary.len() - 1];
        let previous = &summary[summary.len() - 2];

        if let Some(delta) = last.delta {
            if delta < settings.plateau_threshold {
                let last_stage = &stages[stages.len() - 1];
                outcome.reached = true;
                outcome.time = rows
                    .iter()
                    .find(|r| r.time_seconds >= last_stage.start_secs)
                    .or_else(|| rows.last())
                    .map(|r| r.time_label.clone());
                // delta is only set when both averages exist
                if let (Some(p), Some(l)) = (previous.average_vo2, last.average_vo2) {
                    outcome.comparison = Some(PlateauComparison {
                        previous: p,
                        last: l,
                    });
                }
            }
            tracing::debug!(
                "Stage {} delta {:.3} L/min vs threshold {}",
                last.stage,
                delta,
                settings.plateau_threshold
            );
        }
    }

    outcome.summary = summary;
    outcome
}

/// Mean VO2 over a stage's terminal window and whether the whole stage was used.
fn terminal_average(
    rows: &[Row],
    stage: &TimeStage,
    settings: &AnalysisSettings,
) -> (Option<f64>, bool) {
    let window = settings.terminal_window_secs;
    let short_final = stage.is_final && stage.duration_secs() < settings.metrics_stage_secs;
    let partial_window = short_final && stage.duration_secs() <= window;

    let window_start = if partial_window {
        stage.start_secs
    } else {
        stage.end_secs - window
    };

    let values: Vec<f64> = rows
        .iter()
        .filter(|r| stage.contains(r.time_seconds) && r.time_seconds >= window_start)
        .filter_map(|r| r.vo2.filter(|v| v.is_finite()))
        .collect();

    if values.is_empty() {
        return (None, partial_window);
    }

    (
        Some(values.iter().sum::<f64>() / values.len() as f64),
        partial_window,
    )
}
