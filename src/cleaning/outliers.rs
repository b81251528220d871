//! Stage-wise outlier rejection.
//!
//! Runs over complete fixed row-count stages only; the trailing partial stage
//! is left untouched. Two passes per stage:
//! - a statistical band (mean ± k·SD) per primary channel, with the first
//!   rows of the stage excluded from the statistic
//! - a heart-rate artifact check (absolute bounds and isolated jumps)

use crate::cleaning::audit::AuditLog;
use crate::series::derived::recompute_all;
use crate::series::stages::{complete_row_stages, RowStage};
use crate::series::types::{Channel, Row};
use crate::storage::config::AnalysisSettings;

/// Rows with rejected values nulled, plus the removal log.
#[derive(Debug, Clone)]
pub struct DetectionOutcome {
    pub rows: Vec<Row>,
    pub log: AuditLog,
}

/// Mean and population standard deviation of a sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandStats {
    pub mean: f64,
    pub sd: f64,
    pub count: usize,
}

impl BandStats {
    /// Compute over `values`; `None` with fewer than `min_count` values.
    pub fn from_values(values: &[f64], min_count: usize) -> Option<Self> {
        let count = values.len();
        if count == 0 || count < min_count {
            return None;
        }

        let mean = values.iter().sum::<f64>() / count as f64;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count as f64;

        Some(Self {
            mean,
            sd: variance.sqrt(),
            count,
        })
    }

    /// Whether `value` lies outside mean ± `multiplier`·SD.
    pub fn is_outlier(&self, value: f64, multiplier: f64) -> bool {
        (value - self.mean).abs() > multiplier * self.sd
    }
}

/// Detect and null outliers using default settings.
pub fn detect_outliers(rows: &[Row], weight_kg: f64) -> DetectionOutcome {
    detect_outliers_with(rows, weight_kg, &AnalysisSettings::default())
}

/// Detect and null outliers.
///
/// The input is not modified; derived channels of the returned rows are
/// recomputed from the surviving primary values.
pub fn detect_outliers_with(
    rows: &[Row],
    weight_kg: f64,
    settings: &AnalysisSettings,
) -> DetectionOutcome {
    let mut working = rows.to_vec();
    let mut log = AuditLog::new();

    for stage in complete_row_stages(working.len(), settings.cleaning_stage_rows) {
        let before = log.len();

        for channel in Channel::ALL {
            statistical_pass(&mut working, &stage, channel, settings, &mut log);
        }
        heart_rate_pass(&mut working, &stage, settings, &mut log);

        let removed = log.len() - before;
        if removed > 0 {
            tracing::info!(
                "Stage {} (rows {}..{}): {} values rejected",
                stage.number(),
                stage.start,
                stage.end,
                removed
            );
        }
    }

    DetectionOutcome {
        rows: recompute_all(&working, weight_kg),
        log,
    }
}

/// Null values outside the stage's statistical band for one channel.
fn statistical_pass(
    rows: &mut [Row],
    stage: &RowStage,
    channel: Channel,
    settings: &AnalysisSettings,
    log: &mut AuditLog,
) {
    let sample_start = (stage.start + settings.transient_rows).min(stage.end);
    let sample: Vec<f64> = rows[sample_start..stage.end]
        .iter()
        .filter_map(|r| r.valid(channel))
        .collect();

    let Some(band) = BandStats::from_values(&sample, settings.min_band_values.max(2)) else {
        return;
    };

    for index in stage.start..stage.end {
        let Some(value) = rows[index].valid(channel) else {
            continue;
        };

        if band.is_outlier(value, settings.sd_multiplier) {
            let reason = format!(
                "Stage {}: {} value {:.3} outside mean ± {} SD (mean={:.3}, SD={:.3})",
                stage.number(),
                channel,
                value,
                settings.sd_multiplier,
                band.mean,
                band.sd
            );
            tracing::debug!("Row {} ({}): {}", index, rows[index].time_label, reason);

            log.record_removal(index, &rows[index], channel, value, reason);
            rows[index].set(channel, None);
        }
    }
}

/// Reject physiologically impossible heart rates and isolated HR jumps.
///
/// A rise of more than `hr_jump` over the previous row is treated as a sensor
/// artifact unless VO2 or VE rises with it.
fn heart_rate_pass(
    rows: &mut [Row],
    stage: &RowStage,
    settings: &AnalysisSettings,
    log: &mut AuditLog,
) {
    for index in stage.start..stage.end {
        let Some(hr) = rows[index].valid(Channel::Hr) else {
            continue;
        };

        let reason = if hr <= settings.hr_min_exclusive || hr > settings.hr_max {
            Some(format!(
                "Stage {}: HR {:.0} outside physiological range ({:.0}, {:.0}]",
                stage.number(),
                hr,
                settings.hr_min_exclusive,
                settings.hr_max
            ))
        } else if index > stage.start {
            let previous = &rows[index - 1];
            let current = &rows[index];
            match previous.valid(Channel::Hr) {
                Some(prev_hr) if hr - prev_hr > settings.hr_jump => {
                    let rises = |channel: Channel| {
                        matches!(
                            (previous.valid(channel), current.valid(channel)),
                            (Some(a), Some(b)) if b > a
                        )
                    };

                    if !rises(Channel::Vo2) && !rises(Channel::Ve) {
                        Some(format!(
                            "Stage {}: HR jump of +{:.0} bpm without VO2/VE rise",
                            stage.number(),
                            hr - prev_hr
                        ))
                    } else {
                        None
                    }
                }
                _ => None,
            }
        } else {
            None
        };

        if let Some(reason) = reason {
            tracing::debug!("Row {} ({}): {}", index, rows[index].time_label, reason);
            log.record_removal(index, &rows[index], Channel::Hr, hr, reason);
            rows[index].set(Channel::Hr, None);
        }
    }
}
