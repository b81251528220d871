//! Gap interpolation after outlier rejection.
//!
//! Every null primary value is a candidate. Neighbours are searched only
//! inside the fixed row-count stage holding the gap, and a gap is bridged only
//! when the bracketing indices are at most `max_interpolation_gap` apart.
//!
//! The removal log from the detector is amended here:
//! - bridged removals are upgraded to `INTERPOLATED`
//! - bridged values that were missing from the source get a new entry
//! - when interpolation reproduces the rejected original (within
//!   `restore_tolerance`) the original is put back and its entry deleted
//! - unbridgeable removals stay `REMOVED`

use crate::cleaning::audit::{AuditAction, AuditKey, AuditLog, AuditLogEntry, CleaningStats};
use crate::cleaning::outliers::DetectionOutcome;
use crate::series::derived::recompute_all;
use crate::series::stages::row_stage_of;
use crate::series::types::{Channel, Row};
use crate::storage::config::AnalysisSettings;
use serde::{Deserialize, Serialize};

/// Final result of the cleaning stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleaningOutcome {
    /// Cleaned rows with derived channels recomputed
    pub rows: Vec<Row>,
    /// Ordered audit log
    pub audit_log: Vec<AuditLogEntry>,
    pub stats: CleaningStats,
}

/// How a single null is handled.
#[derive(Debug, Clone, PartialEq)]
enum GapDecision {
    Fill(f64),
    Restore(f64),
    Unbridgeable(String),
}

/// Interpolate gaps using default settings.
pub fn interpolate_gaps(detection: &DetectionOutcome, weight_kg: f64) -> CleaningOutcome {
    interpolate_gaps_with(detection, weight_kg, &AnalysisSettings::default())
}

/// Fill bridgeable gaps and amend the removal log.
pub fn interpolate_gaps_with(
    detection: &DetectionOutcome,
    weight_kg: f64,
    settings: &AnalysisSettings,
) -> CleaningOutcome {
    let mut rows = detection.rows.clone();
    let mut log = detection.log.clone();
    let mut restored = 0;

    for channel in Channel::ALL {
        let mut column: Vec<Option<f64>> = rows.iter().map(|r| r.valid(channel)).collect();

        for index in 0..column.len() {
            if column[index].is_some() {
                continue;
            }

            let key = AuditKey::new(index, channel);
            match decide(&column, index, log.get(&key), settings) {
                GapDecision::Fill(value) => {
                    tracing::debug!(
                        "Row {} ({}): {} interpolated to {:.3}",
                        index,
                        rows[index].time_label,
                        channel,
                        value
                    );
                    column[index] = Some(value);
                    log.record_interpolation(index, &rows[index], channel, value);
                }
                GapDecision::Restore(original) => {
                    tracing::debug!(
                        "Row {} ({}): {} interpolation reproduces rejected {:.6}, restoring",
                        index,
                        rows[index].time_label,
                        channel,
                        original
                    );
                    column[index] = Some(original);
                    log.remove(&key);
                    restored += 1;
                }
                GapDecision::Unbridgeable(detail) => {
                    if log.get(&key).is_some() {
                        tracing::debug!(
                            "Row {} ({}): {} could not interpolate ({})",
                            index,
                            rows[index].time_label,
                            channel,
                            detail
                        );
                        log.note_unbridgeable(&key, &detail);
                    }
                }
            }
        }

        for (row, value) in rows.iter_mut().zip(column) {
            row.set(channel, value);
        }
    }

    let stats = log.stats(restored);
    tracing::info!(
        "Cleaning finished: {} removed, {} interpolated, {} restored",
        stats.outliers_removed,
        stats.points_interpolated,
        stats.values_restored
    );

    CleaningOutcome {
        rows: recompute_all(&rows, weight_kg),
        audit_log: log.into_entries(),
        stats,
    }
}

/// Decide how to treat the null at `index`.
fn decide(
    column: &[Option<f64>],
    index: usize,
    existing: Option<&AuditLogEntry>,
    settings: &AnalysisSettings,
) -> GapDecision {
    let stage = row_stage_of(index, column.len(), settings.cleaning_stage_rows);

    let previous = (stage.start..index)
        .rev()
        .find_map(|j| column[j].map(|v| (j, v)));
    let next = (index + 1..stage.end).find_map(|j| column[j].map(|v| (j, v)));

    let ((p, vp), (q, vq)) = match (previous, next) {
        (Some(p), Some(q)) => (p, q),
        (None, _) => {
            return GapDecision::Unbridgeable(format!(
                "no valid value before it in stage {}",
                stage.number()
            ))
        }
        (_, None) => {
            return GapDecision::Unbridgeable(format!(
                "no valid value after it in stage {}",
                stage.number()
            ))
        }
    };

    let gap = q - p;
    if gap > settings.max_interpolation_gap {
        return GapDecision::Unbridgeable(format!(
            "gap of {} rows exceeds {}",
            gap, settings.max_interpolation_gap
        ));
    }

    let value = vp + (vq - vp) * (index - p) as f64 / gap as f64;

    let rejected_original = existing
        .filter(|e| e.action == AuditAction::Removed)
        .and_then(|e| e.original_value);

    match rejected_original {
        Some(original) if (value - original).abs() < settings.restore_tolerance => {
            GapDecision::Restore(original)
        }
        _ => GapDecision::Fill(value),
    }
}
