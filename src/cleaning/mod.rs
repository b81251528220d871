//! Data cleaning: outlier rejection followed by gap interpolation.

pub mod audit;
pub mod interpolation;
pub mod outliers;

pub use audit::{AuditAction, AuditKey, AuditLog, AuditLogEntry, CleaningStats};
pub use interpolation::{interpolate_gaps, interpolate_gaps_with, CleaningOutcome};
pub use outliers::{detect_outliers, detect_outliers_with, BandStats, DetectionOutcome};

use crate::series::types::Row;
use crate::storage::config::AnalysisSettings;

/// Run detection and interpolation back to back.
pub fn clean_series(rows: &[Row], weight_kg: f64, settings: &AnalysisSettings) -> CleaningOutcome {
    let detection = detect_outliers_with(rows, weight_kg, settings);
    interpolate_gaps_with(&detection, weight_kg, settings)
}
