//! Smoothing and test-level metrics: maxima, plateau, percentiles and AUC.

pub mod auc;
pub mod error;
pub mod key_metrics;
pub mod percentiles;
pub mod smoothing;

pub use auc::{integrate_vo2, AucResult};
pub use error::{AnalysisError, AnalysisResult};
pub use key_metrics::{
    calculate_key_metrics, calculate_key_metrics_with, KeyMetrics, PlateauComparison,
    PlateauStageSummary,
};
pub use percentiles::{extract_percentiles, extract_percentiles_with_step};
pub use smoothing::{smooth_series, smooth_series_with, RollingWindow, SMOOTHED_CHANNELS};
