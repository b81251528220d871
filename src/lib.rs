//! CpetLab - CPET data cleaning and metrics
//!
//! Turns raw cardiopulmonary exercise test exports into cleaned, smoothed and
//! metric-annotated series: stage-wise outlier rejection, gap-limited
//! interpolation, three-point smoothing, VO2 plateau detection, percentile
//! extraction and oxygen-volume integration.

pub mod cleaning;
pub mod metrics;
pub mod pipeline;
pub mod series;
pub mod storage;

// Re-export commonly used types
pub use cleaning::{clean_series, AuditAction, AuditLogEntry, CleaningStats};
pub use metrics::{AnalysisError, AucResult, KeyMetrics};
pub use pipeline::{load_batch, run_batch, run_pipeline, BatchInput, PipelineRun};
pub use series::{Channel, Row};
pub use storage::{AnalysisSettings, AppConfig, HistoryRecord, HistoryRepository};
