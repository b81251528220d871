//! CPET time series: row model, derived channels, stage windows and CSV I/O.

pub mod derived;
pub mod exporter_csv;
pub mod import_csv;
pub mod stages;
pub mod types;

pub use derived::{compute_derived, recompute_all};
pub use import_csv::{parse_csv, parse_csv_bytes, parse_time_label, read_csv};
pub use stages::{row_stages, time_stages, RowStage, TimeStage, MAX_TIME_STAGES};
pub use types::{Channel, DerivedMetrics, Row, SeriesError, SeriesResult};
