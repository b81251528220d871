//! Storage module for configuration and run history.

pub mod config;
pub mod database;
pub mod history;
pub mod schema;

pub use config::{AnalysisSettings, AppConfig, ConfigError, ExportSettings};
pub use database::{DatabaseError, SqliteHistory};
pub use history::{HistoryRecord, HistoryRepository, InMemoryHistory};
