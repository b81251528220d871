//! Application and analysis configuration.
//!
//! Loaded from `config.toml` in the platform data directory. Every numeric
//! constant used by the cleaning and metrics stages lives in
//! [`AnalysisSettings`] so runs are reproducible from the config alone.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Tunables for the cleaning, smoothing and metrics stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    /// Rows per cleaning stage
    pub cleaning_stage_rows: usize,
    /// Leading rows of each stage left out of the mean/SD
    pub transient_rows: usize,
    /// Band half-width in standard deviations
    pub sd_multiplier: f64,
    /// Minimum valid values needed to build a band
    pub min_band_values: usize,
    /// Heart rate must be strictly above this (bpm)
    pub hr_min_exclusive: f64,
    /// Heart rate must be at most this (bpm)
    pub hr_max: f64,
    /// Largest row-to-row HR rise tolerated without a ventilatory rise (bpm)
    pub hr_jump: f64,
    /// Largest index distance bridged by interpolation
    pub max_interpolation_gap: usize,
    /// Interpolated values this close to the rejected original restore it
    pub restore_tolerance: f64,
    /// Rolling average window length (rows)
    pub smoothing_window: usize,
    /// Metrics stage length (s)
    pub metrics_stage_secs: f64,
    /// Terminal averaging window at the end of each stage (s)
    pub terminal_window_secs: f64,
    /// Stage-over-stage VO2 rise below which a plateau is declared (L/min)
    pub plateau_threshold: f64,
    /// Percent-of-peak step for percentile extraction
    pub percentile_step: u8,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            cleaning_stage_rows: 18,
            transient_rows: 3,
            sd_multiplier: 3.0,
            min_band_values: 2,
            hr_min_exclusive: 0.0,
            hr_max: 250.0,
            hr_jump: 20.0,
            max_interpolation_gap: 3,
            restore_tolerance: 1e-6,
            smoothing_window: 3,
            metrics_stage_secs: 180.0,
            terminal_window_secs: 30.0,
            plateau_threshold: 0.15,
            percentile_step: 10,
        }
    }
}

/// Export-related settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    /// Decimal places written for channel values
    pub decimals: usize,
    /// Also write the raw (uncleaned) series
    pub include_raw: bool,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            decimals: 3,
            include_raw: false,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Application version
    pub version: String,
    /// Data directory path
    #[serde(skip)]
    pub data_dir: PathBuf,
    /// Body weight used when none is given on the command line
    pub default_weight_kg: Option<f64>,
    /// Pipeline tunables
    pub analysis: AnalysisSettings,
    /// Export settings
    pub export: ExportSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            data_dir: PathBuf::new(),
            default_weight_kg: None,
            analysis: AnalysisSettings::default(),
            export: ExportSettings::default(),
        }
    }
}

impl AppConfig {
    /// Path of the history database inside the data directory.
    pub fn history_db_path(&self) -> PathBuf {
        self.data_dir.join("history.db")
    }
}

/// Validate a body weight in kilograms.
pub fn validate_weight(weight_kg: f64) -> bool {
    weight_kg.is_finite() && weight_kg > 0.0
}

/// Get the application data directory.
pub fn get_data_dir() -> PathBuf {
    directories::ProjectDirs::from("com", "cpetlab", "CpetLab")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Get the configuration file path.
pub fn get_config_path() -> PathBuf {
    get_data_dir().join("config.toml")
}

/// Load application configuration from the default location.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let mut config = load_config_from(&get_config_path())?;
    config.data_dir = get_data_dir();
    Ok(config)
}

/// Load configuration from a specific file; a missing file yields defaults.
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    let mut config = if path.exists() {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?
    } else {
        AppConfig::default()
    };

    config.data_dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    if let Some(weight) = config.default_weight_kg {
        if !validate_weight(weight) {
            return Err(ConfigError::ParseError(format!(
                "default_weight_kg must be positive, got {}",
                weight
            )));
        }
    }

    Ok(config)
}

/// Save application configuration to the default location.
pub fn save_config(config: &AppConfig) -> Result<(), ConfigError> {
    save_config_to(config, &get_config_path())
}

/// Save configuration to a specific file.
pub fn save_config_to(config: &AppConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
    }

    let content =
        toml::to_string_pretty(config).map_err(|e| ConfigError::SerializeError(e.to_string()))?;

    std::fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

    Ok(())
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),
}
