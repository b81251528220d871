//! Row model for CPET time series.
//!
//! A series is an ordered list of [`Row`]s, one per sampled instant. Each row
//! carries the primary gas-exchange channels as measured by the metabolic cart
//! and a block of [`DerivedMetrics`] that is always recomputed from them.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Primary channels measured by the metabolic cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Channel {
    /// Oxygen uptake (L/min)
    #[serde(rename = "VO2")]
    Vo2,
    /// Carbon dioxide output (L/min)
    #[serde(rename = "VCO2")]
    Vco2,
    /// Minute ventilation (L/min)
    #[serde(rename = "VE")]
    Ve,
    /// Heart rate (bpm)
    #[serde(rename = "HR")]
    Hr,
    /// Tidal volume (L)
    #[serde(rename = "VT")]
    Vt,
    /// Breathing frequency (breaths/min)
    #[serde(rename = "BF")]
    Bf,
}

impl Channel {
    /// All primary channels, in column order.
    pub const ALL: [Channel; 6] = [
        Channel::Vo2,
        Channel::Vco2,
        Channel::Ve,
        Channel::Hr,
        Channel::Vt,
        Channel::Bf,
    ];

    /// Canonical column name.
    pub fn name(&self) -> &'static str {
        match self {
            Channel::Vo2 => "VO2",
            Channel::Vco2 => "VCO2",
            Channel::Ve => "VE",
            Channel::Hr => "HR",
            Channel::Vt => "VT",
            Channel::Bf => "BF",
        }
    }

    /// Match a header cell against the canonical column names (case-insensitive).
    pub fn from_header(header: &str) -> Option<Self> {
        let header = header.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(header))
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Ratios derived from the primary channels and body weight.
///
/// Never edited directly; see [`Row::with_derived`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DerivedMetrics {
    /// Relative oxygen uptake (ml/kg/min)
    pub vo2_kg: Option<f64>,
    /// Oxygen pulse (ml/beat)
    pub vo2_hr: Option<f64>,
    /// Ventilatory equivalent for O2
    pub ve_vo2: Option<f64>,
    /// Ventilatory equivalent for CO2
    pub ve_vco2: Option<f64>,
    /// Respiratory exchange ratio
    pub rer: Option<f64>,
    /// Estimated dead-space fraction (VD/VT)
    pub dead_space: Option<f64>,
}

/// One sampled instant of a CPET export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// Time as formatted in the source file
    pub time_label: String,
    /// Seconds from test start
    pub time_seconds: f64,
    pub vo2: Option<f64>,
    pub vco2: Option<f64>,
    pub ve: Option<f64>,
    pub hr: Option<f64>,
    pub vt: Option<f64>,
    pub bf: Option<f64>,
    /// Recomputed ratios
    pub derived: DerivedMetrics,
    /// Ergometer load (W), passed through untouched
    pub load: Option<f64>,
    /// Event marker from the source file
    pub marker: Option<String>,
    /// Percent-of-peak label, only set on percentile rows
    pub percentage: Option<u8>,
}

impl Row {
    /// Create an empty row at the given time.
    pub fn new(time_label: impl Into<String>, time_seconds: f64) -> Self {
        Self {
            time_label: time_label.into(),
            time_seconds,
            vo2: None,
            vco2: None,
            ve: None,
            hr: None,
            vt: None,
            bf: None,
            derived: DerivedMetrics::default(),
            load: None,
            marker: None,
            percentage: None,
        }
    }

    /// Builder-style setter for a primary channel.
    pub fn with(mut self, channel: Channel, value: f64) -> Self {
        self.set(channel, Some(value));
        self
    }

    /// Raw value of a primary channel.
    pub fn get(&self, channel: Channel) -> Option<f64> {
        match channel {
            Channel::Vo2 => self.vo2,
            Channel::Vco2 => self.vco2,
            Channel::Ve => self.ve,
            Channel::Hr => self.hr,
            Channel::Vt => self.vt,
            Channel::Bf => self.bf,
        }
    }

    /// Value of a primary channel if it is present and finite.
    pub fn valid(&self, channel: Channel) -> Option<f64> {
        self.get(channel).filter(|v| v.is_finite())
    }

    /// Overwrite a primary channel.
    ///
    /// Leaves the derived block untouched; the stage that edits a row is
    /// responsible for calling [`Row::with_derived`] before handing it on.
    pub fn set(&mut self, channel: Channel, value: Option<f64>) {
        let value = value.filter(|v| v.is_finite());
        match channel {
            Channel::Vo2 => self.vo2 = value,
            Channel::Vco2 => self.vco2 = value,
            Channel::Ve => self.ve = value,
            Channel::Hr => self.hr = value,
            Channel::Vt => self.vt = value,
            Channel::Bf => self.bf = value,
        }
    }

    /// Label used in percentile tables, e.g. `"60%"`.
    pub fn percentage_label(&self) -> Option<String> {
        self.percentage.map(|p| format!("{}%", p))
    }
}

/// Errors while reading or writing a series.
#[derive(Debug, Error)]
pub enum SeriesError {
    /// Underlying file could not be read or written
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A required column is absent from the header
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// A line could not be parsed
    #[error("Parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    /// No data rows
    #[error("Series has no data rows")]
    Empty,

    /// Failed to write export data
    #[error("Failed to write data: {0}")]
    WriteFailed(String),
}

/// Result type for series I/O.
pub type SeriesResult<T> = Result<T, SeriesError>;
