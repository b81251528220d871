//! Rolling-average smoothing of the cleaned series.
//!
//! Each smoothed channel at row `i` is the mean of rows `i-2`, `i-1` and `i`.
//! A missing value anywhere in the window makes the output missing; there is
//! no partial averaging. The first rows, which have no full window, are
//! copied through unchanged.

use crate::series::derived::recompute_all;
use crate::series::types::{Channel, Row};
use crate::storage::config::AnalysisSettings;
use std::collections::VecDeque;

/// Channels smoothed, in processing order.
pub const SMOOTHED_CHANNELS: [Channel; 6] = [
    Channel::Hr,
    Channel::Vt,
    Channel::Bf,
    Channel::Vo2,
    Channel::Vco2,
    Channel::Ve,
];

/// Trailing window over nullable samples.
#[derive(Debug)]
pub struct RollingWindow {
    /// Buffer of recent values
    buffer: VecDeque<Option<f64>>,
    /// Window size in samples
    window_size: usize,
}

impl RollingWindow {
    /// Create a new window with the given size.
    pub fn new(window_size: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(window_size),
            window_size,
        }
    }

    /// Create a three-sample window.
    pub fn three_point() -> Self {
        Self::new(3)
    }

    /// Add a new value and return the current average.
    pub fn push(&mut self, value: Option<f64>) -> Option<f64> {
        self.buffer.push_back(value);

        if self.buffer.len() > self.window_size {
            self.buffer.pop_front();
        }

        self.average()
    }

    /// Average of the window, oldest value first.
    ///
    /// `None` until the window is full or while any sample in it is missing.
    pub fn average(&self) -> Option<f64> {
        if !self.is_full() {
            return None;
        }

        let sum = self
            .buffer
            .iter()
            .try_fold(0.0, |acc, value| value.map(|v| acc + v))?;

        Some(sum / self.buffer.len() as f64)
    }

    /// Check if the buffer holds a full window.
    pub fn is_full(&self) -> bool {
        self.window_size > 0 && self.buffer.len() >= self.window_size
    }

    /// Reset the window.
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    /// Get the number of samples in the buffer.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

/// Smooth a series with the default three-point window.
pub fn smooth_series(rows: &[Row], weight_kg: f64) -> Vec<Row> {
    smooth_series_with(rows, weight_kg, &AnalysisSettings::default())
}

/// Smooth a series and recompute derived channels.
///
/// A series shorter than the window is returned as a plain copy.
pub fn smooth_series_with(rows: &[Row], weight_kg: f64, settings: &AnalysisSettings) -> Vec<Row> {
    let window_size = settings.smoothing_window.max(1);
    if rows.len() < window_size {
        return rows.to_vec();
    }

    let mut smoothed = rows.to_vec();

    for channel in SMOOTHED_CHANNELS {
        let mut window = RollingWindow::new(window_size);
        for (index, row) in rows.iter().enumerate() {
            let average = window.push(row.valid(channel));
            if index + 1 >= window_size {
                smoothed[index].set(channel, average);
            }
        }
    }

    tracing::debug!(
        "Smoothed {} rows with a {}-point window",
        rows.len(),
        window_size
    );

    recompute_all(&smoothed, weight_kg)
}
