//! Oxygen volume between two fractions of peak VO2.
//!
//! Integrates VO2 (L/min) over time with the trapezoidal rule, giving the
//! accumulated O2 in liters between the first row reaching the lower
//! threshold and the last row at or below the upper one.

use crate::series::types::{Channel, Row};
use serde::{Deserialize, Serialize};

/// Integrated O2 volume and the bounds actually achieved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AucResult {
    /// Accumulated O2 (L)
    pub liters: f64,
    /// Requested lower bound (% of peak)
    pub start_percent: f64,
    /// Requested upper bound (% of peak)
    pub end_percent: f64,
    /// Time of the first row in the bracket (s)
    pub start_time: f64,
    /// Time of the last row in the bracket (s)
    pub end_time: f64,
    /// VO2 at the first row (L/min)
    pub start_vo2: f64,
    /// VO2 at the last row (L/min)
    pub end_vo2: f64,
}

impl AucResult {
    /// Duration of the integrated bracket in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.end_time - self.start_time
    }
}

/// Integrate VO2 between `start_percent` and `end_percent` of `vo2max`.
///
/// Returns `None` when no bracket exists: the percentages are not ordered,
/// the lower threshold is never reached, the upper threshold is never
/// reached, or the bracket collapses to a single row.
pub fn integrate_vo2(
    rows: &[Row],
    vo2max: f64,
    start_percent: f64,
    end_percent: f64,
) -> Option<AucResult> {
    if !(start_percent < end_percent) || !(vo2max > 0.0) || !vo2max.is_finite() {
        return None;
    }

    let start_vo2 = vo2max * start_percent / 100.0;
    let end_vo2 = vo2max * end_percent / 100.0;
    let vo2 = |r: &Row| r.valid(Channel::Vo2);

    let start_index = rows.iter().position(|r| vo2(r).is_some_and(|v| v >= start_vo2))?;

    if !rows.iter().any(|r| vo2(r).is_some_and(|v| v >= end_vo2)) {
        tracing::debug!("AUC: upper threshold {:.3} L/min never reached", end_vo2);
        return None;
    }

    let end_index = rows.iter().rposition(|r| vo2(r).is_some_and(|v| v <= end_vo2))?;

    if start_index >= end_index {
        return None;
    }

    let mut liters = 0.0;
    let mut previous: Option<(f64, f64)> = None;
    for row in &rows[start_index..=end_index] {
        let Some(value) = vo2(row) else {
            continue;
        };
        if let Some((t0, v0)) = previous {
            liters += (v0 + value) / 2.0 * (row.time_seconds - t0) / 60.0;
        }
        previous = Some((row.time_seconds, value));
    }

    let first = &rows[start_index];
    let last = &rows[end_index];

    Some(AucResult {
        liters,
        start_percent,
        end_percent,
        start_time: first.time_seconds,
        end_time: last.time_seconds,
        start_vo2: vo2(first).unwrap_or(start_vo2),
        end_vo2: vo2(last).unwrap_or(end_vo2),
    })
}
