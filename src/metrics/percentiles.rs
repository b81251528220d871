//! Sampling of the series at fixed fractions of peak VO2.

use crate::series::types::{Channel, Row};

/// Rows where VO2 first reaches 10%, 20%, ... 100% of `vo2max`.
pub fn extract_percentiles(rows: &[Row], vo2max: f64) -> Vec<Row> {
    extract_percentiles_with_step(rows, vo2max, 10)
}

/// Rows where VO2 first reaches each multiple of `step` percent of `vo2max`.
///
/// Percentages never reached are skipped. When one row is the first to reach
/// several thresholds it is emitted once, under the lowest percentage. A row
/// that does not come strictly later in time than the previous emitted row is
/// skipped as well, so duplicate timestamps never appear twice.
pub fn extract_percentiles_with_step(rows: &[Row], vo2max: f64, step: u8) -> Vec<Row> {
    if !(vo2max > 0.0) || !vo2max.is_finite() || step == 0 {
        return Vec::new();
    }

    let mut result = Vec::new();
    let mut last_time: Option<f64> = None;

    for percentage in (step..=100).step_by(step as usize) {
        let threshold = vo2max * percentage as f64 / 100.0;

        let Some(index) = rows
            .iter()
            .position(|r| r.valid(Channel::Vo2).is_some_and(|v| v >= threshold))
        else {
            continue;
        };

        let time = rows[index].time_seconds;
        if last_time.is_some_and(|last| time <= last) {
            continue;
        }

        let mut row = rows[index].clone();
        row.percentage = Some(percentage);
        result.push(row);
        last_time = Some(time);
    }

    result
}
