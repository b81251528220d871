//! Stage segmentation.
//!
//! Two deterministic partitionings of a series:
//! - fixed row-count windows used by the cleaning passes
//! - fixed wall-clock windows used by the plateau analysis

use crate::series::types::Row;
use serde::{Deserialize, Serialize};

/// A window of consecutive rows, `start..end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowStage {
    /// Zero-based stage index
    pub index: usize,
    /// First row of the stage
    pub start: usize,
    /// One past the last row of the stage
    pub end: usize,
    /// Whether the stage holds the full row count
    pub complete: bool,
}

impl RowStage {
    /// Number of rows in the stage.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Check if the stage is empty.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// One-based stage number for messages.
    pub fn number(&self) -> usize {
        self.index + 1
    }
}

/// Split `len` rows into windows of `stage_rows`; the final window may be short.
pub fn row_stages(len: usize, stage_rows: usize) -> Vec<RowStage> {
    if len == 0 || stage_rows == 0 {
        return Vec::new();
    }

    (0..len)
        .step_by(stage_rows)
        .enumerate()
        .map(|(index, start)| {
            let end = (start + stage_rows).min(len);
            RowStage {
                index,
                start,
                end,
                complete: end - start == stage_rows,
            }
        })
        .collect()
}

/// Only the windows holding the full row count.
pub fn complete_row_stages(len: usize, stage_rows: usize) -> Vec<RowStage> {
    row_stages(len, stage_rows)
        .into_iter()
        .filter(|s| s.complete)
        .collect()
}

/// The row-count window containing row `index`.
pub fn row_stage_of(index: usize, len: usize, stage_rows: usize) -> RowStage {
    let stage_rows = stage_rows.max(1);
    let stage = index / stage_rows;
    let start = stage * stage_rows;
    let end = (start + stage_rows).min(len);
    RowStage {
        index: stage,
        start,
        end,
        complete: end - start == stage_rows,
    }
}

/// Upper bound on the number of time stages a series may be split into.
pub const MAX_TIME_STAGES: usize = 10_000;

/// A fixed-duration window of the test, in seconds from the first row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeStage {
    /// Zero-based stage index
    pub index: usize,
    /// Absolute start time (s)
    pub start_secs: f64,
    /// Absolute end time (s), clipped to the end of the test
    pub end_secs: f64,
    /// Last stage of the series
    pub is_final: bool,
}

impl TimeStage {
    /// Actual stage duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.end_secs - self.start_secs
    }

    /// Whether a sample time belongs to this stage.
    ///
    /// Stages are half-open except the final one, which also owns its end time.
    pub fn contains(&self, time_secs: f64) -> bool {
        time_secs >= self.start_secs
            && (time_secs < self.end_secs || (self.is_final && time_secs <= self.end_secs))
    }
}

/// Split a series into windows of `stage_secs`.
///
/// The elapsed time is `last - first` unless `total_override` is given. The
/// final window may be shorter than `stage_secs` and is always kept. A total
/// needing more than [`MAX_TIME_STAGES`] windows yields no stages.
pub fn time_stages(rows: &[Row], stage_secs: f64, total_override: Option<f64>) -> Vec<TimeStage> {
    let (first, last) = match (rows.first(), rows.last()) {
        (Some(f), Some(l)) => (f.time_seconds, l.time_seconds),
        _ => return Vec::new(),
    };

    let total = total_override.unwrap_or(last - first);
    if !(total > 0.0) || !(stage_secs > 0.0) || !total.is_finite() {
        return Vec::new();
    }

    let windows = (total / stage_secs).ceil();
    if windows > MAX_TIME_STAGES as f64 {
        tracing::warn!(
            "Test length {} s needs {} stages of {} s, limit is {}",
            total,
            windows,
            stage_secs,
            MAX_TIME_STAGES
        );
        return Vec::new();
    }
    let count = windows as usize;
    let test_end = first + total;

    (0..count)
        .map(|index| {
            let start_secs = first + index as f64 * stage_secs;
            TimeStage {
                index,
                start_secs,
                end_secs: (start_secs + stage_secs).min(test_end),
                is_final: index + 1 == count,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows_every(step: f64, count: usize) -> Vec<Row> {
        (0..count)
            .map(|i| Row::new(format!("{}", i), i as f64 * step))
            .collect()
    }

    #[test]
    fn test_row_stages_with_partial_tail() {
        let stages = row_stages(40, 18);
        assert_eq!(stages.len(), 3);
        assert_eq!((stages[0].start, stages[0].end), (0, 18));
        assert_eq!((stages[1].start, stages[1].end), (18, 36));
        assert_eq!((stages[2].start, stages[2].end), (36, 40));
        assert!(stages[1].complete);
        assert!(!stages[2].complete);

        let complete = complete_row_stages(40, 18);
        assert_eq!(complete.len(), 2);
    }

    #[test]
    fn test_row_stage_of() {
        let stage = row_stage_of(20, 40, 18);
        assert_eq!(stage.index, 1);
        assert_eq!((stage.start, stage.end), (18, 36));

        let tail = row_stage_of(39, 40, 18);
        assert_eq!((tail.start, tail.end), (36, 40));
        assert!(!tail.complete);
    }

    #[test]
    fn test_empty_inputs() {
        assert!(row_stages(0, 18).is_empty());
        assert!(time_stages(&[], 180.0, None).is_empty());
    }

    #[test]
    fn test_time_stages_keep_short_final() {
        // 0..=400 s in 10 s steps
        let rows = rows_every(10.0, 41);
        let stages = time_stages(&rows, 180.0, None);

        assert_eq!(stages.len(), 3);
        assert_eq!(stages[0].duration_secs(), 180.0);
        assert_eq!(stages[2].start_secs, 360.0);
        assert_eq!(stages[2].duration_secs(), 40.0);
        assert!(stages[2].is_final);
        assert!(stages[2].contains(400.0));
        assert!(!stages[1].contains(360.0));
    }

    #[test]
    fn test_time_stages_exact_multiple() {
        let rows = rows_every(10.0, 55); // 0..=540
        let stages = time_stages(&rows, 180.0, None);
        assert_eq!(stages.len(), 3);
        assert_eq!(stages[2].duration_secs(), 180.0);
    }

    #[test]
    fn test_time_stages_zero_duration() {
        let rows = vec![Row::new("0", 5.0), Row::new("0", 5.0)];
        assert!(time_stages(&rows, 180.0, None).is_empty());
    }

    #[test]
    fn test_time_stages_override() {
        let rows = rows_every(10.0, 10); // 0..=90
        let stages = time_stages(&rows, 180.0, Some(400.0));
        assert_eq!(stages.len(), 3);
        assert_eq!(stages[2].end_secs, 400.0);
    }

    #[test]
    fn test_time_stages_oversized_override() {
        let rows = rows_every(10.0, 10);
        assert!(time_stages(&rows, 180.0, Some(1e20)).is_empty());
        assert!(time_stages(&rows, 180.0, Some(f64::MAX)).is_empty());

        let limit = MAX_TIME_STAGES as f64 * 180.0;
        assert_eq!(time_stages(&rows, 180.0, Some(limit)).len(), MAX_TIME_STAGES);
    }
}
