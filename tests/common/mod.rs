//! Shared fixtures for integration tests.

#![allow(dead_code)]

use cpetlab::{Channel, Row};

/// Time label in `m:ss` form.
pub fn label(seconds: usize) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// `count` rows 10 s apart with a single channel set to `value`.
pub fn constant_rows(count: usize, channel: Channel, value: f64) -> Vec<Row> {
    (0..count)
        .map(|i| Row::new(label(i * 10), (i * 10) as f64).with(channel, value))
        .collect()
}

/// Incremental test sampled every 10 s: VO2 ramps then levels off at 3.6 L/min.
///
/// Small deterministic jitter keeps the stage SDs non-zero.
pub fn incremental_test(count: usize) -> Vec<Row> {
    (0..count)
        .map(|i| {
            let x = i as f64;
            let jitter = ((i * 7) % 5) as f64 * 0.01;
            let vo2 = (1.0 + x * 0.03).min(3.6) + jitter;
            Row::new(label(i * 10), x * 10.0)
                .with(Channel::Vo2, vo2)
                .with(Channel::Vco2, vo2 * (0.85 + x * 0.003))
                .with(Channel::Ve, vo2 * 28.0 + jitter * 10.0)
                .with(Channel::Hr, (90.0 + x).min(188.0))
                .with(Channel::Vt, 1.2 + (x * 0.01).min(1.5))
                .with(Channel::Bf, 18.0 + x * 0.25)
        })
        .collect()
}

/// The incremental test with a few typical artifacts:
/// - VE spike at row 40
/// - HR dropout to 0 at row 60
/// - VO2 missing from the source at row 22
/// - VT missing for rows 75..80
/// - VE spike at row 95, inside the trailing partial stage
pub fn noisy_incremental_test() -> Vec<Row> {
    let mut rows = incremental_test(100);
    rows[40].ve = Some(500.0);
    rows[60].hr = Some(0.0);
    rows[22].vo2 = None;
    for row in &mut rows[75..80] {
        row.vt = None;
    }
    rows[95].ve = Some(500.0);
    rows
}
