//! Derived-metric calculation.
//!
//! Every derived channel is a pure function of the primary channels of the
//! same row and the subject's body weight.

use crate::series::types::{DerivedMetrics, Row};

/// Compute the derived block for a row.
///
/// Weight-dependent channels are null unless `weight_kg > 0`.
pub fn compute_derived(row: &Row, weight_kg: f64) -> DerivedMetrics {
    let vo2 = row.vo2;
    let positive = |v: Option<f64>| v.filter(|x| *x > 0.0);

    let vo2_kg = match vo2 {
        Some(v) if weight_kg > 0.0 && weight_kg.is_finite() => Some(v * 1000.0 / weight_kg),
        _ => None,
    };

    let vo2_hr = match (vo2, positive(row.hr)) {
        (Some(v), Some(hr)) => Some(v * 1000.0 / hr),
        _ => None,
    };

    let ve_vo2 = match (row.ve, positive(vo2)) {
        (Some(ve), Some(v)) => Some(ve / v),
        _ => None,
    };

    let ve_vco2 = match (row.ve, positive(row.vco2)) {
        (Some(ve), Some(vco2)) => Some(ve / vco2),
        _ => None,
    };

    let rer = match (row.vco2, positive(vo2)) {
        (Some(vco2), Some(v)) => Some(vco2 / v),
        _ => None,
    };

    let dead_space = rer.map(|r| (0.25 * r - 0.05).max(0.0));

    DerivedMetrics {
        vo2_kg,
        vo2_hr,
        ve_vo2,
        ve_vco2,
        rer,
        dead_space,
    }
}

impl Row {
    /// Copy of this row with its derived channels recomputed.
    pub fn with_derived(&self, weight_kg: f64) -> Row {
        Row {
            derived: compute_derived(self, weight_kg),
            ..self.clone()
        }
    }
}

/// Recompute derived channels for every row, returning a new series.
pub fn recompute_all(rows: &[Row], weight_kg: f64) -> Vec<Row> {
    rows.iter().map(|row| row.with_derived(weight_kg)).collect()
}
