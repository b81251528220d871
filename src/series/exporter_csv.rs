//! CSV export of series, audit log and key metrics.

use crate::cleaning::audit::{AuditLogEntry, CleaningStats};
use crate::metrics::key_metrics::KeyMetrics;
use crate::series::types::{Row, SeriesError, SeriesResult};
use std::io::Write;
use std::path::Path;

fn cell(value: Option<f64>, decimals: usize) -> String {
    value.map_or(String::new(), |v| format!("{:.*}", decimals, v))
}

/// Quote a text cell when it would otherwise break the line.
fn text_cell(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Export rows with primary, derived and passthrough channels.
pub fn export_rows_csv(rows: &[Row], decimals: usize) -> SeriesResult<String> {
    if rows.is_empty() {
        return Err(SeriesError::Empty);
    }

    let mut output = Vec::new();

    writeln!(
        output,
        "Time,Seconds,VO2,VCO2,VE,HR,VT,BF,VO2/kg,VO2/HR,VE/VO2,VE/VCO2,RER,VD/VT,Load,Marker,Percent"
    )
    .map_err(|e| SeriesError::WriteFailed(e.to_string()))?;

    for row in rows {
        let d = &row.derived;
        writeln!(
            output,
            "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
            text_cell(&row.time_label),
            row.time_seconds,
            cell(row.vo2, decimals),
            cell(row.vco2, decimals),
            cell(row.ve, decimals),
            cell(row.hr, decimals),
            cell(row.vt, decimals),
            cell(row.bf, decimals),
            cell(d.vo2_kg, decimals),
            cell(d.vo2_hr, decimals),
            cell(d.ve_vo2, decimals),
            cell(d.ve_vco2, decimals),
            cell(d.rer, decimals),
            cell(d.dead_space, decimals),
            cell(row.load, decimals),
            row.marker.as_deref().map_or(String::new(), text_cell),
            row.percentage_label().unwrap_or_default(),
        )
        .map_err(|e| SeriesError::WriteFailed(e.to_string()))?;
    }

    String::from_utf8(output).map_err(|e| SeriesError::WriteFailed(e.to_string()))
}

/// Export the cleaning audit log. An empty log yields just the header.
pub fn export_audit_csv(entries: &[AuditLogEntry], decimals: usize) -> SeriesResult<String> {
    let mut output = Vec::new();

    writeln!(
        output,
        "row,time,channel,original_value,action,new_value,reason"
    )
    .map_err(|e| SeriesError::WriteFailed(e.to_string()))?;

    for entry in entries {
        writeln!(
            output,
            "{},{},{},{},{},{},{}",
            entry.index,
            text_cell(&entry.time),
            entry.channel,
            cell(entry.original_value, decimals),
            entry.action,
            cell(entry.new_value, decimals),
            text_cell(&entry.reason),
        )
        .map_err(|e| SeriesError::WriteFailed(e.to_string()))?;
    }

    String::from_utf8(output).map_err(|e| SeriesError::WriteFailed(e.to_string()))
}

/// Export headline metrics and cleaning counters as a one-row summary.
pub fn export_summary_csv(metrics: &KeyMetrics, stats: &CleaningStats) -> SeriesResult<String> {
    let mut output = Vec::new();

    writeln!(
        output,
        "vo2max,vo2max_kg,vemax,hrmax,rermax,label,plateau_reached,plateau_time,duration,outliers_removed,points_interpolated,values_restored"
    )
    .map_err(|e| SeriesError::WriteFailed(e.to_string()))?;

    writeln!(
        output,
        "{:.3},{:.1},{:.1},{:.0},{:.2},{},{},{},{},{},{},{}",
        metrics.vo2max,
        metrics.vo2max_kg,
        metrics.vemax,
        metrics.hrmax,
        metrics.rermax,
        metrics.vo2_label(),
        metrics.plateau_reached,
        metrics.plateau_time.as_deref().map_or(String::new(), text_cell),
        metrics.duration.map_or(String::new(), |d| d.to_string()),
        stats.outliers_removed,
        stats.points_interpolated,
        stats.values_restored,
    )
    .map_err(|e| SeriesError::WriteFailed(e.to_string()))?;

    String::from_utf8(output).map_err(|e| SeriesError::WriteFailed(e.to_string()))
}

/// Write CSV content to a file, creating parent directories as needed.
pub fn write_csv_file(content: &str, path: &Path) -> SeriesResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    Ok(())
}

/// Default file name for an export of the given kind, e.g. `test01_cleaned.csv`.
pub fn generate_csv_filename(source_name: &str, kind: &str) -> String {
    let stem = Path::new(source_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("cpet");
    format!("{}_{}.csv", stem, kind)
}
