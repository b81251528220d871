//! CSV row source for header-mapped CPET exports.
//!
//! Expects one header line using the canonical column names (`Time`, `VO2`,
//! `VCO2`, `VE`, `HR`, `VT`, `BF`, optionally `Load` and `Marker`). Column
//! order is free and unknown columns are ignored. Comma, semicolon and tab
//! delimiters are accepted; with semicolon or tab, decimal commas are allowed.

use crate::series::types::{Channel, Row, SeriesError, SeriesResult};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::path::Path;

/// Where each known column sits in a record.
#[derive(Debug, Default)]
struct ColumnMap {
    time: Option<usize>,
    channels: Vec<(Channel, usize)>,
    load: Option<usize>,
    marker: Option<usize>,
}

impl ColumnMap {
    fn from_headers(headers: &StringRecord) -> Self {
        let mut map = ColumnMap::default();
        for (index, name) in headers.iter().enumerate() {
            let name = name.trim_start_matches('\u{feff}').trim();
            if let Some(channel) = Channel::from_header(name) {
                map.channels.push((channel, index));
            } else if name.eq_ignore_ascii_case("time") || name.eq_ignore_ascii_case("t") {
                map.time = Some(index);
            } else if name.eq_ignore_ascii_case("load") {
                map.load = Some(index);
            } else if name.eq_ignore_ascii_case("marker") {
                map.marker = Some(index);
            }
        }
        map
    }
}

/// Parse a time label such as `45`, `3:15`, `0:03:15` or `3:15.5` into seconds.
pub fn parse_time_label(label: &str) -> Option<f64> {
    let label = label.trim().trim_matches('"');
    if label.is_empty() {
        return None;
    }

    let parts: Vec<&str> = label.split(':').collect();
    if parts.len() > 3 {
        return None;
    }

    let mut seconds = 0.0;
    for (i, part) in parts.iter().enumerate() {
        let value: f64 = part.trim().parse().ok()?;
        if value < 0.0 || !value.is_finite() {
            return None;
        }
        // only the last component may carry a fraction or exceed 59
        if i + 1 < parts.len() && (value.fract() != 0.0 || (i > 0 && value >= 60.0)) {
            return None;
        }
        if i > 0 && i + 1 == parts.len() && value >= 60.0 {
            return None;
        }
        seconds = seconds * 60.0 + value;
    }

    Some(seconds)
}

/// Parse a numeric cell; blanks, dashes and text become `None`.
fn parse_value(cell: &str, decimal_comma: bool) -> Option<f64> {
    let cell = cell.trim().trim_matches('"');
    if cell.is_empty() || cell == "-" {
        return None;
    }

    let parsed = if decimal_comma {
        cell.replace(',', ".").parse::<f64>()
    } else {
        cell.parse::<f64>()
    };

    parsed.ok().filter(|v| v.is_finite())
}

/// Pick the most frequent of comma, semicolon and tab in the header line.
///
/// Ties go to comma.
fn detect_delimiter(header: &[u8]) -> u8 {
    [b'\t', b';', b',']
        .into_iter()
        .max_by_key(|d| header.iter().filter(|b| *b == d).count())
        .unwrap_or(b',')
}

/// Parse CSV content into a time-ordered series with derived channels.
pub fn parse_csv(content: &str, weight_kg: f64) -> SeriesResult<Vec<Row>> {
    parse_csv_bytes(content.as_bytes(), weight_kg)
}

/// Parse raw CSV bytes; cells must be valid UTF-8.
pub fn parse_csv_bytes(content: &[u8], weight_kg: f64) -> SeriesResult<Vec<Row>> {
    let header = content
        .split(|b| *b == b'\n')
        .find(|line| line.iter().any(|b| !b.is_ascii_whitespace()))
        .ok_or(SeriesError::Empty)?;
    let delimiter = detect_delimiter(header);
    let decimal_comma = delimiter != b',';

    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(content);

    let headers = reader.headers().map_err(parse_error)?.clone();
    let columns = ColumnMap::from_headers(&headers);

    let time_column = columns
        .time
        .ok_or_else(|| SeriesError::MissingColumn("Time".to_string()))?;
    if !columns.channels.iter().any(|(c, _)| *c == Channel::Vo2) {
        return Err(SeriesError::MissingColumn("VO2".to_string()));
    }

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(parse_error)?;
        let line = record.position().map_or(0, |p| p.line());

        let label = record.get(time_column).unwrap_or_default();
        let Some(seconds) = parse_time_label(label) else {
            tracing::warn!("Skipping line {}: unreadable time '{}'", line, label);
            continue;
        };

        let mut row = Row::new(label, seconds);
        for (channel, index) in &columns.channels {
            let value = record
                .get(*index)
                .and_then(|c| parse_value(c, decimal_comma));
            row.set(*channel, value);
        }
        row.load = columns
            .load
            .and_then(|i| record.get(i))
            .and_then(|c| parse_value(c, decimal_comma));
        row.marker = columns
            .marker
            .and_then(|i| record.get(i))
            .filter(|m| !m.is_empty())
            .map(str::to_string);

        rows.push(row.with_derived(weight_kg));
    }

    if rows.is_empty() {
        return Err(SeriesError::Empty);
    }

    rows.sort_by(|a, b| a.time_seconds.total_cmp(&b.time_seconds));

    tracing::info!(
        "Parsed {} rows with {} channel columns",
        rows.len(),
        columns.channels.len()
    );

    Ok(rows)
}

fn parse_error(err: csv::Error) -> SeriesError {
    SeriesError::Parse {
        line: err.position().map_or(0, |p| p.line() as usize),
        message: err.to_string(),
    }
}

/// Read and parse a CSV file.
pub fn read_csv(path: &Path, weight_kg: f64) -> SeriesResult<Vec<Row>> {
    let content = std::fs::read(path)?;
    parse_csv_bytes(&content, weight_kg)
}
