//! Audit trail for automatic data edits.
//!
//! The outlier pass creates `REMOVED` entries; the interpolation pass then
//! upgrades them to `INTERPOLATED`, deletes them when the original value is
//! restored, or leaves them as terminal removals. There is at most one entry
//! per (row, channel).

use crate::series::types::{Channel, Row};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What happened to a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    /// Value was nulled
    Removed,
    /// Value was filled by linear interpolation
    Interpolated,
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuditAction::Removed => write!(f, "REMOVED"),
            AuditAction::Interpolated => write!(f, "INTERPOLATED"),
        }
    }
}

/// Identity of an audited value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AuditKey {
    /// Row index in the series
    pub index: usize,
    pub channel: Channel,
}

impl AuditKey {
    pub fn new(index: usize, channel: Channel) -> Self {
        Self { index, channel }
    }
}

/// One removal or interpolation event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    /// Row index in the series
    pub index: usize,
    /// Time label of the row
    pub time: String,
    /// Seconds from test start
    pub time_seconds: f64,
    pub channel: Channel,
    /// Value before the edit, if there was one
    pub original_value: Option<f64>,
    /// Human-readable explanation
    pub reason: String,
    pub action: AuditAction,
    /// Value written by interpolation
    pub new_value: Option<f64>,
}

impl AuditLogEntry {
    pub fn key(&self) -> AuditKey {
        AuditKey::new(self.index, self.channel)
    }
}

/// Aggregate counters derived from the final audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CleaningStats {
    /// Entries still marked `REMOVED`
    pub outliers_removed: usize,
    /// Entries marked `INTERPOLATED`
    pub points_interpolated: usize,
    /// Rejections reverted because interpolation reproduced the original value
    pub values_restored: usize,
}

/// Keyed audit log, ordered by row then channel.
#[derive(Debug, Clone, Default)]
pub struct AuditLog {
    entries: BTreeMap<AuditKey, AuditLogEntry>,
}

impl AuditLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `channel` of `row` was nulled.
    pub fn record_removal(
        &mut self,
        index: usize,
        row: &Row,
        channel: Channel,
        original_value: f64,
        reason: String,
    ) {
        let key = AuditKey::new(index, channel);
        self.entries.insert(
            key,
            AuditLogEntry {
                index,
                time: row.time_label.clone(),
                time_seconds: row.time_seconds,
                channel,
                original_value: Some(original_value),
                reason,
                action: AuditAction::Removed,
                new_value: None,
            },
        );
    }

    /// Mark a value as interpolated, upgrading an existing removal or
    /// creating a fresh entry for a value missing from the source.
    pub fn record_interpolation(&mut self, index: usize, row: &Row, channel: Channel, value: f64) {
        let key = AuditKey::new(index, channel);
        match self.entries.get_mut(&key) {
            Some(entry) => {
                entry.reason = format!("{}; interpolated", entry.reason);
                entry.action = AuditAction::Interpolated;
                entry.new_value = Some(value);
            }
            None => {
                self.entries.insert(
                    key,
                    AuditLogEntry {
                        index,
                        time: row.time_label.clone(),
                        time_seconds: row.time_seconds,
                        channel,
                        original_value: None,
                        reason: "Missing value; interpolated".to_string(),
                        action: AuditAction::Interpolated,
                        new_value: Some(value),
                    },
                );
            }
        }
    }

    /// Annotate an existing removal as unbridgeable. The action stays `REMOVED`.
    pub fn note_unbridgeable(&mut self, key: &AuditKey, detail: &str) {
        if let Some(entry) = self.entries.get_mut(key) {
            if entry.action == AuditAction::Removed {
                entry.reason = format!("{}; could not interpolate ({})", entry.reason, detail);
            }
        }
    }

    pub fn get(&self, key: &AuditKey) -> Option<&AuditLogEntry> {
        self.entries.get(key)
    }

    /// Delete an entry, returning it.
    pub fn remove(&mut self, key: &AuditKey) -> Option<AuditLogEntry> {
        self.entries.remove(key)
    }

    /// Iterate entries in row/channel order.
    pub fn entries(&self) -> impl Iterator<Item = &AuditLogEntry> {
        self.entries.values()
    }

    /// Number of entries with the given action.
    pub fn count(&self, action: AuditAction) -> usize {
        self.entries.values().filter(|e| e.action == action).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Counters for this log, given how many removals were reverted.
    pub fn stats(&self, values_restored: usize) -> CleaningStats {
        CleaningStats {
            outliers_removed: self.count(AuditAction::Removed),
            points_interpolated: self.count(AuditAction::Interpolated),
            values_restored,
        }
    }

    /// Consume the log into an ordered list.
    pub fn into_entries(self) -> Vec<AuditLogEntry> {
        self.entries.into_values().collect()
    }
}
