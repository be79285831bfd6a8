//! # Audit Export
//!
//! Serializes attempts to the audit JSON array:
//!
//! ```json
//! [{"trace_id": "e2e5…", "timestamp": "2025-01-01T00:00:00Z",
//!   "rule_set_version": "bond-v1", "status": "SEMANTIC_FAIL",
//!   "violations": [{"rule_id": "…", "field": "…", "message": "…", "severity": "SEMANTIC_FAIL"}],
//!   "iteration_count": 0}]
//! ```

use std::io::Write;

use blueprint_core::{AttemptStatus, Severity, Timestamp};
use serde::{Deserialize, Serialize};

use crate::entry::LedgerEntry;
use crate::error::LedgerError;

/// Which entries to export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportRange {
    /// Every stored entry.
    #[default]
    All,
    /// Entries whose sequence lies in `start..=end`.
    Sequences {
        /// First sequence, inclusive.
        start: u64,
        /// Last sequence, inclusive.
        end: u64,
    },
    /// Entries timestamped within `from..=to`.
    Window {
        /// Earliest timestamp, inclusive.
        from: Timestamp,
        /// Latest timestamp, inclusive.
        to: Timestamp,
    },
    /// Entries on the current timeline, up to the cursor.
    Timeline,
}

impl ExportRange {
    /// Whether a stored entry falls in this range. `Timeline` is resolved by
    /// the ledger, so it accepts everything here.
    pub fn contains(&self, entry: &LedgerEntry) -> bool {
        match self {
            Self::All | Self::Timeline => true,
            Self::Sequences { start, end } => (*start..=*end).contains(&entry.sequence),
            Self::Window { from, to } => (*from..=*to).contains(&entry.attempt.timestamp),
        }
    }
}

/// One exported violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportViolation {
    /// Rule that produced it.
    pub rule_id: String,
    /// Field concerned, if any.
    pub field: Option<String>,
    /// Human-readable message.
    pub message: String,
    /// Severity class.
    pub severity: Severity,
}

/// One exported attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRecord {
    /// Lowercase hex SHA-256.
    pub trace_id: String,
    /// `YYYY-MM-DDTHH:MM:SSZ`.
    pub timestamp: String,
    /// Rule set version evaluated against.
    pub rule_set_version: String,
    /// Final status.
    pub status: AttemptStatus,
    /// Remaining violations.
    pub violations: Vec<ExportViolation>,
    /// Patch rounds that changed the record.
    pub iteration_count: usize,
}

impl From<&LedgerEntry> for ExportRecord {
    fn from(entry: &LedgerEntry) -> Self {
        let attempt = &entry.attempt;
        Self {
            trace_id: attempt.trace_id.to_hex(),
            timestamp: attempt.timestamp.to_iso8601(),
            rule_set_version: attempt.rule_set_version.to_string(),
            status: attempt.status,
            violations: attempt
                .violations
                .iter()
                .map(|v| ExportViolation {
                    rule_id: v.rule_id.to_string(),
                    field: v.field.clone(),
                    message: v.message.clone(),
                    severity: v.severity,
                })
                .collect(),
            iteration_count: attempt.iteration_count,
        }
    }
}

/// Render entries as a pretty-printed JSON array.
pub fn export<'a>(entries: impl IntoIterator<Item = &'a LedgerEntry>) -> Result<Vec<u8>, LedgerError> {
    let mut out = Vec::new();
    export_to_writer(entries, &mut out)?;
    Ok(out)
}

/// Write entries as a pretty-printed JSON array.
pub fn export_to_writer<'a, W: Write>(
    entries: impl IntoIterator<Item = &'a LedgerEntry>,
    mut writer: W,
) -> Result<(), LedgerError> {
    let records: Vec<ExportRecord> = entries.into_iter().map(ExportRecord::from).collect();
    serde_json::to_writer_pretty(&mut writer, &records).map_err(|e| {
        if e.is_io() {
            LedgerError::Io(e.into())
        } else {
            LedgerError::Serialization(e)
        }
    })?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}
