//! # Ledger Entries

use blueprint_core::{EntryId, TraceId, ValidationAttempt};
use serde::{Deserialize, Serialize};

/// One stored attempt.
///
/// `sequence` is the entry's position in the log (0-based, gap-free).
/// `parent` is the sequence of the entry the cursor was on when this one
/// was appended; following parents from any entry yields the timeline that
/// led to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Position in the log.
    pub sequence: u64,
    /// Random storage identifier. Not part of any digest.
    pub entry_id: EntryId,
    /// Sequence of the predecessor on this entry's timeline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<u64>,
    /// The attempt itself.
    pub attempt: ValidationAttempt,
}

impl LedgerEntry {
    /// Shorthand for the attempt's trace id.
    pub fn trace_id(&self) -> &TraceId {
        &self.attempt.trace_id
    }
}
