//! Ledger errors. Lookups that miss return `None`, not an error.

use std::path::PathBuf;

use blueprint_core::{CanonicalizationError, TraceId};
use thiserror::Error;

/// Errors from ledger operations and stores.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// The backing store could not be read or written.
    #[error("ledger I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing store is not accepting writes.
    #[error("ledger store unavailable: {0}")]
    Unavailable(String),

    /// An attempt's stored trace id does not match its content.
    #[error("integrity check failed for trace {trace_id}: {reason}")]
    Integrity {
        /// The trace id as stored.
        trace_id: TraceId,
        /// What did not match.
        reason: String,
    },

    /// A persisted ledger file could not be decoded.
    #[error("corrupt ledger file '{}' at line {line}: {reason}", .path.display())]
    Corrupt {
        /// The ledger file.
        path: PathBuf,
        /// 1-based line number.
        line: usize,
        /// Decoder or consistency message.
        reason: String,
    },

    /// An attempt could not be canonicalized for hashing.
    #[error(transparent)]
    Canonicalization(#[from] CanonicalizationError),

    /// Serialization failure while writing or exporting.
    #[error("ledger serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
