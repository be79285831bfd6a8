//! Engine errors.

use std::path::PathBuf;

use blueprint_core::{BlueprintError, CanonicalizationError, RuleSetVersion};
use blueprint_ledger::LedgerError;
use blueprint_rules::RuleSetError;
use thiserror::Error;

/// Errors returned by [`Engine`](crate::Engine) operations.
#[derive(Error, Debug)]
pub enum EngineError {
    /// No rule set is registered under this version.
    #[error("unknown rule set version '{0}'")]
    UnknownRuleSetVersion(RuleSetVersion),

    /// A rule set names a fix function that is not registered.
    #[error("rule set '{version}' references unregistered fix '{fix}'")]
    UnknownFix {
        /// The offending rule set.
        version: RuleSetVersion,
        /// The missing fix name.
        fix: String,
    },

    /// The engine configuration is invalid or unreadable.
    #[error("invalid configuration{}: {reason}", .path.as_ref().map(|p| format!(" '{}'", p.display())).unwrap_or_default())]
    Config {
        /// The configuration file, if one was read.
        path: Option<PathBuf>,
        /// What is wrong.
        reason: String,
    },

    /// Malformed input or a core invariant failure.
    #[error(transparent)]
    Blueprint(#[from] BlueprintError),

    /// A record could not be canonicalized for hashing.
    #[error(transparent)]
    Canonicalization(#[from] CanonicalizationError),

    /// Rule-set loading or registration failed.
    #[error(transparent)]
    RuleSet(#[from] RuleSetError),

    /// The ledger or its store failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl EngineError {
    /// Whether the caller supplied a record that could not be parsed.
    pub fn is_malformed_record(&self) -> bool {
        matches!(self, Self::Blueprint(BlueprintError::MalformedRecord(_)))
    }
}
