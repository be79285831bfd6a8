//! Rule-set construction and loading errors.

use std::path::PathBuf;

use blueprint_core::{RuleId, RuleSetVersion, ValidationError};
use thiserror::Error;

/// Errors raised while building, loading or registering rule sets.
#[derive(Error, Debug)]
pub enum RuleSetError {
    /// The document does not conform to `ruleset.schema.json`.
    #[error("rule set document failed schema validation:\n{}", .violations.join("\n"))]
    DocumentInvalid {
        /// One line per schema violation (`<instance path>: <message>`).
        violations: Vec<String>,
    },

    /// The bundled document schema failed to compile.
    #[error("rule set document schema unavailable: {0}")]
    SchemaUnavailable(String),

    /// The file could not be read or parsed.
    #[error("cannot load rule set from '{}': {reason}", .path.display())]
    DocumentLoad {
        /// The offending file.
        path: PathBuf,
        /// Why loading failed.
        reason: String,
    },

    /// Two rules share an id.
    #[error("duplicate rule id '{0}'")]
    DuplicateRuleId(RuleId),

    /// A rule is internally inconsistent.
    #[error("invalid rule '{rule_id}': {reason}")]
    InvalidRule {
        /// The offending rule.
        rule_id: RuleId,
        /// What is wrong with it.
        reason: String,
    },

    /// A regular expression failed to compile.
    #[error("invalid pattern {pattern:?}: {reason}")]
    InvalidPattern {
        /// The pattern source.
        pattern: String,
        /// Compiler message.
        reason: String,
    },

    /// A version is already registered; rule sets are never redefined.
    #[error("rule set version '{0}' is already registered")]
    DuplicateVersion(RuleSetVersion),

    /// A domain primitive failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// YAML parse error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON parse error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
