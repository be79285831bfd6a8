//! # Violations
//!
//! A `Violation` is a rule-evaluation outcome, not an error. Schema
//! validators, semantic validators and the patcher all exchange them, and
//! every attempt records the ordered sequence that survived patching.

use serde::{Deserialize, Serialize};

use crate::identity::RuleId;
use crate::record::ValueType;

/// How severe a violation is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    /// A structural (type/shape/required-field) failure.
    SchemaFail,
    /// A business-logic failure on a structurally valid record.
    SemanticFail,
    /// A business-logic finding that is recorded but does not fail the attempt.
    Advisory,
}

impl Severity {
    /// Return the string value used in exports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SchemaFail => "SCHEMA_FAIL",
            Self::SemanticFail => "SEMANTIC_FAIL",
            Self::Advisory => "ADVISORY",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The structural constraint family that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    /// Text or sequence length bounds.
    Length,
    /// Regular-expression match.
    Pattern,
    /// Numeric bounds.
    Range,
    /// Well-known text format (timestamps, dates).
    Format,
}

/// What kind of check produced a violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ViolationKind {
    /// A required field is absent or null.
    MissingRequired,
    /// The field holds a value of the wrong type.
    TypeMismatch {
        /// Declared type.
        expected: ValueType,
        /// Observed type.
        actual: ValueType,
    },
    /// A declared constraint failed.
    Constraint {
        /// Which constraint family.
        constraint: ConstraintKind,
    },
    /// A semantic predicate failed.
    Predicate,
}

/// A single rule-evaluation finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// The rule that produced this violation.
    pub rule_id: RuleId,
    /// The field concerned, if the rule targets one.
    pub field: Option<String>,
    /// Human-readable description.
    pub message: String,
    /// Severity class.
    pub severity: Severity,
    /// Whether a registered deterministic fix may resolve it.
    pub fixable: bool,
    /// The check that failed.
    pub kind: ViolationKind,
}

impl Violation {
    /// A structural violation.
    pub fn schema(
        rule_id: RuleId,
        field: impl Into<String>,
        kind: ViolationKind,
        message: impl Into<String>,
        fixable: bool,
    ) -> Self {
        Self {
            rule_id,
            field: Some(field.into()),
            message: message.into(),
            severity: Severity::SchemaFail,
            fixable,
            kind,
        }
    }

    /// A semantic violation. Never fixable.
    pub fn semantic(
        rule_id: RuleId,
        field: Option<String>,
        message: impl Into<String>,
        severity: Severity,
    ) -> Self {
        Self {
            rule_id,
            field,
            message: message.into(),
            severity,
            fixable: false,
            kind: ViolationKind::Predicate,
        }
    }

    /// Whether two violations describe the same issue (same rule, field and
    /// check), ignoring message wording that may embed the current value.
    pub fn same_issue(&self, other: &Violation) -> bool {
        self.rule_id == other.rule_id && self.field == other.field && self.kind == other.kind
    }

    /// Whether this violation fails an attempt.
    pub fn is_failure(&self) -> bool {
        self.severity != Severity::Advisory
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.field {
            Some(field) => write!(f, "[{}] {} ({}): {}", self.severity, field, self.rule_id, self.message),
            None => write!(f, "[{}] ({}): {}", self.severity, self.rule_id, self.message),
        }
    }
}
