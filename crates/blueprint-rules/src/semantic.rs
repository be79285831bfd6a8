//! # Semantic Rules
//!
//! Business-logic predicates evaluated against a structurally valid record.
//! Semantic rules never repair anything; the compliance validator turns a
//! failing predicate into a `fixable: false` violation carrying the rule's
//! message verbatim.

use blueprint_core::{RuleId, Severity};
use serde::{Deserialize, Serialize};

use crate::error::RuleSetError;

fn default_severity() -> Severity {
    Severity::SemanticFail
}

/// A closed set of business-logic predicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Predicate {
    /// Text must be specific: at least `min_length` characters after
    /// trimming, and not composed solely of generic terms.
    NameSpecificity {
        /// Dotted field path.
        field: String,
        /// Minimum trimmed character count.
        min_length: usize,
        /// Case-insensitive words that, on their own, make a name generic.
        #[serde(default)]
        generic_terms: Vec<String>,
    },
    /// A sequence must hold at least `min` items. Absent counts as empty.
    MinCount {
        /// Dotted field path.
        field: String,
        /// Minimum item count.
        min: usize,
    },
    /// A number must lie within inclusive bounds.
    NumericRange {
        /// Dotted field path.
        field: String,
        /// Inclusive minimum.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        /// Inclusive maximum.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
    },
    /// Text must be one of an allowed list.
    AllowedValues {
        /// Dotted field path.
        field: String,
        /// Permitted values, compared exactly.
        values: Vec<String>,
    },
    /// `field` must be present whenever `when_field` equals `equals`.
    RequiredWhen {
        /// The conditionally required field.
        field: String,
        /// The field whose value triggers the requirement.
        when_field: String,
        /// Trigger value, compared against the text form of `when_field`.
        equals: String,
    },
}

impl Predicate {
    /// The field the predicate is about.
    pub fn field(&self) -> &str {
        match self {
            Self::NameSpecificity { field, .. }
            | Self::MinCount { field, .. }
            | Self::NumericRange { field, .. }
            | Self::AllowedValues { field, .. }
            | Self::RequiredWhen { field, .. } => field,
        }
    }

    /// Snake-case name of the predicate kind.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::NameSpecificity { .. } => "name_specificity",
            Self::MinCount { .. } => "min_count",
            Self::NumericRange { .. } => "numeric_range",
            Self::AllowedValues { .. } => "allowed_values",
            Self::RequiredWhen { .. } => "required_when",
        }
    }
}

/// A business-logic rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticRule {
    /// Rule identifier, unique within the rule set.
    pub id: RuleId,
    /// The predicate to evaluate.
    pub predicate: Predicate,
    /// Message recorded when the predicate fails.
    pub message: String,
    /// `SEMANTIC_FAIL` (default) or `ADVISORY`.
    #[serde(default = "default_severity")]
    pub severity: Severity,
}

impl SemanticRule {
    /// A failing rule with `SEMANTIC_FAIL` severity.
    pub fn new(id: RuleId, predicate: Predicate, message: impl Into<String>) -> Self {
        Self {
            id,
            predicate,
            message: message.into(),
            severity: Severity::SemanticFail,
        }
    }

    /// Record findings without failing the attempt.
    pub fn advisory(mut self) -> Self {
        self.severity = Severity::Advisory;
        self
    }

    pub(crate) fn check_consistency(&self) -> Result<(), RuleSetError> {
        let invalid = |reason: String| RuleSetError::InvalidRule {
            rule_id: self.id.clone(),
            reason,
        };
        if self.severity == Severity::SchemaFail {
            return Err(invalid("semantic rules cannot carry SCHEMA_FAIL severity".to_string()));
        }
        if self.message.trim().is_empty() {
            return Err(invalid("message must be non-empty".to_string()));
        }
        if self.predicate.field().trim().is_empty() {
            return Err(invalid("predicate field must be non-empty".to_string()));
        }
        match &self.predicate {
            Predicate::NumericRange { min: Some(lo), max: Some(hi), .. } if lo > hi => {
                Err(invalid(format!("range min {lo} exceeds max {hi}")))
            }
            Predicate::NumericRange { min, max, .. }
                if min.is_some_and(|v| !v.is_finite()) || max.is_some_and(|v| !v.is_finite()) =>
            {
                Err(invalid("range bounds must be finite".to_string()))
            }
            Predicate::AllowedValues { values, .. } if values.is_empty() => {
                Err(invalid("allowed_values needs at least one value".to_string()))
            }
            Predicate::RequiredWhen { when_field, .. } if when_field.trim().is_empty() => {
                Err(invalid("when_field must be non-empty".to_string()))
            }
            _ => Ok(()),
        }
    }
}
