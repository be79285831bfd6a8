//! # Validation Attempts
//!
//! A `ValidationAttempt` is the immutable record of one validate-or-replay
//! call. Its `trace_id` is the SHA-256 of the canonical serialization of
//!
//! ```text
//! {"input": <input_record>, "output": <output_record>, "rule_set_version": "<version>"}
//! ```
//!
//! Timestamps, violation text and replay provenance are deliberately left
//! out of the digest: validating the same input under the same version must
//! yield the same trace id on every run.

use serde::{Deserialize, Serialize};

use crate::canonical::CanonicalBytes;
use crate::digest::sha256_digest;
use crate::error::CanonicalizationError;
use crate::identity::{RuleSetVersion, TraceId};
use crate::record::Record;
use crate::temporal::Timestamp;
use crate::violation::{Severity, Violation};

/// Final status of an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttemptStatus {
    /// No failing violations.
    Valid,
    /// Structural violations remained after patching.
    SchemaFail,
    /// The record is structurally valid but fails business rules.
    SemanticFail,
}

impl AttemptStatus {
    /// Return the string value used in exports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Valid => "VALID",
            Self::SchemaFail => "SCHEMA_FAIL",
            Self::SemanticFail => "SEMANTIC_FAIL",
        }
    }

    /// Derive the status from an attempt's final violations.
    pub fn from_violations(violations: &[Violation]) -> Self {
        if violations.iter().any(|v| v.severity == Severity::SchemaFail) {
            Self::SchemaFail
        } else if violations.iter().any(|v| v.severity == Severity::SemanticFail) {
            Self::SemanticFail
        } else {
            Self::Valid
        }
    }
}

impl std::fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why the patch loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchOutcome {
    /// The record had no fixable structural violations; no patch ran.
    NotNeeded,
    /// Every structural violation was fixed.
    Clean,
    /// Fixable violations are gone but unfixable ones remain.
    Unfixable,
    /// The iteration bound was reached with fixable violations remaining.
    Exhausted,
    /// A round changed nothing or returned to an earlier record state.
    CycleDetected,
}

impl PatchOutcome {
    /// Return the string value for serialization.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotNeeded => "not_needed",
            Self::Clean => "clean",
            Self::Unfixable => "unfixable",
            Self::Exhausted => "exhausted",
            Self::CycleDetected => "cycle_detected",
        }
    }
}

impl std::fmt::Display for PatchOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize)]
struct TraceMaterial<'a> {
    input: &'a Record,
    output: &'a Record,
    rule_set_version: &'a RuleSetVersion,
}

/// Compute the trace id for an input/version/output triple.
pub fn compute_trace_id(
    input: &Record,
    rule_set_version: &RuleSetVersion,
    output: &Record,
) -> Result<TraceId, CanonicalizationError> {
    let canonical = CanonicalBytes::new(&TraceMaterial {
        input,
        output,
        rule_set_version,
    })?;
    Ok(TraceId::from_digest(sha256_digest(&canonical)))
}

/// The immutable record of one validation attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationAttempt {
    /// Digest of `{input, rule_set_version, output}`.
    pub trace_id: TraceId,
    /// The record as received.
    pub input_record: Record,
    /// The record after patching (equal to the input if nothing was fixed).
    pub output_record: Record,
    /// Remaining violations, in rule declaration order.
    pub violations: Vec<Violation>,
    /// Violations resolved by the patcher.
    pub fixed: Vec<Violation>,
    /// Final status.
    pub status: AttemptStatus,
    /// Why the patch loop stopped.
    pub patch_outcome: PatchOutcome,
    /// Number of patch rounds that changed the record.
    pub iteration_count: usize,
    /// The rule set version evaluated against.
    pub rule_set_version: RuleSetVersion,
    /// When the attempt was made.
    pub timestamp: Timestamp,
    /// Trace id of the attempt this one replays, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replay_of: Option<TraceId>,
}

impl ValidationAttempt {
    /// Seal a new attempt, computing its trace id and deriving its status.
    ///
    /// # Errors
    ///
    /// Returns a `CanonicalizationError` if either record cannot be
    /// canonicalized.
    pub fn new(
        input_record: Record,
        output_record: Record,
        rule_set_version: RuleSetVersion,
        violations: Vec<Violation>,
        fixed: Vec<Violation>,
        patch_outcome: PatchOutcome,
        iteration_count: usize,
    ) -> Result<Self, CanonicalizationError> {
        let trace_id = compute_trace_id(&input_record, &rule_set_version, &output_record)?;
        let status = AttemptStatus::from_violations(&violations);
        Ok(Self {
            trace_id,
            input_record,
            output_record,
            violations,
            fixed,
            status,
            patch_outcome,
            iteration_count,
            rule_set_version,
            timestamp: Timestamp::now(),
            replay_of: None,
        })
    }

    /// Mark this attempt as a replay of another.
    pub fn with_replay_of(mut self, original: TraceId) -> Self {
        self.replay_of = Some(original);
        self
    }

    /// Override the timestamp. Does not affect the trace id.
    pub fn with_timestamp(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Recompute the trace id from the stored records and version.
    pub fn recompute_trace_id(&self) -> Result<TraceId, CanonicalizationError> {
        compute_trace_id(&self.input_record, &self.rule_set_version, &self.output_record)
    }

    /// Whether the stored trace id still matches the stored content.
    pub fn verify_integrity(&self) -> bool {
        matches!(self.recompute_trace_id(), Ok(id) if id == self.trace_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::RuleId;
    use crate::record::FieldValue;
    use crate::violation::ViolationKind;

    fn version(s: &str) -> RuleSetVersion {
        RuleSetVersion::new(s).unwrap()
    }

    fn bond() -> Record {
        Record::new()
            .with("asset_id", "BOND456")
            .with("price", 1000i64)
    }

    fn valid_attempt() -> ValidationAttempt {
        ValidationAttempt::new(
            bond(),
            bond(),
            version("v1"),
            vec![],
            vec![],
            PatchOutcome::NotNeeded,
            0,
        )
        .unwrap()
    }

    #[test]
    fn trace_id_is_deterministic() {
        let a = valid_attempt();
        let b = valid_attempt();
        assert_eq!(a.trace_id, b.trace_id);
        assert_eq!(a.status, AttemptStatus::Valid);
    }

    #[test]
    fn trace_id_depends_on_version() {
        let a = compute_trace_id(&bond(), &version("v1"), &bond()).unwrap();
        let b = compute_trace_id(&bond(), &version("v2"), &bond()).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn timestamp_and_provenance_do_not_affect_trace() {
        let a = valid_attempt();
        let b = valid_attempt()
            .with_timestamp(Timestamp::parse("2020-01-01T00:00:00Z").unwrap())
            .with_replay_of(a.trace_id);
        assert_eq!(a.trace_id, b.trace_id);
        assert!(b.verify_integrity());
    }

    #[test]
    fn tampered_output_fails_integrity() {
        let mut attempt = valid_attempt();
        assert!(attempt.verify_integrity());
        attempt.output_record.set("price", FieldValue::Integer(1001));
        assert!(!attempt.verify_integrity());
    }

    #[test]
    fn status_is_derived_from_violations() {
        let rid = RuleId::new("issuer.generic").unwrap();
        let semantic = Violation::semantic(rid.clone(), None, "generic", Severity::SemanticFail);
        let advisory = Violation::semantic(rid.clone(), None, "hint", Severity::Advisory);
        let schema = Violation::schema(rid, "isin", ViolationKind::MissingRequired, "missing", false);

        assert_eq!(AttemptStatus::from_violations(&[advisory.clone()]), AttemptStatus::Valid);
        assert_eq!(
            AttemptStatus::from_violations(&[advisory, semantic.clone()]),
            AttemptStatus::SemanticFail
        );
        assert_eq!(
            AttemptStatus::from_violations(&[semantic, schema]),
            AttemptStatus::SchemaFail
        );
    }

    #[test]
    fn serde_round_trip_preserves_integrity() {
        let attempt = valid_attempt();
        let json = serde_json::to_string(&attempt).unwrap();
        assert!(!json.contains("replay_of"));
        let back: ValidationAttempt = serde_json::from_str(&json).unwrap();
        assert_eq!(back, attempt);
        assert!(back.verify_integrity());
    }
}
