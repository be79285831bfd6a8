//! # Error Hierarchy
//!
//! Structured error types shared across the Blueprint workspace, built with
//! `thiserror`. Rule-evaluation outcomes are never errors; these types cover
//! only malformed input, canonicalization and I/O.

use thiserror::Error;

/// Top-level error type for the Blueprint core.
#[derive(Error, Debug)]
pub enum BlueprintError {
    /// The input could not be interpreted as a record.
    #[error("malformed record: {0}")]
    MalformedRecord(String),

    /// Canonicalization failure during digest computation.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// Domain primitive validation failure.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A stored trace id does not match the digest of its inputs.
    #[error("integrity error: {0}")]
    Integrity(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Integers beyond the IEEE-754 safe range cannot be represented
    /// identically by every JCS implementation.
    #[error("integer {0} is outside the canonical safe range (|n| <= 2^53 - 1)")]
    IntegerOutOfRange(String),

    /// JSON serialization failed during canonicalization.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// Validation errors for domain primitive newtypes.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Rule-set version identifiers must be non-empty and free of whitespace.
    #[error("invalid rule set version: \"{0}\" (expected non-empty, no whitespace)")]
    InvalidRuleSetVersion(String),

    /// Rule identifiers must be non-empty.
    #[error("invalid rule id: must be non-empty")]
    InvalidRuleId,

    /// Trace ids are 64 lowercase or uppercase hex characters.
    #[error("invalid trace id: \"{0}\" (expected 64 hex characters)")]
    InvalidTraceId(String),

    /// Timestamp string is not valid UTC ISO 8601.
    #[error("invalid timestamp: \"{value}\" ({reason})")]
    InvalidTimestamp {
        /// The string that failed to parse.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_record_display() {
        let err = BlueprintError::MalformedRecord("expected a JSON object".into());
        assert_eq!(err.to_string(), "malformed record: expected a JSON object");
    }

    #[test]
    fn validation_error_converts_into_top_level() {
        let err: BlueprintError = ValidationError::InvalidRuleId.into();
        assert!(matches!(err, BlueprintError::Validation(_)));
        assert!(err.to_string().contains("rule id"));
    }

    #[test]
    fn io_error_converts_into_top_level() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
        let err: BlueprintError = io.into();
        assert!(err.to_string().contains("disk gone"));
    }

    #[test]
    fn integer_out_of_range_display_names_the_value() {
        let err = CanonicalizationError::IntegerOutOfRange("9007199254740993".into());
        assert!(err.to_string().contains("9007199254740993"));
    }
}
