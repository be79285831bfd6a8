//! # blueprint-core — Foundational Types for the Blueprint Engine
//!
//! This crate defines the value types every other Blueprint crate speaks:
//! the record model, canonical serialization, content digests, and the
//! immutable `ValidationAttempt` that the ledger stores. It depends on
//! nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **`CanonicalBytes` newtype.** Every digest in the system is computed
//!    from `CanonicalBytes::new()`. There is no other path from a value to a
//!    `ContentDigest`, so a trace id can always be recomputed byte-for-byte.
//!
//! 2. **Trace ids are derived, not assigned.** `TraceId` is the SHA-256 of
//!    `{input, rule_set_version, output}`. `ValidationAttempt` computes it at
//!    construction and can recompute it at any time to detect tampering.
//!
//! 3. **Outcomes are data.** Schema and semantic failures are `Violation`
//!    values inside an attempt, never `Err`. Only infrastructure problems
//!    (malformed input, canonicalization, I/O) are errors.
//!
//! 4. **UTC-only timestamps** with seconds precision.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `blueprint-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod attempt;
pub mod canonical;
pub mod digest;
pub mod error;
pub mod identity;
pub mod record;
pub mod temporal;
pub mod violation;

// Re-export primary types for ergonomic imports.
pub use attempt::{AttemptStatus, PatchOutcome, ValidationAttempt};
pub use canonical::CanonicalBytes;
pub use digest::{sha256_digest, sha256_hex, ContentDigest};
pub use error::{BlueprintError, CanonicalizationError, ValidationError};
pub use identity::{EntryId, RuleId, RuleSetVersion, TraceId};
pub use record::{FieldValue, Record, ValueType};
pub use temporal::Timestamp;
pub use violation::{ConstraintKind, Severity, Violation, ViolationKind};
