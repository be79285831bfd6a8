//! # blueprint-schema — Structural Validation
//!
//! Checks an asset record against the structural tier of a rule set and
//! produces typed [`Violation`](blueprint_core::Violation)s. This is the
//! first stage of the pipeline and the oracle the patcher re-runs after
//! every round of fixes.
//!
//! - [`RecordValidator`]: the seam shared with the semantic validator.
//! - [`SchemaValidator`]: the structural implementation.
//! - [`coercible`]: which type mismatches a fix may repair.
//!
//! ## Crate Policy
//!
//! - Validation is pure: no I/O, no clock, no mutation of the record.
//! - Output depends only on the record's content and the rule order, never
//!   on the order fields arrived in.
//! - A failed rule is data (`Violation`), never an `Err`.

pub mod validate;

pub use validate::{coercible, RecordValidator, SchemaValidator};
