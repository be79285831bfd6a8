//! # blueprint-rules — Versioned Rule Sets
//!
//! A `RuleSet` is the immutable, declarative description of what a valid
//! asset record looks like. It has two tiers:
//!
//! - [`StructuralRule`]s: field presence, expected type, and a closed set of
//!   [`Constraint`] kinds (length, pattern, range, format), each optionally
//!   naming the deterministic fix that may repair it.
//! - [`SemanticRule`]s: business-logic [`Predicate`]s (issuer-name
//!   specificity, documentation counts, price bounds, currency policy,
//!   conditional requirements).
//!
//! Rule sets are loaded from YAML or JSON documents. Every document is
//! checked against the bundled `ruleset.schema.json` before it is
//! deserialized, and [`RuleSet::new`] enforces the invariants the schema
//! cannot express (unique rule ids, ordered bounds).
//!
//! ## Crate Policy
//!
//! - Depends only on `blueprint-core` internally.
//! - A `RuleSet` never changes after construction. A new version is a new
//!   value registered under a new [`RuleSetVersion`](blueprint_core::RuleSetVersion).
//! - No evaluation logic lives here; validators and fixes read these types.

pub mod document;
pub mod error;
pub mod registry;
pub mod ruleset;
pub mod semantic;
pub mod structural;

pub use error::RuleSetError;
pub use registry::RuleSetRegistry;
pub use ruleset::{RuleSet, RuleSetBuilder};
pub use semantic::{Predicate, SemanticRule};
pub use structural::{Constraint, FieldPattern, StructuralRule, TextFormat};
