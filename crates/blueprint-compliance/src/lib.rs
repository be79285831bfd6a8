//! # blueprint-compliance — Semantic Validation
//!
//! Evaluates the semantic tier of a rule set: pricing bounds, issuer-name
//! heuristics, documentation counts, currency policy and conditional
//! requirements.
//!
//! ```text
//! blueprint-rules (data)  -->  blueprint-compliance  -->  Vec<Violation>
//!   SemanticRule                 SemanticValidator          SEMANTIC_FAIL / ADVISORY
//!   Predicate                    evaluate_predicate
//! ```
//!
//! ## Crate Policy
//!
//! - Every predicate is evaluated, in declaration order, with no
//!   short-circuit; one call reports every business-rule gap.
//! - The record is never mutated and every violation is `fixable: false`.
//! - Callers run this only once the structural tier reports no failures.

pub mod evaluators;

pub use evaluators::{evaluate_predicate, SemanticValidator};
