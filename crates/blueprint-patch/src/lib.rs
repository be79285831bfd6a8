//! # blueprint-patch — Deterministic Patcher
//!
//! Repairs recoverable structural violations with pure, named fix
//! functions and re-validates until the record is stable.
//!
//! - [`FixFunction`] / [`FixRegistry`]: `(value, rule) -> value'` functions
//!   registered by name. [`FixRegistry::builtin`] carries the standard set
//!   (`coerce_number`, `coerce_boolean`, `coerce_text`,
//!   `normalize_timestamp`, `trim`, `trim_uppercase`, `clamp_range`,
//!   `truncate`).
//! - [`DeterministicPatcher`]: the bounded fix/re-validate loop.
//!
//! ## Termination
//!
//! The loop stops when nothing fixable remains, when the iteration bound
//! is reached, when a round changes nothing, or when a round reproduces a
//! record state already seen. Every stop is reported as a
//! [`PatchOutcome`](blueprint_core::PatchOutcome); none is an error.
//!
//! ## Crate Policy
//!
//! - Fix functions are pure: no I/O, no clock, no randomness.
//! - A fix is applied at most once per field per round.
//! - A fix that yields a non-finite number is discarded.

pub mod fixes;
pub mod patcher;

pub use fixes::{FixFunction, FixRegistry};
pub use patcher::{DeterministicPatcher, PatchResult, DEFAULT_MAX_ITERATIONS};
