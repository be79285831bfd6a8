//! # blueprint-engine — Validation-Patch-Ledger Engine
//!
//! Wires the pipeline together and owns the ledger:
//!
//! ```text
//! record ─► SchemaValidator ─► DeterministicPatcher ⇄ SchemaValidator
//!                                      │
//!                                      ▼
//!                             SemanticValidator ─► Ledger::append ─► export
//! ```
//!
//! - [`Engine`]: `validate_and_patch`, `validate_json`, `evaluate`,
//!   `history`, `undo`, `redo`, `replay`, `export_ledger`.
//! - [`EngineConfig`]: iteration bound, ledger file and rule-set directory,
//!   loaded from YAML.
//! - [`EngineError`]: configuration and infrastructure failures. Failing
//!   rules are never errors; they are recorded in the attempt.
//!
//! ## Crate Policy
//!
//! - Every completed validation produces exactly one ledger entry.
//! - Unknown rule-set versions and unregistered fix names are rejected
//!   before anything is appended.
//! - Malformed input is surfaced to the caller and never appended.

pub mod config;
pub mod engine;
pub mod error;

pub use config::EngineConfig;
pub use engine::Engine;
pub use error::EngineError;
