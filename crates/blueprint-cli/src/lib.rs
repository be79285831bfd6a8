//! # blueprint-cli — Command-Line Interface
//!
//! Thin adapter over [`blueprint_engine::Engine`]. Every subcommand builds
//! an engine from the global options, calls one engine operation and
//! prints the result.
//!
//! ## Subcommands
//!
//! - `blueprint validate <FILE> --rule-set <VERSION>`: validate, patch
//!   and record a JSON record.
//! - `blueprint history`: list ledger entries.
//! - `blueprint show <TRACE_ID>`: print one recorded attempt.
//! - `blueprint replay <TRACE_ID> --rule-set <VERSION>`: re-run a recorded
//!   input under another rule set.
//! - `blueprint export`: write the audit JSON array.
//! - `blueprint verify`: recompute every stored trace id.
//! - `blueprint demo`: patch a messy AI-generated bond record in memory.
//!
//! ## Exit Codes
//!
//! `0` success, `1` validation failure or missing entry, `2` operational
//! error.

pub mod context;
pub mod demo;
pub mod ledger;
pub mod validate;

use blueprint_core::ValidationAttempt;

/// Rule-set documents bundled with the binary.
pub const BUILTIN_RULE_SETS: [(&str, &str); 3] = [
    ("bond-v1.yaml", include_str!("../../../rulesets/bond-v1.yaml")),
    ("bond-v2.yaml", include_str!("../../../rulesets/bond-v2.yaml")),
    ("fibo-bond-v1.yaml", include_str!("../../../rulesets/fibo-bond-v1.yaml")),
];

/// Print a one-screen summary of an attempt.
pub fn print_attempt(attempt: &ValidationAttempt) {
    println!("trace_id:  {}", attempt.trace_id);
    println!("rule_set:  {}", attempt.rule_set_version);
    println!("status:    {}", attempt.status);
    println!(
        "patch:     {} ({} iteration{})",
        attempt.patch_outcome,
        attempt.iteration_count,
        if attempt.iteration_count == 1 { "" } else { "s" }
    );
    if let Some(original) = &attempt.replay_of {
        println!("replay_of: {original}");
    }
    if !attempt.fixed.is_empty() {
        println!("fixed:");
        for v in &attempt.fixed {
            println!("  {} ({})", v.field.as_deref().unwrap_or("-"), v.rule_id);
        }
    }
    if attempt.violations.is_empty() {
        println!("violations: none");
    } else {
        println!("violations:");
        for v in &attempt.violations {
            println!("  {v}");
        }
    }
}

/// Default log level for a `-v` count.
pub fn log_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Exit code for a recorded attempt: 0 when valid, 1 otherwise.
pub fn attempt_exit_code(attempt: &ValidationAttempt) -> u8 {
    if attempt.status == blueprint_core::AttemptStatus::Valid {
        0
    } else {
        1
    }
}
