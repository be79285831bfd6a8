//! `blueprint demo`: patch a messy AI-generated bond record in memory.

use anyhow::Result;
use blueprint_core::{Record, RuleSetVersion};
use blueprint_engine::Engine;
use blueprint_ledger::HistoryFilter;
use clap::Args;

use crate::context::register_builtins;
use crate::ledger::print_entry_row;

/// Rule set the demo validates against.
pub const DEMO_RULE_SET: &str = "fibo-bond-v1";

/// Typical model output: lowercase padded currency, human-readable face
/// value, slash-separated date.
pub const DEMO_RECORD: &str = r#"{
  "isin": "US1234567890",
  "currency": "usd ",
  "face_value": "5M",
  "maturity_date": "2030/01/01",
  "issuer": "Global Corp"
}"#;

/// Same shape, but in a currency outside the supported policy.
pub const DEMO_UNSUPPORTED: &str = r#"{
  "isin": "JP1234567890",
  "currency": "jpy",
  "face_value": 1000000,
  "maturity_date": "2031-06-30",
  "issuer": "Tokyo Metropolitan Government"
}"#;

/// Arguments for the `demo` subcommand.
#[derive(Args, Debug)]
pub struct DemoArgs {
    /// Print only the patched record.
    #[arg(long)]
    pub quiet: bool,
}

/// Run the demo against an in-memory ledger. Never touches the filesystem.
pub fn run_demo(args: &DemoArgs) -> Result<u8> {
    let mut engine = Engine::in_memory();
    register_builtins(&mut engine)?;
    let version = RuleSetVersion::new(DEMO_RULE_SET)?;

    let input = Record::parse_json(DEMO_RECORD)?;
    let attempt = engine.validate_and_patch(input, &version)?;

    if args.quiet {
        println!("{}", serde_json::to_string_pretty(&attempt.output_record.to_json())?);
        return Ok(0);
    }

    println!("== input ({DEMO_RULE_SET})");
    println!("{}", serde_json::to_string_pretty(&attempt.input_record.to_json())?);
    println!();
    println!("== patched output");
    println!("{}", serde_json::to_string_pretty(&attempt.output_record.to_json())?);
    println!();
    crate::print_attempt(&attempt);

    let rejected = engine.validate_and_patch(Record::parse_json(DEMO_UNSUPPORTED)?, &version)?;
    println!();
    println!("== second record: {}", rejected.status);
    for v in &rejected.violations {
        println!("  {v}");
    }

    println!();
    println!("== ledger");
    for entry in &engine.history(HistoryFilter::all()) {
        print_entry_row(entry);
    }
    if let Some(current) = engine.undo() {
        println!("undo -> cursor at sequence {} ({})", current.sequence, current.attempt.status);
    }
    println!("{} entries retained; undo never deletes", engine.ledger().len());
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use blueprint_core::{AttemptStatus, FieldValue, PatchOutcome};

    #[test]
    fn demo_record_is_repaired_in_one_round() {
        let mut engine = Engine::in_memory();
        register_builtins(&mut engine).unwrap();
        let version = RuleSetVersion::new(DEMO_RULE_SET).unwrap();
        let attempt = engine
            .validate_and_patch(Record::parse_json(DEMO_RECORD).unwrap(), &version)
            .unwrap();

        assert_eq!(attempt.status, AttemptStatus::Valid);
        assert_eq!(attempt.patch_outcome, PatchOutcome::Clean);
        assert_eq!(attempt.iteration_count, 1);
        let out = &attempt.output_record;
        assert_eq!(out.get("currency"), Some(&FieldValue::Text("USD".into())));
        assert_eq!(out.get("face_value"), Some(&FieldValue::Integer(5_000_000)));
        assert_eq!(out.get("maturity_date"), Some(&FieldValue::Text("2030-01-01T00:00:00Z".into())));
        assert_eq!(attempt.fixed.len(), 3);
    }

    #[test]
    fn unsupported_currency_fails_policy() {
        let mut engine = Engine::in_memory();
        register_builtins(&mut engine).unwrap();
        let version = RuleSetVersion::new(DEMO_RULE_SET).unwrap();
        let attempt = engine
            .validate_and_patch(Record::parse_json(DEMO_UNSUPPORTED).unwrap(), &version)
            .unwrap();
        assert_eq!(attempt.status, AttemptStatus::SemanticFail);
        assert_eq!(attempt.violations.len(), 1);
        assert_eq!(attempt.violations[0].rule_id.as_str(), "currency.policy");
    }

    #[test]
    fn demo_runs() {
        assert_eq!(run_demo(&DemoArgs { quiet: true }).unwrap(), 0);
        assert_eq!(run_demo(&DemoArgs { quiet: false }).unwrap(), 0);
    }
}
