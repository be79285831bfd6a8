//! `blueprint validate`: validate, patch and record one JSON record.

use std::path::PathBuf;

use anyhow::{Context, Result};
use blueprint_core::RuleSetVersion;
use clap::Args;

use crate::context::{build_engine, GlobalOptions};
use crate::{attempt_exit_code, print_attempt};

/// Arguments for the `validate` subcommand.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// JSON file holding one asset record.
    pub file: PathBuf,

    /// Rule-set version to validate against.
    #[arg(long = "rule-set", short = 'r')]
    pub rule_set: String,

    /// Print the full attempt as JSON instead of a summary.
    #[arg(long)]
    pub json: bool,
}

/// Run validation and append the attempt to the ledger.
///
/// Returns exit code: 0 when the attempt is VALID, 1 when it fails,
/// 2 on operational error (reported through `Err`).
pub fn run_validate(args: &ValidateArgs, opts: &GlobalOptions) -> Result<u8> {
    let version = RuleSetVersion::new(args.rule_set.as_str())?;
    let text = std::fs::read_to_string(&args.file)
        .with_context(|| format!("failed to read record from {}", args.file.display()))?;

    let engine = build_engine(opts)?;
    let attempt = engine
        .validate_json(&text, &version)
        .with_context(|| format!("validation of {} failed", args.file.display()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&attempt)?);
    } else {
        print_attempt(&attempt);
    }
    Ok(attempt_exit_code(&attempt))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(dir: &std::path::Path) -> GlobalOptions {
        GlobalOptions {
            config: None,
            ledger: Some(dir.join("ledger.jsonl")),
            rules_dir: None,
        }
    }

    fn write_record(dir: &std::path::Path, json: &str) -> PathBuf {
        let path = dir.join("record.json");
        std::fs::write(&path, json).unwrap();
        path
    }

    #[test]
    fn valid_record_exits_zero_and_is_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_record(
            dir.path(),
            r#"{"asset_id":"BOND1","asset_type":"Bond","issuer_name":"Republic of Kenya Treasury","price":1000,"currency":"usd","coupon":4.5,"documentation":["prospectus","term sheet"]}"#,
        );
        let args = ValidateArgs { file, rule_set: "bond-v1".into(), json: false };
        assert_eq!(run_validate(&args, &opts(dir.path())).unwrap(), 0);

        let engine = build_engine(&opts(dir.path())).unwrap();
        assert_eq!(engine.ledger().len(), 1);
    }

    #[test]
    fn failing_record_exits_one() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_record(
            dir.path(),
            r#"{"asset_id":"BOND456","asset_type":"Bond","issuer_name":"Government Corp","price":1000}"#,
        );
        let args = ValidateArgs { file, rule_set: "bond-v1".into(), json: true };
        assert_eq!(run_validate(&args, &opts(dir.path())).unwrap(), 1);
    }

    #[test]
    fn unknown_rule_set_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_record(dir.path(), r#"{"asset_id":"X"}"#);
        let args = ValidateArgs { file, rule_set: "bond-v9".into(), json: false };
        assert!(run_validate(&args, &opts(dir.path())).is_err());
    }

    #[test]
    fn malformed_json_is_an_error_and_not_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let file = write_record(dir.path(), "{not json");
        let args = ValidateArgs { file, rule_set: "bond-v1".into(), json: false };
        assert!(run_validate(&args, &opts(dir.path())).is_err());

        let engine = build_engine(&opts(dir.path())).unwrap();
        assert!(engine.ledger().is_empty());
    }
}
