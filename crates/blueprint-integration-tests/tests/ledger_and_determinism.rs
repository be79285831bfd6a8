//! # Ledger Guarantees and Determinism
//!
//! Append-only history with undo/redo, trace-id integrity, bounded patch
//! loops, audit export shape and persistence across engine restarts.

mod common;

use std::sync::Arc;

use blueprint_core::{AttemptStatus, FieldValue, PatchOutcome, Record, RuleId, ValidationAttempt, ValueType};
use blueprint_engine::{Engine, EngineConfig};
use blueprint_ledger::{ExportRange, HistoryFilter, Ledger};
use blueprint_rules::{Constraint, FieldPattern, RuleSet, StructuralRule};
use common::{clean_bond, engine, record, rulesets_dir, version};
use proptest::prelude::*;
use serde_json::json;

fn bond(asset_id: &str) -> Record {
    let mut value = clean_bond();
    value["asset_id"] = json!(asset_id);
    record(value)
}

// =========================================================================
// Determinism and integrity
// =========================================================================

#[test]
fn same_input_and_version_give_same_trace_id() {
    let engine = engine();
    let mut messy = clean_bond();
    messy["maturity"] = json!("2025/12/01");
    let a = engine.evaluate(record(messy.clone()), &version("bond-v1")).unwrap();
    let b = engine.evaluate(record(messy), &version("bond-v1")).unwrap();
    assert_eq!(a.trace_id, b.trace_id);
    assert_eq!(a.output_record, b.output_record);
    assert_eq!(a.violations, b.violations);
}

#[test]
fn trace_id_depends_on_rule_set_version() {
    let engine = engine();
    let a = engine.evaluate(bond("BOND1"), &version("bond-v1")).unwrap();
    let b = engine.evaluate(bond("BOND1"), &version("bond-v2")).unwrap();
    assert_ne!(a.trace_id, b.trace_id);
}

#[test]
fn field_order_does_not_change_trace_id() {
    let engine = engine();
    let forward = engine
        .validate_json(r#"{"asset_id":"B1","price":"1K","currency":"usd"}"#, &version("bond-v1"))
        .unwrap();
    let reversed = engine
        .validate_json(r#"{"currency":"usd","price":"1K","asset_id":"B1"}"#, &version("bond-v1"))
        .unwrap();
    assert_eq!(forward.trace_id, reversed.trace_id);
}

#[test]
fn one_byte_output_change_breaks_integrity() {
    let engine = engine();
    let attempt = engine.evaluate(bond("BOND1"), &version("bond-v1")).unwrap();
    assert!(attempt.verify_integrity());

    let mut tampered = attempt.clone();
    tampered.output_record.set("asset_id", FieldValue::from("BOND2"));
    assert!(!tampered.verify_integrity());
    assert!(engine.ledger().append(tampered).is_err());
    assert!(engine.ledger().is_empty());
}

#[test]
fn stored_attempts_serialize_losslessly() {
    let engine = engine();
    let attempt = engine.validate_and_patch(bond("BOND1"), &version("bond-v1")).unwrap();
    let text = serde_json::to_string(&attempt).unwrap();
    let back: ValidationAttempt = serde_json::from_str(&text).unwrap();
    assert_eq!(back, attempt);
    assert!(back.verify_integrity());
}

// =========================================================================
// Append-only history
// =========================================================================

#[test]
fn undo_moves_the_cursor_without_deleting() {
    let engine = engine();
    for id in ["A1", "A2", "A3"] {
        engine.validate_and_patch(bond(id), &version("bond-v1")).unwrap();
    }
    assert_eq!(engine.ledger().current().unwrap().sequence, 2);

    let back = engine.undo().unwrap();
    assert_eq!(back.sequence, 1);
    assert_eq!(engine.ledger().len(), 3);
    assert_eq!(engine.history(HistoryFilter::all().timeline()).count(), 2);

    let forward = engine.redo().unwrap();
    assert_eq!(forward.sequence, 2);
    assert!(engine.redo().is_none());
}

#[test]
fn undo_stops_at_the_first_entry() {
    let engine = engine();
    assert!(engine.undo().is_none());
    engine.validate_and_patch(bond("A1"), &version("bond-v1")).unwrap();
    assert!(engine.undo().is_none());
    assert_eq!(engine.ledger().current().unwrap().sequence, 0);
}

#[test]
fn appending_after_undo_branches_but_keeps_everything() {
    let engine = engine();
    let mut traces = Vec::new();
    for id in ["A1", "A2", "A3"] {
        traces.push(engine.validate_and_patch(bond(id), &version("bond-v1")).unwrap().trace_id);
    }
    engine.undo().unwrap();
    engine.undo().unwrap();
    let branch = engine.validate_and_patch(bond("B1"), &version("bond-v1")).unwrap();

    assert_eq!(engine.ledger().len(), 4);
    assert!(engine.redo().is_none());

    let timeline: Vec<u64> = engine.ledger().timeline().iter().map(|e| e.sequence).collect();
    assert_eq!(timeline, vec![0, 3]);
    assert_eq!(engine.ledger().get_sequence(3).unwrap().parent, Some(0));
    assert_eq!(engine.ledger().current().unwrap().trace_id(), &branch.trace_id);

    // Abandoned entries stay retrievable by trace id.
    for trace in &traces {
        assert!(engine.get(trace).is_some());
    }
    assert_eq!(engine.history(HistoryFilter::all()).count(), 4);
}

#[test]
fn history_filters_compose() {
    let engine = engine();
    engine.validate_and_patch(bond("A1"), &version("bond-v1")).unwrap();
    engine.validate_and_patch(bond("A2"), &version("bond-v2")).unwrap();
    engine
        .validate_and_patch(record(json!({"asset_id": "A3", "issuer_name": "Global Corp"})), &version("bond-v1"))
        .unwrap();

    let failed = engine.history(HistoryFilter::all().with_status(AttemptStatus::SemanticFail));
    assert_eq!(failed.count(), 2);

    let v1_failed = engine.history(
        HistoryFilter::all()
            .with_status(AttemptStatus::SemanticFail)
            .with_rule_set_version(version("bond-v1")),
    );
    assert_eq!(v1_failed.count(), 1);
    assert_eq!(v1_failed.iter().next().unwrap().sequence, 2);

    let latest = engine.history(HistoryFilter::all().with_limit(1));
    assert_eq!(latest.count(), 1);
    assert_eq!(latest.iter().next().unwrap().sequence, 2);

    let newest_failures = engine.history(HistoryFilter::all().with_status(AttemptStatus::SemanticFail).with_limit(1));
    assert_eq!(newest_failures.iter().next().unwrap().sequence, 2);
}

#[test]
fn duplicate_submissions_are_both_recorded() {
    let engine = engine();
    let first = engine.validate_and_patch(bond("A1"), &version("bond-v1")).unwrap();
    let second = engine.validate_and_patch(bond("A1"), &version("bond-v1")).unwrap();
    assert_eq!(first.trace_id, second.trace_id);
    assert_eq!(engine.ledger().len(), 2);
    assert_eq!(engine.get(&first.trace_id).unwrap().sequence, 0);
}

// =========================================================================
// Termination
// =========================================================================

fn oscillating_engine(max_iterations: usize) -> Engine {
    let config = EngineConfig { max_patch_iterations: max_iterations, ..EngineConfig::default() };
    let mut engine = Engine::with_ledger(config, Ledger::in_memory());
    engine.register_fix("flip", |v: &FieldValue, _: &StructuralRule| match v.as_str()? {
        "left" => Some(FieldValue::from("right")),
        _ => Some(FieldValue::from("left")),
    });
    engine.register_fix("grow", |v: &FieldValue, _: &StructuralRule| {
        v.as_str().map(|s| FieldValue::Text(format!("{s}+")))
    });
    let rules = RuleSet::builder(version("unstable-v1"))
        .structural(
            StructuralRule::new(RuleId::new("side.never").unwrap(), "side", ValueType::Text)
                .constraint(Constraint::Pattern { pattern: FieldPattern::new("never").unwrap() })
                .fix("flip"),
        )
        .structural(
            StructuralRule::new(RuleId::new("tail.never").unwrap(), "tail", ValueType::Text)
                .constraint(Constraint::Pattern { pattern: FieldPattern::new("never").unwrap() })
                .fix("grow"),
        )
        .build()
        .unwrap();
    engine.register_rule_set(rules).unwrap();
    engine
}

#[test]
fn oscillating_fix_terminates_as_cycle() {
    let engine = oscillating_engine(8);
    let attempt = engine
        .validate_and_patch(record(json!({"side": "left"})), &version("unstable-v1"))
        .unwrap();
    assert_eq!(attempt.patch_outcome, PatchOutcome::CycleDetected);
    assert_eq!(attempt.status, AttemptStatus::SchemaFail);
    assert!(attempt.iteration_count <= 8);
    assert_eq!(engine.ledger().len(), 1);
}

#[test]
fn ever_changing_fix_is_bounded() {
    let engine = oscillating_engine(5);
    let attempt = engine
        .validate_and_patch(record(json!({"tail": ""})), &version("unstable-v1"))
        .unwrap();
    assert_eq!(attempt.patch_outcome, PatchOutcome::Exhausted);
    assert_eq!(attempt.iteration_count, 5);
    assert_eq!(attempt.output_record.get("tail"), Some(&FieldValue::from("+++++")));
}

proptest! {
    #[test]
    fn patch_loop_always_terminates_within_bound(max in 1usize..12, start in "[a-d]{0,6}") {
        let engine = oscillating_engine(max);
        let attempt = engine
            .evaluate(record(json!({"side": start.clone(), "tail": start})), &version("unstable-v1"))
            .unwrap();
        prop_assert!(attempt.iteration_count <= max);
        prop_assert_ne!(attempt.status, AttemptStatus::Valid);
    }
}

// =========================================================================
// Export
// =========================================================================

#[test]
fn export_has_the_audit_shape() {
    let engine = engine();
    engine
        .validate_and_patch(
            record(json!({"asset_id": "BOND456", "asset_type": "Bond", "issuer_name": "Government Corp", "price": 1000})),
            &version("bond-v1"),
        )
        .unwrap();
    engine.validate_and_patch(bond("A2"), &version("bond-v1")).unwrap();

    let bytes = engine.export_ledger(ExportRange::All).unwrap();
    let exported: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    let items = exported.as_array().unwrap();
    assert_eq!(items.len(), 2);

    let first = items[0].as_object().unwrap();
    let mut keys: Vec<&str> = first.keys().map(String::as_str).collect();
    keys.sort_unstable();
    assert_eq!(
        keys,
        vec!["iteration_count", "rule_set_version", "status", "timestamp", "trace_id", "violations"]
    );
    assert_eq!(first["status"], "SEMANTIC_FAIL");
    assert_eq!(first["trace_id"].as_str().unwrap().len(), 64);
    assert!(first["timestamp"].as_str().unwrap().ends_with('Z'));
    let violation = &first["violations"][0];
    assert_eq!(violation["rule_id"], "issuer_name.specific");
    assert_eq!(violation["severity"], "SEMANTIC_FAIL");
    assert_eq!(items[1]["status"], "VALID");
}

#[test]
fn export_ranges_select_entries() {
    let engine = engine();
    for id in ["A1", "A2", "A3", "A4"] {
        engine.validate_and_patch(bond(id), &version("bond-v1")).unwrap();
    }
    engine.undo().unwrap();

    let count = |range: ExportRange| -> usize {
        let bytes = engine.export_ledger(range).unwrap();
        serde_json::from_slice::<serde_json::Value>(&bytes).unwrap().as_array().unwrap().len()
    };
    assert_eq!(count(ExportRange::All), 4);
    assert_eq!(count(ExportRange::Sequences { start: 1, end: 2 }), 2);
    assert_eq!(count(ExportRange::Timeline), 3);

    let empty = Engine::in_memory();
    assert_eq!(empty.export_ledger(ExportRange::All).unwrap(), b"[]\n".to_vec());
}

// =========================================================================
// Persistence and rule-set loading
// =========================================================================

#[test]
fn jsonl_ledger_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let config = EngineConfig {
        ledger_path: Some(dir.path().join("audit/ledger.jsonl")),
        rule_sets_dir: Some(rulesets_dir()),
        ..EngineConfig::default()
    };

    let trace = {
        let engine = Engine::from_config(config.clone()).unwrap();
        engine.validate_and_patch(bond("A1"), &version("bond-v1")).unwrap();
        engine.validate_and_patch(bond("A2"), &version("bond-v1")).unwrap();
        engine.undo().unwrap();
        engine.validate_and_patch(bond("A3"), &version("bond-v2")).unwrap().trace_id
    };

    let engine = Engine::from_config(config).unwrap();
    assert_eq!(engine.ledger().len(), 3);
    assert_eq!(engine.verify_ledger().unwrap(), 3);
    assert_eq!(engine.ledger().current().unwrap().trace_id(), &trace);
    let timeline: Vec<u64> = engine.ledger().timeline().iter().map(|e| e.sequence).collect();
    assert_eq!(timeline, vec![0, 2]);
}

#[test]
fn repository_rule_sets_all_load() {
    let mut engine = Engine::in_memory();
    let loaded = engine.load_rule_sets(&rulesets_dir()).unwrap();
    let names: Vec<&str> = loaded.iter().map(|v| v.as_str()).collect();
    assert_eq!(names, vec!["bond-v1", "bond-v2", "fibo-bond-v1"]);
    for v in &loaded {
        let rules: Arc<RuleSet> = engine.rule_set(v).unwrap();
        for fix in rules.fix_names() {
            assert!(engine.fixes().contains(fix), "{v} names unregistered fix {fix}");
        }
    }
}

#[test]
fn loading_a_broken_directory_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::copy(rulesets_dir().join("bond-v1.yaml"), dir.path().join("a.yaml")).unwrap();
    std::fs::write(dir.path().join("b.yaml"), "version: broken\nstructural: [{id: x}]\n").unwrap();

    let mut engine = Engine::in_memory();
    assert!(engine.load_rule_sets(dir.path()).is_err());
    assert_eq!(engine.versions().count(), 0);
}
