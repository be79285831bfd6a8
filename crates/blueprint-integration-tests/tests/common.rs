//! Shared fixtures: an engine loaded with the repository's rule sets.

#![allow(dead_code)]

use std::path::PathBuf;

use blueprint_core::{Record, RuleSetVersion};
use blueprint_engine::Engine;
use serde_json::Value;

pub fn rulesets_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../rulesets")
}

pub fn engine() -> Engine {
    let mut engine = Engine::in_memory();
    engine.load_rule_sets(&rulesets_dir()).expect("repository rule sets load");
    engine
}

pub fn version(s: &str) -> RuleSetVersion {
    RuleSetVersion::new(s).unwrap()
}

pub fn record(value: Value) -> Record {
    Record::from_json(value).unwrap()
}

/// A bond record that passes every bond-v1 rule.
pub fn clean_bond() -> Value {
    serde_json::json!({
        "asset_id": "BOND1",
        "asset_type": "Bond",
        "issuer_name": "Republic of Kenya Treasury",
        "price": 1000,
        "currency": "USD",
        "coupon": 4.5,
        "documentation": ["prospectus", "term sheet"]
    })
}
