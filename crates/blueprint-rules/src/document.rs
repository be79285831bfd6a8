//! # Rule-Set Documents
//!
//! Rule sets are authored as YAML or JSON. Loading is a three-step
//! pipeline: parse to a JSON value, validate against the bundled
//! `ruleset.schema.json`, then deserialize and freeze through
//! [`RuleSet::new`]. A document that fails the schema never reaches serde,
//! so error messages point at the offending instance path rather than at
//! an opaque deserializer position.

use std::path::Path;
use std::sync::OnceLock;

use blueprint_core::RuleSetVersion;
use jsonschema::Validator;
use serde::Deserialize;
use serde_json::Value;

use crate::error::RuleSetError;
use crate::ruleset::RuleSet;
use crate::semantic::SemanticRule;
use crate::structural::StructuralRule;

/// The bundled document schema.
pub const RULESET_SCHEMA: &str = include_str!("../schemas/ruleset.schema.json");

#[derive(Debug, Deserialize)]
struct RuleSetDocument {
    version: RuleSetVersion,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    structural: Vec<StructuralRule>,
    #[serde(default)]
    semantic: Vec<SemanticRule>,
}

fn document_validator() -> Result<&'static Validator, RuleSetError> {
    static VALIDATOR: OnceLock<Result<Validator, String>> = OnceLock::new();
    VALIDATOR
        .get_or_init(|| {
            let schema: Value = serde_json::from_str(RULESET_SCHEMA).map_err(|e| e.to_string())?;
            let mut opts = jsonschema::options();
            opts.with_draft(jsonschema::Draft::Draft202012);
            opts.build(&schema).map_err(|e| e.to_string())
        })
        .as_ref()
        .map_err(|reason| RuleSetError::SchemaUnavailable(reason.clone()))
}

/// Check a parsed document against `ruleset.schema.json`.
pub fn validate_document(instance: &Value) -> Result<(), RuleSetError> {
    let validator = document_validator()?;
    let violations: Vec<String> = validator
        .iter_errors(instance)
        .map(|e| {
            let path = e.instance_path.to_string();
            if path.is_empty() {
                format!("  (root): {e}")
            } else {
                format!("  {path}: {e}")
            }
        })
        .collect();
    if violations.is_empty() {
        Ok(())
    } else {
        Err(RuleSetError::DocumentInvalid { violations })
    }
}

impl RuleSet {
    /// Build a rule set from an already-parsed JSON document.
    pub fn from_document(document: Value) -> Result<Self, RuleSetError> {
        validate_document(&document)?;
        let doc: RuleSetDocument = serde_json::from_value(document)?;
        let rule_set = RuleSet::new(doc.version, doc.description, doc.structural, doc.semantic)?;
        tracing::debug!(
            version = %rule_set.version(),
            structural = rule_set.structural().len(),
            semantic = rule_set.semantic().len(),
            "rule set loaded"
        );
        Ok(rule_set)
    }

    /// Parse a YAML document.
    pub fn from_yaml_str(text: &str) -> Result<Self, RuleSetError> {
        let document: Value = serde_yaml::from_str(text)?;
        Self::from_document(document)
    }

    /// Parse a JSON document.
    pub fn from_json_str(text: &str) -> Result<Self, RuleSetError> {
        let document: Value = serde_json::from_str(text)?;
        Self::from_document(document)
    }

    /// Load a document from disk. `.json` files are parsed as JSON,
    /// everything else as YAML.
    pub fn load_file(path: &Path) -> Result<Self, RuleSetError> {
        let text = std::fs::read_to_string(path).map_err(|e| RuleSetError::DocumentLoad {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        let parsed = if is_json {
            Self::from_json_str(&text)
        } else {
            Self::from_yaml_str(&text)
        };
        parsed.map_err(|e| match e {
            RuleSetError::Yaml(_) | RuleSetError::Json(_) => RuleSetError::DocumentLoad {
                path: path.to_path_buf(),
                reason: e.to_string(),
            },
            other => other,
        })
    }
}
