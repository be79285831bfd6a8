//! Structural rule evaluation.

use std::fmt;

use blueprint_core::{FieldValue, Record, ValueType, Violation, ViolationKind};
use blueprint_rules::{Constraint, RuleSet, StructuralRule};

// ---------------------------------------------------------------------------
// Validator seam
// ---------------------------------------------------------------------------

/// A pure evaluator of one rule tier.
pub trait RecordValidator: Send + Sync + fmt::Debug {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Evaluate `record` against `rules`, returning violations in rule
    /// declaration order.
    fn validate(&self, record: &Record, rules: &RuleSet) -> Vec<Violation>;
}

// ---------------------------------------------------------------------------
// Structural validator
// ---------------------------------------------------------------------------

/// Evaluates structural rules: presence, type, then constraints.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaValidator;

impl SchemaValidator {
    /// Create a validator.
    pub fn new() -> Self {
        Self
    }

    /// Evaluate a single structural rule.
    pub fn check_rule(&self, record: &Record, rule: &StructuralRule) -> Vec<Violation> {
        let Some(value) = record.get_present(&rule.field) else {
            if rule.required {
                return vec![Violation::schema(
                    rule.id.clone(),
                    &rule.field,
                    ViolationKind::MissingRequired,
                    format!("required field '{}' is missing", rule.field),
                    false,
                )];
            }
            return Vec::new();
        };

        let actual = value.value_type();
        if !rule.expected_type.accepts(actual) {
            let fixable = rule.fix.is_some() && coercible(value, rule.expected_type);
            return vec![Violation::schema(
                rule.id.clone(),
                &rule.field,
                ViolationKind::TypeMismatch {
                    expected: rule.expected_type,
                    actual,
                },
                format!(
                    "field '{}' must be {}, got {}",
                    rule.field,
                    rule.expected_type,
                    value.describe()
                ),
                fixable,
            )];
        }

        rule.constraints
            .iter()
            .filter_map(|constraint| {
                check_constraint(value, constraint).map(|detail| {
                    Violation::schema(
                        rule.id.clone(),
                        &rule.field,
                        ViolationKind::Constraint {
                            constraint: constraint.kind(),
                        },
                        format!("field '{}' {detail}", rule.field),
                        rule.fix.is_some(),
                    )
                })
            })
            .collect()
    }
}

impl RecordValidator for SchemaValidator {
    fn name(&self) -> &'static str {
        "schema"
    }

    fn validate(&self, record: &Record, rules: &RuleSet) -> Vec<Violation> {
        rules
            .structural()
            .iter()
            .flat_map(|rule| self.check_rule(record, rule))
            .collect()
    }
}

/// Whether a value of the wrong type can be converted to `expected` by a
/// fix function.
pub fn coercible(value: &FieldValue, expected: ValueType) -> bool {
    match (value, expected) {
        (FieldValue::Text(_), ValueType::Number | ValueType::Integer | ValueType::Boolean) => true,
        (FieldValue::Integer(_) | FieldValue::Float(_) | FieldValue::Bool(_), ValueType::Text) => {
            true
        }
        (FieldValue::Float(f), ValueType::Integer) => f.is_finite() && f.fract() == 0.0,
        _ => false,
    }
}

/// Returns a description of the failure, or `None` when the constraint
/// holds or does not apply to this value's type.
fn check_constraint(value: &FieldValue, constraint: &Constraint) -> Option<String> {
    match constraint {
        Constraint::Length { min, max } => {
            let (len, unit) = match value {
                FieldValue::Text(s) => (s.chars().count(), "characters"),
                FieldValue::Sequence(items) => (items.len(), "items"),
                _ => return None,
            };
            let too_short = min.is_some_and(|m| len < m);
            let too_long = max.is_some_and(|m| len > m);
            (too_short || too_long).then(|| {
                format!(
                    "has {len} {unit}, expected {}",
                    describe_bounds(min.map(|v| v as f64), max.map(|v| v as f64))
                )
            })
        }
        Constraint::Pattern { pattern } => {
            let text = value.as_str()?;
            (!pattern.is_match(text))
                .then(|| format!("value {text:?} does not match pattern {}", pattern.as_str()))
        }
        Constraint::Range { min, max } => {
            let n = value.as_f64()?;
            let below = min.is_some_and(|m| n < m);
            let above = max.is_some_and(|m| n > m);
            (below || above)
                .then(|| format!("value {n} is outside {}", describe_bounds(*min, *max)))
        }
        Constraint::Format { format } => {
            let text = value.as_str()?;
            (!format.matches(text)).then(|| format!("value {text:?} is not in {format} format"))
        }
    }
}

fn describe_bounds(min: Option<f64>, max: Option<f64>) -> String {
    match (min, max) {
        (Some(lo), Some(hi)) if lo == hi => format!("exactly {lo}"),
        (Some(lo), Some(hi)) => format!("between {lo} and {hi}"),
        (Some(lo), None) => format!("at least {lo}"),
        (None, Some(hi)) => format!("at most {hi}"),
        (None, None) => "any".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blueprint_core::{ConstraintKind, RuleId, RuleSetVersion, Severity};
    use blueprint_rules::{FieldPattern, TextFormat};
    use serde_json::json;

    fn rid(s: &str) -> RuleId {
        RuleId::new(s).unwrap()
    }

    fn bond_rules() -> RuleSet {
        RuleSet::builder(RuleSetVersion::new("bond-v1").unwrap())
            .structural(StructuralRule::new(rid("asset_id"), "asset_id", ValueType::Text).required())
            .structural(
                StructuralRule::new(rid("isin"), "isin", ValueType::Text)
                    .constraint(Constraint::Length { min: Some(12), max: Some(12) }),
            )
            .structural(
                StructuralRule::new(rid("currency"), "currency", ValueType::Text)
                    .constraint(Constraint::Pattern { pattern: FieldPattern::new("[A-Z]{3}").unwrap() })
                    .fix("trim_uppercase"),
            )
            .structural(
                StructuralRule::new(rid("price"), "price", ValueType::Number)
                    .constraint(Constraint::Range { min: Some(0.0), max: None })
                    .fix("coerce_number"),
            )
            .structural(
                StructuralRule::new(rid("maturity"), "maturity", ValueType::Text)
                    .constraint(Constraint::Format { format: TextFormat::Rfc3339Utc })
                    .fix("normalize_timestamp"),
            )
            .build()
            .unwrap()
    }

    fn record(v: serde_json::Value) -> Record {
        Record::from_json(v).unwrap()
    }

    #[test]
    fn valid_record_has_no_violations() {
        let r = record(json!({
            "asset_id": "BOND456",
            "isin": "US0378331005",
            "currency": "USD",
            "price": 1000,
            "maturity": "2025-12-01T00:00:00Z"
        }));
        assert!(SchemaValidator::new().validate(&r, &bond_rules()).is_empty());
    }

    #[test]
    fn missing_required_is_not_fixable() {
        let v = SchemaValidator::new().validate(&record(json!({})), &bond_rules());
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].kind, ViolationKind::MissingRequired);
        assert_eq!(v[0].severity, Severity::SchemaFail);
        assert!(!v[0].fixable);
    }

    #[test]
    fn null_counts_as_absent() {
        let v = SchemaValidator::new().validate(&record(json!({"asset_id": null})), &bond_rules());
        assert_eq!(v[0].kind, ViolationKind::MissingRequired);
    }

    #[test]
    fn type_mismatch_skips_constraints() {
        let v = SchemaValidator::new().validate(
            &record(json!({"asset_id": "A", "price": "5M"})),
            &bond_rules(),
        );
        assert_eq!(v.len(), 1);
        assert_eq!(
            v[0].kind,
            ViolationKind::TypeMismatch { expected: ValueType::Number, actual: ValueType::Text }
        );
        assert!(v[0].fixable);
    }

    #[test]
    fn mismatch_without_coercion_path_is_not_fixable() {
        let v = SchemaValidator::new().validate(
            &record(json!({"asset_id": "A", "price": [1, 2]})),
            &bond_rules(),
        );
        assert!(!v[0].fixable);
    }

    #[test]
    fn constraint_violations_follow_declaration_order() {
        let v = SchemaValidator::new().validate(
            &record(json!({
                "asset_id": "A",
                "isin": "SHORT",
                "currency": "usd ",
                "price": -1,
                "maturity": "2025/12/01"
            })),
            &bond_rules(),
        );
        let ids: Vec<&str> = v.iter().map(|x| x.rule_id.as_str()).collect();
        assert_eq!(ids, vec!["isin", "currency", "price", "maturity"]);
        assert!(!v[0].fixable, "isin declares no fix");
        assert!(v[1..].iter().all(|x| x.fixable));
        assert_eq!(v[3].kind, ViolationKind::Constraint { constraint: ConstraintKind::Format });
    }

    #[test]
    fn nested_fields_are_addressed_by_path() {
        let rules = RuleSet::builder(RuleSetVersion::new("v").unwrap())
            .structural(StructuralRule::new(rid("issuer.name"), "issuer.name", ValueType::Text).required())
            .build()
            .unwrap();
        let ok = record(json!({"issuer": {"name": "Acme Capital"}}));
        let missing = record(json!({"issuer": {}}));
        assert!(SchemaValidator.validate(&ok, &rules).is_empty());
        assert_eq!(SchemaValidator.validate(&missing, &rules).len(), 1);
    }

    #[test]
    fn integral_float_is_coercible_to_integer() {
        assert!(coercible(&FieldValue::Float(3.0), ValueType::Integer));
        assert!(!coercible(&FieldValue::Float(3.5), ValueType::Integer));
        assert!(coercible(&FieldValue::Bool(true), ValueType::Text));
        assert!(!coercible(&FieldValue::Sequence(vec![]), ValueType::Text));
    }

    #[test]
    fn length_applies_to_sequences() {
        let rules = RuleSet::builder(RuleSetVersion::new("v").unwrap())
            .structural(
                StructuralRule::new(rid("docs"), "docs", ValueType::Sequence)
                    .constraint(Constraint::Length { min: Some(1), max: None }),
            )
            .build()
            .unwrap();
        let v = SchemaValidator.validate(&record(json!({"docs": []})), &rules);
        assert_eq!(v.len(), 1);
        assert!(v[0].message.contains("0 items"));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn field_order_never_changes_output(
                pairs in proptest::collection::vec(("[a-z]{1,6}", "[ -~]{0,12}"), 0..8)
            ) {
                let rules = bond_rules();
                let forward: serde_json::Map<String, serde_json::Value> = pairs
                    .iter()
                    .map(|(k, v)| (k.clone(), json!(v)))
                    .collect();
                let reversed: serde_json::Map<String, serde_json::Value> = pairs
                    .iter()
                    .rev()
                    .map(|(k, v)| (k.clone(), json!(v)))
                    .collect();
                let a = SchemaValidator.validate(&record(serde_json::Value::Object(forward)), &rules);
                let b = SchemaValidator.validate(&record(serde_json::Value::Object(reversed)), &rules);
                // Duplicate keys keep their last value, so compare only when unique.
                let unique: std::collections::BTreeSet<_> = pairs.iter().map(|(k, _)| k).collect();
                prop_assume!(unique.len() == pairs.len());
                prop_assert_eq!(a, b);
            }
        }
    }
}
