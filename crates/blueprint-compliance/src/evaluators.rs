//! Predicate evaluators.

use blueprint_core::{FieldValue, Record, Violation};
use blueprint_rules::{Predicate, RuleSet};
use blueprint_schema::RecordValidator;

/// Evaluates semantic rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct SemanticValidator;

impl SemanticValidator {
    /// Create a validator.
    pub fn new() -> Self {
        Self
    }
}

impl RecordValidator for SemanticValidator {
    fn name(&self) -> &'static str {
        "semantic"
    }

    fn validate(&self, record: &Record, rules: &RuleSet) -> Vec<Violation> {
        let violations: Vec<Violation> = rules
            .semantic()
            .iter()
            .filter(|rule| !evaluate_predicate(record, &rule.predicate))
            .map(|rule| {
                Violation::semantic(
                    rule.id.clone(),
                    Some(rule.predicate.field().to_string()),
                    rule.message.clone(),
                    rule.severity,
                )
            })
            .collect();
        if !violations.is_empty() {
            tracing::debug!(
                rule_set = %rules.version(),
                failed = violations.len(),
                "semantic predicates failed"
            );
        }
        violations
    }
}

/// Whether `record` satisfies `predicate`.
pub fn evaluate_predicate(record: &Record, predicate: &Predicate) -> bool {
    match predicate {
        Predicate::NameSpecificity {
            field,
            min_length,
            generic_terms,
        } => record
            .get_present(field)
            .and_then(FieldValue::as_str)
            .is_some_and(|name| is_specific_name(name, *min_length, generic_terms)),

        Predicate::MinCount { field, min } => {
            let count = match record.get_present(field) {
                None => 0,
                Some(FieldValue::Sequence(items)) => items.len(),
                // A lone scalar is a single entry.
                Some(_) => 1,
            };
            count >= *min
        }

        Predicate::NumericRange { field, min, max } => record
            .get_present(field)
            .and_then(FieldValue::as_f64)
            .is_some_and(|n| min.map_or(true, |lo| n >= lo) && max.map_or(true, |hi| n <= hi)),

        Predicate::AllowedValues { field, values } => record
            .get_present(field)
            .and_then(FieldValue::as_str)
            .is_some_and(|v| values.iter().any(|allowed| allowed == v)),

        Predicate::RequiredWhen {
            field,
            when_field,
            equals,
        } => {
            let triggered = record
                .get_present(when_field)
                .and_then(text_form)
                .is_some_and(|v| &v == equals);
            !triggered || record.get_present(field).is_some()
        }
    }
}

fn is_specific_name(name: &str, min_length: usize, generic_terms: &[String]) -> bool {
    let trimmed = name.trim();
    if trimmed.chars().count() < min_length {
        return false;
    }
    let words: Vec<String> = trimmed
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|w| !w.is_empty())
        .collect();
    if words.is_empty() {
        return false;
    }
    !words
        .iter()
        .all(|w| generic_terms.iter().any(|g| g.to_lowercase() == *w))
}

fn text_form(value: &FieldValue) -> Option<String> {
    match value {
        FieldValue::Text(s) => Some(s.clone()),
        FieldValue::Bool(b) => Some(b.to_string()),
        FieldValue::Integer(i) => Some(i.to_string()),
        FieldValue::Float(f) => Some(f.to_string()),
        _ => None,
    }
}
