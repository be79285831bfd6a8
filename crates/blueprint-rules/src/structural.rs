//! # Structural Rules
//!
//! A `StructuralRule` declares one field's presence, type and constraints.
//! Constraint kinds are a closed set; the schema validator matches on them
//! exhaustively, so adding a kind forces every consumer to handle it.

use blueprint_core::{ConstraintKind, RuleId, ValueType};
use chrono::{NaiveDate, NaiveTime};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::RuleSetError;

/// A compiled, fully anchored regular expression.
///
/// The source `^[A-Z]{3}$` and `[A-Z]{3}` behave identically: the whole
/// value must match.
#[derive(Debug, Clone)]
pub struct FieldPattern {
    source: String,
    regex: Regex,
}

impl FieldPattern {
    /// Compile a pattern.
    pub fn new(source: impl Into<String>) -> Result<Self, RuleSetError> {
        let source = source.into();
        let regex = Regex::new(&format!("^(?:{source})$")).map_err(|e| {
            RuleSetError::InvalidPattern {
                pattern: source.clone(),
                reason: e.to_string(),
            }
        })?;
        Ok(Self { source, regex })
    }

    /// Whether the whole text matches.
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// The pattern as written.
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl PartialEq for FieldPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Serialize for FieldPattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.source)
    }
}

impl<'de> Deserialize<'de> for FieldPattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let source = String::deserialize(deserializer)?;
        Self::new(source).map_err(serde::de::Error::custom)
    }
}

/// Well-known text formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextFormat {
    /// `YYYY-MM-DDTHH:MM:SSZ` (UTC, seconds precision, `Z` suffix).
    Rfc3339Utc,
    /// `YYYY-MM-DD`.
    IsoDate,
}

impl TextFormat {
    /// Return the string value used in documents and messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rfc3339Utc => "rfc3339_utc",
            Self::IsoDate => "iso_date",
        }
    }

    /// Whether `text` is in this format.
    pub fn matches(&self, text: &str) -> bool {
        match self {
            Self::Rfc3339Utc => {
                text.len() == 20
                    && text.ends_with('Z')
                    && text.as_bytes()[10] == b'T'
                    && is_iso_date(&text[..10])
                    && is_clock(&text[11..19])
            }
            Self::IsoDate => is_iso_date(text),
        }
    }
}

impl std::fmt::Display for TextFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn is_clock(s: &str) -> bool {
    s.len() == 8 && NaiveTime::parse_from_str(s, "%H:%M:%S").is_ok()
}

fn is_iso_date(s: &str) -> bool {
    s.len() == 10 && NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}

/// A single structural constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Constraint {
    /// Character count of text, or item count of a sequence.
    Length {
        /// Inclusive minimum.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<usize>,
        /// Inclusive maximum.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<usize>,
    },
    /// Whole-value regular expression match on text.
    Pattern {
        /// The compiled pattern.
        pattern: FieldPattern,
    },
    /// Inclusive numeric bounds.
    Range {
        /// Inclusive minimum.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        min: Option<f64>,
        /// Inclusive maximum.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<f64>,
    },
    /// Text must be in a well-known format.
    Format {
        /// The required format.
        format: TextFormat,
    },
}

impl Constraint {
    /// The constraint family, as recorded in violations.
    pub fn kind(&self) -> ConstraintKind {
        match self {
            Self::Length { .. } => ConstraintKind::Length,
            Self::Pattern { .. } => ConstraintKind::Pattern,
            Self::Range { .. } => ConstraintKind::Range,
            Self::Format { .. } => ConstraintKind::Format,
        }
    }
}

/// Structural rule for one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuralRule {
    /// Rule identifier, unique within the rule set.
    pub id: RuleId,
    /// Dotted field path.
    pub field: String,
    /// Declared type.
    #[serde(rename = "type")]
    pub expected_type: ValueType,
    /// Whether absence (or null) is a violation.
    #[serde(default)]
    pub required: bool,
    /// Constraints checked in declaration order once the type matches.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<Constraint>,
    /// Name of the registered fix function that may repair this field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix: Option<String>,
}

impl StructuralRule {
    /// An optional field of the given type with no constraints.
    pub fn new(id: RuleId, field: impl Into<String>, expected_type: ValueType) -> Self {
        Self {
            id,
            field: field.into(),
            expected_type,
            required: false,
            constraints: Vec::new(),
            fix: None,
        }
    }

    /// Mark the field as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Append a constraint.
    pub fn constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Name the fix function for this field.
    pub fn fix(mut self, name: impl Into<String>) -> Self {
        self.fix = Some(name.into());
        self
    }

    /// The `Range` bounds of this rule, if it declares one.
    pub fn range_bounds(&self) -> Option<(Option<f64>, Option<f64>)> {
        self.constraints.iter().find_map(|c| match c {
            Constraint::Range { min, max } => Some((*min, *max)),
            _ => None,
        })
    }

    /// The maximum declared length, if any.
    pub fn max_length(&self) -> Option<usize> {
        self.constraints.iter().find_map(|c| match c {
            Constraint::Length { max, .. } => *max,
            _ => None,
        })
    }

    /// The declared text format, if any.
    pub fn text_format(&self) -> Option<TextFormat> {
        self.constraints.iter().find_map(|c| match c {
            Constraint::Format { format } => Some(*format),
            _ => None,
        })
    }

    pub(crate) fn check_consistency(&self) -> Result<(), RuleSetError> {
        let invalid = |reason: String| RuleSetError::InvalidRule {
            rule_id: self.id.clone(),
            reason,
        };
        if self.field.trim().is_empty() || self.field.split('.').any(str::is_empty) {
            return Err(invalid(format!("field path {:?} is empty or malformed", self.field)));
        }
        if self.expected_type == ValueType::Null {
            return Err(invalid("expected type cannot be null".to_string()));
        }
        for constraint in &self.constraints {
            match constraint {
                Constraint::Length { min: Some(lo), max: Some(hi) } if lo > hi => {
                    return Err(invalid(format!("length min {lo} exceeds max {hi}")));
                }
                Constraint::Range { min: Some(lo), max: Some(hi) } if lo > hi => {
                    return Err(invalid(format!("range min {lo} exceeds max {hi}")));
                }
                Constraint::Range { min, max }
                    if min.is_some_and(|v| !v.is_finite()) || max.is_some_and(|v| !v.is_finite()) =>
                {
                    return Err(invalid("range bounds must be finite".to_string()));
                }
                _ => {}
            }
        }
        if matches!(&self.fix, Some(name) if name.trim().is_empty()) {
            return Err(invalid("fix name must be non-empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rid(s: &str) -> RuleId {
        RuleId::new(s).unwrap()
    }

    #[test]
    fn pattern_is_fully_anchored() {
        let p = FieldPattern::new("[A-Z]{3}").unwrap();
        assert!(p.is_match("USD"));
        assert!(!p.is_match("USD "));
        assert!(!p.is_match("xUSD"));
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        assert!(matches!(
            FieldPattern::new("([A-Z"),
            Err(RuleSetError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn rfc3339_utc_format() {
        assert!(TextFormat::Rfc3339Utc.matches("2025-12-01T00:00:00Z"));
        assert!(!TextFormat::Rfc3339Utc.matches("2025/12/01"));
        assert!(!TextFormat::Rfc3339Utc.matches("2025-12-01T00:00:00+00:00"));
        assert!(!TextFormat::Rfc3339Utc.matches("2025-13-01T00:00:00Z"));
        assert!(!TextFormat::Rfc3339Utc.matches("2025-12-01T24:00:00Z"));
    }

    #[test]
    fn iso_date_knows_the_calendar() {
        assert!(TextFormat::IsoDate.matches("2024-02-29"));
        assert!(!TextFormat::IsoDate.matches("2023-02-29"));
        assert!(!TextFormat::IsoDate.matches("2023-04-31"));
        assert!(!TextFormat::IsoDate.matches("2023-4-30"));
    }

    #[test]
    fn constraint_document_shape() {
        let c: Constraint =
            serde_json::from_value(serde_json::json!({"kind": "length", "min": 12, "max": 12})).unwrap();
        assert_eq!(c, Constraint::Length { min: Some(12), max: Some(12) });
        assert_eq!(c.kind(), ConstraintKind::Length);

        let p: Constraint =
            serde_json::from_value(serde_json::json!({"kind": "pattern", "pattern": "^[A-Z]{3}$"})).unwrap();
        assert_eq!(p.kind(), ConstraintKind::Pattern);
        assert_eq!(serde_json::to_value(&p).unwrap()["pattern"], "^[A-Z]{3}$");
    }

    #[test]
    fn consistency_rejects_inverted_bounds() {
        let rule = StructuralRule::new(rid("price.range"), "price", ValueType::Number)
            .constraint(Constraint::Range { min: Some(10.0), max: Some(1.0) });
        assert!(matches!(rule.check_consistency(), Err(RuleSetError::InvalidRule { .. })));
    }

    #[test]
    fn consistency_rejects_malformed_paths() {
        let rule = StructuralRule::new(rid("bad"), "issuer..name", ValueType::Text);
        assert!(rule.check_consistency().is_err());
    }

    #[test]
    fn accessors_find_declared_constraints() {
        let rule = StructuralRule::new(rid("maturity"), "maturity", ValueType::Text)
            .constraint(Constraint::Format { format: TextFormat::Rfc3339Utc })
            .constraint(Constraint::Length { min: None, max: Some(20) })
            .fix("normalize_timestamp");
        assert_eq!(rule.text_format(), Some(TextFormat::Rfc3339Utc));
        assert_eq!(rule.max_length(), Some(20));
        assert_eq!(rule.range_bounds(), None);
        assert_eq!(rule.fix.as_deref(), Some("normalize_timestamp"));
    }
}
