//! # Record Model
//!
//! A `Record` maps field names to typed `FieldValue`s. Keys are held in a
//! `BTreeMap`, so iteration order never depends on the order in which an
//! ingestion step happened to emit fields. Nested records are addressed
//! with dotted paths (`issuer.name`).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::canonical::MAX_SAFE_INTEGER;
use crate::error::BlueprintError;

/// A typed field value.
///
/// Serialized untagged, so a record round-trips through plain JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// JSON `null`. Treated as absent by the validators.
    Null,
    /// Boolean.
    Bool(bool),
    /// Integral number.
    Integer(i64),
    /// Non-integral (or out-of-i64-range) number.
    Float(f64),
    /// Text.
    Text(String),
    /// Ordered sequence of values.
    Sequence(Vec<FieldValue>),
    /// Nested record.
    Nested(Record),
}

/// The type of a field value, as declared by structural rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    /// Text value.
    #[serde(rename = "string")]
    Text,
    /// Any number, integral or not.
    Number,
    /// Integral number only.
    Integer,
    /// Boolean.
    Boolean,
    /// Sequence.
    Sequence,
    /// Nested record.
    Record,
    /// `null` (only ever an actual type, never an expected one).
    Null,
}

impl ValueType {
    /// Return the string value used in documents and messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Sequence => "sequence",
            Self::Record => "record",
            Self::Null => "null",
        }
    }

    /// Whether a value of type `actual` satisfies this expected type.
    pub fn accepts(&self, actual: ValueType) -> bool {
        match self {
            Self::Number => matches!(actual, Self::Number | Self::Integer),
            other => *other == actual,
        }
    }
}

impl std::fmt::Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FieldValue {
    /// The runtime type of this value.
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Null => ValueType::Null,
            Self::Bool(_) => ValueType::Boolean,
            Self::Integer(_) => ValueType::Integer,
            Self::Float(_) => ValueType::Number,
            Self::Text(_) => ValueType::Text,
            Self::Sequence(_) => ValueType::Sequence,
            Self::Nested(_) => ValueType::Record,
        }
    }

    /// Whether this value is `null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Borrow as text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric view of integers and floats.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Borrow as a sequence.
    pub fn as_sequence(&self) -> Option<&[FieldValue]> {
        match self {
            Self::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// Whether every float inside this value is finite.
    pub fn is_finite(&self) -> bool {
        match self {
            Self::Float(f) => f.is_finite(),
            Self::Sequence(items) => items.iter().all(FieldValue::is_finite),
            Self::Nested(record) => record.fields.values().all(FieldValue::is_finite),
            _ => true,
        }
    }

    /// Whether this value can be canonicalized: floats are finite and
    /// integers lie within ±(2^53−1).
    pub fn is_canonicalizable(&self) -> bool {
        match self {
            Self::Float(f) => f.is_finite(),
            Self::Integer(i) => i.unsigned_abs() <= MAX_SAFE_INTEGER as u64,
            Self::Sequence(items) => items.iter().all(FieldValue::is_canonicalizable),
            Self::Nested(record) => record.fields.values().all(FieldValue::is_canonicalizable),
            _ => true,
        }
    }

    /// Short human-readable rendering used in violation messages.
    pub fn describe(&self) -> String {
        match self {
            Self::Null => "null".to_string(),
            Self::Bool(b) => b.to_string(),
            Self::Integer(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Text(s) => format!("{s:?}"),
            Self::Sequence(items) => format!("[{} item(s)]", items.len()),
            Self::Nested(record) => format!("{{{} field(s)}}", record.len()),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<Vec<FieldValue>> for FieldValue {
    fn from(items: Vec<FieldValue>) -> Self {
        Self::Sequence(items)
    }
}

impl From<Record> for FieldValue {
    fn from(record: Record) -> Self {
        Self::Nested(record)
    }
}

/// An asset record: field name → typed value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: BTreeMap<String, FieldValue>,
}

impl Record {
    /// An empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert of a top-level field.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Convert an already-parsed JSON value.
    ///
    /// # Errors
    ///
    /// `BlueprintError::MalformedRecord` if the value is not a JSON object.
    pub fn from_json(value: Value) -> Result<Self, BlueprintError> {
        if !value.is_object() {
            return Err(BlueprintError::MalformedRecord(format!(
                "expected a JSON object at the top level, got {}",
                json_kind(&value)
            )));
        }
        serde_json::from_value(value).map_err(|e| BlueprintError::MalformedRecord(e.to_string()))
    }

    /// Parse JSON text into a record.
    ///
    /// # Errors
    ///
    /// `BlueprintError::MalformedRecord` if the text is not JSON or not an
    /// object.
    pub fn parse_json(text: &str) -> Result<Self, BlueprintError> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| BlueprintError::MalformedRecord(format!("invalid JSON: {e}")))?;
        Self::from_json(value)
    }

    /// Render as a JSON value.
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Look up a field by dotted path.
    pub fn get(&self, path: &str) -> Option<&FieldValue> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.fields.get(first)?;
        for segment in segments {
            match current {
                FieldValue::Nested(inner) => current = inner.fields.get(segment)?,
                _ => return None,
            }
        }
        Some(current)
    }

    /// Look up a field, treating `null` as absent.
    pub fn get_present(&self, path: &str) -> Option<&FieldValue> {
        self.get(path).filter(|v| !v.is_null())
    }

    /// Write a field by dotted path, creating intermediate records.
    ///
    /// Returns `false` (and leaves the record untouched) if an intermediate
    /// segment exists but is not a nested record.
    pub fn set(&mut self, path: &str, value: FieldValue) -> bool {
        match path.split_once('.') {
            None => {
                self.fields.insert(path.to_string(), value);
                true
            }
            Some((head, rest)) => {
                let slot = self
                    .fields
                    .entry(head.to_string())
                    .or_insert_with(|| FieldValue::Nested(Record::new()));
                match slot {
                    FieldValue::Nested(inner) => inner.set(rest, value),
                    _ => false,
                }
            }
        }
    }

    /// Number of top-level fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate top-level fields in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.fields.iter()
    }
}

impl From<BTreeMap<String, FieldValue>> for Record {
    fn from(fields: BTreeMap<String, FieldValue>) -> Self {
        Self { fields }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_typed_values() {
        let record = Record::parse_json(
            r#"{"asset_id":"BOND456","price":1000,"yield":4.5,"listed":true,
                "documentation":["prospectus"],"issuer":{"name":"Acme"},"note":null}"#,
        )
        .unwrap();
        assert_eq!(record.get("asset_id"), Some(&FieldValue::Text("BOND456".into())));
        assert_eq!(record.get("price"), Some(&FieldValue::Integer(1000)));
        assert_eq!(record.get("yield"), Some(&FieldValue::Float(4.5)));
        assert_eq!(record.get("listed"), Some(&FieldValue::Bool(true)));
        assert_eq!(record.get("issuer.name"), Some(&FieldValue::Text("Acme".into())));
        assert_eq!(record.get("note"), Some(&FieldValue::Null));
        assert_eq!(record.get_present("note"), None);
        assert_eq!(
            record.get("documentation").and_then(FieldValue::as_sequence).map(<[_]>::len),
            Some(1)
        );
    }

    #[test]
    fn top_level_must_be_object() {
        let err = Record::parse_json("[1,2,3]").unwrap_err();
        assert!(matches!(err, BlueprintError::MalformedRecord(_)));
        assert!(err.to_string().contains("array"));
    }

    #[test]
    fn unparseable_text_is_malformed() {
        let err = Record::parse_json("{\"isin\": ").unwrap_err();
        assert!(matches!(err, BlueprintError::MalformedRecord(_)));
    }

    #[test]
    fn field_order_does_not_matter() {
        let a = Record::from_json(json!({"a": 1, "b": "x"})).unwrap();
        let b = Record::from_json(json!({"b": "x", "a": 1})).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_json(), b.to_json());
    }

    #[test]
    fn set_creates_intermediate_records() {
        let mut record = Record::new();
        assert!(record.set("issuer.address.city", "Lagos".into()));
        assert_eq!(record.get("issuer.address.city"), Some(&FieldValue::Text("Lagos".into())));
    }

    #[test]
    fn set_refuses_to_descend_through_scalars() {
        let mut record = Record::new().with("issuer", "Acme");
        assert!(!record.set("issuer.name", "Acme Ltd".into()));
        assert_eq!(record.get("issuer"), Some(&FieldValue::Text("Acme".into())));
    }

    #[test]
    fn number_accepts_integer_but_not_the_reverse() {
        assert!(ValueType::Number.accepts(ValueType::Integer));
        assert!(ValueType::Number.accepts(ValueType::Number));
        assert!(!ValueType::Integer.accepts(ValueType::Number));
        assert!(!ValueType::Text.accepts(ValueType::Number));
    }

    #[test]
    fn value_type_serializes_with_document_names() {
        assert_eq!(serde_json::to_string(&ValueType::Text).unwrap(), "\"string\"");
        let parsed: ValueType = serde_json::from_str("\"integer\"").unwrap();
        assert_eq!(parsed, ValueType::Integer);
    }

    #[test]
    fn non_finite_floats_are_detected() {
        assert!(FieldValue::Float(1.0).is_finite());
        assert!(!FieldValue::Float(f64::NAN).is_finite());
        let nested = FieldValue::Sequence(vec![FieldValue::Float(f64::INFINITY)]);
        assert!(!nested.is_finite());
    }

    #[test]
    fn unsafe_integers_are_not_canonicalizable() {
        assert!(FieldValue::Integer(MAX_SAFE_INTEGER).is_canonicalizable());
        assert!(FieldValue::Integer(-MAX_SAFE_INTEGER).is_canonicalizable());
        assert!(!FieldValue::Integer(MAX_SAFE_INTEGER + 2).is_canonicalizable());
        let nested = Record::new().with("inner", Record::new().with("n", i64::MIN));
        assert!(!FieldValue::Nested(nested).is_canonicalizable());
        assert!(!FieldValue::Float(f64::NAN).is_canonicalizable());
    }
}
