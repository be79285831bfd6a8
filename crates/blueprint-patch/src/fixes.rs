//! # Fix Functions
//!
//! A fix is a pure `(value, rule) -> Option<value'>`. `None` means the fix
//! does not apply to this value; the patcher then leaves the field alone.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use blueprint_core::canonical::MAX_SAFE_INTEGER;
use blueprint_core::{FieldValue, Timestamp, ValueType};
use blueprint_rules::{StructuralRule, TextFormat};
use chrono::{NaiveDate, NaiveDateTime};

/// A pure repair for one field value.
pub trait FixFunction: Send + Sync {
    /// Produce a repaired value, or `None` if this fix cannot help.
    fn apply(&self, value: &FieldValue, rule: &StructuralRule) -> Option<FieldValue>;
}

impl<F> FixFunction for F
where
    F: Fn(&FieldValue, &StructuralRule) -> Option<FieldValue> + Send + Sync,
{
    fn apply(&self, value: &FieldValue, rule: &StructuralRule) -> Option<FieldValue> {
        self(value, rule)
    }
}

/// Fix functions by name.
#[derive(Clone, Default)]
pub struct FixRegistry {
    fixes: BTreeMap<String, Arc<dyn FixFunction>>,
}

impl fmt::Debug for FixRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FixRegistry")
            .field("fixes", &self.fixes.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl FixRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in fix.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register("coerce_number", coerce_number);
        registry.register("coerce_boolean", coerce_boolean);
        registry.register("coerce_text", coerce_text);
        registry.register("normalize_timestamp", normalize_timestamp);
        registry.register("trim", trim);
        registry.register("trim_uppercase", trim_uppercase);
        registry.register("clamp_range", clamp_range);
        registry.register("truncate", truncate);
        registry
    }

    /// Register (or replace) a fix under `name`.
    pub fn register(&mut self, name: impl Into<String>, fix: impl FixFunction + 'static) {
        let name = name.into();
        if self.fixes.insert(name.clone(), Arc::new(fix)).is_some() {
            tracing::debug!(fix = %name, "replaced registered fix function");
        }
    }

    /// Look up a fix.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn FixFunction>> {
        self.fixes.get(name)
    }

    /// Whether `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.fixes.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fixes.keys().map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// Built-in fixes
// ---------------------------------------------------------------------------

/// Numbers from text: `" 1,250.50 "`, `"5M"`, `"1.5k"`, `"2B"`. Integral
/// floats become integers when the rule expects one.
pub fn coerce_number(value: &FieldValue, rule: &StructuralRule) -> Option<FieldValue> {
    let n = match value {
        FieldValue::Text(s) => parse_human_number(s)?,
        FieldValue::Float(f) if rule.expected_type == ValueType::Integer => *f,
        _ => return None,
    };
    if !n.is_finite() {
        return None;
    }
    if rule.expected_type == ValueType::Integer && n.fract() != 0.0 {
        return None;
    }
    Some(number_value(n))
}

fn parse_human_number(text: &str) -> Option<f64> {
    let cleaned: String = text
        .trim()
        .chars()
        .filter(|c| !matches!(c, ',' | '_' | ' '))
        .collect();
    let (digits, multiplier) = match cleaned.chars().last()? {
        'k' | 'K' => (&cleaned[..cleaned.len() - 1], 1e3),
        'm' | 'M' => (&cleaned[..cleaned.len() - 1], 1e6),
        'b' | 'B' => (&cleaned[..cleaned.len() - 1], 1e9),
        _ => (cleaned.as_str(), 1.0),
    };
    if digits.is_empty() || !digits.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse::<f64>().ok().map(|n| n * multiplier)
}

fn number_value(n: f64) -> FieldValue {
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER as f64 {
        FieldValue::Integer(n as i64)
    } else {
        FieldValue::Float(n)
    }
}

/// Booleans from `true/false`, `yes/no`, `y/n`, `1/0` text or integers.
pub fn coerce_boolean(value: &FieldValue, _rule: &StructuralRule) -> Option<FieldValue> {
    match value {
        FieldValue::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "y" | "1" => Some(FieldValue::Bool(true)),
            "false" | "no" | "n" | "0" => Some(FieldValue::Bool(false)),
            _ => None,
        },
        FieldValue::Integer(1) => Some(FieldValue::Bool(true)),
        FieldValue::Integer(0) => Some(FieldValue::Bool(false)),
        _ => None,
    }
}

/// Text from numbers and booleans.
pub fn coerce_text(value: &FieldValue, _rule: &StructuralRule) -> Option<FieldValue> {
    match value {
        FieldValue::Integer(i) => Some(FieldValue::Text(i.to_string())),
        FieldValue::Float(f) => Some(FieldValue::Text(f.to_string())),
        FieldValue::Bool(b) => Some(FieldValue::Text(b.to_string())),
        _ => None,
    }
}

const DATE_FORMATS: [&str; 3] = ["%Y/%m/%d", "%Y-%m-%d", "%Y.%m.%d"];
const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y/%m/%d %H:%M:%S"];

/// Dates and datetimes to `YYYY-MM-DDTHH:MM:SSZ`, or to `YYYY-MM-DD` when
/// the rule's format is `iso_date`. Offsets are converted to UTC; naive
/// values are taken as UTC.
pub fn normalize_timestamp(value: &FieldValue, rule: &StructuralRule) -> Option<FieldValue> {
    let text = value.as_str()?.trim();
    let parsed = Timestamp::parse_lenient(text)
        .ok()
        .map(|ts| ts.as_datetime().naive_utc())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        })
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })?;
    let rendered = match rule.text_format() {
        Some(TextFormat::IsoDate) => parsed.format("%Y-%m-%d").to_string(),
        _ => Timestamp::from_utc(parsed.and_utc()).to_iso8601(),
    };
    Some(FieldValue::Text(rendered))
}

/// Surrounding whitespace removed.
pub fn trim(value: &FieldValue, _rule: &StructuralRule) -> Option<FieldValue> {
    let s = value.as_str()?;
    Some(FieldValue::Text(s.trim().to_string()))
}

/// Trimmed and upper-cased: `"usd "` becomes `"USD"`.
pub fn trim_uppercase(value: &FieldValue, _rule: &StructuralRule) -> Option<FieldValue> {
    let s = value.as_str()?;
    Some(FieldValue::Text(s.trim().to_uppercase()))
}

/// Numbers pulled into the rule's `range` bounds.
pub fn clamp_range(value: &FieldValue, rule: &StructuralRule) -> Option<FieldValue> {
    let n = value.as_f64()?;
    let (min, max) = rule.range_bounds()?;
    let mut clamped = n;
    if let Some(lo) = min {
        clamped = clamped.max(lo);
    }
    if let Some(hi) = max {
        clamped = clamped.min(hi);
    }
    match value {
        FieldValue::Integer(_) if clamped.fract() == 0.0 => Some(number_value(clamped)),
        _ => Some(FieldValue::Float(clamped)),
    }
}

/// Text or sequences cut to the rule's maximum length.
pub fn truncate(value: &FieldValue, rule: &StructuralRule) -> Option<FieldValue> {
    let max = rule.max_length()?;
    match value {
        FieldValue::Text(s) => Some(FieldValue::Text(s.chars().take(max).collect())),
        FieldValue::Sequence(items) => Some(FieldValue::Sequence(items.iter().take(max).cloned().collect())),
        _ => None,
    }
}
