//! # Canonical Serialization — JCS Byte Production
//!
//! `CanonicalBytes` is the sole construction path for bytes that feed a
//! digest. Trace ids are only reproducible across runs, machines and
//! implementations if every producer serializes the same value to the same
//! bytes, so the constructor is the only way in.
//!
//! ## Rules
//!
//! 1. **Integers stay within ±(2^53 − 1).** RFC 8785 serializes numbers as
//!    IEEE-754 doubles; larger integers would silently lose precision in
//!    other JCS implementations, so they are rejected.
//! 2. **Floats** use the ECMAScript shortest round-trip form mandated by
//!    RFC 8785 (`1000.0` serializes as `1000`, `0.5` as `0.5`).
//! 3. **Objects** have their keys sorted by UTF-16 code unit; output has no
//!    insignificant whitespace and is UTF-8.
//!
//! Serialization itself is delegated to `serde_jcs`.

use serde::Serialize;
use serde_json::Value;

use crate::error::CanonicalizationError;

/// Largest integer magnitude representable exactly as an IEEE-754 double.
pub const MAX_SAFE_INTEGER: i64 = 9_007_199_254_740_991;

/// Bytes produced exclusively by JCS canonicalization.
///
/// # Invariants
///
/// - The only constructor is `CanonicalBytes::new()`.
/// - All integers are within the canonical safe range.
/// - Object keys are sorted, separators are compact.
///
/// The inner `Vec<u8>` is private, so downstream code cannot forge an
/// instance from arbitrary bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Construct canonical bytes from any serializable value.
    ///
    /// # Errors
    ///
    /// Returns `CanonicalizationError::IntegerOutOfRange` if the value holds
    /// an integer outside ±(2^53 − 1). Returns
    /// `CanonicalizationError::SerializationFailed` if serialization fails.
    pub fn new(obj: &impl Serialize) -> Result<Self, CanonicalizationError> {
        let value = serde_json::to_value(obj)?;
        check_safe_integers(&value)?;
        let s = serde_jcs::to_string(&value)?;
        Ok(Self(s.into_bytes()))
    }

    /// Access the canonical bytes for digest computation.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the length of the canonical byte sequence.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the canonical byte sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

fn check_safe_integers(value: &Value) -> Result<(), CanonicalizationError> {
    match value {
        Value::Null | Value::Bool(_) | Value::String(_) => Ok(()),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                if i.unsigned_abs() > MAX_SAFE_INTEGER as u64 {
                    return Err(CanonicalizationError::IntegerOutOfRange(n.to_string()));
                }
            } else if n.is_u64() {
                // Anything that only fits in u64 is above i64::MAX.
                return Err(CanonicalizationError::IntegerOutOfRange(n.to_string()));
            }
            Ok(())
        }
        Value::Array(items) => items.iter().try_for_each(check_safe_integers),
        Value::Object(map) => map.values().try_for_each(check_safe_integers),
    }
}
