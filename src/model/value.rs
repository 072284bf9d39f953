//! Opaque comparable value type
//!
//! Values live in `BTreeSet`s and are compared for existence checks, so the
//! type must carry total equality, a stable hash and a total order. Floats
//! are canonicalized first (every NaN collapses to one bit pattern, -0.0
//! collapses to 0.0) so that `Eq`, `Hash` and `Ord` agree with each other.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// A single storable value.
///
/// Cross-variant comparisons use a strict variant rank
/// (`Bool < Int < Float < Text`) and never coerce: `Int(1)` and
/// `Float(1.0)` are distinct values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    Bool(bool),
    Int(i64),
    /// Serialized by bit pattern: JSON has no representation for NaN or
    /// the infinities, and a lossy `null` would make a journaled float
    /// undecodable on restart.
    Float(#[serde(with = "float_bits")] f64),
    Text(String),
}

mod float_bits {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(float: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(float.to_bits())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        u64::deserialize(deserializer).map(f64::from_bits)
    }
}

impl Value {
    /// Returns the text payload, if this is a `Text` value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Variant rank used for cross-variant ordering.
    fn rank(&self) -> u8 {
        match self {
            Value::Bool(_) => 0,
            Value::Int(_) => 1,
            Value::Float(_) => 2,
            Value::Text(_) => 3,
        }
    }

    /// Canonical bit pattern for a float: one NaN, one zero.
    fn canonical_bits(float: f64) -> u64 {
        if float.is_nan() {
            f64::NAN.to_bits()
        } else if float == 0.0 {
            0
        } else {
            float.to_bits()
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => {
                Self::canonical_bits(*a) == Self::canonical_bits(*b)
            }
            (Value::Text(a), Value::Text(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Value::Bool(b) => b.hash(state),
            Value::Int(i) => i.hash(state),
            Value::Float(f) => Self::canonical_bits(*f).hash(state),
            Value::Text(t) => t.hash(state),
        }
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => f64::from_bits(Self::canonical_bits(*a))
                .total_cmp(&f64::from_bits(Self::canonical_bits(*b))),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Text(t) => write!(f, "\"{}\"", t),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_no_cross_variant_equality() {
        assert_ne!(Value::Int(1), Value::Float(1.0));
        assert_ne!(Value::Bool(true), Value::Int(1));
        assert_ne!(Value::Text("1".into()), Value::Int(1));
    }

    #[test]
    fn test_float_canonicalization() {
        assert_eq!(Value::Float(0.0), Value::Float(-0.0));
        assert_eq!(Value::Float(f64::NAN), Value::Float(-f64::NAN));
    }

    #[test]
    fn test_ordering_is_total_and_consistent_with_eq() {
        let values = vec![
            Value::Bool(false),
            Value::Bool(true),
            Value::Int(-3),
            Value::Int(5),
            Value::Float(-0.0),
            Value::Float(2.5),
            Value::Text("a".into()),
            Value::Text("b".into()),
        ];
        let sorted: BTreeSet<Value> = values.iter().cloned().collect();
        assert_eq!(sorted.len(), values.len());
        // -0.0 and 0.0 collapse into one element
        let mut with_zero = sorted.clone();
        with_zero.insert(Value::Float(0.0));
        assert_eq!(with_zero.len(), values.len());
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Int(42).to_string(), "42");
        assert_eq!(Value::Text("jeff".into()).to_string(), "\"jeff\"");
        assert_eq!(Value::Bool(true).to_string(), "true");
    }

    #[test]
    fn test_serde_round_trip() {
        let values = vec![
            Value::Bool(true),
            Value::Int(7),
            Value::Float(3.25),
            Value::Text("hello".into()),
        ];
        for value in values {
            let encoded = serde_json::to_string(&value).unwrap();
            let decoded: Value = serde_json::from_str(&encoded).unwrap();
            assert_eq!(value, decoded);
        }
    }

    #[test]
    fn test_serde_round_trip_is_lossless_for_non_finite_floats() {
        let values = vec![
            Value::Float(f64::NAN),
            Value::Float(f64::INFINITY),
            Value::Float(f64::NEG_INFINITY),
            Value::Float(-0.0),
        ];
        for value in values {
            let encoded = serde_json::to_string(&value).unwrap();
            let decoded: Value = serde_json::from_str(&encoded).unwrap();
            assert_eq!(value, decoded);
        }
    }
}
