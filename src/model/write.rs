//! Write: an immutable mutation intent
//!
//! A write either maps a value to a key within a record (`Add`) or unmaps
//! it (`Remove`). Writes are never edited in place; reversing a mapping is
//! a second write with the opposite polarity.
//!
//! Equality and hashing cover key, value and record only. Polarity and
//! version are ignored so that an `Add` and the `Remove` that reverses it
//! compare equal, which is exactly what existence checks need.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::time::{self, Time};
use crate::model::Value;

/// Direction of a storable write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Polarity {
    Add,
    Remove,
}

/// An immutable record of one mutation intent.
///
/// Constructed through [`Write::add`], [`Write::remove`] or
/// [`Write::probe`]. Probe writes exist only for comparison: they carry no
/// polarity, their version is the `0` sentinel, and a buffer will refuse to
/// admit them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Write {
    key: String,
    value: Value,
    record: u64,
    polarity: Option<Polarity>,
    version: Time,
}

impl Write {
    /// Creates a storable write that maps `value` to `key` in `record`.
    pub fn add(key: impl Into<String>, value: Value, record: u64) -> Self {
        Self {
            key: key.into(),
            value,
            record,
            polarity: Some(Polarity::Add),
            version: time::now(),
        }
    }

    /// Creates a storable write that unmaps `value` from `key` in `record`.
    pub fn remove(key: impl Into<String>, value: Value, record: u64) -> Self {
        Self {
            key: key.into(),
            value,
            record,
            polarity: Some(Polarity::Remove),
            version: time::now(),
        }
    }

    /// Creates a not-storable write used only for equality comparison.
    pub fn probe(key: impl Into<String>, value: Value, record: u64) -> Self {
        Self {
            key: key.into(),
            value,
            record,
            polarity: None,
            version: 0,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn record(&self) -> u64 {
        self.record
    }

    /// The polarity, or `None` for a probe write.
    pub fn polarity(&self) -> Option<Polarity> {
        self.polarity
    }

    /// Creation order of this write; `0` for probes.
    pub fn version(&self) -> Time {
        self.version
    }

    /// Whether this write may be admitted into a buffer.
    pub fn is_storable(&self) -> bool {
        self.polarity.is_some()
    }
}

impl PartialEq for Write {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.value == other.value && self.record == other.record
    }
}

impl Eq for Write {}

impl Hash for Write {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
        self.value.hash(state);
        self.record.hash(state);
    }
}

impl fmt::Display for Write {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verb = match self.polarity {
            Some(Polarity::Add) => "ADD",
            Some(Polarity::Remove) => "REMOVE",
            None => "PROBE",
        };
        write!(f, "{} {} AS {} IN {}", verb, self.key, self.value, self.record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_ignores_polarity_and_version() {
        let add = Write::add("name", Value::from("jeff"), 1);
        let remove = Write::remove("name", Value::from("jeff"), 1);
        let probe = Write::probe("name", Value::from("jeff"), 1);

        assert_eq!(add, remove);
        assert_eq!(add, probe);
        assert_ne!(add.version(), remove.version());
    }

    #[test]
    fn test_inequality_on_any_field() {
        let base = Write::add("name", Value::from("jeff"), 1);
        assert_ne!(base, Write::add("age", Value::from("jeff"), 1));
        assert_ne!(base, Write::add("name", Value::from("ashleah"), 1));
        assert_ne!(base, Write::add("name", Value::from("jeff"), 2));
    }

    #[test]
    fn test_probes_are_not_storable() {
        let probe = Write::probe("name", Value::from("jeff"), 1);
        assert!(!probe.is_storable());
        assert_eq!(probe.version(), 0);
        assert!(probe.polarity().is_none());
    }

    #[test]
    fn test_versions_follow_creation_order() {
        let first = Write::add("k", Value::from(1), 1);
        let second = Write::add("k", Value::from(2), 1);
        assert!(second.version() > first.version());
    }

    #[test]
    fn test_display_describes_the_mutation() {
        let write = Write::add("name", Value::from("jeff"), 7);
        assert_eq!(write.to_string(), "ADD name AS \"jeff\" IN 7");
        let write = Write::remove("age", Value::from(30), 7);
        assert_eq!(write.to_string(), "REMOVE age AS 30 IN 7");
    }

    #[test]
    fn test_serde_round_trip_preserves_all_fields() {
        let write = Write::add("name", Value::from("jeff"), 7);
        let encoded = serde_json::to_vec(&write).unwrap();
        let decoded: Write = serde_json::from_slice(&encoded).unwrap();
        assert_eq!(write, decoded);
        assert_eq!(write.polarity(), decoded.polarity());
        assert_eq!(write.version(), decoded.version());
    }
}
