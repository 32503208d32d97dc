//! Dynamic value type crossing the store boundary.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The contents of a store as returned by
/// [`KeyValueStore::read_all`](crate::KeyValueStore::read_all).
pub type StoreContents = BTreeMap<String, Value>;

/// A dynamic store value.
///
/// This is the closed set of value shapes that may cross the store adapter
/// boundary, so the contract stays statically checkable regardless of what
/// the concrete backend accepts natively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Boolean value.
    Bool(bool),
    /// Signed integer (full i64 range).
    Integer(i64),
    /// Floating-point number.
    Float(f64),
    /// Text string (UTF-8).
    Text(String),
    /// Byte string.
    Bytes(Vec<u8>),
    /// An instant in time, as milliseconds since the Unix epoch.
    Timestamp(i64),
    /// Ordered sequence of values.
    Array(Vec<Value>),
    /// Nested mapping with string keys.
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Returns the variant name, for error messages and status lines.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::Timestamp(_) => "timestamp",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
        }
    }

    /// Returns the timestamp in milliseconds if this is a [`Value::Timestamp`].
    #[must_use]
    pub fn as_timestamp(&self) -> Option<i64> {
        match self {
            Value::Timestamp(millis) => Some(*millis),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Array(v)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(v: BTreeMap<String, Value>) -> Self {
        Value::Map(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_impls() {
        assert_eq!(Value::from(true), Value::Bool(true));
        assert_eq!(Value::from(42i64), Value::Integer(42));
        assert_eq!(Value::from("dark"), Value::Text("dark".into()));
        assert_eq!(Value::from(vec![1u8, 2]), Value::Bytes(vec![1, 2]));
    }

    #[test]
    fn type_names() {
        assert_eq!(Value::Bool(false).type_name(), "bool");
        assert_eq!(Value::Timestamp(0).type_name(), "timestamp");
        assert_eq!(Value::Map(BTreeMap::new()).type_name(), "map");
    }

    #[test]
    fn as_timestamp() {
        assert_eq!(Value::Timestamp(1500).as_timestamp(), Some(1500));
        assert_eq!(Value::Integer(1500).as_timestamp(), None);
    }

    #[test]
    fn nested_value_serializes() {
        let mut inner = BTreeMap::new();
        inner.insert("volume".to_owned(), Value::Float(0.8));
        inner.insert("muted".to_owned(), Value::Bool(false));
        let value = Value::Array(vec![
            Value::Text("settings".into()),
            Value::Map(inner),
            Value::Timestamp(1_700_000_000_000),
        ]);

        let json = serde_json::to_string(&value).unwrap();
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(back, value);
    }
}
