//! Typed access to the loosely-typed `arguments` object of a `tools/call`.
//!
//! Handlers decide what a failed extraction means; the built-in tools turn it
//! into a tool-level failure result rather than a protocol error.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Reasons an argument could not be extracted.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ArgumentError {
    #[error("missing argument '{key}'")]
    Missing { key: String },
    #[error("argument '{key}' must be a {expected}, got {found}")]
    WrongType {
        key: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("arguments must be an object, got {0}")]
    NotAnObject(&'static str),
}

/// String-keyed bag of JSON values passed to a tool handler.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Arguments(Map<String, Value>);

impl Arguments {
    pub fn new() -> Self {
        Arguments(Map::new())
    }

    /// Accept an object, treating `null` as an empty bag.
    pub fn from_value(value: Value) -> Result<Self, ArgumentError> {
        match value {
            Value::Null => Ok(Arguments::new()),
            Value::Object(map) => Ok(Arguments(map)),
            other => Err(ArgumentError::NotAnObject(kind_of(&other))),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    pub fn require_str(&self, key: &str) -> Result<&str, ArgumentError> {
        let value = self.require(key)?;
        value.as_str().ok_or_else(|| wrong_type(key, "string", value))
    }

    pub fn optional_str(&self, key: &str) -> Result<Option<&str>, ArgumentError> {
        match self.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => value
                .as_str()
                .map(Some)
                .ok_or_else(|| wrong_type(key, "string", value)),
        }
    }

    pub fn require_i64(&self, key: &str) -> Result<i64, ArgumentError> {
        let value = self.require(key)?;
        value.as_i64().ok_or_else(|| wrong_type(key, "integer", value))
    }

    pub fn require_f64(&self, key: &str) -> Result<f64, ArgumentError> {
        let value = self.require(key)?;
        value.as_f64().ok_or_else(|| wrong_type(key, "number", value))
    }

    pub fn require_bool(&self, key: &str) -> Result<bool, ArgumentError> {
        let value = self.require(key)?;
        value.as_bool().ok_or_else(|| wrong_type(key, "boolean", value))
    }

    fn require(&self, key: &str) -> Result<&Value, ArgumentError> {
        self.get(key).ok_or_else(|| ArgumentError::Missing {
            key: key.to_string(),
        })
    }
}

impl From<Map<String, Value>> for Arguments {
    fn from(map: Map<String, Value>) -> Self {
        Arguments(map)
    }
}

impl TryFrom<Value> for Arguments {
    type Error = ArgumentError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Arguments::from_value(value)
    }
}

fn wrong_type(key: &str, expected: &'static str, found: &Value) -> ArgumentError {
    ArgumentError::WrongType {
        key: key.to_string(),
        expected,
        found: kind_of(found),
    }
}

fn kind_of(value: &Value) -> &'static str {
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

    fn args(v: Value) -> Arguments {
        Arguments::from_value(v).unwrap()
    }

    #[test]
    fn test_null_is_empty_bag() {
        assert!(args(Value::Null).is_empty());
    }

    #[test]
    fn test_non_object_rejected() {
        let err = Arguments::from_value(json!([1, 2])).unwrap_err();
        assert_eq!(err, ArgumentError::NotAnObject("array"));
    }

    #[test]
    fn test_require_str() {
        let a = args(json!({"message": "hi", "count": 3}));
        assert_eq!(a.require_str("message").unwrap(), "hi");
        assert_eq!(
            a.require_str("missing").unwrap_err(),
            ArgumentError::Missing { key: "missing".into() }
        );
        assert_eq!(
            a.require_str("count").unwrap_err(),
            ArgumentError::WrongType {
                key: "count".into(),
                expected: "string",
                found: "number",
            }
        );
    }

    #[test]
    fn test_empty_string_is_valid() {
        let a = args(json!({"message": ""}));
        assert_eq!(a.require_str("message").unwrap(), "");
    }

    #[test]
    fn test_optional_str() {
        let a = args(json!({"a": null, "b": "x", "c": 1}));
        assert_eq!(a.optional_str("a").unwrap(), None);
        assert_eq!(a.optional_str("b").unwrap(), Some("x"));
        assert_eq!(a.optional_str("zzz").unwrap(), None);
        assert!(a.optional_str("c").is_err());
    }

    #[test]
    fn test_numeric_and_bool() {
        let a = args(json!({"n": 42, "f": 1.5, "b": true}));
        assert_eq!(a.require_i64("n").unwrap(), 42);
        assert_eq!(a.require_f64("f").unwrap(), 1.5);
        assert!(a.require_bool("b").unwrap());
        assert!(a.require_i64("f").is_err());
    }
}
