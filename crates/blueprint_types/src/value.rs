//! Universal Value type that flows between native code and Blueprints
//!
//! Boxed struct payloads are opaque bytes; this is the representation used
//! when a script or a test needs to look inside one.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ─────────────────────────────────────────────────────────────────────────────
// Universal Value Type
// ─────────────────────────────────────────────────────────────────────────────

/// Universal value type that can flow between native code and Blueprints
///
/// Supports primitive types (null, bool, int, float, string) and compound
/// types (arrays, typed or untyped objects). Object fields are kept sorted so
/// dumps of the same struct are stable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum Value {
    /// Null/undefined value
    #[default]
    Null,
    /// Boolean value
    Bool(bool),
    /// 64-bit integer
    Int(i64),
    /// 64-bit floating point
    Float(f64),
    /// UTF-8 string
    String(String),
    /// Ordered array of values
    Array(Vec<Value>),
    /// Structured object with optional type identifier
    Object {
        /// Type identifier (e.g., "game/Score")
        #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
        type_id: Option<String>,
        /// Field values
        fields: BTreeMap<String, Value>,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// Value Accessors
// ─────────────────────────────────────────────────────────────────────────────

impl Value {
    /// Get as boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as i64 (also converts from float if lossless)
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    /// Get as f64 (also converts from int)
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Get as string reference
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as object fields reference
    pub fn as_object(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Object { fields, .. } => Some(fields),
            _ => None,
        }
    }

    /// Get object type ID if this is a typed object
    pub fn object_type_id(&self) -> Option<&str> {
        match self {
            Value::Object { type_id, .. } => type_id.as_deref(),
            _ => None,
        }
    }

    /// Get a field from an object
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_object().and_then(|obj| obj.get(key))
    }

    /// Short name of the variant, for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object { .. } => "object",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// From Implementations
// ─────────────────────────────────────────────────────────────────────────────

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v as f64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// serde_json::Value Interop
// ─────────────────────────────────────────────────────────────────────────────

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else if let Some(f) = n.as_f64() {
                    Value::Float(f)
                } else {
                    Value::Null
                }
            }
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(arr) => {
                Value::Array(arr.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(obj) => {
                let fields = obj.into_iter().map(|(k, v)| (k, Value::from(v))).collect();
                Value::Object { type_id: None, fields }
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// TryFrom Implementations
// ─────────────────────────────────────────────────────────────────────────────

/// Error when converting from Value
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValueConversionError {
    #[error("Expected {expected}, got {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },
    #[error("Integer overflow")]
    IntegerOverflow,
}

impl TryFrom<&Value> for bool {
    type Error = ValueConversionError;
    fn try_from(v: &Value) -> Result<Self, Self::Error> {
        v.as_bool().ok_or(ValueConversionError::TypeMismatch {
            expected: "bool",
            actual: v.type_name(),
        })
    }
}

impl TryFrom<&Value> for i32 {
    type Error = ValueConversionError;
    fn try_from(v: &Value) -> Result<Self, Self::Error> {
        let i = v.as_i64().ok_or(ValueConversionError::TypeMismatch {
            expected: "int",
            actual: v.type_name(),
        })?;
        i32::try_from(i).map_err(|_| ValueConversionError::IntegerOverflow)
    }
}

impl TryFrom<&Value> for f32 {
    type Error = ValueConversionError;
    fn try_from(v: &Value) -> Result<Self, Self::Error> {
        v.as_f64()
            .map(|f| f as f32)
            .ok_or(ValueConversionError::TypeMismatch {
                expected: "float",
                actual: v.type_name(),
            })
    }
}

impl TryFrom<&Value> for String {
    type Error = ValueConversionError;
    fn try_from(v: &Value) -> Result<Self, Self::Error> {
        v.as_str()
            .map(str::to_string)
            .ok_or(ValueConversionError::TypeMismatch {
                expected: "string",
                actual: v.type_name(),
            })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_conversions() {
        assert_eq!(Value::from(42).as_i64(), Some(42));
        assert_eq!(Value::from(2.5f32).as_f64(), Some(2.5));
        assert_eq!(Value::Bool(true).as_bool(), Some(true));
        assert_eq!(Value::from("hello").as_str(), Some("hello"));
    }

    #[test]
    fn test_from_json() {
        let v = Value::from(serde_json::json!({"x": 1, "y": [true, "s"], "z": 0.5}));
        assert_eq!(v.get("x"), Some(&Value::Int(1)));
        assert_eq!(v.get("z"), Some(&Value::Float(0.5)));
        assert_eq!(
            v.get("y"),
            Some(&Value::Array(vec![Value::Bool(true), Value::from("s")]))
        );
        assert_eq!(v.object_type_id(), None);
    }

    #[test]
    fn test_try_from_mismatch() {
        let err = i32::try_from(&Value::from("seven")).unwrap_err();
        assert_eq!(
            err,
            ValueConversionError::TypeMismatch { expected: "int", actual: "string" }
        );
        assert_eq!(
            i32::try_from(&Value::Int(i64::MAX)),
            Err(ValueConversionError::IntegerOverflow)
        );
        assert_eq!(f32::try_from(&Value::Int(3)), Ok(3.0));
    }
}
