//! Property values.
//!
//! A property holds one `Value`: a closed union of JSON-compatible shapes.
//! The union is encoded as plain JSON (no tag), so `"a"`, `1.5`, `true`,
//! `[..]` and `{..}` map straight onto the five variants. `null` is not a
//! member and fails to decode.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// String-keyed map of values. Key order carries no meaning.
pub type Object = BTreeMap<String, Value>;

/// Value stored under a property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<Value>),
    Object(Object),
}

/// Variant tag of a [`Value`], used by property schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    String,
    Number,
    Bool,
    Object,
    List,
}

impl ValueKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Bool => "bool",
            Self::Object => "object",
            Self::List => "list",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Value {
    /// Variant tag of this value
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::String(_) => ValueKind::String,
            Self::Number(_) => ValueKind::Number,
            Self::Bool(_) => ValueKind::Bool,
            Self::Object(_) => ValueKind::Object,
            Self::List(_) => ValueKind::List,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Self::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(l) => Some(l),
            _ => None,
        }
    }

    /// False when any number inside is NaN or infinite.
    pub fn is_finite(&self) -> bool {
        match self {
            Self::Number(n) => n.is_finite(),
            Self::List(items) => items.iter().all(Value::is_finite),
            Self::Object(map) => map.values().all(Value::is_finite),
            Self::String(_) | Self::Bool(_) => true,
        }
    }

    /// Whether this value can be written as a single HTML attribute value.
    pub fn is_scalar(&self) -> bool {
        matches!(self, Self::String(_) | Self::Number(_) | Self::Bool(_))
    }

    /// Scalar values rendered as text; `None` for lists and objects.
    pub fn to_scalar_string(&self) -> Option<String> {
        match self {
            Self::String(s) => Some(s.clone()),
            Self::Number(n) => Some(format_number(*n)),
            Self::Bool(b) => Some(b.to_string()),
            Self::Object(_) | Self::List(_) => None,
        }
    }
}

/// Integral numbers print without a trailing `.0`.
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

// =============================================================================
// Conversions
// =============================================================================

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(l: Vec<Value>) -> Self {
        Self::List(l)
    }
}

impl From<Object> for Value {
    fn from(o: Object) -> Self {
        Self::Object(o)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_json_encoding() {
        assert_eq!(serde_json::to_string(&Value::from("hi")).unwrap(), r#""hi""#);
        assert_eq!(serde_json::to_string(&Value::from(2)).unwrap(), "2.0");
        assert_eq!(serde_json::to_string(&Value::from(true)).unwrap(), "true");

        let mut obj = Object::new();
        obj.insert("w".into(), Value::from(10));
        obj.insert("tags".into(), Value::List(vec!["a".into(), "b".into()]));
        let json = serde_json::to_string(&Value::Object(obj.clone())).unwrap();
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Value::Object(obj));
    }

    #[test]
    fn test_is_finite_looks_inside() {
        assert!(Value::from(1.5).is_finite());
        assert!(!Value::from(f64::NAN).is_finite());

        let mut obj = Object::new();
        obj.insert("deep".into(), Value::List(vec![Value::from(f64::NEG_INFINITY)]));
        assert!(!Value::Object(obj).is_finite());
    }

    #[test]
    fn test_decode_picks_variant() {
        let v: Value = serde_json::from_str("3").unwrap();
        assert_eq!(v.kind(), ValueKind::Number);
        let v: Value = serde_json::from_str(r#"{"k":[1,"x",false]}"#).unwrap();
        assert_eq!(v.kind(), ValueKind::Object);
        let list = v.as_object().unwrap()["k"].as_list().unwrap();
        assert_eq!(list[1].as_str(), Some("x"));
        assert_eq!(list[2].as_bool(), Some(false));
    }

    #[test]
    fn test_null_is_rejected() {
        assert!(serde_json::from_str::<Value>("null").is_err());
        assert!(serde_json::from_str::<Value>(r#"{"a":null}"#).is_err());
    }

    #[test]
    fn test_scalar_strings() {
        assert_eq!(Value::from(3).to_scalar_string().as_deref(), Some("3"));
        assert_eq!(Value::from(0.5).to_scalar_string().as_deref(), Some("0.5"));
        assert_eq!(Value::from(false).to_scalar_string().as_deref(), Some("false"));
        assert_eq!(Value::List(vec![]).to_scalar_string(), None);
    }
}
