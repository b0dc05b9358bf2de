//! Property value type for the store seam.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A property value as the backing store sees it.
///
/// Deliberately small: scalars plus a calendar date are everything the
/// family graph persists. A store client for a richer backend can widen its
/// own wire type; this crate never needs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Date(NaiveDate),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Bool(_) => "BOOLEAN",
            Value::Int(_) => "INTEGER",
            Value::Float(_) => "FLOAT",
            Value::String(_) => "STRING",
            Value::Date(_) => "DATE",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Attempt to extract as &str
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Attempt to extract as a calendar date
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }
}

// ============================================================================
// Conversions (From impls)
// ============================================================================

impl From<bool> for Value { fn from(v: bool) -> Self { Value::Bool(v) } }
impl From<i64> for Value { fn from(v: i64) -> Self { Value::Int(v) } }
impl From<f64> for Value { fn from(v: f64) -> Self { Value::Float(v) } }
impl From<String> for Value { fn from(v: String) -> Self { Value::String(v) } }
impl From<&str> for Value { fn from(v: &str) -> Self { Value::String(v.to_owned()) } }
impl From<NaiveDate> for Value { fn from(v: NaiveDate) -> Self { Value::Date(v) } }
impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self { v.map(Into::into).unwrap_or(Value::Null) }
}

// ============================================================================
// Display
// ============================================================================

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::String(s) => write!(f, "\"{}\"", s.replace('"', "\\\"")),
            Value::Date(d) => write!(f, "{d}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_from() {
        assert_eq!(Value::from("hello"), Value::String("hello".into()));
        assert_eq!(Value::from(42i64), Value::Int(42));
        assert_eq!(Value::from(true), Value::Bool(true));
        assert_eq!(Value::from(None::<&str>), Value::Null);
    }

    #[test]
    fn test_date_extraction() {
        let d = NaiveDate::from_ymd_opt(1990, 1, 1).unwrap();
        assert_eq!(Value::from(d).as_date(), Some(d));
        assert_eq!(Value::from("1990-01-01").as_date(), None);
    }

    #[test]
    fn test_type_names_and_display() {
        let d = NaiveDate::from_ymd_opt(1990, 1, 1).unwrap();
        assert_eq!(Value::from(d).type_name(), "DATE");
        assert_eq!(Value::from(d).to_string(), "1990-01-01");
        assert_eq!(Value::from("a \"quoted\" name").to_string(), "\"a \\\"quoted\\\" name\"");
        assert!(Value::Null.is_null());
        assert!(!Value::from(0i64).is_null());
    }
}
