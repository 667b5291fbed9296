use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// A single typed channel value.
///
/// Accessors never fail: asking for a case the value does not hold yields
/// `None`, which is what lets suppliers propagate absence instead of errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    #[serde(rename = "bool")]
    Bool(bool),
    #[serde(rename = "int64")]
    Long(i64),
    #[serde(rename = "float64")]
    Double(f64),
    #[serde(rename = "string")]
    Str(String),
    #[serde(rename = "timestamp")]
    Date(DateTime<Utc>),
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_long(&self) -> Option<i64> {
        match self {
            Value::Long(n) => Some(*n),
            _ => None,
        }
    }

    /// Doubles, and longs widened to double.
    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(f) => Some(*f),
            Value::Long(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Long(_) | Value::Double(_))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Long(_) => "int64",
            Value::Double(_) => "float64",
            Value::Str(_) => "string",
            Value::Date(_) => "timestamp",
        }
    }

    /// Coerce to a long: doubles truncate, strings are parsed, dates become
    /// epoch milliseconds.
    pub fn cast_long(&self) -> Option<i64> {
        match self {
            Value::Long(n) => Some(*n),
            Value::Double(f) if f.is_finite() => Some(f.trunc() as i64),
            Value::Str(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
            }
            Value::Date(d) => Some(d.timestamp_millis()),
            _ => None,
        }
    }

    /// Coerce to a double: longs widen, strings are parsed.
    pub fn cast_double(&self) -> Option<f64> {
        match self {
            Value::Double(f) => Some(*f),
            Value::Long(n) => Some(*n as f64),
            Value::Str(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    /// Textual form of any value.
    pub fn cast_string(&self) -> String {
        self.to_string()
    }

    /// Convert a raw JSON scalar into a typed value. Arrays, objects and
    /// `null` have no typed counterpart.
    pub fn from_json(raw: &serde_json::Value) -> Option<Value> {
        match raw {
            serde_json::Value::Bool(b) => Some(Value::Bool(*b)),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Some(Value::Long(i)),
                None => n.as_f64().map(Value::Double),
            },
            serde_json::Value::String(s) => Some(Value::Str(s.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Long(n) => write!(f, "{n}"),
            Value::Double(d) => write!(f, "{d}"),
            Value::Str(s) => f.write_str(s),
            Value::Date(d) => f.write_str(&d.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Long(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Long(i64::from(n))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Double(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(d: DateTime<Utc>) -> Self {
        Value::Date(d)
    }
}
