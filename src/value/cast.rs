//! Explicit value coercion backing the `CAST` function and column typing
//!
//! Casting never fails: a value that cannot be represented in the target
//! type becomes `Null`.

use super::value::Value;

/// Target type of a cast
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastTarget {
    /// Leave the value untouched
    Any,
    Int,
    Float,
    String,
    Bool,
    Blob,
    Array,
    Map,
}

impl CastTarget {
    /// Parses a type name as accepted by `CAST` and the data model
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "any" | "*" => Some(CastTarget::Any),
            "int" | "integer" => Some(CastTarget::Int),
            "float" | "number" => Some(CastTarget::Float),
            "string" | "text" => Some(CastTarget::String),
            "bool" | "boolean" => Some(CastTarget::Bool),
            "blob" => Some(CastTarget::Blob),
            "array" => Some(CastTarget::Array),
            "map" | "object" => Some(CastTarget::Map),
            _ => None,
        }
    }
}

impl Value {
    /// Coerces the value to `target`.
    pub fn cast(&self, target: CastTarget) -> Value {
        if self.is_null() {
            return Value::Null;
        }

        match target {
            CastTarget::Any => self.clone(),
            CastTarget::Int => match self {
                Value::Int(i) => Value::Int(*i),
                Value::Float(f) if f.is_finite() => Value::Int(f.trunc() as i64),
                Value::Bool(b) => Value::Int(*b as i64),
                Value::String(s) => {
                    let s = s.trim();
                    if let Ok(i) = s.parse::<i64>() {
                        Value::Int(i)
                    } else {
                        match s.parse::<f64>() {
                            Ok(f) if f.is_finite() => Value::Int(f.trunc() as i64),
                            _ => Value::Null,
                        }
                    }
                }
                _ => Value::Null,
            },
            CastTarget::Float => match self {
                Value::Int(i) => Value::Float(*i as f64),
                Value::Float(f) => Value::Float(*f),
                Value::Bool(b) => Value::Float(if *b { 1.0 } else { 0.0 }),
                Value::String(s) => s
                    .trim()
                    .parse::<f64>()
                    .map(Value::Float)
                    .unwrap_or(Value::Null),
                _ => Value::Null,
            },
            CastTarget::String => match self {
                Value::String(s) => Value::String(s.clone()),
                Value::Blob(b) => Value::String(String::from_utf8_lossy(b).into_owned()),
                other => Value::String(other.to_string()),
            },
            CastTarget::Bool => match self {
                Value::Bool(b) => Value::Bool(*b),
                Value::Int(i) => Value::Bool(*i != 0),
                Value::Float(f) => Value::Bool(*f != 0.0 && !f.is_nan()),
                Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                    "true" | "1" | "yes" => Value::Bool(true),
                    "false" | "0" | "no" | "" => Value::Bool(false),
                    _ => Value::Null,
                },
                _ => Value::Null,
            },
            CastTarget::Blob => match self {
                Value::Blob(b) => Value::Blob(b.clone()),
                Value::String(s) => Value::Blob(s.as_bytes().to_vec()),
                Value::Array(items) => {
                    let bytes: Option<Vec<u8>> = items
                        .iter()
                        .map(|v| v.as_i64().and_then(|i| u8::try_from(i).ok()))
                        .collect();
                    bytes.map(Value::Blob).unwrap_or(Value::Null)
                }
                _ => Value::Null,
            },
            CastTarget::Array => match self {
                Value::Array(a) => Value::Array(a.clone()),
                Value::String(s) => match serde_json::from_str::<serde_json::Value>(s) {
                    Ok(serde_json::Value::Array(a)) => {
                        Value::Array(a.into_iter().map(Value::from).collect())
                    }
                    _ => Value::Array(vec![self.clone()]),
                },
                other => Value::Array(vec![other.clone()]),
            },
            CastTarget::Map => match self {
                Value::Map(m) => Value::Map(m.clone()),
                Value::String(s) => match serde_json::from_str::<serde_json::Value>(s) {
                    Ok(obj @ serde_json::Value::Object(_)) => Value::from(obj),
                    _ => Value::Null,
                },
                _ => Value::Null,
            },
        }
    }
}
