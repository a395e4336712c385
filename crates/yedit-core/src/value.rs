// Coercion of loosely-typed incoming values (CLI flags, edit lists) into
// document values.
use serde_json::Value;

use crate::error::{Error, Result};
use crate::persist::{self, ContentType};

pub const TRUE_TOKENS: [&str; 11] = [
    "y", "Y", "yes", "Yes", "YES", "true", "True", "TRUE", "on", "On", "ON",
];
pub const FALSE_TOKENS: [&str; 11] = [
    "n", "N", "no", "No", "NO", "false", "False", "FALSE", "off", "Off", "OFF",
];

/// Declared type of an incoming value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Bool,
    Str,
}

impl ValueType {
    /// Interpret a free-form hint such as `"bool"`, `"boolean"` or `"str"`.
    pub fn from_hint(hint: &str) -> Option<Self> {
        if hint.contains("bool") {
            Some(ValueType::Bool)
        } else if hint.contains("str") {
            Some(ValueType::Str)
        } else {
            None
        }
    }
}

pub fn parse_bool(s: &str) -> Option<bool> {
    if TRUE_TOKENS.contains(&s) {
        Some(true)
    } else if FALSE_TOKENS.contains(&s) {
        Some(false)
    } else {
        None
    }
}

/// Coerce `value` to its declared type, or infer one from a string.
///
/// Undeclared strings are read as YAML so `"5"`, `"true"`, `"null"` and
/// `"{a: 1}"` become a number, a boolean, null and a mapping. The empty
/// string stays a string.
pub fn parse_value(value: Value, value_type: Option<ValueType>) -> Result<Value> {
    match (value, value_type) {
        (Value::String(s), Some(ValueType::Bool)) => match parse_bool(&s) {
            Some(b) => Ok(Value::Bool(b)),
            None => Err(Error::ValueType(format!(
                "not a boolean type. str=[{}] vtype=[bool]",
                s
            ))),
        },
        (Value::String(s), Some(ValueType::Str)) => Ok(Value::String(s)),
        (Value::Bool(b), Some(ValueType::Str)) => Ok(Value::String(b.to_string())),
        (Value::Number(n), Some(ValueType::Str)) => Ok(Value::String(n.to_string())),
        (Value::String(s), None) if s.is_empty() => Ok(Value::String(s)),
        (Value::String(s), None) => serde_yaml::from_str::<Value>(&s)
            .map_err(|e| Error::ValueType(format!("value=[{}]: {}", s, e))),
        (other, _) => Ok(other),
    }
}

/// Resolve the `curr_value` of an update edit, optionally decoding it from
/// an explicit serialization format.
pub fn curr_value(value: Option<Value>, format: Option<ContentType>) -> Result<Option<Value>> {
    let Some(value) = value else {
        return Ok(None);
    };
    let value = parse_value(value, None)?;
    match (value, format) {
        (Value::String(s), Some(ct)) => persist::parse_str(&s, ct).map(Some),
        (value, _) => Ok(Some(value)),
    }
}
