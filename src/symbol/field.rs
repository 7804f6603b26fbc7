//! Field types and values for intermediate symbols.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared semantic type of a symbol field.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// UTF-8 text
    String,
    /// 32-bit signed integer (enumerations are stored as numbers)
    Number,
    /// 64-bit unsigned integer (byte counts)
    LargeNumber,
    /// Boolean flag
    Bool,
    /// Filesystem path, stored as text
    Path,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::LargeNumber => "large number",
            FieldType::Bool => "bool",
            FieldType::Path => "path",
        };
        f.write_str(name)
    }
}

/// A primitive value stored in a symbol field.
///
/// The serialized form is untagged so the flat IR stays readable; the
/// declared [`FieldType`] of the target field disambiguates on load.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Boolean value
    Bool(bool),
    /// Signed number
    Number(i32),
    /// Unsigned large number
    LargeNumber(u64),
    /// Text value (also used for paths)
    String(String),
}

impl FieldValue {
    /// Returns true when this value may be stored in a field of `field_type`.
    pub fn fits(&self, field_type: FieldType) -> bool {
        matches!(
            (self, field_type),
            (FieldValue::String(_), FieldType::String)
                | (FieldValue::String(_), FieldType::Path)
                | (FieldValue::Number(_), FieldType::Number)
                | (FieldValue::LargeNumber(_), FieldType::LargeNumber)
                | (FieldValue::Bool(_), FieldType::Bool)
        )
    }

    /// Human readable kind, used in type mismatch diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            FieldValue::Bool(_) => "bool",
            FieldValue::Number(_) => "number",
            FieldValue::LargeNumber(_) => "large number",
            FieldValue::String(_) => "string",
        }
    }

    /// Coerces a value produced by the untagged deserializer into the
    /// representation expected by `field_type`.
    ///
    /// JSON does not distinguish `i32` from `u64`, so a small unsigned
    /// number loaded back into a `LargeNumber` field arrives as `Number`.
    pub(crate) fn normalize(self, field_type: FieldType) -> Self {
        match (self, field_type) {
            (FieldValue::Number(n), FieldType::LargeNumber) if n >= 0 => {
                FieldValue::LargeNumber(n as u64)
            }
            (FieldValue::LargeNumber(n), FieldType::Number) => match i32::try_from(n) {
                Ok(n) => FieldValue::Number(n),
                Err(_) => FieldValue::LargeNumber(n),
            },
            (value, _) => value,
        }
    }

    /// Returns the text if this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the number if this is a number value.
    pub fn as_number(&self) -> Option<i32> {
        match self {
            FieldValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the number if this is a large number value.
    pub fn as_large_number(&self) -> Option<u64> {
        match self {
            FieldValue::LargeNumber(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the flag if this is a boolean value.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Bool(b) => write!(f, "{}", if *b { "yes" } else { "no" }),
            FieldValue::Number(n) => write!(f, "{n}"),
            FieldValue::LargeNumber(n) => write!(f, "{n}"),
            FieldValue::String(s) => f.write_str(s),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Number(value)
    }
}

impl From<u64> for FieldValue {
    fn from(value: u64) -> Self {
        FieldValue::LargeNumber(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

/// Name and declared type of one field in a symbol definition.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// Field name, unique within its definition
    pub name: String,
    /// Declared type
    pub field_type: FieldType,
}

impl FieldDefinition {
    /// Creates a field definition.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
        }
    }
}

/// Enumerated field index of a concrete symbol kind.
///
/// Implemented by the per-kind field enums (for example
/// [`RelatedBundleField`](crate::relation::RelatedBundleField)). Raw `usize`
/// indices are accepted as well and are range checked on access.
pub trait FieldIndex: Copy {
    /// Zero based position of the field in its definition.
    fn index(self) -> usize;
}

impl FieldIndex for usize {
    fn index(self) -> usize {
        self
    }
}
