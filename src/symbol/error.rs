//! Errors raised by the symbol model.
//!
//! These are contract violations: a caller wrote a value of the wrong kind or
//! addressed a field the definition does not declare. They are never
//! recovered from; they surface at the invocation boundary.

use super::field::FieldType;
use thiserror::Error as DeriveError;

/// Symbol model errors.
#[derive(Debug, DeriveError, Clone, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// A value's kind disagrees with the field's declared type.
    #[error("type mismatch on {definition}.{field}: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Symbol definition name
        definition: String,
        /// Field name
        field: String,
        /// Declared field type
        expected: FieldType,
        /// Kind of the offending value
        actual: String,
    },

    /// A field index outside the definition's declared range.
    #[error("field index {index} is out of range for {definition} ({field_count} fields)")]
    SchemaViolation {
        /// Symbol definition name
        definition: String,
        /// Requested index
        index: usize,
        /// Number of declared fields
        field_count: usize,
    },

    /// A flat value list does not have one entry per declared field.
    #[error("{definition} expects {expected} field values, got {actual}")]
    ValueCount {
        /// Symbol definition name
        definition: String,
        /// Declared field count
        expected: usize,
        /// Supplied value count
        actual: usize,
    },

    /// No definition with this name is registered.
    #[error("unknown symbol definition: {0}")]
    UnknownDefinition(String),

    /// A definition with this name is already registered.
    #[error("symbol definition already registered: {0}")]
    DuplicateDefinition(String),
}

/// Convenient type alias for Result.
pub type Result<T> = std::result::Result<T, Error>;
