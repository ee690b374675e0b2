//! Error types for field schemas and the type registry

use thiserror::Error;

/// Result type for fields operations
pub type Result<T> = std::result::Result<T, FieldsError>;

/// Errors that can occur in type registry operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FieldsError {
    /// Work item type already registered under this name
    #[error("work item type already exists: {name}")]
    DuplicateType { name: String },

    /// Work item type not found by name
    #[error("work item type not found: {name}")]
    UnknownType { name: String },

    /// Field already defined on the type
    #[error("duplicate field '{field}' on type '{type_name}'")]
    DuplicateField { type_name: String, field: String },

    /// Field not found on the type
    #[error("field '{field}' not found on type '{type_name}'")]
    UnknownField { type_name: String, field: String },

    /// Schema rejected before admission (bad options, range, or default)
    #[error("invalid schema for field '{field}': {reason}")]
    InvalidSchema { field: String, reason: String },

    /// Value does not satisfy the field's constraints
    #[error("invalid value for field '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    /// Field carries values on existing work items; removal needs force
    #[error("field '{field}' on type '{type_name}' is in use by {count} work item(s)")]
    FieldInUse {
        type_name: String,
        field: String,
        count: usize,
    },

    /// Type has existing work items; deletion needs a replacement type
    #[error("work item type '{name}' is in use by {count} work item(s)")]
    TypeInUse { name: String, count: usize },
}

impl FieldsError {
    /// Create an invalid-schema error
    pub fn invalid_schema(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSchema {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid-value error
    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
