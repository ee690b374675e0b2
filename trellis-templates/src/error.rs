//! Error types for the template store

use thiserror::Error;

/// Result type for template operations
pub type Result<T> = std::result::Result<T, TemplateError>;

/// Errors that can occur in template operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    /// No template with the given id
    #[error("template not found: {id}")]
    TemplateNotFound { id: String },
}
