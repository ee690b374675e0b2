//! Error types for workflow graph operations

use thiserror::Error;

use crate::state::StateName;

/// Result type for workflow operations
pub type Result<T> = std::result::Result<T, WorkflowError>;

/// Errors that can occur in workflow graph operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkflowError {
    /// State already defined under this name
    #[error("workflow state already exists: {name}")]
    DuplicateState { name: StateName },

    /// State not found by name
    #[error("workflow state not found: {name}")]
    UnknownState { name: StateName },

    /// State has occupying work items; removal needs a migration target
    #[error("workflow state '{name}' is in use by {count} work item(s)")]
    StateInUse { name: StateName, count: usize },

    /// A transition between this pair of states already exists
    #[error("transition already exists: {from} -> {to}")]
    DuplicateTransition { from: StateName, to: StateName },

    /// No transition between this pair of states to remove or update
    #[error("transition not found: {from} -> {to}")]
    TransitionNotFound { from: StateName, to: StateName },

    /// The graph defines no transition for this move
    #[error("no transition is defined from '{from}' to '{to}'")]
    TransitionNotDefined { from: StateName, to: StateName },

    /// Actor lacks a role the transition requires
    #[error("transition '{from}' -> '{to}' requires role(s): {required}")]
    RoleNotPermitted {
        from: StateName,
        to: StateName,
        required: String,
    },

    /// A gating field is missing or does not carry the required value
    #[error("transition requires field '{field}' to be '{expected}'")]
    RequiredFieldMissing { field: String, expected: String },
}
