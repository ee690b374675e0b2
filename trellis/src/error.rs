//! Error types for the engine facade

use thiserror::Error;
use trellis_fields::FieldsError;
use trellis_hierarchy::{HierarchyError, ItemId};
use trellis_templates::TemplateError;
use trellis_workflow::WorkflowError;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors surfaced by the engine facade.
///
/// Component failures pass through unchanged so hosts can match on the
/// underlying kind; the engine adds only the failures it owns (project and
/// instance lookup, start-state resolution).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    /// Project not found by name
    #[error("project not found: {name}")]
    ProjectNotFound { name: String },

    /// Project already exists under this name
    #[error("project already exists: {name}")]
    DuplicateProject { name: String },

    /// Work item instance not found by id
    #[error("work item not found: {id}")]
    InstanceNotFound { id: ItemId },

    /// The workflow defines no start state to place a new work item in
    #[error("project '{project}' has no start state")]
    NoStartState { project: String },

    /// Type registry failure
    #[error(transparent)]
    Fields(#[from] FieldsError),

    /// Workflow graph failure
    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    /// Hierarchy failure
    #[error(transparent)]
    Hierarchy(#[from] HierarchyError),

    /// Template store failure
    #[error(transparent)]
    Template(#[from] TemplateError),
}
