//! # Trellis
//!
//! A configurable workflow and work item type engine for project tracking
//! systems. Each project owns three configurable pieces:
//!
//! - **Work item types**: user-defined, with typed, constrained fields
//!   ([`FieldKind`], [`FieldSchema`], validated before anything is admitted)
//! - **A workflow graph**: states and gated transitions; cycles are
//!   permitted but always reported ([`WorkflowGraph`])
//! - **A hierarchy**: parent/child edges with automatic completion rollup.
//!   When the last child reaches an end state, the parent advances too,
//!   recursively, in the same call
//!
//! Configuration snapshots can be captured as reusable templates and merged
//! into other projects, and the whole configuration round-trips through a
//! JSON interchange document.
//!
//! The engine is an in-process library with a synchronous API. Each
//! project's state sits behind one read/write lock, so concurrent callers
//! (including state-change events racing configuration edits) always see
//! whole operations.
//!
//! ## Quick Start
//!
//! ```
//! use trellis::{Engine, FieldKind, FieldSchema, Transition, WorkflowState};
//! use std::collections::BTreeMap;
//!
//! # fn main() -> trellis::Result<()> {
//! let engine = Engine::new();
//! engine.create_project("PHOENIX")?;
//!
//! engine.add_state("PHOENIX", WorkflowState::new("TODO", "Ready").start())?;
//! engine.add_state("PHOENIX", WorkflowState::new("DONE", "Finished").end())?;
//! engine.add_transition("PHOENIX", Transition::new("TODO", "DONE"))?;
//!
//! engine.create_type("PHOENIX", "BUG", "A software defect")?;
//! engine.add_field(
//!     "PHOENIX",
//!     "BUG",
//!     FieldSchema::new(
//!         "severity",
//!         FieldKind::Enum { allowed: vec!["low".into(), "high".into()] },
//!     )
//!     .required()
//!     .with_default("low"),
//! )?;
//!
//! let bug = engine.create_instance("PHOENIX", "BUG", BTreeMap::new())?;
//! engine.on_child_state_changed("PHOENIX", &bug, "DONE".into())?;
//! # Ok(())
//! # }
//! ```

pub mod defaults;
mod engine;
mod error;
mod instance;
mod policy;
mod project;

pub use engine::Engine;
pub use error::{EngineError, Result};
pub use instance::{Instance, InstanceStore};
pub use policy::CompletionPolicy;
pub use project::ProjectState;

// Re-export the component crates' surface so hosts depend on one crate.
pub use trellis_fields::{
    ConversionReport, EntityType, FieldKind, FieldSchema, FieldValue, FieldsError, RemovalReport,
    TypeRegistry,
};
pub use trellis_hierarchy::{
    HierarchyError, HierarchyIndex, ItemId, RelationshipEdge, RelationshipType,
};
pub use trellis_templates::{
    ApplyReport, InstanceSnapshot, ProjectConfigDocument, Template, TemplateError, TemplateId,
    TemplateStore,
};
pub use trellis_workflow::{
    MigrationReport, StateName, Transition, TransitionOutcome, WorkflowError, WorkflowGraph,
    WorkflowState,
};
