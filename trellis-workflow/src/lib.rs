//! # Trellis Workflow Graphs
//!
//! A per-project workflow definition: named states (any number of which may
//! be start or end states) and directed transitions between them, optionally
//! gated by actor roles and required field values.
//!
//! Cycles are a configuration choice, not an error (rework loops are a
//! legitimate pattern), so `add_transition` always admits the edge and
//! reports the cycle it closes as a warning for the host to display.
//!
//! ## Quick Start
//!
//! ```
//! use trellis_workflow::{StateName, Transition, WorkflowGraph, WorkflowState};
//!
//! let mut graph = WorkflowGraph::new();
//! graph.add_state(WorkflowState::new("TODO", "Ready to pick up").start()).unwrap();
//! graph.add_state(WorkflowState::new("DOING", "In progress")).unwrap();
//! graph.add_state(WorkflowState::new("DONE", "Finished").end()).unwrap();
//!
//! graph.add_transition(Transition::new("TODO", "DOING")).unwrap();
//! let outcome = graph.add_transition(Transition::new("DOING", "DONE")).unwrap();
//! assert!(!outcome.cycle_warning());
//!
//! graph.validate_transition(&StateName::from("TODO"), &StateName::from("DOING")).unwrap();
//! ```

pub mod error;
pub mod graph;
pub mod state;
pub mod transition;

pub use error::{Result, WorkflowError};
pub use graph::{MigrationReport, WorkflowGraph};
pub use state::{StateName, WorkflowState};
pub use transition::{Transition, TransitionOutcome};
