//! Stock configuration for new projects.
//!
//! The out-of-the-box workflow runs intake to release with a rework loop
//! out of test, and the stock work item types cover the usual planning
//! shapes. Projects created empty can build their own from scratch; these
//! exist so a fresh project is usable immediately.

use trellis_fields::{FieldKind, FieldSchema, TypeRegistry};
use trellis_workflow::{Transition, WorkflowGraph, WorkflowState};

use crate::project::ProjectState;

/// The stock workflow graph.
pub fn default_workflow() -> WorkflowGraph {
    let mut graph = WorkflowGraph::new();
    let states = [
        WorkflowState::new("FOUND", "Newly reported, not yet looked at").start(),
        WorkflowState::new("TRIAGED", "Assessed and prioritized"),
        WorkflowState::new("TO_DO", "Ready to be picked up"),
        WorkflowState::new("IN_PROGRESS", "Actively being worked"),
        WorkflowState::new("IN_TEST", "Under verification"),
        WorkflowState::new("DONE", "Verified complete").end(),
        WorkflowState::new("RELEASED", "Shipped to users").end(),
    ];
    let transitions = [
        Transition::new("FOUND", "TRIAGED"),
        Transition::new("TRIAGED", "TO_DO"),
        Transition::new("TO_DO", "IN_PROGRESS"),
        Transition::new("IN_PROGRESS", "IN_TEST"),
        Transition::new("IN_PROGRESS", "DONE"),
        Transition::new("IN_TEST", "DONE"),
        // Rework loop; adding it reports a cycle warning by design
        Transition::new("IN_TEST", "IN_PROGRESS"),
        Transition::new("DONE", "RELEASED"),
    ];
    for state in states {
        graph
            .add_state(state)
            .expect("stock states have unique names");
    }
    for transition in transitions {
        graph
            .add_transition(transition)
            .expect("stock transitions reference stock states");
    }
    graph
}

/// The stock work item types.
pub fn default_types() -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    let types = [
        ("EPIC", "A large initiative spanning several features"),
        ("FEATURE", "A shippable unit of functionality"),
        ("STORY", "A user-visible slice of a feature"),
        ("BUG", "A defect in shipped or in-progress work"),
        ("TASK", "A unit of work without user-facing scope"),
    ];
    for (name, description) in types {
        registry
            .create_type(name, description)
            .expect("stock types have unique names");
    }
    let fields = [
        (
            "BUG",
            FieldSchema::new(
                "severity",
                FieldKind::Enum {
                    allowed: vec![
                        "low".into(),
                        "medium".into(),
                        "high".into(),
                        "critical".into(),
                    ],
                },
            )
            .required()
            .with_default("medium"),
        ),
        ("BUG", FieldSchema::new("steps_to_reproduce", FieldKind::Text)),
        (
            "STORY",
            FieldSchema::new(
                "points",
                FieldKind::Number {
                    min: Some(1.0),
                    max: Some(13.0),
                },
            ),
        ),
        ("FEATURE", FieldSchema::new("target_date", FieldKind::Date)),
        ("TASK", FieldSchema::new("assignee", FieldKind::UserReference)),
    ];
    for (type_name, schema) in fields {
        registry
            .add_field(type_name, schema)
            .expect("stock field schemas are valid");
    }
    registry
}

/// Seed a freshly created project with the stock configuration.
pub fn seed(project: &mut ProjectState) {
    *project.types_mut() = default_types();
    *project.workflow_mut() = default_workflow();
}
