//! The file-level configuration interchange document.
//!
//! One JSON document per project: every work item type, every workflow state
//! and gated transition, the relationship edges, and export metadata. The
//! same shape serves backup export and merge-style import.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use trellis_fields::EntityType;
use trellis_hierarchy::RelationshipEdge;
use trellis_workflow::WorkflowGraph;

/// Current document format version.
pub const DOCUMENT_VERSION: u32 = 1;

fn default_version() -> u32 {
    DOCUMENT_VERSION
}

/// A complete exported project configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProjectConfigDocument {
    #[serde(default = "default_version")]
    pub version: u32,
    /// Name of the exporting project.
    pub project: String,
    pub exported_at: DateTime<Utc>,
    /// Work item types, in registration order.
    pub types: Vec<EntityType>,
    /// Workflow states and transitions, gates included.
    pub workflow: WorkflowGraph,
    /// Parent/child edges between work items.
    #[serde(default)]
    pub relationships: Vec<RelationshipEdge>,
}

impl ProjectConfigDocument {
    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Parse from JSON.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_fields::{FieldKind, FieldSchema, TypeRegistry};
    use trellis_workflow::{Transition, WorkflowState};

    fn sample_document() -> ProjectConfigDocument {
        let mut types = TypeRegistry::new();
        types.create_type("BUG", "A software defect").unwrap();
        types
            .add_field(
                "BUG",
                FieldSchema::new(
                    "severity",
                    FieldKind::Enum {
                        allowed: vec!["low".into(), "high".into()],
                    },
                )
                .required(),
            )
            .unwrap();

        let mut workflow = WorkflowGraph::new();
        workflow
            .add_state(WorkflowState::new("TODO", "Ready").start())
            .unwrap();
        workflow
            .add_state(WorkflowState::new("DONE", "Finished").end())
            .unwrap();
        workflow
            .add_transition(
                Transition::new("TODO", "DONE").with_required_role("developer"),
            )
            .unwrap();

        ProjectConfigDocument {
            version: DOCUMENT_VERSION,
            project: "PHOENIX".into(),
            exported_at: Utc::now(),
            types: types.list().cloned().collect(),
            workflow,
            relationships: Vec::new(),
        }
    }

    #[test]
    fn document_round_trips_through_json() {
        let doc = sample_document();
        let json = doc.to_json().unwrap();
        let parsed = ProjectConfigDocument::from_json(&json).unwrap();
        assert_eq!(doc, parsed);
    }

    #[test]
    fn document_carries_gates() {
        let doc = sample_document();
        let json = doc.to_json().unwrap();
        assert!(json.contains("required_roles"));
        assert!(json.contains("developer"));
    }

    #[test]
    fn missing_relationships_defaults_empty() {
        let doc = sample_document();
        let mut value: serde_json::Value = serde_json::from_str(&doc.to_json().unwrap()).unwrap();
        value.as_object_mut().unwrap().remove("relationships");
        let parsed = ProjectConfigDocument::from_json(&value.to_string()).unwrap();
        assert!(parsed.relationships.is_empty());
    }
}
