//! Template types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use trellis_fields::EntityType;
use trellis_workflow::WorkflowGraph;
use ulid::Ulid;

/// Opaque, generated template identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateId(String);

impl TemplateId {
    /// Generate a fresh id
    pub fn new() -> Self {
        Self(Ulid::new().to_string())
    }

    /// Wrap an existing id string
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TemplateId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TemplateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An immutable snapshot of a project's type and workflow configuration.
///
/// Templates outlive the project they were captured from and are never
/// mutated by `apply`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Template {
    pub id: TemplateId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub created_at: DateTime<Utc>,
    /// Captured work item types, in registration order.
    pub types: Vec<EntityType>,
    /// Captured workflow graph, states and gated transitions included.
    pub workflow: WorkflowGraph,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(TemplateId::new(), TemplateId::new());
    }

    #[test]
    fn test_template_json_round_trip() {
        let template = Template {
            id: TemplateId::from_string("agile-dev"),
            name: "Agile Development".into(),
            description: "Standard Agile workflow with sprints".into(),
            created_at: Utc::now(),
            types: Vec::new(),
            workflow: WorkflowGraph::new(),
        };
        let json = serde_json::to_string(&template).unwrap();
        let parsed: Template = serde_json::from_str(&json).unwrap();
        assert_eq!(template, parsed);
    }
}
