//! The append-only template store.

use chrono::Utc;
use indexmap::IndexMap;
use tracing::info;
use trellis_fields::TypeRegistry;
use trellis_workflow::WorkflowGraph;

use crate::error::{Result, TemplateError};
use crate::template::{Template, TemplateId};

/// Owns every captured template, independent of any project.
#[derive(Debug, Clone, Default)]
pub struct TemplateStore {
    templates: IndexMap<TemplateId, Template>,
}

impl TemplateStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture a snapshot of a project's configuration as a new template.
    pub fn capture(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        types: &TypeRegistry,
        workflow: &WorkflowGraph,
    ) -> &Template {
        let template = Template {
            id: TemplateId::new(),
            name: name.into(),
            description: description.into(),
            created_at: Utc::now(),
            types: types.list().cloned().collect(),
            workflow: workflow.clone(),
        };
        info!(template = %template.name, id = %template.id, "captured template");
        let id = template.id.clone();
        self.templates.insert(id.clone(), template);
        &self.templates[&id]
    }

    /// Look up a template by id.
    pub fn get(&self, id: &TemplateId) -> Result<&Template> {
        self.templates
            .get(id)
            .ok_or_else(|| TemplateError::TemplateNotFound {
                id: id.to_string(),
            })
    }

    /// All templates, in creation order.
    pub fn list(&self) -> impl Iterator<Item = &Template> {
        self.templates.values()
    }

    /// Number of stored templates.
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Whether the store has no templates.
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
