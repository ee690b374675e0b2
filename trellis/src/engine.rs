//! The engine: a shared, mutable in-process store keyed by project.
//!
//! Each project owns a (type registry, workflow graph, hierarchy, instance
//! index) bundle behind one read/write lock; configuration mutations and
//! rollup propagation take the write lock, queries the read lock, so a
//! partially-applied change is never observable. The template store is
//! global: templates outlive the projects they were captured from.
//!
//! Every operation is synchronous, bounded by in-memory graph size, and
//! safe to retry: duplicate-name detection returns a definite failure
//! instead of double-applying.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, PoisonError, RwLock};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::info;
use trellis_fields::{
    ConversionReport, EntityType, FieldSchema, FieldValue, RemovalReport,
};
use trellis_hierarchy::{ItemId, RelationshipType};
use trellis_templates::{
    ApplyReport, ProjectConfigDocument, Template, TemplateId, TemplateStore,
};
use trellis_workflow::{
    MigrationReport, StateName, Transition, TransitionOutcome, WorkflowState,
};

use crate::defaults;
use crate::error::{EngineError, Result};
use crate::instance::Instance;
use crate::policy::CompletionPolicy;
use crate::project::ProjectState;

/// The top-level engine handle. Cheap to share behind an `Arc`; all methods
/// take `&self`.
#[derive(Default)]
pub struct Engine {
    projects: DashMap<String, Arc<RwLock<ProjectState>>>,
    templates: RwLock<TemplateStore>,
}

impl Engine {
    /// Create an engine with no projects and no templates.
    pub fn new() -> Self {
        Self::default()
    }

    // ---- project lifecycle ----

    /// Create an empty project.
    pub fn create_project(&self, name: &str) -> Result<()> {
        match self.projects.entry(name.to_string()) {
            Entry::Occupied(_) => Err(EngineError::DuplicateProject {
                name: name.to_string(),
            }),
            Entry::Vacant(entry) => {
                info!(project = name, "creating project");
                entry.insert(Arc::new(RwLock::new(ProjectState::new(name))));
                Ok(())
            }
        }
    }

    /// Create a project seeded with the stock workflow and work item types.
    pub fn create_project_with_defaults(&self, name: &str) -> Result<()> {
        self.create_project(name)?;
        self.write(name, |project| {
            defaults::seed(project);
            Ok(())
        })
    }

    /// Tear down a project and everything it owns. Templates captured from
    /// it survive.
    pub fn delete_project(&self, name: &str) -> Result<()> {
        self.projects
            .remove(name)
            .map(|_| info!(project = name, "deleted project"))
            .ok_or_else(|| EngineError::ProjectNotFound {
                name: name.to_string(),
            })
    }

    /// Whether a project exists.
    pub fn project_exists(&self, name: &str) -> bool {
        self.projects.contains_key(name)
    }

    /// Names of all projects, sorted.
    pub fn list_projects(&self) -> Vec<String> {
        let mut names: Vec<String> = self.projects.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    fn handle(&self, name: &str) -> Result<Arc<RwLock<ProjectState>>> {
        self.projects
            .get(name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| EngineError::ProjectNotFound {
                name: name.to_string(),
            })
    }

    fn read<R>(&self, project: &str, f: impl FnOnce(&ProjectState) -> Result<R>) -> Result<R> {
        let handle = self.handle(project)?;
        let guard = handle.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    fn write<R>(&self, project: &str, f: impl FnOnce(&mut ProjectState) -> Result<R>) -> Result<R> {
        let handle = self.handle(project)?;
        let mut guard = handle.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    // ---- work item types ----

    /// Register a new work item type.
    pub fn create_type(&self, project: &str, name: &str, description: &str) -> Result<EntityType> {
        self.write(project, |p| {
            Ok(p.types_mut().create_type(name, description)?.clone())
        })
    }

    /// Add a field to a type. The schema is fully validated before it
    /// becomes visible.
    pub fn add_field(&self, project: &str, type_name: &str, schema: FieldSchema) -> Result<()> {
        self.write(project, |p| Ok(p.types_mut().add_field(type_name, schema)?))
    }

    /// Remove a field; needs `force` when work items carry values for it.
    pub fn remove_field(
        &self,
        project: &str,
        type_name: &str,
        field: &str,
        force: bool,
    ) -> Result<RemovalReport> {
        self.write(project, |p| p.remove_field(type_name, field, force))
    }

    /// Update a type's description.
    pub fn update_type_description(
        &self,
        project: &str,
        type_name: &str,
        description: &str,
    ) -> Result<()> {
        self.write(project, |p| {
            Ok(p.types_mut().update_description(type_name, description)?)
        })
    }

    /// Delete a type; needs a replacement when work items of it exist.
    pub fn delete_type(
        &self,
        project: &str,
        name: &str,
        replacement: Option<&str>,
    ) -> Result<ConversionReport> {
        self.write(project, |p| p.delete_type(name, replacement))
    }

    /// All types of a project, in registration order.
    pub fn list_types(&self, project: &str) -> Result<Vec<EntityType>> {
        self.read(project, |p| Ok(p.types().list().cloned().collect()))
    }

    // ---- workflow ----

    /// Add a workflow state.
    pub fn add_state(&self, project: &str, state: WorkflowState) -> Result<()> {
        self.write(project, |p| Ok(p.workflow_mut().add_state(state)?))
    }

    /// Remove a state; needs a migration target when work items occupy it.
    pub fn remove_state(
        &self,
        project: &str,
        name: &StateName,
        migrate_to: Option<&StateName>,
    ) -> Result<MigrationReport> {
        self.write(project, |p| p.remove_state(name, migrate_to))
    }

    /// Mark a state as a start state.
    pub fn set_start_state(&self, project: &str, name: &StateName) -> Result<()> {
        self.write(project, |p| Ok(p.workflow_mut().set_start_state(name)?))
    }

    /// Mark a state as an end state.
    pub fn set_end_state(&self, project: &str, name: &StateName) -> Result<()> {
        self.write(project, |p| Ok(p.workflow_mut().set_end_state(name)?))
    }

    /// Update a state's description.
    pub fn update_state_description(
        &self,
        project: &str,
        name: &StateName,
        description: &str,
    ) -> Result<()> {
        self.write(project, |p| {
            Ok(p.workflow_mut().update_state_description(name, description)?)
        })
    }

    /// Add a transition. The outcome reports the cycle it closed, if any;
    /// the edge is admitted either way.
    pub fn add_transition(&self, project: &str, transition: Transition) -> Result<TransitionOutcome> {
        self.write(project, |p| Ok(p.workflow_mut().add_transition(transition)?))
    }

    /// Remove a transition.
    pub fn remove_transition(&self, project: &str, from: &StateName, to: &StateName) -> Result<()> {
        self.write(project, |p| {
            p.workflow_mut().remove_transition(from, to)?;
            Ok(())
        })
    }

    /// Replace the role/field gates on an existing transition.
    pub fn set_transition_requirements(
        &self,
        project: &str,
        from: &StateName,
        to: &StateName,
        required_roles: BTreeSet<String>,
        required_fields: BTreeMap<String, String>,
    ) -> Result<()> {
        self.write(project, |p| {
            Ok(p.workflow_mut()
                .set_transition_requirements(from, to, required_roles, required_fields)?)
        })
    }

    /// All states of a project, in insertion order.
    pub fn list_states(&self, project: &str) -> Result<Vec<WorkflowState>> {
        self.read(project, |p| Ok(p.workflow().states().cloned().collect()))
    }

    /// All transitions of a project.
    pub fn list_transitions(&self, project: &str) -> Result<Vec<Transition>> {
        self.read(project, |p| Ok(p.workflow().transitions().cloned().collect()))
    }

    /// States unreachable from every start state.
    pub fn unreachable_states(&self, project: &str) -> Result<Vec<StateName>> {
        self.read(project, |p| Ok(p.workflow().unreachable_states()))
    }

    /// The workflow rendered as a Mermaid state diagram.
    pub fn workflow_diagram(&self, project: &str) -> Result<String> {
        self.read(project, |p| Ok(p.workflow().mermaid_diagram()))
    }

    /// Validate an actor-initiated move without performing it.
    pub fn validate_transition(
        &self,
        project: &str,
        from: &StateName,
        to: &StateName,
        actor_roles: &BTreeSet<String>,
        actor_fields: &BTreeMap<String, String>,
    ) -> Result<()> {
        self.read(project, |p| {
            Ok(p.workflow()
                .validate_gated_transition(from, to, actor_roles, actor_fields)?)
        })
    }

    /// Replace the rollup completion policy.
    pub fn set_completion_policy(&self, project: &str, policy: CompletionPolicy) -> Result<()> {
        self.write(project, |p| {
            p.set_completion_policy(policy);
            Ok(())
        })
    }

    // ---- work item instances ----

    /// Track a new work item in the workflow's first start state.
    pub fn create_instance(
        &self,
        project: &str,
        type_name: &str,
        fields: BTreeMap<String, FieldValue>,
    ) -> Result<ItemId> {
        self.write(project, |p| p.create_instance(type_name, None, fields))
    }

    /// Track a new work item in an explicit state.
    pub fn create_instance_in_state(
        &self,
        project: &str,
        type_name: &str,
        state: StateName,
        fields: BTreeMap<String, FieldValue>,
    ) -> Result<ItemId> {
        self.write(project, |p| p.create_instance(type_name, Some(state), fields))
    }

    /// Look up a work item.
    pub fn instance(&self, project: &str, id: &ItemId) -> Result<Instance> {
        self.read(project, |p| Ok(p.instance(id)?.clone()))
    }

    /// Set one validated field value on a work item.
    pub fn set_instance_field(
        &self,
        project: &str,
        id: &ItemId,
        field: &str,
        value: FieldValue,
    ) -> Result<()> {
        self.write(project, |p| p.set_instance_field(id, field, value))
    }

    /// Stop tracking a work item; its hierarchy edges go with it.
    pub fn delete_instance(&self, project: &str, id: &ItemId) -> Result<()> {
        self.write(project, |p| {
            p.delete_instance(id)?;
            Ok(())
        })
    }

    /// Execute a gated, actor-initiated transition, then roll up. Returns
    /// the parents completed by rollup.
    pub fn transition_instance(
        &self,
        project: &str,
        id: &ItemId,
        to: &StateName,
        actor_roles: &BTreeSet<String>,
        actor_fields: &BTreeMap<String, String>,
    ) -> Result<Vec<ItemId>> {
        self.write(project, |p| {
            p.transition_instance(id, to, actor_roles, actor_fields)
        })
    }

    /// Event entry point: a work item's state changed outside the engine.
    /// Records it and rolls up atomically. Returns the parents completed.
    pub fn on_child_state_changed(
        &self,
        project: &str,
        id: &ItemId,
        new_state: StateName,
    ) -> Result<Vec<ItemId>> {
        self.write(project, |p| p.on_child_state_changed(id, new_state))
    }

    // ---- hierarchy ----

    /// Attach `child` under `parent`.
    pub fn attach(
        &self,
        project: &str,
        child: &ItemId,
        parent: &ItemId,
        relationship: RelationshipType,
    ) -> Result<()> {
        self.write(project, |p| p.attach(child, parent, relationship))
    }

    /// Detach `child` from its parent. A no-op when it has none.
    pub fn detach(&self, project: &str, child: &ItemId) -> Result<()> {
        self.write(project, |p| {
            p.detach(child);
            Ok(())
        })
    }

    /// Direct children of `parent`, in attachment order.
    pub fn children(&self, project: &str, parent: &ItemId) -> Result<Vec<ItemId>> {
        self.read(project, |p| Ok(p.hierarchy().children(parent).cloned().collect()))
    }

    /// The parent of `child`, if any.
    pub fn parent_of(&self, project: &str, child: &ItemId) -> Result<Option<ItemId>> {
        self.read(project, |p| {
            Ok(p.hierarchy().parent_of(child).map(|e| e.parent.clone()))
        })
    }

    /// All descendants of `parent`.
    pub fn descendants(&self, project: &str, parent: &ItemId) -> Result<Vec<ItemId>> {
        self.read(project, |p| Ok(p.hierarchy().descendants(parent)))
    }

    // ---- templates and interchange ----

    /// Capture a project's configuration as a new template.
    pub fn capture_template(
        &self,
        project: &str,
        name: &str,
        description: &str,
    ) -> Result<Template> {
        self.read(project, |p| {
            let mut store = self.templates.write().unwrap_or_else(PoisonError::into_inner);
            Ok(store
                .capture(name, description, p.types(), p.workflow())
                .clone())
        })
    }

    /// All templates, in creation order.
    pub fn list_templates(&self) -> Vec<Template> {
        self.templates
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .list()
            .cloned()
            .collect()
    }

    /// Apply a template to a project: merge, never replace. Always succeeds
    /// on content conflicts and reports them; the merge is computed on a
    /// scratch copy and swapped in under the project's write lock.
    pub fn apply_template(&self, template_id: &TemplateId, project: &str) -> Result<ApplyReport> {
        let template = self
            .templates
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(template_id)?
            .clone();
        self.write(project, |p| {
            Ok(p.apply_configuration(
                template.name.clone(),
                &template.types,
                &template.workflow,
            ))
        })
    }

    /// Export a project's full configuration for backup or audit.
    pub fn export_project(&self, project: &str) -> Result<ProjectConfigDocument> {
        self.read(project, |p| Ok(p.export_document()))
    }

    /// Import a configuration document into a project, with template-apply
    /// (merge) semantics.
    pub fn import_project(&self, project: &str, doc: &ProjectConfigDocument) -> Result<ApplyReport> {
        self.write(project, |p| Ok(p.import_document(doc)))
    }
}
