//! Per-project state: the type registry, workflow graph, hierarchy index,
//! and instance index, plus every operation that needs more than one of
//! them. One `ProjectState` is guarded by one read/write lock in the engine;
//! everything here assumes it is called with that lock held.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;
use tracing::{debug, warn};
use trellis_fields::{
    ConversionReport, EntityType, FieldValue, FieldsError, RemovalReport, TypeRegistry,
};
use trellis_hierarchy::{
    propagate, HierarchyIndex, ItemId, RelationshipType, RollupContext,
};
use trellis_templates::{
    merge_configuration, ApplyReport, InstanceSnapshot, ProjectConfigDocument,
    document::DOCUMENT_VERSION,
};
use trellis_workflow::{
    MigrationReport, StateName, WorkflowError, WorkflowGraph,
};

use crate::error::{EngineError, Result};
use crate::instance::{Instance, InstanceStore};
use crate::policy::CompletionPolicy;

/// The configuration and instance index of one project.
#[derive(Debug)]
pub struct ProjectState {
    name: String,
    types: TypeRegistry,
    workflow: WorkflowGraph,
    hierarchy: HierarchyIndex,
    instances: InstanceStore,
    completion: CompletionPolicy,
}

impl ProjectState {
    /// Create an empty project.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            types: TypeRegistry::new(),
            workflow: WorkflowGraph::new(),
            hierarchy: HierarchyIndex::new(),
            instances: InstanceStore::new(),
            completion: CompletionPolicy::default(),
        }
    }

    /// The project's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The project's type registry.
    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    /// The project's type registry, mutably. Pure registry operations
    /// (create, add field, update description) go straight through.
    pub fn types_mut(&mut self) -> &mut TypeRegistry {
        &mut self.types
    }

    /// The project's workflow graph.
    pub fn workflow(&self) -> &WorkflowGraph {
        &self.workflow
    }

    /// The project's workflow graph, mutably. Pure graph operations
    /// (add state, add/remove transition, flags) go straight through.
    pub fn workflow_mut(&mut self) -> &mut WorkflowGraph {
        &mut self.workflow
    }

    /// The project's hierarchy index.
    pub fn hierarchy(&self) -> &HierarchyIndex {
        &self.hierarchy
    }

    /// The project's instance index.
    pub fn instances(&self) -> &InstanceStore {
        &self.instances
    }

    /// The rollup completion policy.
    pub fn completion_policy(&self) -> &CompletionPolicy {
        &self.completion
    }

    /// Replace the rollup completion policy.
    pub fn set_completion_policy(&mut self, policy: CompletionPolicy) {
        self.completion = policy;
    }

    // ---- instance-aware type operations ----

    /// Remove a field from a type. Fails with `FieldInUse` when instances
    /// carry a value for it, unless `force` is given; then the values are
    /// cleared and the report says so.
    pub fn remove_field(
        &mut self,
        type_name: &str,
        field: &str,
        force: bool,
    ) -> Result<RemovalReport> {
        if self.types.get(type_name)?.field(field).is_none() {
            return Err(FieldsError::UnknownField {
                type_name: type_name.to_string(),
                field: field.to_string(),
            }
            .into());
        }
        let count = self.instances.count_field_values(type_name, field);
        if count > 0 && !force {
            return Err(FieldsError::FieldInUse {
                type_name: type_name.to_string(),
                field: field.to_string(),
                count,
            }
            .into());
        }
        self.types.remove_field(type_name, field)?;
        let cleared = self.instances.clear_field(type_name, field);
        let warning = (cleared > 0).then(|| {
            format!(
                "forced removal of field '{field}' on type '{type_name}' discarded values from {cleared} work item(s)"
            )
        });
        if let Some(warning) = &warning {
            warn!(project = %self.name, "{warning}");
        }
        Ok(RemovalReport {
            type_name: type_name.to_string(),
            field: field.to_string(),
            cleared,
            warning,
        })
    }

    /// Delete a type. Fails with `TypeInUse` when instances of it exist and
    /// no replacement is named; with a replacement, every instance is
    /// converted and the report carries the exact count.
    pub fn delete_type(
        &mut self,
        name: &str,
        replacement: Option<&str>,
    ) -> Result<ConversionReport> {
        self.types.get(name)?;
        let count = self.instances.count_of_type(name);
        // A type is not its own replacement.
        let replacement = replacement.filter(|r| *r != name);
        match replacement {
            Some(r) => {
                self.types.get(r)?;
            }
            None if count > 0 => {
                return Err(FieldsError::TypeInUse {
                    name: name.to_string(),
                    count,
                }
                .into());
            }
            None => {}
        }
        self.types.delete_type(name)?;
        let converted = match replacement {
            Some(r) => self.instances.convert_type(name, r),
            None => 0,
        };
        let warning = (converted > 0).then(|| {
            format!(
                "forced conversion of {converted} work item(s) from type '{name}' to '{}'",
                replacement.unwrap_or_default()
            )
        });
        if let Some(warning) = &warning {
            warn!(project = %self.name, "{warning}");
        }
        Ok(ConversionReport {
            deleted: name.to_string(),
            replacement: replacement.map(String::from),
            converted,
            warning,
        })
    }

    // ---- instance-aware workflow operations ----

    /// Remove a state. Fails with `StateInUse` when work items occupy it and
    /// no migration target is named; with a target, every occupant is moved
    /// and the report carries the count.
    pub fn remove_state(
        &mut self,
        name: &StateName,
        migrate_to: Option<&StateName>,
    ) -> Result<MigrationReport> {
        if !self.workflow.contains_state(name) {
            return Err(WorkflowError::UnknownState { name: name.clone() }.into());
        }
        let occupants = self.instances.ids_in_state(name);
        let migrate_to = match migrate_to {
            Some(target) => {
                // The target must survive the removal.
                if target == name || !self.workflow.contains_state(target) {
                    return Err(WorkflowError::UnknownState {
                        name: target.clone(),
                    }
                    .into());
                }
                Some(target.clone())
            }
            None if !occupants.is_empty() => {
                return Err(WorkflowError::StateInUse {
                    name: name.clone(),
                    count: occupants.len(),
                }
                .into());
            }
            None => None,
        };
        self.workflow.remove_state(name)?;
        let moved = match &migrate_to {
            Some(target) => self.instances.migrate_state(name, target),
            None => 0,
        };
        let warning = (moved > 0).then(|| {
            format!(
                "forced state change: moved {moved} work item(s) from '{name}' to '{}'",
                migrate_to.as_ref().map(StateName::as_str).unwrap_or_default()
            )
        });
        if let Some(warning) = &warning {
            warn!(project = %self.name, "{warning}");
        }
        Ok(MigrationReport {
            removed: name.clone(),
            migrated_to: migrate_to,
            moved,
            warning,
        })
    }

    // ---- instances ----

    /// Track a new work item instance. With no explicit state, the item is
    /// placed in the workflow's first start state. Provided field values are
    /// validated against the type's schemas; defaults fill the gaps; a
    /// required field with neither a value nor a default rejects the call.
    pub fn create_instance(
        &mut self,
        type_name: &str,
        state: Option<StateName>,
        fields: BTreeMap<String, FieldValue>,
    ) -> Result<ItemId> {
        let entity = self.types.get(type_name)?;

        let mut values = BTreeMap::new();
        for (name, value) in fields {
            let schema = entity
                .field(&name)
                .ok_or_else(|| FieldsError::UnknownField {
                    type_name: type_name.to_string(),
                    field: name.clone(),
                })?;
            schema.kind.validate_value(&name, &value)?;
            values.insert(name, value);
        }
        for schema in entity.fields.values() {
            if values.contains_key(&schema.name) {
                continue;
            }
            if let Some(default) = &schema.default {
                values.insert(schema.name.clone(), default.clone());
            } else if schema.required {
                return Err(FieldsError::invalid_value(
                    &schema.name,
                    "required field has no value and no default",
                )
                .into());
            }
        }

        let state = match state {
            Some(state) => {
                if !self.workflow.contains_state(&state) {
                    return Err(WorkflowError::UnknownState { name: state }.into());
                }
                state
            }
            None => self
                .workflow
                .start_states()
                .next()
                .map(|s| s.name.clone())
                .ok_or_else(|| EngineError::NoStartState {
                    project: self.name.clone(),
                })?,
        };

        let id = ItemId::new();
        debug!(project = %self.name, id = %id, type_name, state = %state, "tracking work item");
        self.instances.insert(Instance {
            id: id.clone(),
            type_name: type_name.to_string(),
            state,
            fields: values,
        });
        Ok(id)
    }

    /// Look up a tracked instance.
    pub fn instance(&self, id: &ItemId) -> Result<&Instance> {
        self.instances
            .get(id)
            .ok_or_else(|| EngineError::InstanceNotFound { id: id.clone() })
    }

    /// Set one field value on a tracked instance, validating it first.
    pub fn set_instance_field(
        &mut self,
        id: &ItemId,
        field: &str,
        value: FieldValue,
    ) -> Result<()> {
        let type_name = self.instance(id)?.type_name.clone();
        let schema = self
            .types
            .get(&type_name)?
            .field(field)
            .ok_or_else(|| FieldsError::UnknownField {
                type_name: type_name.clone(),
                field: field.to_string(),
            })?;
        schema.kind.validate_value(field, &value)?;
        if let Some(instance) = self.instances.get_mut(id) {
            instance.fields.insert(field.to_string(), value);
        }
        Ok(())
    }

    /// Stop tracking an instance. Its hierarchy edges go with it: the item
    /// is detached from its parent and its children become roots.
    pub fn delete_instance(&mut self, id: &ItemId) -> Result<Instance> {
        let removed = self
            .instances
            .remove(id)
            .ok_or_else(|| EngineError::InstanceNotFound { id: id.clone() })?;
        self.hierarchy.remove_item(id);
        Ok(removed)
    }

    /// Execute an actor-initiated transition: the move must be defined and
    /// its role/field gates satisfied. Gate fields are the instance's own
    /// values overlaid with whatever the actor supplies. On success the
    /// state change propagates through hierarchy rollup; the ids of parents
    /// completed by rollup are returned.
    pub fn transition_instance(
        &mut self,
        id: &ItemId,
        to: &StateName,
        actor_roles: &BTreeSet<String>,
        actor_fields: &BTreeMap<String, String>,
    ) -> Result<Vec<ItemId>> {
        let instance = self.instance(id)?;
        let from = instance.state.clone();
        let mut gate_fields = instance.gate_fields();
        gate_fields.extend(actor_fields.clone());
        self.workflow
            .validate_gated_transition(&from, to, actor_roles, &gate_fields)?;
        self.apply_state_change(id, to.clone())
    }

    /// Event entry point: a work item's state changed. Records the change
    /// and runs rollup: if every sibling now rests in an end state, the
    /// parent advances to the completion state, recursively, all within
    /// this call. Returns the ids of parents completed by rollup.
    pub fn on_child_state_changed(
        &mut self,
        id: &ItemId,
        new_state: StateName,
    ) -> Result<Vec<ItemId>> {
        if !self.workflow.contains_state(&new_state) {
            return Err(WorkflowError::UnknownState { name: new_state }.into());
        }
        self.apply_state_change(id, new_state)
    }

    fn apply_state_change(&mut self, id: &ItemId, new_state: StateName) -> Result<Vec<ItemId>> {
        let instance = self
            .instances
            .get_mut(id)
            .ok_or_else(|| EngineError::InstanceNotFound { id: id.clone() })?;
        debug!(project = %self.name, id = %id, from = %instance.state, to = %new_state, "state changed");
        instance.state = new_state;

        let target = self.completion.resolve(&self.workflow);
        let mut ctx = RollupAdapter {
            workflow: &self.workflow,
            instances: &mut self.instances,
            target,
        };
        Ok(propagate(&self.hierarchy, &mut ctx, id))
    }

    // ---- hierarchy ----

    /// Attach `child` under `parent`. Both must be tracked instances.
    pub fn attach(
        &mut self,
        child: &ItemId,
        parent: &ItemId,
        relationship: RelationshipType,
    ) -> Result<()> {
        self.instance(child)?;
        self.instance(parent)?;
        self.hierarchy
            .attach(child.clone(), parent.clone(), relationship)?;
        Ok(())
    }

    /// Detach `child` from its parent. A no-op when it has none.
    pub fn detach(&mut self, child: &ItemId) {
        self.hierarchy.detach(child);
    }

    // ---- configuration interchange ----

    /// Merge an incoming configuration into this project and swap the
    /// result in. With the engine's write lock held across this call, the
    /// whole merge becomes visible at once or not at all.
    pub fn apply_configuration(
        &mut self,
        source: impl Into<String>,
        incoming_types: &[EntityType],
        incoming_workflow: &WorkflowGraph,
    ) -> ApplyReport {
        let snapshots: Vec<InstanceSnapshot> = self
            .instances
            .iter()
            .map(|i| InstanceSnapshot {
                id: i.id.to_string(),
                type_name: i.type_name.clone(),
                state: i.state.clone(),
            })
            .collect();
        let (types, workflow, report) = merge_configuration(
            source,
            &self.types,
            &self.workflow,
            incoming_types,
            incoming_workflow,
            &snapshots,
        );
        self.types = types;
        self.workflow = workflow;
        report
    }

    /// Export the full configuration as an interchange document.
    pub fn export_document(&self) -> ProjectConfigDocument {
        ProjectConfigDocument {
            version: DOCUMENT_VERSION,
            project: self.name.clone(),
            exported_at: Utc::now(),
            types: self.types.list().cloned().collect(),
            workflow: self.workflow.clone(),
            relationships: self.hierarchy.edges().into_iter().cloned().collect(),
        }
    }

    /// Import an interchange document: merge its configuration, then
    /// restore the relationship edges whose endpoints exist here. Edges
    /// that cannot be re-attached are skipped, not fatal.
    pub fn import_document(&mut self, doc: &ProjectConfigDocument) -> ApplyReport {
        let report = self.apply_configuration(doc.project.clone(), &doc.types, &doc.workflow);
        for edge in &doc.relationships {
            if self.instances.get(&edge.child).is_none()
                || self.instances.get(&edge.parent).is_none()
            {
                debug!(child = %edge.child, parent = %edge.parent, "skipping edge with unknown endpoint");
                continue;
            }
            if let Err(err) = self.hierarchy.attach(
                edge.child.clone(),
                edge.parent.clone(),
                edge.relationship.clone(),
            ) {
                debug!(child = %edge.child, error = %err, "skipping edge");
            }
        }
        report
    }
}

/// Borrows the pieces of a project that rollup needs, with the completion
/// target resolved up front.
struct RollupAdapter<'a> {
    workflow: &'a WorkflowGraph,
    instances: &'a mut InstanceStore,
    target: Option<StateName>,
}

impl RollupContext for RollupAdapter<'_> {
    fn state_of(&self, id: &ItemId) -> Option<StateName> {
        self.instances.get(id).map(|i| i.state.clone())
    }

    fn is_end_state(&self, state: &StateName) -> bool {
        self.workflow.state(state).is_some_and(|s| s.is_end)
    }

    fn completion_target(&self) -> Option<StateName> {
        self.target.clone()
    }

    fn transition_defined(&self, from: &StateName, to: &StateName) -> bool {
        self.workflow.transition(from, to).is_some()
    }

    fn advance(&mut self, id: &ItemId, to: &StateName) {
        if let Some(instance) = self.instances.get_mut(id) {
            instance.state = to.clone();
        }
    }
}
