//! Configuration merge.
//!
//! Applying a template (or importing a document) merges the incoming
//! configuration into the target and reports what happened. The merge never
//! fails on content conflicts: incoming definitions win on name collisions
//! with differing shape, target-only definitions survive, and work items
//! whose type or state is absent from the incoming configuration are flagged
//! for the caller to reconcile rather than blocking the call.
//!
//! The merge is computed on scratch copies; the caller swaps the results in
//! under its project lock so the whole merge becomes visible at once.

use serde::{Deserialize, Serialize};
use tracing::info;
use trellis_fields::{EntityType, TypeRegistry};
use trellis_workflow::{StateName, WorkflowGraph};

/// The (id, type, state) of one live work item, as seen by the merge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InstanceSnapshot {
    pub id: String,
    pub type_name: String,
    pub state: StateName,
}

/// What a merge did, and what it could not resolve.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ApplyReport {
    /// Name of the applied template or imported document.
    pub source: String,
    pub states_added: Vec<StateName>,
    /// States that existed in the target with a differing shape and were
    /// overwritten by the incoming definition.
    pub states_modified: Vec<StateName>,
    pub types_added: Vec<String>,
    /// Types that existed in the target with a differing shape and were
    /// overwritten by the incoming definition.
    pub types_modified: Vec<String>,
    pub transitions_added: Vec<String>,
    pub transitions_modified: Vec<String>,
    /// Work items whose current type or state does not appear in the
    /// incoming configuration. The merge keeps them valid (target-only
    /// definitions survive), but they likely need manual migration.
    pub instances_needing_migration: Vec<String>,
}

impl ApplyReport {
    /// Whether the merge changed anything at all.
    pub fn changed(&self) -> bool {
        !(self.states_added.is_empty()
            && self.states_modified.is_empty()
            && self.types_added.is_empty()
            && self.types_modified.is_empty()
            && self.transitions_added.is_empty()
            && self.transitions_modified.is_empty())
    }
}

/// Merge an incoming configuration into scratch copies of the target's
/// registry and graph. Returns the merged pair plus the report.
pub fn merge_configuration(
    source: impl Into<String>,
    target_types: &TypeRegistry,
    target_workflow: &WorkflowGraph,
    incoming_types: &[EntityType],
    incoming_workflow: &WorkflowGraph,
    instances: &[InstanceSnapshot],
) -> (TypeRegistry, WorkflowGraph, ApplyReport) {
    let mut report = ApplyReport {
        source: source.into(),
        ..ApplyReport::default()
    };
    let mut merged_types = target_types.clone();
    let mut merged_workflow = target_workflow.clone();

    for incoming in incoming_types {
        match target_types.get(&incoming.name) {
            Err(_) => {
                report.types_added.push(incoming.name.clone());
                merged_types.insert_type(incoming.clone());
            }
            Ok(existing) if existing != incoming => {
                report.types_modified.push(incoming.name.clone());
                merged_types.insert_type(incoming.clone());
            }
            Ok(_) => {}
        }
    }

    for incoming in incoming_workflow.states() {
        match target_workflow.state(&incoming.name) {
            None => {
                report.states_added.push(incoming.name.clone());
                merged_workflow.insert_state(incoming.clone());
            }
            Some(existing) if existing != incoming => {
                report.states_modified.push(incoming.name.clone());
                merged_workflow.insert_state(incoming.clone());
            }
            Some(_) => {}
        }
    }

    for incoming in incoming_workflow.transitions() {
        let rendered = format!("{} -> {}", incoming.from, incoming.to);
        match target_workflow.transition(&incoming.from, &incoming.to) {
            None => {
                report.transitions_added.push(rendered);
                merged_workflow.insert_transition(incoming.clone());
            }
            Some(existing) if existing != incoming => {
                report.transitions_modified.push(rendered);
                merged_workflow.insert_transition(incoming.clone());
            }
            Some(_) => {}
        }
    }

    for instance in instances {
        let type_known = incoming_types.iter().any(|t| t.name == instance.type_name);
        let state_known = incoming_workflow.contains_state(&instance.state);
        if !type_known || !state_known {
            report.instances_needing_migration.push(instance.id.clone());
        }
    }

    info!(
        source = %report.source,
        types_added = report.types_added.len(),
        states_added = report.states_added.len(),
        transitions_added = report.transitions_added.len(),
        needs_migration = report.instances_needing_migration.len(),
        "merged configuration"
    );
    (merged_types, merged_workflow, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_fields::{FieldKind, FieldSchema};
    use trellis_workflow::{Transition, WorkflowState};

    fn incoming() -> (Vec<EntityType>, WorkflowGraph) {
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
            .add_transition(Transition::new("TODO", "DONE"))
            .unwrap();
        (types.list().cloned().collect(), workflow)
    }

    #[test]
    fn merge_into_empty_target_adds_everything() {
        let (types, workflow) = incoming();
        let (merged_types, merged_workflow, report) = merge_configuration(
            "Agile Development",
            &TypeRegistry::new(),
            &WorkflowGraph::new(),
            &types,
            &workflow,
            &[],
        );

        assert_eq!(report.types_added, vec!["BUG"]);
        assert_eq!(
            report.states_added,
            vec![StateName::from("TODO"), StateName::from("DONE")]
        );
        assert_eq!(report.transitions_added, vec!["TODO -> DONE"]);
        assert!(report.types_modified.is_empty());
        assert!(report.instances_needing_migration.is_empty());

        // Structural equality with the source
        let round: Vec<_> = merged_types.list().cloned().collect();
        assert_eq!(round, types);
        assert_eq!(merged_workflow, workflow);
    }

    #[test]
    fn identical_definitions_report_nothing() {
        let (types, workflow) = incoming();
        let mut target_types = TypeRegistry::new();
        for t in &types {
            target_types.insert_type(t.clone());
        }
        let (_, _, report) = merge_configuration(
            "again",
            &target_types,
            &workflow,
            &types,
            &workflow,
            &[],
        );
        assert!(!report.changed());
    }

    #[test]
    fn differing_shape_reports_modified_and_overwrites() {
        let (types, workflow) = incoming();
        let mut target_types = TypeRegistry::new();
        target_types
            .create_type("BUG", "Same name, no fields")
            .unwrap();

        let (merged_types, _, report) = merge_configuration(
            "Agile Development",
            &target_types,
            &WorkflowGraph::new(),
            &types,
            &workflow,
            &[],
        );
        assert_eq!(report.types_modified, vec!["BUG"]);
        // Incoming shape wins
        assert!(merged_types.get("BUG").unwrap().field("severity").is_some());
    }

    #[test]
    fn target_only_definitions_survive() {
        let (types, workflow) = incoming();
        let mut target_workflow = WorkflowGraph::new();
        target_workflow
            .add_state(WorkflowState::new("ON_HOLD", "Parked"))
            .unwrap();

        let (_, merged_workflow, _) = merge_configuration(
            "Agile Development",
            &TypeRegistry::new(),
            &target_workflow,
            &types,
            &workflow,
            &[],
        );
        assert!(merged_workflow.contains_state(&"ON_HOLD".into()));
        assert!(merged_workflow.contains_state(&"TODO".into()));
    }

    #[test]
    fn stranded_instances_flagged_not_blocking() {
        let (types, workflow) = incoming();
        let instances = vec![
            InstanceSnapshot {
                id: "w1".into(),
                type_name: "BUG".into(),
                state: "TODO".into(),
            },
            InstanceSnapshot {
                id: "w2".into(),
                type_name: "CHORE".into(),
                state: "TODO".into(),
            },
            InstanceSnapshot {
                id: "w3".into(),
                type_name: "BUG".into(),
                state: "ON_HOLD".into(),
            },
        ];
        let (_, _, report) = merge_configuration(
            "Agile Development",
            &TypeRegistry::new(),
            &WorkflowGraph::new(),
            &types,
            &workflow,
            &instances,
        );
        assert_eq!(report.instances_needing_migration, vec!["w2", "w3"]);
    }
}
