//! The per-project workflow graph: states plus transitions.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, WorkflowError};
use crate::state::{StateName, WorkflowState};
use crate::transition::{Transition, TransitionOutcome};

/// Report returned by a state removal that migrated occupying work items.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MigrationReport {
    pub removed: StateName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub migrated_to: Option<StateName>,
    /// Work items moved out of the removed state.
    pub moved: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// A project's workflow definition: states in insertion order, plus the
/// directed transitions between them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WorkflowGraph {
    states: IndexMap<StateName, WorkflowState>,
    transitions: Vec<Transition>,
}

impl WorkflowGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    // ---- states ----

    /// Add a state to the graph.
    pub fn add_state(&mut self, state: WorkflowState) -> Result<()> {
        if self.states.contains_key(&state.name) {
            return Err(WorkflowError::DuplicateState { name: state.name });
        }
        info!(state = %state.name, is_start = state.is_start, is_end = state.is_end, "adding workflow state");
        self.states.insert(state.name.clone(), state);
        Ok(())
    }

    /// Remove a state and every transition touching it, returning the removed
    /// state. Occupancy checks are the caller's responsibility.
    pub fn remove_state(&mut self, name: &StateName) -> Result<WorkflowState> {
        let removed = self
            .states
            .shift_remove(name)
            .ok_or_else(|| WorkflowError::UnknownState { name: name.clone() })?;
        self.transitions
            .retain(|t| &t.from != name && &t.to != name);
        info!(state = %name, "removed workflow state");
        Ok(removed)
    }

    /// Insert a state, replacing any existing definition under the same
    /// name. Used by template application, which reports collisions itself.
    pub fn insert_state(&mut self, state: WorkflowState) {
        self.states.insert(state.name.clone(), state);
    }

    /// Look up a state by name.
    pub fn state(&self, name: &StateName) -> Option<&WorkflowState> {
        self.states.get(name)
    }

    /// Whether a state with this name exists.
    pub fn contains_state(&self, name: &StateName) -> bool {
        self.states.contains_key(name)
    }

    /// All states, in insertion order.
    pub fn states(&self) -> impl Iterator<Item = &WorkflowState> {
        self.states.values()
    }

    /// Start states, in insertion order.
    pub fn start_states(&self) -> impl Iterator<Item = &WorkflowState> {
        self.states.values().filter(|s| s.is_start)
    }

    /// End states, in insertion order.
    pub fn end_states(&self) -> impl Iterator<Item = &WorkflowState> {
        self.states.values().filter(|s| s.is_end)
    }

    /// The first end state in insertion order, which is the default
    /// completion target for hierarchy rollup.
    pub fn first_end_state(&self) -> Option<&StateName> {
        self.end_states().next().map(|s| &s.name)
    }

    /// Mark an existing state as a start state.
    pub fn set_start_state(&mut self, name: &StateName) -> Result<()> {
        self.state_mut(name)?.is_start = true;
        info!(state = %name, "marked as start state");
        Ok(())
    }

    /// Mark an existing state as an end state.
    pub fn set_end_state(&mut self, name: &StateName) -> Result<()> {
        self.state_mut(name)?.is_end = true;
        info!(state = %name, "marked as end state");
        Ok(())
    }

    /// Update a state's description.
    pub fn update_state_description(
        &mut self,
        name: &StateName,
        description: impl Into<String>,
    ) -> Result<()> {
        self.state_mut(name)?.description = description.into();
        Ok(())
    }

    fn state_mut(&mut self, name: &StateName) -> Result<&mut WorkflowState> {
        self.states
            .get_mut(name)
            .ok_or_else(|| WorkflowError::UnknownState { name: name.clone() })
    }

    // ---- transitions ----

    /// Add a transition. Both endpoints must exist and the pair must be new.
    ///
    /// The edge is admitted even when it closes a cycle; the cycle is
    /// reported in the outcome so the host can surface a warning.
    pub fn add_transition(&mut self, transition: Transition) -> Result<TransitionOutcome> {
        if !self.states.contains_key(&transition.from) {
            return Err(WorkflowError::UnknownState {
                name: transition.from,
            });
        }
        if !self.states.contains_key(&transition.to) {
            return Err(WorkflowError::UnknownState {
                name: transition.to,
            });
        }
        if self.transition(&transition.from, &transition.to).is_some() {
            return Err(WorkflowError::DuplicateTransition {
                from: transition.from,
                to: transition.to,
            });
        }

        // The new edge closes a cycle iff its source is already reachable
        // from its target.
        let cycle = self
            .path_between(&transition.to, &transition.from)
            .map(|mut walk| {
                let mut cycle = vec![transition.from.clone()];
                cycle.append(&mut walk);
                cycle
            });
        if let Some(cycle) = &cycle {
            let rendered: Vec<&str> = cycle.iter().map(StateName::as_str).collect();
            warn!(cycle = rendered.join(" -> "), "transition closes a cycle");
        }

        info!(from = %transition.from, to = %transition.to, gated = transition.is_gated(), "adding transition");
        self.transitions.push(transition);
        Ok(TransitionOutcome { cycle })
    }

    /// Insert a transition, replacing the gates of an existing one between
    /// the same pair. Used by template application, which reports collisions
    /// itself.
    pub fn insert_transition(&mut self, transition: Transition) {
        match self
            .transitions
            .iter_mut()
            .find(|t| t.connects(&transition.from, &transition.to))
        {
            Some(existing) => *existing = transition,
            None => self.transitions.push(transition),
        }
    }

    /// Remove the transition between the given pair, returning it.
    pub fn remove_transition(&mut self, from: &StateName, to: &StateName) -> Result<Transition> {
        let idx = self
            .transitions
            .iter()
            .position(|t| t.connects(from, to))
            .ok_or_else(|| WorkflowError::TransitionNotFound {
                from: from.clone(),
                to: to.clone(),
            })?;
        info!(from = %from, to = %to, "removed transition");
        Ok(self.transitions.remove(idx))
    }

    /// Look up the transition between a pair of states.
    pub fn transition(&self, from: &StateName, to: &StateName) -> Option<&Transition> {
        self.transitions.iter().find(|t| t.connects(from, to))
    }

    /// All transitions, in insertion order.
    pub fn transitions(&self) -> impl Iterator<Item = &Transition> {
        self.transitions.iter()
    }

    /// Replace the role/field gates on an existing transition.
    pub fn set_transition_requirements(
        &mut self,
        from: &StateName,
        to: &StateName,
        required_roles: BTreeSet<String>,
        required_fields: BTreeMap<String, String>,
    ) -> Result<()> {
        let transition = self
            .transitions
            .iter_mut()
            .find(|t| t.connects(from, to))
            .ok_or_else(|| WorkflowError::TransitionNotFound {
                from: from.clone(),
                to: to.clone(),
            })?;
        transition.required_roles = required_roles;
        transition.required_fields = required_fields;
        info!(from = %from, to = %to, "updated transition requirements");
        Ok(())
    }

    // ---- validation ----

    /// Validate that the graph defines a transition for this move.
    /// This is the whole check for system-initiated moves, which bypass
    /// role and field gating.
    pub fn validate_transition(&self, from: &StateName, to: &StateName) -> Result<()> {
        self.transition(from, to)
            .map(|_| ())
            .ok_or_else(|| WorkflowError::TransitionNotDefined {
                from: from.clone(),
                to: to.clone(),
            })
    }

    /// Validate an actor-initiated move: the transition must exist, the
    /// actor must hold every required role, and every gating field must be
    /// present with its required value.
    pub fn validate_gated_transition(
        &self,
        from: &StateName,
        to: &StateName,
        actor_roles: &BTreeSet<String>,
        actor_fields: &BTreeMap<String, String>,
    ) -> Result<()> {
        let transition =
            self.transition(from, to)
                .ok_or_else(|| WorkflowError::TransitionNotDefined {
                    from: from.clone(),
                    to: to.clone(),
                })?;

        if !transition.required_roles.is_subset(actor_roles) {
            let required: Vec<&str> = transition
                .required_roles
                .iter()
                .map(String::as_str)
                .collect();
            return Err(WorkflowError::RoleNotPermitted {
                from: from.clone(),
                to: to.clone(),
                required: required.join(", "),
            });
        }

        for (field, expected) in &transition.required_fields {
            match actor_fields.get(field) {
                Some(value) if value == expected && !value.trim().is_empty() => {}
                _ => {
                    return Err(WorkflowError::RequiredFieldMissing {
                        field: field.clone(),
                        expected: expected.clone(),
                    })
                }
            }
        }
        Ok(())
    }

    // ---- derived properties ----

    /// States unreachable from every start state, in insertion order.
    /// Unreachable states are permitted; this exists so hosts can report
    /// them.
    pub fn unreachable_states(&self) -> Vec<StateName> {
        let mut visited: BTreeSet<&StateName> = BTreeSet::new();
        let mut queue: VecDeque<&StateName> = self.start_states().map(|s| &s.name).collect();
        for start in queue.iter() {
            visited.insert(*start);
        }
        while let Some(current) = queue.pop_front() {
            for t in self.transitions.iter().filter(|t| &t.from == current) {
                if visited.insert(&t.to) {
                    queue.push_back(&t.to);
                }
            }
        }
        self.states
            .keys()
            .filter(|name| !visited.contains(name))
            .cloned()
            .collect()
    }

    /// Breadth-first path from `from` to `to` over existing transitions,
    /// inclusive of both endpoints. `Some([from])` when `from == to`.
    fn path_between(&self, from: &StateName, to: &StateName) -> Option<Vec<StateName>> {
        if from == to {
            return Some(vec![from.clone()]);
        }
        let mut predecessor: HashMap<&StateName, &StateName> = HashMap::new();
        let mut queue: VecDeque<&StateName> = VecDeque::new();
        queue.push_back(from);
        while let Some(current) = queue.pop_front() {
            for t in self.transitions.iter().filter(|t| &t.from == current) {
                if &t.to == from || predecessor.contains_key(&t.to) {
                    continue;
                }
                predecessor.insert(&t.to, current);
                if &t.to == to {
                    let mut walk = vec![to.clone()];
                    let mut cursor = to;
                    while let Some(prev) = predecessor.get(cursor) {
                        walk.push((*prev).clone());
                        cursor = *prev;
                    }
                    walk.reverse();
                    return Some(walk);
                }
                queue.push_back(&t.to);
            }
        }
        None
    }

    /// Render the graph as a Mermaid `stateDiagram-v2` block.
    pub fn mermaid_diagram(&self) -> String {
        let mut out = String::from("stateDiagram-v2\n");
        for state in self.start_states() {
            out.push_str(&format!("    [*] --> {}\n", state.name));
        }
        for t in &self.transitions {
            out.push_str(&format!("    {} --> {}\n", t.from, t.to));
        }
        for state in self.end_states() {
            out.push_str(&format!("    {} --> [*]\n", state.name));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear_graph() -> WorkflowGraph {
        let mut graph = WorkflowGraph::new();
        graph
            .add_state(WorkflowState::new("TODO", "Ready").start())
            .unwrap();
        graph
            .add_state(WorkflowState::new("DOING", "In progress"))
            .unwrap();
        graph
            .add_state(WorkflowState::new("DONE", "Finished").end())
            .unwrap();
        graph.add_transition(Transition::new("TODO", "DOING")).unwrap();
        graph.add_transition(Transition::new("DOING", "DONE")).unwrap();
        graph
    }

    #[test]
    fn duplicate_state_rejected() {
        let mut graph = linear_graph();
        let err = graph
            .add_state(WorkflowState::new("TODO", "again"))
            .unwrap_err();
        assert_eq!(
            err,
            WorkflowError::DuplicateState {
                name: "TODO".into()
            }
        );
    }

    #[test]
    fn transition_endpoints_must_exist() {
        let mut graph = linear_graph();
        let err = graph
            .add_transition(Transition::new("DONE", "ARCHIVED"))
            .unwrap_err();
        assert_eq!(
            err,
            WorkflowError::UnknownState {
                name: "ARCHIVED".into()
            }
        );
    }

    #[test]
    fn duplicate_transition_rejected() {
        let mut graph = linear_graph();
        let err = graph
            .add_transition(Transition::new("TODO", "DOING"))
            .unwrap_err();
        assert!(matches!(err, WorkflowError::DuplicateTransition { .. }));
    }

    #[test]
    fn reverse_edge_warns_about_cycle_but_is_added() {
        let mut graph = linear_graph();
        let outcome = graph
            .add_transition(Transition::new("DOING", "TODO"))
            .unwrap();
        assert!(outcome.cycle_warning());
        let cycle = outcome.cycle.unwrap();
        assert_eq!(cycle.first().unwrap().as_str(), "DOING");
        assert_eq!(cycle.last().unwrap().as_str(), "DOING");
        // The edge exists despite the warning
        assert!(graph
            .transition(&"DOING".into(), &"TODO".into())
            .is_some());
    }

    #[test]
    fn longer_cycle_reports_full_walk() {
        let mut graph = linear_graph();
        let outcome = graph
            .add_transition(Transition::new("DONE", "TODO"))
            .unwrap();
        let cycle = outcome.cycle.unwrap();
        let names: Vec<&str> = cycle.iter().map(StateName::as_str).collect();
        assert_eq!(names, ["DONE", "TODO", "DOING", "DONE"]);
    }

    #[test]
    fn self_loop_warns() {
        let mut graph = linear_graph();
        let outcome = graph
            .add_transition(Transition::new("DOING", "DOING"))
            .unwrap();
        assert!(outcome.cycle_warning());
    }

    #[test]
    fn acyclic_edge_does_not_warn() {
        let mut graph = linear_graph();
        let outcome = graph
            .add_transition(Transition::new("TODO", "DONE"))
            .unwrap();
        assert!(!outcome.cycle_warning());
    }

    #[test]
    fn remove_transition() {
        let mut graph = linear_graph();
        graph
            .remove_transition(&"TODO".into(), &"DOING".into())
            .unwrap();
        let err = graph
            .remove_transition(&"TODO".into(), &"DOING".into())
            .unwrap_err();
        assert!(matches!(err, WorkflowError::TransitionNotFound { .. }));
    }

    #[test]
    fn remove_state_drops_its_transitions() {
        let mut graph = linear_graph();
        graph.remove_state(&"DOING".into()).unwrap();
        assert!(graph.transition(&"TODO".into(), &"DOING".into()).is_none());
        assert!(graph.transition(&"DOING".into(), &"DONE".into()).is_none());
    }

    #[test]
    fn validate_transition_requires_an_edge() {
        let graph = linear_graph();
        assert!(graph
            .validate_transition(&"TODO".into(), &"DOING".into())
            .is_ok());
        let err = graph
            .validate_transition(&"TODO".into(), &"DONE".into())
            .unwrap_err();
        assert!(matches!(err, WorkflowError::TransitionNotDefined { .. }));
    }

    #[test]
    fn role_gate_requires_every_role() {
        let mut graph = linear_graph();
        graph
            .set_transition_requirements(
                &"DOING".into(),
                &"DONE".into(),
                ["reviewer".to_string(), "lead".to_string()].into(),
                BTreeMap::new(),
            )
            .unwrap();

        let holding_one: BTreeSet<String> = ["reviewer".to_string()].into();
        let err = graph
            .validate_gated_transition(&"DOING".into(), &"DONE".into(), &holding_one, &BTreeMap::new())
            .unwrap_err();
        assert!(matches!(err, WorkflowError::RoleNotPermitted { .. }));
        assert!(err.to_string().contains("lead"));

        let holding_both: BTreeSet<String> =
            ["reviewer".to_string(), "lead".to_string()].into();
        assert!(graph
            .validate_gated_transition(&"DOING".into(), &"DONE".into(), &holding_both, &BTreeMap::new())
            .is_ok());
    }

    #[test]
    fn field_gate_requires_exact_value() {
        let mut graph = linear_graph();
        graph
            .set_transition_requirements(
                &"DOING".into(),
                &"DONE".into(),
                BTreeSet::new(),
                [("approved".to_string(), "true".to_string())].into(),
            )
            .unwrap();

        let missing = BTreeMap::new();
        let err = graph
            .validate_gated_transition(&"DOING".into(), &"DONE".into(), &BTreeSet::new(), &missing)
            .unwrap_err();
        assert_eq!(
            err,
            WorkflowError::RequiredFieldMissing {
                field: "approved".into(),
                expected: "true".into(),
            }
        );

        let wrong: BTreeMap<String, String> =
            [("approved".to_string(), "false".to_string())].into();
        assert!(graph
            .validate_gated_transition(&"DOING".into(), &"DONE".into(), &BTreeSet::new(), &wrong)
            .is_err());

        let right: BTreeMap<String, String> =
            [("approved".to_string(), "true".to_string())].into();
        assert!(graph
            .validate_gated_transition(&"DOING".into(), &"DONE".into(), &BTreeSet::new(), &right)
            .is_ok());
    }

    #[test]
    fn unreachable_states_reported_not_forbidden() {
        let mut graph = linear_graph();
        graph
            .add_state(WorkflowState::new("ORPHANED", "No path in"))
            .unwrap();
        let unreachable = graph.unreachable_states();
        assert_eq!(unreachable, vec![StateName::from("ORPHANED")]);
    }

    #[test]
    fn first_end_state_follows_insertion_order() {
        let mut graph = linear_graph();
        graph
            .add_state(WorkflowState::new("RELEASED", "Shipped").end())
            .unwrap();
        assert_eq!(graph.first_end_state().unwrap().as_str(), "DONE");
    }

    #[test]
    fn mermaid_diagram_lists_edges() {
        let graph = linear_graph();
        let diagram = graph.mermaid_diagram();
        assert!(diagram.starts_with("stateDiagram-v2"));
        assert!(diagram.contains("[*] --> TODO"));
        assert!(diagram.contains("TODO --> DOING"));
        assert!(diagram.contains("DONE --> [*]"));
    }

    #[test]
    fn graph_json_round_trip() {
        let graph = linear_graph();
        let json = serde_json::to_string(&graph).unwrap();
        let parsed: WorkflowGraph = serde_json::from_str(&json).unwrap();
        assert_eq!(graph, parsed);
    }
}
