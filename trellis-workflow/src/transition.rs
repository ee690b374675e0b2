//! Workflow transitions and their gates

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::state::StateName;

/// A directed transition between two workflow states.
///
/// A transition may be gated: `required_roles` must all be held by the actor,
/// and every entry in `required_fields` must be present on the work item with
/// the given non-empty value. System-initiated transitions bypass both gates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transition {
    pub from: StateName,
    pub to: StateName,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub required_roles: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub required_fields: BTreeMap<String, String>,
}

impl Transition {
    /// Create an ungated transition
    pub fn new(from: impl Into<StateName>, to: impl Into<StateName>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            required_roles: BTreeSet::new(),
            required_fields: BTreeMap::new(),
        }
    }

    /// Require a role to execute this transition
    pub fn with_required_role(mut self, role: impl Into<String>) -> Self {
        self.required_roles.insert(role.into());
        self
    }

    /// Require a field to carry a specific value to execute this transition
    pub fn with_required_field(
        mut self,
        field: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.required_fields.insert(field.into(), value.into());
        self
    }

    /// Whether this transition connects the given pair
    pub fn connects(&self, from: &StateName, to: &StateName) -> bool {
        &self.from == from && &self.to == to
    }

    /// Whether any role or field gate is configured
    pub fn is_gated(&self) -> bool {
        !self.required_roles.is_empty() || !self.required_fields.is_empty()
    }
}

/// Result of adding a transition.
///
/// The edge is always admitted; if it closed a cycle, the walk that proves
/// it is carried here for the host to display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionOutcome {
    /// The cycle the new edge closed, as a state walk starting and ending at
    /// the transition's source. `None` when the graph stayed acyclic through
    /// this edge.
    pub cycle: Option<Vec<StateName>>,
}

impl TransitionOutcome {
    /// Whether the added edge closed a cycle
    pub fn cycle_warning(&self) -> bool {
        self.cycle.is_some()
    }
}
