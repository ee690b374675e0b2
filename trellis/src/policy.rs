//! Rollup completion policy.

use serde::{Deserialize, Serialize};
use trellis_workflow::{StateName, WorkflowGraph};

/// Which end state a rolled-up parent advances to.
///
/// A workflow may define several end states, and which one counts as "the"
/// completion state is a per-project decision, so it is policy rather than
/// law. The default takes the first end state in insertion order, which is
/// deterministic because states list in the order they were added.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "policy", rename_all = "kebab-case")]
pub enum CompletionPolicy {
    /// First end state in insertion order.
    #[default]
    FirstEndState,
    /// A project-configured target. Falls back to the first end state when
    /// the target is missing or no longer an end state.
    Target { state: StateName },
}

impl CompletionPolicy {
    /// Resolve the completion state against a graph.
    pub fn resolve(&self, graph: &WorkflowGraph) -> Option<StateName> {
        match self {
            Self::FirstEndState => graph.first_end_state().cloned(),
            Self::Target { state } => graph
                .state(state)
                .filter(|s| s.is_end)
                .map(|s| s.name.clone())
                .or_else(|| graph.first_end_state().cloned()),
        }
    }
}
