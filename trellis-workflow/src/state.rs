//! Workflow state types

use serde::{Deserialize, Serialize};

/// Unique identifier for workflow states within one graph
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(transparent)]
pub struct StateName(String);

impl StateName {
    /// Create a new state name
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for StateName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for StateName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for StateName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single workflow state.
///
/// Any number of states may be flagged as start or end states; work items
/// enter the workflow in a start state and may rest in an end state. End
/// states are advisory-terminal: further transitions out are allowed if the
/// graph defines them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowState {
    pub name: StateName,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_start: bool,
    #[serde(default)]
    pub is_end: bool,
}

impl WorkflowState {
    /// Create a new plain state (neither start nor end)
    pub fn new(name: impl Into<StateName>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            is_start: false,
            is_end: false,
        }
    }

    /// Flag as a start state
    pub fn start(mut self) -> Self {
        self.is_start = true;
        self
    }

    /// Flag as an end state
    pub fn end(mut self) -> Self {
        self.is_end = true;
        self
    }
}
