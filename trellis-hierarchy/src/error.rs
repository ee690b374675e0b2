//! Error types for the hierarchy index

use thiserror::Error;

use crate::ids::ItemId;

/// Result type for hierarchy operations
pub type Result<T> = std::result::Result<T, HierarchyError>;

/// Errors that can occur in hierarchy operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HierarchyError {
    /// Attaching would place an item beneath one of its own descendants
    #[error("relationship cycle detected: {path}")]
    CycleDetected { path: String },

    /// The child is already attached to a parent
    #[error("work item {child} already has parent {parent}")]
    ChildAlreadyHasParent { child: ItemId, parent: ItemId },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = HierarchyError::CycleDetected {
            path: "a -> b -> a".into(),
        };
        assert_eq!(err.to_string(), "relationship cycle detected: a -> b -> a");
    }
}
