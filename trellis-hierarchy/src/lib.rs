//! Parent/child relationships between work items, with completion rollup
//!
//! This crate owns the relationship edges of one project: each child has at
//! most one parent, a parent may have many children, and an item can never be
//! attached beneath one of its own descendants. On top of the index sits the
//! rollup driver: when every child of a parent rests in an end state of the
//! project's workflow, the parent is advanced to the designated completion
//! state, recursively, within the same propagation call.
//!
//! The index stores ids only. What a given item's current state is, which
//! states count as terminal, and how an item is advanced are answered by the
//! caller through the [`RollupContext`] seam.

pub mod error;
pub mod ids;
pub mod index;
pub mod rollup;

pub use error::{HierarchyError, Result};
pub use ids::{ItemId, RelationshipType};
pub use index::{HierarchyIndex, RelationshipEdge};
pub use rollup::{propagate, RollupContext};
