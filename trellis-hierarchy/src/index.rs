//! The relationship edge index.
//!
//! Edges are stored twice for O(1) lookup in both directions: a child->edge
//! map and a parent->children set. The two are kept consistent by every
//! mutation path.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::error::{HierarchyError, Result};
use crate::ids::{ItemId, RelationshipType};

/// One child -> parent relationship.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RelationshipEdge {
    pub child: ItemId,
    pub parent: ItemId,
    pub relationship: RelationshipType,
}

/// The parent/child edges of one project.
#[derive(Debug, Clone, Default)]
pub struct HierarchyIndex {
    parent_of: HashMap<ItemId, RelationshipEdge>,
    children_of: IndexMap<ItemId, IndexSet<ItemId>>,
}

impl HierarchyIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `child` under `parent`.
    ///
    /// Fails if the child already has a parent, or if `parent` sits anywhere
    /// in `child`'s subtree (which would close a cycle). The guard is a
    /// bounded ancestor walk from `parent`, not a full graph search: with one
    /// parent per child, `parent` is a descendant of `child` exactly when
    /// `child` appears among `parent`'s ancestors.
    pub fn attach(
        &mut self,
        child: ItemId,
        parent: ItemId,
        relationship: RelationshipType,
    ) -> Result<()> {
        if let Some(existing) = self.parent_of.get(&child) {
            return Err(HierarchyError::ChildAlreadyHasParent {
                child,
                parent: existing.parent.clone(),
            });
        }

        if child == parent || self.ancestors(&parent).contains(&child) {
            let mut path: Vec<String> = vec![child.to_string(), parent.to_string()];
            for ancestor in self.ancestors(&parent) {
                path.push(ancestor.to_string());
                if ancestor == child {
                    break;
                }
            }
            return Err(HierarchyError::CycleDetected {
                path: path.join(" -> "),
            });
        }

        debug!(child = %child, parent = %parent, relationship = %relationship, "attaching");
        self.children_of
            .entry(parent.clone())
            .or_default()
            .insert(child.clone());
        self.parent_of.insert(
            child.clone(),
            RelationshipEdge {
                child,
                parent,
                relationship,
            },
        );
        Ok(())
    }

    /// Detach `child` from its parent, returning the removed edge.
    /// A no-op returning `None` when the child has no parent.
    pub fn detach(&mut self, child: &ItemId) -> Option<RelationshipEdge> {
        let edge = self.parent_of.remove(child)?;
        if let Some(children) = self.children_of.get_mut(&edge.parent) {
            children.shift_remove(child);
            if children.is_empty() {
                self.children_of.shift_remove(&edge.parent);
            }
        }
        debug!(child = %child, parent = %edge.parent, "detached");
        Some(edge)
    }

    /// Remove every edge touching `id`: its own parent link, and the links
    /// of all its direct children (which become roots). Called when the
    /// underlying item is deleted.
    pub fn remove_item(&mut self, id: &ItemId) {
        self.detach(id);
        if let Some(children) = self.children_of.shift_remove(id) {
            for child in children {
                self.parent_of.remove(&child);
            }
        }
    }

    /// The edge connecting `child` to its parent, if any.
    pub fn parent_of(&self, child: &ItemId) -> Option<&RelationshipEdge> {
        self.parent_of.get(child)
    }

    /// Direct children of `parent`, in attachment order.
    pub fn children(&self, parent: &ItemId) -> impl Iterator<Item = &ItemId> {
        self.children_of.get(parent).into_iter().flatten()
    }

    /// Whether `parent` has any children.
    pub fn has_children(&self, parent: &ItemId) -> bool {
        self.children_of
            .get(parent)
            .is_some_and(|c| !c.is_empty())
    }

    /// All descendants of `parent`, in no particular order.
    pub fn descendants(&self, parent: &ItemId) -> Vec<ItemId> {
        let mut out = Vec::new();
        let mut queue: Vec<&ItemId> = self.children(parent).collect();
        while let Some(current) = queue.pop() {
            out.push(current.clone());
            queue.extend(self.children(current));
        }
        out
    }

    /// The chain of ancestors of `child`, nearest first.
    pub fn ancestors(&self, child: &ItemId) -> Vec<ItemId> {
        let mut out = Vec::new();
        let mut cursor = child;
        while let Some(edge) = self.parent_of.get(cursor) {
            out.push(edge.parent.clone());
            cursor = &edge.parent;
        }
        out
    }

    /// All edges, for export. Ordered by parent attachment order.
    pub fn edges(&self) -> Vec<&RelationshipEdge> {
        self.children_of
            .values()
            .flatten()
            .filter_map(|child| self.parent_of.get(child))
            .collect()
    }

    /// Number of edges in the index.
    pub fn len(&self) -> usize {
        self.parent_of.len()
    }

    /// Whether the index has no edges.
    pub fn is_empty(&self) -> bool {
        self.parent_of.is_empty()
    }
}
