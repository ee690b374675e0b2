//! Completion rollup.
//!
//! When a child's workflow state changes, its parent may be due for
//! automatic completion: if every child now rests in an end state, the
//! parent advances to the designated completion state, and that advance may
//! in turn complete a grandparent. The whole chain runs inside one call so
//! a partially-applied rollup is never observable.

use tracing::{debug, warn};
use trellis_workflow::StateName;

use crate::ids::ItemId;
use crate::index::HierarchyIndex;

/// The seam between the edge index and the world of live work items.
///
/// Implemented by the engine over its instance store and workflow graph;
/// implemented over plain maps in tests.
pub trait RollupContext {
    /// Current workflow state of an item, if the item is known.
    fn state_of(&self, id: &ItemId) -> Option<StateName>;

    /// Whether a state is an end state of the owning workflow graph.
    fn is_end_state(&self, state: &StateName) -> bool;

    /// The completion state a rolled-up parent should advance to.
    fn completion_target(&self) -> Option<StateName>;

    /// Whether the graph defines a transition for this move. Rollup moves
    /// are system-initiated and bypass role/field gating.
    fn transition_defined(&self, from: &StateName, to: &StateName) -> bool;

    /// Apply the state change to the item.
    fn advance(&mut self, id: &ItemId, to: &StateName);
}

/// Propagate a state change upward from `child`.
///
/// Returns the parents that were advanced to the completion state, nearest
/// first. Stops at the first ancestor that is not (or cannot be) completed.
pub fn propagate(
    index: &HierarchyIndex,
    ctx: &mut dyn RollupContext,
    child: &ItemId,
) -> Vec<ItemId> {
    let mut completed = Vec::new();
    let mut cursor = child.clone();

    while let Some(edge) = index.parent_of(&cursor) {
        let parent = edge.parent.clone();

        let all_children_done = index.children(&parent).all(|c| {
            ctx.state_of(c)
                .map(|s| ctx.is_end_state(&s))
                .unwrap_or(false)
        });
        if !all_children_done {
            break;
        }

        let Some(target) = ctx.completion_target() else {
            warn!(parent = %parent, "children complete but the workflow has no end state to roll up to");
            break;
        };
        let Some(parent_state) = ctx.state_of(&parent) else {
            warn!(parent = %parent, "children complete but the parent has no tracked state");
            break;
        };
        if ctx.is_end_state(&parent_state) {
            // Already complete; anything above was handled when it got there.
            break;
        }
        if !ctx.transition_defined(&parent_state, &target) {
            warn!(
                parent = %parent,
                from = %parent_state,
                to = %target,
                "children complete but no transition reaches the completion state"
            );
            break;
        }

        debug!(parent = %parent, to = %target, "rolling up completed children");
        ctx.advance(&parent, &target);
        completed.push(parent.clone());
        cursor = parent;
    }

    completed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::RelationshipType;
    use std::collections::HashMap;

    struct MapContext {
        states: HashMap<ItemId, StateName>,
        end_states: Vec<StateName>,
        target: Option<StateName>,
        transitions: Vec<(StateName, StateName)>,
    }

    impl MapContext {
        fn new(target: &str) -> Self {
            Self {
                states: HashMap::new(),
                end_states: vec![StateName::from(target)],
                target: Some(StateName::from(target)),
                transitions: vec![
                    ("IN_PROGRESS".into(), "DONE".into()),
                ],
            }
        }

        fn set(&mut self, id: &ItemId, state: &str) {
            self.states.insert(id.clone(), state.into());
        }
    }

    impl RollupContext for MapContext {
        fn state_of(&self, id: &ItemId) -> Option<StateName> {
            self.states.get(id).cloned()
        }
        fn is_end_state(&self, state: &StateName) -> bool {
            self.end_states.contains(state)
        }
        fn completion_target(&self) -> Option<StateName> {
            self.target.clone()
        }
        fn transition_defined(&self, from: &StateName, to: &StateName) -> bool {
            self.transitions
                .iter()
                .any(|(f, t)| f == from && t == to)
        }
        fn advance(&mut self, id: &ItemId, to: &StateName) {
            self.states.insert(id.clone(), to.clone());
        }
    }

    fn id(s: &str) -> ItemId {
        ItemId::from_string(s)
    }

    fn family() -> HierarchyIndex {
        let mut index = HierarchyIndex::new();
        index
            .attach(id("c1"), id("p"), RelationshipType::default())
            .unwrap();
        index
            .attach(id("c2"), id("p"), RelationshipType::default())
            .unwrap();
        index
    }

    #[test]
    fn incomplete_sibling_blocks_rollup() {
        let index = family();
        let mut ctx = MapContext::new("DONE");
        ctx.set(&id("p"), "IN_PROGRESS");
        ctx.set(&id("c1"), "DONE");
        ctx.set(&id("c2"), "IN_PROGRESS");

        assert!(propagate(&index, &mut ctx, &id("c1")).is_empty());
        assert_eq!(ctx.state_of(&id("p")).unwrap().as_str(), "IN_PROGRESS");
    }

    #[test]
    fn last_child_completes_parent() {
        let index = family();
        let mut ctx = MapContext::new("DONE");
        ctx.set(&id("p"), "IN_PROGRESS");
        ctx.set(&id("c1"), "DONE");
        ctx.set(&id("c2"), "DONE");

        let completed = propagate(&index, &mut ctx, &id("c2"));
        assert_eq!(completed, vec![id("p")]);
        assert_eq!(ctx.state_of(&id("p")).unwrap().as_str(), "DONE");
    }

    #[test]
    fn rollup_recurses_to_grandparent() {
        let mut index = family();
        index
            .attach(id("p"), id("gp"), RelationshipType::default())
            .unwrap();
        let mut ctx = MapContext::new("DONE");
        ctx.set(&id("gp"), "IN_PROGRESS");
        ctx.set(&id("p"), "IN_PROGRESS");
        ctx.set(&id("c1"), "DONE");
        ctx.set(&id("c2"), "DONE");

        let completed = propagate(&index, &mut ctx, &id("c2"));
        assert_eq!(completed, vec![id("p"), id("gp")]);
        assert_eq!(ctx.state_of(&id("gp")).unwrap().as_str(), "DONE");
    }

    #[test]
    fn missing_transition_stops_rollup() {
        let index = family();
        let mut ctx = MapContext::new("DONE");
        ctx.transitions.clear();
        ctx.set(&id("p"), "IN_PROGRESS");
        ctx.set(&id("c1"), "DONE");
        ctx.set(&id("c2"), "DONE");

        assert!(propagate(&index, &mut ctx, &id("c2")).is_empty());
        assert_eq!(ctx.state_of(&id("p")).unwrap().as_str(), "IN_PROGRESS");
    }

    #[test]
    fn no_end_state_stops_rollup() {
        let index = family();
        let mut ctx = MapContext::new("DONE");
        ctx.target = None;
        ctx.set(&id("p"), "IN_PROGRESS");
        ctx.set(&id("c1"), "DONE");
        ctx.set(&id("c2"), "DONE");

        assert!(propagate(&index, &mut ctx, &id("c2")).is_empty());
    }

    #[test]
    fn already_complete_parent_untouched() {
        let index = family();
        let mut ctx = MapContext::new("DONE");
        ctx.set(&id("p"), "DONE");
        ctx.set(&id("c1"), "DONE");
        ctx.set(&id("c2"), "DONE");

        assert!(propagate(&index, &mut ctx, &id("c2")).is_empty());
    }

    #[test]
    fn root_item_has_nothing_to_propagate() {
        let index = family();
        let mut ctx = MapContext::new("DONE");
        ctx.set(&id("p"), "IN_PROGRESS");

        assert!(propagate(&index, &mut ctx, &id("p")).is_empty());
    }
}
