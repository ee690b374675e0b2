//! The lightweight work item instance index.
//!
//! Full work item lifecycle lives outside this engine; what remains here is
//! the minimum the configuration layer needs to answer "is this in use" and
//! to perform forced migrations, conversions, and rollup: each instance's
//! type, current state, and field values.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use trellis_fields::FieldValue;
use trellis_hierarchy::ItemId;
use trellis_workflow::StateName;

/// One tracked work item instance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Instance {
    pub id: ItemId,
    pub type_name: String,
    pub state: StateName,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldValue>,
}

impl Instance {
    /// Field values rendered as strings for transition gate checks.
    pub fn gate_fields(&self) -> BTreeMap<String, String> {
        self.fields
            .iter()
            .map(|(name, value)| {
                let rendered = match value {
                    FieldValue::Text(v) => v.clone(),
                    FieldValue::Number(n) => n.to_string(),
                    FieldValue::List(values) => values.join(","),
                };
                (name.clone(), rendered)
            })
            .collect()
    }
}

/// All tracked instances of one project, in registration order.
#[derive(Debug, Clone, Default)]
pub struct InstanceStore {
    items: IndexMap<ItemId, Instance>,
}

impl InstanceStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a new instance.
    pub fn insert(&mut self, instance: Instance) {
        self.items.insert(instance.id.clone(), instance);
    }

    /// Look up an instance by id.
    pub fn get(&self, id: &ItemId) -> Option<&Instance> {
        self.items.get(id)
    }

    /// Look up an instance by id, mutably.
    pub fn get_mut(&mut self, id: &ItemId) -> Option<&mut Instance> {
        self.items.get_mut(id)
    }

    /// Stop tracking an instance.
    pub fn remove(&mut self, id: &ItemId) -> Option<Instance> {
        self.items.shift_remove(id)
    }

    /// All instances, in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Instance> {
        self.items.values()
    }

    /// Number of tracked instances.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Ids of instances currently in `state`.
    pub fn ids_in_state(&self, state: &StateName) -> Vec<ItemId> {
        self.items
            .values()
            .filter(|i| &i.state == state)
            .map(|i| i.id.clone())
            .collect()
    }

    /// Number of instances of the given type.
    pub fn count_of_type(&self, type_name: &str) -> usize {
        self.items
            .values()
            .filter(|i| i.type_name == type_name)
            .count()
    }

    /// Number of instances of `type_name` carrying a value for `field`.
    pub fn count_field_values(&self, type_name: &str, field: &str) -> usize {
        self.items
            .values()
            .filter(|i| i.type_name == type_name && i.fields.contains_key(field))
            .count()
    }

    /// Drop `field` from every instance of `type_name`; returns how many
    /// instances carried a value.
    pub fn clear_field(&mut self, type_name: &str, field: &str) -> usize {
        let mut cleared = 0;
        for instance in self.items.values_mut() {
            if instance.type_name == type_name && instance.fields.remove(field).is_some() {
                cleared += 1;
            }
        }
        cleared
    }

    /// Convert every instance of `from` to type `to`; returns the count.
    pub fn convert_type(&mut self, from: &str, to: &str) -> usize {
        let mut converted = 0;
        for instance in self.items.values_mut() {
            if instance.type_name == from {
                instance.type_name = to.to_string();
                converted += 1;
            }
        }
        converted
    }

    /// Move every instance out of `from` into `to`; returns the count.
    pub fn migrate_state(&mut self, from: &StateName, to: &StateName) -> usize {
        let mut moved = 0;
        for instance in self.items.values_mut() {
            if &instance.state == from {
                instance.state = to.clone();
                moved += 1;
            }
        }
        moved
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance(id: &str, type_name: &str, state: &str) -> Instance {
        Instance {
            id: ItemId::from_string(id),
            type_name: type_name.into(),
            state: state.into(),
            fields: BTreeMap::new(),
        }
    }

    #[test]
    fn state_and_type_counts() {
        let mut store = InstanceStore::new();
        store.insert(instance("a", "BUG", "TODO"));
        store.insert(instance("b", "BUG", "DONE"));
        store.insert(instance("c", "TASK", "TODO"));

        assert_eq!(store.ids_in_state(&"TODO".into()).len(), 2);
        assert_eq!(store.count_of_type("BUG"), 2);
        assert_eq!(store.count_of_type("EPIC"), 0);
    }

    #[test]
    fn migrate_state_moves_all_occupants() {
        let mut store = InstanceStore::new();
        store.insert(instance("a", "BUG", "IN_TEST"));
        store.insert(instance("b", "BUG", "IN_TEST"));
        store.insert(instance("c", "BUG", "DONE"));

        let moved = store.migrate_state(&"IN_TEST".into(), &"IN_PROGRESS".into());
        assert_eq!(moved, 2);
        assert!(store.ids_in_state(&"IN_TEST".into()).is_empty());
        assert_eq!(store.ids_in_state(&"IN_PROGRESS".into()).len(), 2);
    }

    #[test]
    fn convert_type_reports_exact_count() {
        let mut store = InstanceStore::new();
        store.insert(instance("a", "BUG", "TODO"));
        store.insert(instance("b", "BUG", "TODO"));
        store.insert(instance("c", "TASK", "TODO"));

        assert_eq!(store.convert_type("BUG", "TASK"), 2);
        assert_eq!(store.count_of_type("TASK"), 3);
    }

    #[test]
    fn clear_field_counts_only_carriers() {
        let mut store = InstanceStore::new();
        let mut with_value = instance("a", "BUG", "TODO");
        with_value
            .fields
            .insert("severity".into(), FieldValue::Text("high".into()));
        store.insert(with_value);
        store.insert(instance("b", "BUG", "TODO"));

        assert_eq!(store.count_field_values("BUG", "severity"), 1);
        assert_eq!(store.clear_field("BUG", "severity"), 1);
        assert_eq!(store.count_field_values("BUG", "severity"), 0);
    }

    #[test]
    fn gate_fields_render_as_strings() {
        let mut item = instance("a", "BUG", "TODO");
        item.fields
            .insert("approved".into(), FieldValue::Text("true".into()));
        item.fields.insert("points".into(), FieldValue::Number(3.0));
        item.fields.insert(
            "components".into(),
            FieldValue::List(vec!["api".into(), "ui".into()]),
        );

        let gates = item.gate_fields();
        assert_eq!(gates["approved"], "true");
        assert_eq!(gates["points"], "3");
        assert_eq!(gates["components"], "api,ui");
    }
}
