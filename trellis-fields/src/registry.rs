//! Work item type registry.
//!
//! A `TypeRegistry` owns the set of custom work item types for one project.
//! Listing order is registration order. The registry is value-free: in-use
//! checks against live work items are the caller's job, which is why
//! `remove_field` and `delete_type` come in unchecked primitive form here
//! and gate-checked form on the engine facade.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{FieldsError, Result};
use crate::types::FieldSchema;

/// A named, user-defined work item type: a bundle of field schemas.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntityType {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub fields: IndexMap<String, FieldSchema>,
}

impl EntityType {
    /// Create a new type with no fields.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            fields: IndexMap::new(),
        }
    }

    /// Look up a field schema by name.
    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.get(name)
    }

    /// Names of required fields, in definition order.
    pub fn required_fields(&self) -> impl Iterator<Item = &str> {
        self.fields
            .values()
            .filter(|f| f.required)
            .map(|f| f.name.as_str())
    }
}

/// Report returned by a forced field removal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemovalReport {
    pub type_name: String,
    pub field: String,
    /// Work items that carried a value for the field and lost it.
    pub cleared: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Report returned by a type deletion that converted existing work items.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversionReport {
    pub deleted: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replacement: Option<String>,
    /// Work items moved to the replacement type.
    pub converted: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// The set of custom work item types for one project.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TypeRegistry {
    types: IndexMap<String, EntityType>,
}

impl TypeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new work item type.
    pub fn create_type(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<&EntityType> {
        let name = name.into();
        if self.types.contains_key(&name) {
            return Err(FieldsError::DuplicateType { name });
        }
        info!(type_name = %name, "registering work item type");
        let entry = self
            .types
            .entry(name.clone())
            .or_insert(EntityType::new(name, description));
        Ok(entry)
    }

    /// Insert an already-built type, replacing any existing definition.
    /// Used by template application, which reports collisions itself.
    pub fn insert_type(&mut self, entity: EntityType) {
        self.types.insert(entity.name.clone(), entity);
    }

    /// Add a field to a type. The schema is fully validated before it is
    /// admitted; a rejected schema leaves the type untouched.
    pub fn add_field(&mut self, type_name: &str, schema: FieldSchema) -> Result<()> {
        schema.validate()?;
        let entity = self.get_mut(type_name)?;
        if entity.fields.contains_key(&schema.name) {
            return Err(FieldsError::DuplicateField {
                type_name: type_name.to_string(),
                field: schema.name,
            });
        }
        info!(type_name, field = %schema.name, kind = schema.kind.label(), "adding field");
        entity.fields.insert(schema.name.clone(), schema);
        Ok(())
    }

    /// Remove a field from a type, returning the removed schema.
    /// In-use checks are the caller's responsibility.
    pub fn remove_field(&mut self, type_name: &str, field: &str) -> Result<FieldSchema> {
        let entity = self.get_mut(type_name)?;
        let removed =
            entity
                .fields
                .shift_remove(field)
                .ok_or_else(|| FieldsError::UnknownField {
                    type_name: type_name.to_string(),
                    field: field.to_string(),
                })?;
        info!(type_name, field, "removed field");
        Ok(removed)
    }

    /// Update a type's description.
    pub fn update_description(&mut self, type_name: &str, description: impl Into<String>) -> Result<()> {
        self.get_mut(type_name)?.description = description.into();
        Ok(())
    }

    /// Delete a type, returning the removed definition.
    /// In-use checks are the caller's responsibility.
    pub fn delete_type(&mut self, name: &str) -> Result<EntityType> {
        let removed = self
            .types
            .shift_remove(name)
            .ok_or_else(|| FieldsError::UnknownType {
                name: name.to_string(),
            })?;
        info!(type_name = name, "deleted work item type");
        Ok(removed)
    }

    /// Look up a type by name.
    pub fn get(&self, name: &str) -> Result<&EntityType> {
        self.types.get(name).ok_or_else(|| FieldsError::UnknownType {
            name: name.to_string(),
        })
    }

    fn get_mut(&mut self, name: &str) -> Result<&mut EntityType> {
        self.types
            .get_mut(name)
            .ok_or_else(|| FieldsError::UnknownType {
                name: name.to_string(),
            })
    }

    /// Whether a type with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// All types, in registration order.
    pub fn list(&self) -> impl Iterator<Item = &EntityType> {
        self.types.values()
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether the registry has no types.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
