//! Field schemas and the custom work item type registry
//!
//! `trellis-fields` is a standalone, schema-first crate that manages typed,
//! constrained field definitions and the per-project registry of custom work
//! item types. It knows nothing about workflows or hierarchies; consumers
//! wire those on top.
//!
//! # Architecture
//!
//! - **Tagged schemas**: Field kinds are a closed tagged union, not strings.
//!   Every constraint (enum options, numeric range, default value) is checked
//!   before a schema becomes visible, so no admitted field is ever invalid.
//! - **Insertion order**: Types and fields list in the order they were
//!   registered.
//! - **Value-free registry**: The registry owns schemas, not field values.
//!   Value validation is offered as a pure function over a schema.

pub mod error;
pub mod registry;
pub mod types;

pub use error::{FieldsError, Result};
pub use registry::{ConversionReport, EntityType, RemovalReport, TypeRegistry};
pub use types::{FieldKind, FieldSchema, FieldValue};
