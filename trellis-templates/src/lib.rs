//! Configuration templates and the export/import document
//!
//! A template is an immutable, named snapshot of one project's type registry
//! and workflow graph. The store is append-only: capturing never blocks,
//! applying never mutates the template, only the target project, by merge.
//!
//! The same merge path backs file-level import, so a configuration exported
//! from one project and imported into another behaves exactly like applying
//! a template captured at export time.

pub mod apply;
pub mod document;
pub mod error;
pub mod store;
pub mod template;

pub use apply::{merge_configuration, ApplyReport, InstanceSnapshot};
pub use document::ProjectConfigDocument;
pub use error::{Result, TemplateError};
pub use store::TemplateStore;
pub use template::{Template, TemplateId};
