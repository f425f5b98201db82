//! Workspace aggregation for thalo: the document store, the schema
//! registry, the cross-file link index, and the per-check workspace index.
//!
//! The [`Workspace`] is the sole mutation gateway. Every `add_document` /
//! `apply_edit` / `remove_document` completes all propagation before
//! returning, so workspace-wide queries always see a consistent post-state.

mod error;
mod index;
mod link_index;
mod schema_registry;
mod workspace;

pub use error::WorkspaceError;
pub use index::{EntryRef, WorkspaceIndex};
pub use link_index::WorkspaceLinkIndex;
pub use schema_registry::{EntitySchema, FieldSchema, SchemaRegistry, SectionSchema};
pub use workspace::{AddDocumentOptions, InvalidationResult, Workspace};

pub use thalo_parser::{DocumentEdit, FileType, InputEdit};
pub use thalo_semantic_analyzer::{
    AnalyzedEntry, DocumentLinkIndex, DocumentModel, EntryId, LinkDefinition, LinkReference,
};
