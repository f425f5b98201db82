//! Per-document semantic analysis for thalo.
mod links;
mod model;

pub use links::{DocumentLinkIndex, LinkDefinition, LinkReference};
pub use model::{AnalyzedEntry, DirtyFlags, DocumentModel, EntryId};
