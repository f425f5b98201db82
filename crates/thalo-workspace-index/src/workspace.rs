//! The workspace: sole owner and mutation gateway of documents, models,
//! schema registry, and link index.

use crate::error::WorkspaceError;
use crate::link_index::WorkspaceLinkIndex;
use crate::schema_registry::SchemaRegistry;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thalo_parser::{Document, DocumentEdit, FileType, InputEdit};
use thalo_semantic_analyzer::{DirtyFlags, DocumentModel};
use tracing::debug;

/// Options for [`Workspace::add_document`].
#[derive(Debug, Clone)]
pub struct AddDocumentOptions {
    /// Unique path; also drives file-type detection.
    pub filename: String,
    /// Overrides extension-based detection when set.
    pub file_type: Option<FileType>,
}

impl AddDocumentOptions {
    pub fn new(filename: impl Into<String>) -> Self {
        Self { filename: filename.into(), file_type: None }
    }

    pub fn with_file_type(mut self, file_type: FileType) -> Self {
        self.file_type = Some(file_type);
        self
    }
}

/// Which derived layers a mutation invalidated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InvalidationResult {
    pub entries_changed: bool,
    pub schemas_changed: bool,
    pub links_changed: bool,
}

impl From<DirtyFlags> for InvalidationResult {
    fn from(flags: DirtyFlags) -> Self {
        Self {
            entries_changed: flags.entries_changed,
            schemas_changed: flags.schemas_changed,
            links_changed: flags.links_changed,
        }
    }
}

struct DocumentState {
    document: Document,
    model: DocumentModel,
}

/// All open documents plus the aggregates derived from them.
///
/// Single-threaded by design: every mutation runs to completion, updating
/// the model, schema registry, and link index before returning, so queries
/// never observe a partially-propagated edit.
#[derive(Default)]
pub struct Workspace {
    order: Vec<String>,
    documents: FxHashMap<String, DocumentState>,
    schema_registry: SchemaRegistry,
    link_index: WorkspaceLinkIndex,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a document (or replaces one already at the path) and propagates
    /// its semantics into the aggregates.
    pub fn add_document(
        &mut self,
        source: impl Into<String>,
        options: AddDocumentOptions,
    ) -> InvalidationResult {
        let path = options.filename.clone();
        if self.documents.contains_key(&path) {
            debug!(%path, "add_document over an existing path; replacing content");
            return self
                .replace_content(&path, source.into())
                .unwrap_or_default();
        }

        let document = Document::new(source.into(), &path, options.file_type);
        let model = DocumentModel::analyze(&document);
        self.order.push(path.clone());
        self.propagate(path.clone(), document, model, DirtyFlags::all())
    }

    /// Removes a document and withdraws its contributions.
    pub fn remove_document(&mut self, path: &str) -> Result<(), WorkspaceError> {
        if self.documents.remove(path).is_none() {
            return Err(WorkspaceError::DocumentNotFound { path: path.to_string() });
        }
        self.order.retain(|p| p != path);
        self.schema_registry.remove_document(path);
        self.link_index.remove_document(path);
        Ok(())
    }

    pub fn get_document(&self, path: &str) -> Option<&Document> {
        self.documents.get(path).map(|state| &state.document)
    }

    pub fn get_model(&self, path: &str) -> Option<&DocumentModel> {
        self.documents.get(path).map(|state| &state.model)
    }

    /// Models in document insertion order.
    pub fn all_models(&self) -> impl Iterator<Item = &DocumentModel> {
        self.order
            .iter()
            .filter_map(|path| self.documents.get(path))
            .map(|state| &state.model)
    }

    /// Document paths in insertion order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn document_count(&self) -> usize {
        self.order.len()
    }

    /// Applies a positional edit and propagates invalidations.
    pub fn apply_edit(
        &mut self,
        path: &str,
        edit: &DocumentEdit,
    ) -> Result<InvalidationResult, WorkspaceError> {
        self.mutate(path, |document| {
            document.apply_edit(edit);
        })
    }

    /// Applies a byte-offset edit the host pre-computed.
    pub fn apply_edit_range(
        &mut self,
        path: &str,
        edit: InputEdit,
        new_text: &str,
    ) -> Result<InvalidationResult, WorkspaceError> {
        self.mutate(path, |document| {
            document.apply_edit_range(edit, new_text);
        })
    }

    /// Replaces a document's entire source.
    pub fn replace_content(
        &mut self,
        path: &str,
        new_source: String,
    ) -> Result<InvalidationResult, WorkspaceError> {
        self.mutate(path, move |document| {
            document.replace_content(new_source);
        })
    }

    pub fn schema_registry(&self) -> &SchemaRegistry {
        &self.schema_registry
    }

    pub fn link_index(&self) -> &WorkspaceLinkIndex {
        &self.link_index
    }

    fn mutate(
        &mut self,
        path: &str,
        op: impl FnOnce(&mut Document),
    ) -> Result<InvalidationResult, WorkspaceError> {
        let state = self
            .documents
            .get_mut(path)
            .ok_or_else(|| WorkspaceError::DocumentNotFound { path: path.to_string() })?;
        op(&mut state.document);
        let flags = state.model.update(&state.document);
        if flags.schemas_changed {
            self.schema_registry.update_document(path, &state.model);
        }
        if flags.links_changed {
            self.link_index.update_document(path, state.model.link_index());
        }
        debug!(
            path,
            entries = flags.entries_changed,
            schemas = flags.schemas_changed,
            links = flags.links_changed,
            "edit propagated",
        );
        Ok(flags.into())
    }

    fn propagate(
        &mut self,
        path: String,
        document: Document,
        model: DocumentModel,
        flags: DirtyFlags,
    ) -> InvalidationResult {
        if flags.schemas_changed {
            self.schema_registry.update_document(&path, &model);
        }
        if flags.links_changed {
            self.link_index.update_document(&path, model.link_index());
        }
        self.documents.insert(path, DocumentState { document, model });
        flags.into()
    }
}
