//! Read-only context handed to rule visitors.

use crate::diagnostic::Draft;
use thalo_position_tracking::Location;
use thalo_semantic_analyzer::{AnalyzedEntry, DocumentModel};
use thalo_workspace_index::{SchemaRegistry, Workspace, WorkspaceIndex, WorkspaceLinkIndex};

/// Whole-workspace context for `before_check` / `after_check` hooks.
/// Cross-document rules read [`CheckContext::index`], never the workspace's
/// models directly.
pub struct CheckContext<'a> {
    pub workspace: &'a Workspace,
    pub index: &'a WorkspaceIndex<'a>,
}

impl<'a> CheckContext<'a> {
    pub fn schemas(&self) -> &'a SchemaRegistry {
        self.workspace.schema_registry()
    }

    pub fn links(&self) -> &'a WorkspaceLinkIndex {
        self.workspace.link_index()
    }
}

/// Per-entry context for the `visit_*` callbacks.
pub struct EntryContext<'a> {
    pub file: &'a str,
    pub model: &'a DocumentModel,
    pub analyzed: &'a AnalyzedEntry,
    pub schemas: &'a SchemaRegistry,
    pub links: &'a WorkspaceLinkIndex,
}

impl EntryContext<'_> {
    /// A draft at a block-relative location within this entry's block.
    pub fn draft(&self, location: Location, message: impl Into<String>) -> Draft {
        Draft::new(self.file, self.analyzed.source_map, location, message)
    }
}
