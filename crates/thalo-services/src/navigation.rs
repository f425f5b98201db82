//! Find-definition and find-references over the workspace link index.

use thalo_semantic_analyzer::{LinkDefinition, LinkReference};
use thalo_syntax::TokenKind;
use thalo_workspace_index::Workspace;

/// A definition plus everything referring to it.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferencesResult {
    pub definition: Option<LinkDefinition>,
    pub references: Vec<LinkReference>,
}

/// The `^id` token at a file-absolute byte offset, if the offset sits on one.
pub fn link_id_at(workspace: &Workspace, path: &str, offset: usize) -> Option<String> {
    let document = workspace.get_document(path)?;
    let block_index = document.block_at_offset(offset)?;
    let block = document.blocks().get(block_index)?;
    let relative = block.source_map.to_block_offset(offset);
    let token = block.tree.root.token_at_offset(relative)?;
    if token.kind != TokenKind::Link {
        return None;
    }
    Some(token.text(&block.sub_source).get(1..)?.to_string())
}

/// Resolves the `^id` under the cursor to its definition's file-absolute
/// location.
pub fn find_definition(
    workspace: &Workspace,
    path: &str,
    offset: usize,
) -> Option<LinkDefinition> {
    let id = link_id_at(workspace, path, offset)?;
    workspace.link_index().link_definition(&id).cloned()
}

/// All uses of an id across the workspace.
pub fn find_references(workspace: &Workspace, id: &str) -> ReferencesResult {
    let links = workspace.link_index();
    ReferencesResult {
        definition: links.link_definition(id).cloned(),
        references: links.references(id).to_vec(),
    }
}

/// All uses of the id under the cursor.
pub fn find_references_at(
    workspace: &Workspace,
    path: &str,
    offset: usize,
) -> Option<ReferencesResult> {
    let id = link_id_at(workspace, path, offset)?;
    Some(find_references(workspace, &id))
}
