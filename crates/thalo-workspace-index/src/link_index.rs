//! Workspace-wide link index: the union of per-document link tables,
//! maintained by document-level diffs.

use rustc_hash::FxHashMap;
use thalo_semantic_analyzer::{DocumentLinkIndex, LinkDefinition, LinkReference};

/// Cross-document link lookup. Aggregation follows document insertion order
/// so duplicate reporting and navigation are deterministic.
#[derive(Debug, Default)]
pub struct WorkspaceLinkIndex {
    doc_order: Vec<String>,
    by_doc: FxHashMap<String, DocumentLinkIndex>,
    definitions: FxHashMap<String, Vec<LinkDefinition>>,
    references: FxHashMap<String, Vec<LinkReference>>,
}

impl WorkspaceLinkIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces one document's contribution and re-aggregates.
    pub fn update_document(&mut self, path: &str, index: &DocumentLinkIndex) {
        if !self.by_doc.contains_key(path) {
            self.doc_order.push(path.to_string());
        }
        self.by_doc.insert(path.to_string(), index.clone());
        self.rebuild();
    }

    /// Drops one document's contribution and re-aggregates.
    pub fn remove_document(&mut self, path: &str) {
        self.by_doc.remove(path);
        self.doc_order.retain(|p| p != path);
        self.rebuild();
    }

    /// The first explicit definition of an id, in document insertion order.
    pub fn link_definition(&self, id: &str) -> Option<&LinkDefinition> {
        self.definitions.get(id).and_then(|defs| defs.first())
    }

    /// Every explicit definition of an id; more than one is a
    /// `duplicate-link-id` condition.
    pub fn definitions(&self, id: &str) -> &[LinkDefinition] {
        self.definitions.get(id).map_or(&[], Vec::as_slice)
    }

    /// Every reference to an id.
    pub fn references(&self, id: &str) -> &[LinkReference] {
        self.references.get(id).map_or(&[], Vec::as_slice)
    }

    /// All defined ids, sorted for deterministic iteration.
    pub fn defined_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.definitions.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// All references across the workspace, in document insertion order.
    pub fn all_references(&self) -> impl Iterator<Item = &LinkReference> {
        self.doc_order
            .iter()
            .filter_map(|p| self.by_doc.get(p))
            .flat_map(|index| index.references().iter())
    }

    fn rebuild(&mut self) {
        self.definitions.clear();
        self.references.clear();
        for path in &self.doc_order {
            let Some(index) = self.by_doc.get(path) else { continue };
            for definition in index.definitions() {
                self.definitions
                    .entry(definition.link_id.clone())
                    .or_default()
                    .push(definition.clone());
            }
            for reference in index.references() {
                self.references
                    .entry(reference.link_id.clone())
                    .or_default()
                    .push(reference.clone());
            }
        }
    }
}
