//! The per-document semantic model, derived from the AST on every change.

use crate::links::{DocumentLinkIndex, LinkDefinition, LinkReference};
use serde::{Deserialize, Serialize};
use thalo_ast::{
    ActualizeEntry, Entry, EntryKind, FieldOrError, InstanceEntry, Query, QueryCondition,
    SchemaEntry, SynthesisEntry, ValueContent,
};
use thalo_parser::{Document, extract};
use thalo_position_tracking::{Location, SourceMap};

/// Cross-re-parse identity: `(file, canonical timestamp, kind, link id)`.
/// Entries are reconstructed on every parse, so nothing holds them by
/// object identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryId {
    pub file: String,
    pub timestamp: Option<String>,
    pub kind: EntryKind,
    pub link_id: Option<String>,
}

impl EntryId {
    /// Builds the identity of an entry within `file`.
    pub fn of(file: &str, entry: &Entry) -> Self {
        Self {
            file: file.to_string(),
            timestamp: entry.timestamp().map(|t| t.canonical()),
            kind: entry.kind(),
            link_id: entry.explicit_link().map(str::to_string),
        }
    }
}

/// One extracted entry plus the block it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzedEntry {
    /// Index into the document's blocks.
    pub block: usize,
    /// The block's map, for translating this entry's locations.
    pub source_map: SourceMap,
    pub entry: Entry,
}

impl AnalyzedEntry {
    /// The entry's identity within `file`.
    pub fn id(&self, file: &str) -> EntryId {
        EntryId::of(file, &self.entry)
    }

    /// The entry's file-absolute location.
    pub fn file_location(&self) -> Location {
        self.source_map.to_file_location(self.entry.location())
    }
}

/// Which derived layers an update invalidated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DirtyFlags {
    pub entries_changed: bool,
    pub schemas_changed: bool,
    pub links_changed: bool,
}

impl DirtyFlags {
    /// Flags for a document seen for the first time.
    pub fn all() -> Self {
        Self { entries_changed: true, schemas_changed: true, links_changed: true }
    }

    pub fn any(&self) -> bool {
        self.entries_changed || self.schemas_changed || self.links_changed
    }
}

/// Per-document semantics: entries in source order plus the local link index.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentModel {
    path: String,
    entries: Vec<AnalyzedEntry>,
    link_index: DocumentLinkIndex,
}

impl DocumentModel {
    /// Analyzes a freshly parsed document.
    pub fn analyze(document: &Document) -> Self {
        let path = document.path().to_string();
        let mut entries = Vec::new();
        for (block_index, block) in document.blocks().iter().enumerate() {
            for entry in extract(&block.tree, &block.sub_source) {
                entries.push(AnalyzedEntry {
                    block: block_index,
                    source_map: block.source_map,
                    entry,
                });
            }
        }
        let link_index = build_link_index(&path, &entries);
        Self { path, entries, link_index }
    }

    /// Re-derives the model after an edit, reporting what changed.
    pub fn update(&mut self, document: &Document) -> DirtyFlags {
        let fresh = Self::analyze(document);
        let entries_changed = fresh.entries != self.entries;
        let schemas_changed = !schema_entries_eq(&fresh.entries, &self.entries);
        let links_changed = fresh.link_index != self.link_index;
        *self = fresh;
        DirtyFlags { entries_changed, schemas_changed, links_changed }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// All entries in source order (block order, then entry order).
    pub fn entries(&self) -> &[AnalyzedEntry] {
        &self.entries
    }

    pub fn link_index(&self) -> &DocumentLinkIndex {
        &self.link_index
    }

    pub fn instance_entries(&self) -> impl Iterator<Item = (&AnalyzedEntry, &InstanceEntry)> {
        self.entries.iter().filter_map(|a| match &a.entry {
            Entry::Instance(e) => Some((a, e)),
            _ => None,
        })
    }

    pub fn schema_entries(&self) -> impl Iterator<Item = (&AnalyzedEntry, &SchemaEntry)> {
        self.entries.iter().filter_map(|a| match &a.entry {
            Entry::Schema(e) => Some((a, e)),
            _ => None,
        })
    }

    pub fn synthesis_entries(&self) -> impl Iterator<Item = (&AnalyzedEntry, &SynthesisEntry)> {
        self.entries.iter().filter_map(|a| match &a.entry {
            Entry::Synthesis(e) => Some((a, e)),
            _ => None,
        })
    }

    pub fn actualize_entries(&self) -> impl Iterator<Item = (&AnalyzedEntry, &ActualizeEntry)> {
        self.entries.iter().filter_map(|a| match &a.entry {
            Entry::Actualize(e) => Some((a, e)),
            _ => None,
        })
    }
}

fn schema_entries_eq(a: &[AnalyzedEntry], b: &[AnalyzedEntry]) -> bool {
    fn of(entries: &[AnalyzedEntry]) -> Vec<&AnalyzedEntry> {
        entries.iter().filter(|e| e.entry.kind() == EntryKind::Schema).collect()
    }
    of(a) == of(b)
}

fn build_link_index(file: &str, entries: &[AnalyzedEntry]) -> DocumentLinkIndex {
    let mut index = DocumentLinkIndex::default();
    for (ordinal, analyzed) in entries.iter().enumerate() {
        let map = analyzed.source_map;
        let entry = &analyzed.entry;

        if let Some(timestamp) = entry.timestamp() {
            index.record_implicit(timestamp.canonical(), ordinal);
        }

        // Header links on create / define-* entries are definitions; on
        // `update` entries they reference the created entry instead.
        if let Some(id) = entry.explicit_link() {
            let location = definition_location(entry).unwrap_or_else(|| entry.header_location());
            let is_update = matches!(
                entry,
                Entry::Instance(e)
                    if e.header.directive.ok() == Some(&thalo_ast::InstanceDirective::Update)
            );
            if is_update {
                index.push_reference(LinkReference {
                    link_id: id.to_string(),
                    file: file.to_string(),
                    location: map.to_file_location(location),
                    metadata_key: None,
                });
            } else {
                index.push_definition(LinkDefinition {
                    link_id: id.to_string(),
                    entry: EntryId::of(file, entry),
                    file: file.to_string(),
                    location: map.to_file_location(location),
                });
            }
        }

        // References come from metadata values, query conditions, and
        // actualize targets.
        for metadata in entry.metadata() {
            if let Some(value) = metadata.value.as_ref().and_then(FieldOrError::ok) {
                collect_value_references(file, &metadata.key, value, map, &mut index);
            }
        }
        if let Entry::Actualize(actualize) = entry {
            if let Some(target) = actualize.header.target.ok() {
                index.push_reference(LinkReference {
                    link_id: target.clone(),
                    file: file.to_string(),
                    location: map.to_file_location(actualize.header.target.location()),
                    metadata_key: None,
                });
            }
        }
    }
    index
}

/// The location of the header's `^id` token.
fn definition_location(entry: &Entry) -> Option<Location> {
    match entry {
        Entry::Instance(InstanceEntry { header, .. }) => {
            header.explicit_link.as_ref().map(FieldOrError::location)
        }
        Entry::Schema(SchemaEntry { header, .. }) => {
            header.explicit_link.as_ref().map(FieldOrError::location)
        }
        Entry::Synthesis(SynthesisEntry { header, .. }) => Some(header.link_id.location()),
        Entry::Actualize(ActualizeEntry { .. }) => None,
    }
}

fn collect_value_references(
    file: &str,
    key: &str,
    value: &ValueContent,
    map: SourceMap,
    index: &mut DocumentLinkIndex,
) {
    match value {
        ValueContent::Link { id, location } => {
            index.push_reference(LinkReference {
                link_id: id.clone(),
                file: file.to_string(),
                location: map.to_file_location(*location),
                metadata_key: Some(key.to_string()),
            });
        }
        ValueContent::Array { elements, .. } => {
            for element in elements.iter().filter_map(FieldOrError::ok) {
                collect_value_references(file, key, element, map, index);
            }
        }
        ValueContent::Query(query) => collect_query_references(file, key, query, map, index),
        _ => {}
    }
}

fn collect_query_references(
    file: &str,
    key: &str,
    query: &Query,
    map: SourceMap,
    index: &mut DocumentLinkIndex,
) {
    for condition in &query.conditions {
        match condition {
            QueryCondition::Link { id, location } => {
                index.push_reference(LinkReference {
                    link_id: id.clone(),
                    file: file.to_string(),
                    location: map.to_file_location(*location),
                    metadata_key: Some(key.to_string()),
                });
            }
            QueryCondition::Field { value, .. } => {
                collect_value_references(file, key, value, map, index);
            }
            QueryCondition::Tag { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use thalo_parser::DocumentEdit;

    fn model_of(source: &str, path: &str) -> DocumentModel {
        DocumentModel::analyze(&Document::new(source.to_string(), path, None))
    }

    #[test]
    fn collects_definitions_and_references() {
        let source = "2026-01-05T18:00Z create lore \"E\" ^e1\n  subject: ^self\n";
        let model = model_of(source, "entries.thalo");
        let defs = model.link_index().definitions();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].link_id, "e1");
        assert_eq!(defs[0].entry.kind, EntryKind::Instance);

        let refs = model.link_index().references();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].link_id, "self");
        assert_eq!(refs[0].metadata_key.as_deref(), Some("subject"));
    }

    #[test]
    fn actualize_targets_are_references_not_definitions() {
        let source = "2026-01-07T12:00Z actualize-synthesis ^p\n";
        let model = model_of(source, "entries.thalo");
        assert!(model.link_index().definitions().is_empty());
        assert_eq!(model.link_index().references()[0].link_id, "p");
    }

    #[test]
    fn query_conditions_contribute_references() {
        let source = "2026-01-07T10:00Z define-synthesis \"P\" ^p\n  sources: lore where subject = ^self and ^other\n";
        let model = model_of(source, "entries.thalo");
        let ids: Vec<&str> =
            model.link_index().references().iter().map(|r| r.link_id.as_str()).collect();
        assert_eq!(ids, vec!["self", "other"]);
    }

    #[test]
    fn markdown_locations_are_file_absolute() {
        let source = "intro\n\n```thalo\n2026-01-05T18:00Z create lore ^e1\n```\n";
        let model = model_of(source, "notes.md");
        let defs = model.link_index().definitions();
        assert_eq!(defs[0].location.start_position.row, 3);
    }

    #[test]
    fn implicit_definitions_key_on_canonical_timestamps() {
        let source = "2026-01-05T18:00+02:00 create lore\n";
        let model = model_of(source, "entries.thalo");
        assert_eq!(model.link_index().implicit_definition("2026-01-05T16:00Z"), Some(0));
    }

    #[test]
    fn update_reports_dirty_layers() {
        let mut doc = Document::new(
            "2026-01-05T18:00Z create lore ^e1\n  k: 1\n".to_string(),
            "entries.thalo",
            None,
        );
        let mut model = DocumentModel::analyze(&doc);

        // Touch a metadata value: entries change, links and schemas do not.
        doc.apply_edit(&DocumentEdit {
            start_row: 1,
            start_col: 5,
            end_row: 1,
            end_col: 6,
            new_text: "2".to_string(),
        });
        let flags = model.update(&doc);
        assert!(flags.entries_changed);
        assert!(!flags.links_changed);
        assert!(!flags.schemas_changed);

        // A no-op rewrite leaves everything clean.
        let flags = model.update(&doc);
        assert!(!flags.any());
    }

    #[test]
    fn kind_filtered_accessors() {
        let source = "2026-01-01T00:00Z define-entity lore\n\n2026-01-05T18:00Z create lore\n";
        let model = model_of(source, "entries.thalo");
        assert_eq!(model.schema_entries().count(), 1);
        assert_eq!(model.instance_entries().count(), 1);
        assert_eq!(model.synthesis_entries().count(), 0);
    }
}
