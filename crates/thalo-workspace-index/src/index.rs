//! Per-check groupings, precomputed in one pass so no rule scans entries
//! itself.

use crate::workspace::Workspace;
use rustc_hash::FxHashMap;
use thalo_ast::{
    ActualizeEntry, Entry, InstanceEntry, SchemaDirective, SchemaEntry, SynthesisEntry,
};
use thalo_semantic_analyzer::AnalyzedEntry;

/// A borrowed view of one entry of a known kind.
#[derive(Debug, Clone, Copy)]
pub struct EntryRef<'a, T> {
    pub file: &'a str,
    pub analyzed: &'a AnalyzedEntry,
    pub entry: &'a T,
}

/// The precomputed groupings rules consume. Vectors preserve workspace
/// iteration order (document insertion order, then source order).
#[derive(Debug, Default)]
pub struct WorkspaceIndex<'a> {
    pub define_entities_by_name: FxHashMap<&'a str, Vec<EntryRef<'a, SchemaEntry>>>,
    pub alter_entities_by_name: FxHashMap<&'a str, Vec<EntryRef<'a, SchemaEntry>>>,
    pub instance_entries_by_entity: FxHashMap<&'a str, Vec<EntryRef<'a, InstanceEntry>>>,
    pub synthesis_entries: Vec<EntryRef<'a, SynthesisEntry>>,
    pub actualize_entries: Vec<EntryRef<'a, ActualizeEntry>>,
}

impl<'a> WorkspaceIndex<'a> {
    /// Builds the index in a single O(entries) pass.
    pub fn build(workspace: &'a Workspace) -> Self {
        let mut index = WorkspaceIndex::default();
        for model in workspace.all_models() {
            let file = model.path();
            for analyzed in model.entries() {
                match &analyzed.entry {
                    Entry::Instance(entry) => {
                        if let Some(entity) = entry.header.entity.ok() {
                            index
                                .instance_entries_by_entity
                                .entry(entity.as_str())
                                .or_default()
                                .push(EntryRef { file, analyzed, entry });
                        }
                    }
                    Entry::Schema(entry) => {
                        let Some(name) = entry.header.entity_name.ok() else { continue };
                        let group = match entry.header.directive.ok() {
                            Some(SchemaDirective::DefineEntity) => {
                                &mut index.define_entities_by_name
                            }
                            Some(SchemaDirective::AlterEntity) => {
                                &mut index.alter_entities_by_name
                            }
                            None => continue,
                        };
                        group
                            .entry(name.as_str())
                            .or_default()
                            .push(EntryRef { file, analyzed, entry });
                    }
                    Entry::Synthesis(entry) => {
                        index.synthesis_entries.push(EntryRef { file, analyzed, entry });
                    }
                    Entry::Actualize(entry) => {
                        index.actualize_entries.push(EntryRef { file, analyzed, entry });
                    }
                }
            }
        }
        index
    }

    /// Define-entity names, sorted for deterministic iteration.
    pub fn defined_entity_names(&self) -> Vec<&'a str> {
        let mut names: Vec<&'a str> = self.define_entities_by_name.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Alter-entity names, sorted for deterministic iteration.
    pub fn altered_entity_names(&self) -> Vec<&'a str> {
        let mut names: Vec<&'a str> = self.alter_entities_by_name.keys().copied().collect();
        names.sort_unstable();
        names
    }
}
