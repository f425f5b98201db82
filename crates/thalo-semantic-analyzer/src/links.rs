//! Per-document link tables: explicit definitions, references, and implicit
//! per-entry timestamp definitions.

use crate::EntryId;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thalo_position_tracking::Location;

/// Where a `^id` is declared. Locations are file-absolute: every consumer
/// (navigation, duplicate reporting) needs file coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkDefinition {
    pub link_id: String,
    pub entry: EntryId,
    pub file: String,
    pub location: Location,
}

/// One use of a `^id` outside its definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkReference {
    pub link_id: String,
    pub file: String,
    pub location: Location,
    /// The metadata key whose value carried the reference, when applicable.
    pub metadata_key: Option<String>,
}

/// A single document's contribution to the workspace link index.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DocumentLinkIndex {
    definitions: Vec<LinkDefinition>,
    references: Vec<LinkReference>,
    /// Canonical timestamp → entry ordinal; in-file back-references only.
    implicit: FxHashMap<String, usize>,
}

impl DocumentLinkIndex {
    pub(crate) fn push_definition(&mut self, definition: LinkDefinition) {
        self.definitions.push(definition);
    }

    pub(crate) fn push_reference(&mut self, reference: LinkReference) {
        self.references.push(reference);
    }

    pub(crate) fn record_implicit(&mut self, canonical: String, entry_ordinal: usize) {
        // First entry at a timestamp wins; identity disambiguates via kind.
        self.implicit.entry(canonical).or_insert(entry_ordinal);
    }

    /// Explicit definitions in source order.
    pub fn definitions(&self) -> &[LinkDefinition] {
        &self.definitions
    }

    /// References in source order.
    pub fn references(&self) -> &[LinkReference] {
        &self.references
    }

    /// The ordinal of the entry implicitly defined by a canonical timestamp.
    pub fn implicit_definition(&self, canonical: &str) -> Option<usize> {
        self.implicit.get(canonical).copied()
    }

    /// Explicit definitions of one id.
    pub fn definitions_of<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a LinkDefinition> {
        self.definitions.iter().filter(move |d| d.link_id == id)
    }
}
