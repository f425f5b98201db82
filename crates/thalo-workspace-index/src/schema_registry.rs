//! Effective entity schemas: `define-entity` folded with `alter-entity`
//! deltas in canonical-timestamp order.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::sync::Arc;
use thalo_ast::{
    FieldOrError, SchemaDirective, SchemaEntry, TypeExpr, ValueContent,
};
use thalo_semantic_analyzer::DocumentModel;
use tracing::debug;

/// One resolved field of an entity schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSchema {
    pub name: String,
    pub optional: bool,
    pub ty: TypeExpr,
    pub default_value: Option<ValueContent>,
    pub description: Option<String>,
}

/// One resolved section of an entity schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionSchema {
    pub name: String,
    pub optional: bool,
    pub description: Option<String>,
}

/// The effective shape of an entity after all alterations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySchema {
    pub name: String,
    pub description: Option<String>,
    /// Ordered: base declaration order, alterations appended.
    pub fields: Vec<FieldSchema>,
    pub sections: Vec<SectionSchema>,
    /// Canonical timestamp of the winning `define-entity`.
    pub defined_at: String,
    /// File holding the winning `define-entity`.
    pub defined_in: String,
}

impl EntitySchema {
    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn section(&self, name: &str) -> Option<&SectionSchema> {
        self.sections.iter().find(|s| s.name == name)
    }
}

#[derive(Debug, Clone)]
struct SchemaRecord {
    file: String,
    /// Canonical timestamp; records without one cannot participate.
    timestamp: String,
    entry: SchemaEntry,
}

/// Caches effective schemas, invalidating per entity name on change.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    by_doc: FxHashMap<String, Vec<SchemaRecord>>,
    /// Document insertion order, for deterministic tie-breaks.
    doc_order: Vec<String>,
    cache: RefCell<FxHashMap<String, Option<Arc<EntitySchema>>>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces a document's schema records and drops cache entries for
    /// every entity name the document mentioned before or after.
    pub fn update_document(&mut self, path: &str, model: &DocumentModel) {
        let mut touched: FxHashSet<String> = self.entity_names_in(path).collect();
        let records: Vec<SchemaRecord> = model
            .schema_entries()
            .filter_map(|(_, entry)| {
                let timestamp = entry.header.timestamp.ok()?.canonical();
                Some(SchemaRecord {
                    file: path.to_string(),
                    timestamp,
                    entry: entry.clone(),
                })
            })
            .collect();
        for record in &records {
            if let Some(name) = record.entry.header.entity_name.ok() {
                touched.insert(name.clone());
            }
        }
        if !self.by_doc.contains_key(path) {
            self.doc_order.push(path.to_string());
        }
        self.by_doc.insert(path.to_string(), records);
        self.invalidate(touched);
    }

    /// Drops a document's records and the cache entries they fed.
    pub fn remove_document(&mut self, path: &str) {
        let touched: FxHashSet<String> = self.entity_names_in(path).collect();
        self.by_doc.remove(path);
        self.doc_order.retain(|p| p != path);
        self.invalidate(touched);
    }

    /// The effective schema of an entity, or `None` when it has no
    /// `define-entity` with a usable timestamp.
    pub fn get(&self, name: &str) -> Option<Arc<EntitySchema>> {
        if let Some(cached) = self.cache.borrow().get(name) {
            return cached.clone();
        }
        let resolved = self.resolve(name, None).map(Arc::new);
        self.cache.borrow_mut().insert(name.to_string(), resolved.clone());
        resolved
    }

    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// The effective schema with only alterations strictly before the given
    /// canonical timestamp applied. Uncached; used by alteration checks.
    pub fn get_before(&self, name: &str, before: &str) -> Option<EntitySchema> {
        self.resolve(name, Some(before))
    }

    /// All entity names with at least one `define-entity` record.
    pub fn defined_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .records()
            .filter(|r| r.entry.header.directive.ok() == Some(&SchemaDirective::DefineEntity))
            .filter_map(|r| r.entry.header.entity_name.ok().cloned())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    fn invalidate(&mut self, names: FxHashSet<String>) {
        if names.is_empty() {
            return;
        }
        debug!(count = names.len(), "invalidating entity schema cache entries");
        let mut cache = self.cache.borrow_mut();
        for name in names {
            cache.remove(&name);
        }
    }

    fn entity_names_in(&self, path: &str) -> impl Iterator<Item = String> {
        self.by_doc
            .get(path)
            .into_iter()
            .flatten()
            .filter_map(|r| r.entry.header.entity_name.ok().cloned())
            .collect::<Vec<_>>()
            .into_iter()
    }

    /// Records across all documents in insertion order.
    fn records(&self) -> impl Iterator<Item = &SchemaRecord> {
        self.doc_order.iter().filter_map(|p| self.by_doc.get(p)).flatten()
    }

    fn resolve(&self, name: &str, before: Option<&str>) -> Option<EntitySchema> {
        let matching: Vec<&SchemaRecord> = self
            .records()
            .filter(|r| r.entry.header.entity_name.ok().map(String::as_str) == Some(name))
            .collect();

        // Earliest define wins; ties break on file then insertion order.
        let define = matching
            .iter()
            .filter(|r| r.entry.header.directive.ok() == Some(&SchemaDirective::DefineEntity))
            .min_by(|a, b| {
                a.timestamp.cmp(&b.timestamp).then_with(|| a.file.cmp(&b.file))
            })?;

        let mut schema = EntitySchema {
            name: name.to_string(),
            description: define
                .entry
                .header
                .title
                .as_ref()
                .and_then(FieldOrError::ok)
                .cloned(),
            fields: Vec::new(),
            sections: Vec::new(),
            defined_at: define.timestamp.clone(),
            defined_in: define.file.clone(),
        };
        apply_additions(&mut schema, &define.entry);

        let mut alters: Vec<&&SchemaRecord> = matching
            .iter()
            .filter(|r| r.entry.header.directive.ok() == Some(&SchemaDirective::AlterEntity))
            .filter(|r| before.is_none_or(|limit| r.timestamp.as_str() < limit))
            .collect();
        alters.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

        for alter in alters {
            apply_additions(&mut schema, &alter.entry);
            // Removals apply after additions within a single alter.
            if let Some(block) = &alter.entry.remove_metadata_block {
                for name in &block.names {
                    schema.fields.retain(|f| f.name != name.name);
                }
            }
            if let Some(block) = &alter.entry.remove_sections_block {
                for name in &block.names {
                    schema.sections.retain(|s| s.name != name.name);
                }
            }
        }
        Some(schema)
    }
}

/// Merges a schema entry's declared fields and sections into the effective
/// schema. Later declarations replace earlier ones by name, in place.
fn apply_additions(schema: &mut EntitySchema, entry: &SchemaEntry) {
    if let Some(block) = &entry.metadata_block {
        for decl in &block.fields {
            // Declarations whose type failed to parse contribute nothing.
            let Some(ty) = decl.ty.ok() else { continue };
            let field = FieldSchema {
                name: decl.name.clone(),
                optional: decl.optional,
                ty: ty.clone(),
                default_value: decl
                    .default_value
                    .as_ref()
                    .and_then(FieldOrError::ok)
                    .cloned(),
                description: decl.description.clone(),
            };
            match schema.fields.iter_mut().find(|f| f.name == decl.name) {
                Some(existing) => *existing = field,
                None => schema.fields.push(field),
            }
        }
    }
    if let Some(block) = &entry.sections_block {
        for decl in &block.sections {
            let section = SectionSchema {
                name: decl.name.clone(),
                optional: decl.optional,
                description: decl.description.clone(),
            };
            match schema.sections.iter_mut().find(|s| s.name == decl.name) {
                Some(existing) => *existing = section,
                None => schema.sections.push(section),
            }
        }
    }
}
