//! Query execution over workspace instance entries.

use rustc_hash::FxHashSet;
use thalo_ast::{
    FieldOrError, InstanceEntry, Query, QueryCondition, Timestamp, ValueContent, metadata_value,
};
use thalo_cancel::CancelToken;
use thalo_semantic_analyzer::{AnalyzedEntry, EntryId};
use thalo_workspace_index::Workspace;

/// One instance entry matched by a query.
#[derive(Debug, Clone, Copy)]
pub struct QueryHit<'a> {
    pub file: &'a str,
    pub analyzed: &'a AnalyzedEntry,
    pub entry: &'a InstanceEntry,
}

impl QueryHit<'_> {
    pub fn id(&self) -> EntryId {
        self.analyzed.id(self.file)
    }
}

/// Execution options.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryOptions {
    /// Only entries strictly after this instant match.
    pub after_timestamp: Option<Timestamp>,
}

/// A possibly-partial result set.
#[derive(Debug)]
pub struct QueryResult<'a> {
    pub hits: Vec<QueryHit<'a>>,
    pub cancelled: bool,
}

/// Runs one query; hits come back sorted by canonical timestamp ascending.
pub fn execute_query<'a>(
    workspace: &'a Workspace,
    query: &Query,
    options: &QueryOptions,
    cancel: &CancelToken,
) -> QueryResult<'a> {
    execute_queries(workspace, std::slice::from_ref(query), options, cancel)
}

/// Runs several queries and unions their hits, deduplicated by entry
/// identity, sorted by canonical timestamp ascending.
pub fn execute_queries<'a>(
    workspace: &'a Workspace,
    queries: &[Query],
    options: &QueryOptions,
    cancel: &CancelToken,
) -> QueryResult<'a> {
    let mut hits: Vec<QueryHit<'a>> = Vec::new();
    let mut seen: FxHashSet<EntryId> = FxHashSet::default();

    for model in workspace.all_models() {
        for (analyzed, entry) in model.instance_entries() {
            if cancel.is_cancelled() {
                sort_hits(&mut hits);
                return QueryResult { hits, cancelled: true };
            }
            let Some(timestamp) = entry.header.timestamp.ok() else { continue };
            if options.after_timestamp.is_some_and(|after| *timestamp <= after) {
                continue;
            }
            if !queries.iter().any(|q| matches_query(entry, q)) {
                continue;
            }
            let hit = QueryHit { file: model.path(), analyzed, entry };
            if seen.insert(hit.id()) {
                hits.push(hit);
            }
        }
    }
    sort_hits(&mut hits);
    QueryResult { hits, cancelled: false }
}

fn sort_hits(hits: &mut [QueryHit<'_>]) {
    hits.sort_by_key(|hit| {
        hit.entry.header.timestamp.ok().map_or(i64::MIN, Timestamp::utc_minutes)
    });
}

fn matches_query(entry: &InstanceEntry, query: &Query) -> bool {
    if entry.header.entity.ok().map(String::as_str) != Some(query.entity.as_str()) {
        return false;
    }
    query.conditions.iter().all(|condition| matches_condition(entry, condition))
}

fn matches_condition(entry: &InstanceEntry, condition: &QueryCondition) -> bool {
    match condition {
        // Tags compare byte-for-byte; no case folding.
        QueryCondition::Tag { name, .. } => entry.header.tags.iter().any(|t| &t.name == name),
        QueryCondition::Link { id, .. } => references_link(entry, id),
        QueryCondition::Field { key, value, .. } => metadata_value(&entry.metadata, key)
            .and_then(|m| m.value.as_ref())
            .and_then(FieldOrError::ok)
            .is_some_and(|found| values_equal(found, value)),
    }
}

fn references_link(entry: &InstanceEntry, id: &str) -> bool {
    if entry.header.explicit_link.as_ref().and_then(|l| l.ok()).map(String::as_str) == Some(id) {
        return true;
    }
    entry.metadata.iter().any(|m| {
        m.value
            .as_ref()
            .and_then(FieldOrError::ok)
            .is_some_and(|value| value_references_link(value, id))
    })
}

fn value_references_link(value: &ValueContent, id: &str) -> bool {
    match value {
        ValueContent::Link { id: found, .. } => found == id,
        ValueContent::Array { elements, .. } => elements
            .iter()
            .filter_map(FieldOrError::ok)
            .any(|element| value_references_link(element, id)),
        _ => false,
    }
}

/// Structural value equality, ignoring source locations.
pub(crate) fn values_equal(a: &ValueContent, b: &ValueContent) -> bool {
    match (a, b) {
        (ValueContent::Quoted { value: a, .. }, ValueContent::Quoted { value: b, .. }) => a == b,
        (ValueContent::Link { id: a, .. }, ValueContent::Link { id: b, .. }) => a == b,
        (ValueContent::Datetime { value: a, .. }, ValueContent::Datetime { value: b, .. }) => {
            a == b
        }
        (ValueContent::Number { value: a, .. }, ValueContent::Number { value: b, .. }) => a == b,
        (
            ValueContent::DateRange { start: a_start, end: a_end, .. },
            ValueContent::DateRange { start: b_start, end: b_end, .. },
        ) => a_start == b_start && a_end == b_end,
        (ValueContent::Query(a), ValueContent::Query(b)) => {
            // Entity selectors compare by name; conditions rarely appear in
            // field positions, so equality falls back to their keys.
            a.entity == b.entity && a.conditions.len() == b.conditions.len()
        }
        (ValueContent::Array { elements: a, .. }, ValueContent::Array { elements: b, .. }) => {
            a.len() == b.len()
                && a.iter().zip(b).all(|(x, y)| match (x.ok(), y.ok()) {
                    (Some(x), Some(y)) => values_equal(x, y),
                    _ => false,
                })
        }
        _ => false,
    }
}
