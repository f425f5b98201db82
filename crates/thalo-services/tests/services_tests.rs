//! Service integration: queries, navigation, semantic tokens, trackers.

use pretty_assertions::assert_eq;
use thalo_ast::{Location, Query, QueryCondition, Timestamp, ValueContent};
use thalo_cancel::CancelToken;
use thalo_services::{
    ChangeTracker, GitClient, GitTracker, Marker, QueryOptions, TimestampTracker, TrackerError,
    TrackerKind, execute_query, find_definition, find_references, legend, semantic_tokens,
};
use thalo_workspace_index::{AddDocumentOptions, Workspace};

fn lore_query(conditions: Vec<QueryCondition>) -> Query {
    Query {
        entity: "lore".to_string(),
        entity_location: Location::default(),
        conditions,
        location: Location::default(),
    }
}

fn sample_workspace() -> Workspace {
    let mut workspace = Workspace::new();
    workspace.add_document(
        "2026-01-05T18:00Z create lore \"A\" ^a #core\n  subject: ^s1\n\n2026-01-03T09:00Z create lore \"B\" ^b\n  subject: ^s2\n\n2026-01-04T11:00Z create note \"N\"\n",
        AddDocumentOptions::new("entries.thalo"),
    );
    workspace
}

#[test]
fn queries_filter_by_entity_and_sort_by_timestamp() {
    let workspace = sample_workspace();
    let result = execute_query(
        &workspace,
        &lore_query(vec![]),
        &QueryOptions::default(),
        &CancelToken::new(),
    );
    assert!(!result.cancelled);
    let titles: Vec<Option<&str>> = result
        .hits
        .iter()
        .map(|h| h.entry.header.title.as_ref().and_then(|t| t.ok()).map(String::as_str))
        .collect();
    // B (Jan 3) before A (Jan 5); the `note` entry is out.
    assert_eq!(titles, vec![Some("B"), Some("A")]);
}

#[test]
fn tag_conditions_are_case_sensitive() {
    let workspace = sample_workspace();
    let tagged = execute_query(
        &workspace,
        &lore_query(vec![QueryCondition::Tag {
            name: "core".to_string(),
            location: Location::default(),
        }]),
        &QueryOptions::default(),
        &CancelToken::new(),
    );
    assert_eq!(tagged.hits.len(), 1);

    let wrong_case = execute_query(
        &workspace,
        &lore_query(vec![QueryCondition::Tag {
            name: "Core".to_string(),
            location: Location::default(),
        }]),
        &QueryOptions::default(),
        &CancelToken::new(),
    );
    assert!(wrong_case.hits.is_empty());
}

#[test]
fn field_conditions_compare_structurally() {
    let workspace = sample_workspace();
    let result = execute_query(
        &workspace,
        &lore_query(vec![QueryCondition::Field {
            key: "subject".to_string(),
            key_location: Location::default(),
            value: Box::new(ValueContent::Link {
                id: "s1".to_string(),
                location: Location::default(),
            }),
            location: Location::default(),
        }]),
        &QueryOptions::default(),
        &CancelToken::new(),
    );
    assert_eq!(result.hits.len(), 1);
    assert_eq!(
        result.hits[0].entry.header.title.as_ref().and_then(|t| t.ok()).map(String::as_str),
        Some("A"),
    );
}

#[test]
fn after_timestamp_is_strict() {
    let workspace = sample_workspace();
    let after = Timestamp::parse("2026-01-03T09:00Z");
    let result = execute_query(
        &workspace,
        &lore_query(vec![]),
        &QueryOptions { after_timestamp: after },
        &CancelToken::new(),
    );
    // B sits exactly at the marker and is excluded.
    assert_eq!(result.hits.len(), 1);
}

#[test]
fn definitions_resolve_across_files() {
    let mut workspace = Workspace::new();
    workspace.add_document(
        "2026-01-05T18:00Z create lore \"A\" ^a\n",
        AddDocumentOptions::new("a.thalo"),
    );
    workspace.add_document(
        "2026-01-06T09:00Z create lore \"B\"\n  subject: ^a\n",
        AddDocumentOptions::new("b.thalo"),
    );

    // Offset of the `^a` reference inside b.thalo.
    let source = workspace.get_document("b.thalo").map(|d| d.source().to_string());
    let offset = source.as_deref().and_then(|s| s.find("^a")).map(|o| o + 1);
    let definition = offset.and_then(|o| find_definition(&workspace, "b.thalo", o));
    assert_eq!(definition.map(|d| d.file), Some("a.thalo".to_string()));

    let refs = find_references(&workspace, "a");
    assert!(refs.definition.is_some());
    assert_eq!(refs.references.len(), 1);
    assert_eq!(refs.references[0].metadata_key.as_deref(), Some("subject"));
}

#[test]
fn semantic_tokens_delta_encode_in_order() {
    let mut workspace = Workspace::new();
    workspace.add_document(
        "2026-01-05T18:00Z create lore \"A\" ^a\n  subject: ^s\n",
        AddDocumentOptions::new("entries.thalo"),
    );
    let tokens = semantic_tokens(&workspace, "entries.thalo").unwrap_or_default();
    let lg = legend();
    assert_eq!(lg.token_types.len(), 10);
    assert_eq!(lg.modifiers.len(), 3);

    // First token: the timestamp at 0:0, length 17, type `number`.
    assert_eq!(tokens[0], [0, 0, 17, 9, 0]);
    // Second token: `create` 18 columns in, type `keyword`.
    assert_eq!(tokens[1], [0, 18, 6, 6, 0]);
    // The header link carries declaration|definition modifiers.
    let link = tokens.iter().find(|t| t[3] == 8).copied().unwrap_or_default();
    assert_eq!(link[4], 0b11);
    // Deltas never run backwards: every delta_line is non-negative by type,
    // and same-line tokens advance.
    for window in tokens.windows(2) {
        if window[1][0] == 0 {
            assert!(window[1][1] > 0);
        }
    }
}

#[test]
fn timestamp_tracker_reports_entries_after_the_marker() {
    let workspace = sample_workspace();
    let tracker = TimestampTracker::new();
    assert_eq!(tracker.kind(), TrackerKind::Ts);

    let marker = Marker { kind: TrackerKind::Ts, value: "2026-01-04T00:00Z".to_string() };
    let hits = tracker
        .changed_entries(&workspace, &[lore_query(vec![])], Some(&marker))
        .unwrap_or_default();
    // Only A (Jan 5) is after the marker.
    assert_eq!(hits.len(), 1);

    // A git marker fed to the ts tracker degrades to "everything".
    let alien = Marker { kind: TrackerKind::Git, value: "abc1234".to_string() };
    let hits = tracker
        .changed_entries(&workspace, &[lore_query(vec![])], Some(&alien))
        .unwrap_or_default();
    assert_eq!(hits.len(), 2);
}

/// A scripted git collaborator for tracker tests.
struct FakeGit {
    head: String,
    uncommitted: Vec<String>,
    changed: Vec<String>,
    old_content: Option<String>,
}

impl GitClient for FakeGit {
    fn is_repository(&self) -> bool {
        true
    }

    fn head_commit(&self) -> Result<String, TrackerError> {
        Ok(self.head.clone())
    }

    fn uncommitted_files(&self) -> Result<Vec<String>, TrackerError> {
        Ok(self.uncommitted.clone())
    }

    fn changed_files_since(
        &self,
        _commit: &str,
        _ignore_revs: &[String],
    ) -> Result<Vec<String>, TrackerError> {
        Ok(self.changed.clone())
    }

    fn file_at(&self, _commit: &str, _path: &str) -> Result<Option<String>, TrackerError> {
        Ok(self.old_content.clone())
    }

    fn ignore_revs(&self) -> Result<Vec<String>, TrackerError> {
        Ok(Vec::new())
    }
}

#[test]
fn git_tracker_refuses_uncommitted_changes_unless_forced() {
    let workspace = sample_workspace();
    let client = FakeGit {
        head: "deadbee".to_string(),
        uncommitted: vec!["entries.thalo".to_string()],
        changed: vec![],
        old_content: None,
    };
    let tracker = GitTracker::new(client);
    let marker = Marker { kind: TrackerKind::Git, value: "0123abc".to_string() };
    match tracker.changed_entries(&workspace, &[lore_query(vec![])], Some(&marker)) {
        Err(TrackerError::UncommittedChanges { files }) => {
            assert_eq!(files, vec!["entries.thalo".to_string()]);
        }
        other => assert!(other.is_err(), "expected UncommittedChanges"),
    }

    let forced = GitTracker::forced(FakeGit {
        head: "deadbee".to_string(),
        uncommitted: vec!["entries.thalo".to_string()],
        changed: vec![],
        old_content: None,
    });
    assert!(
        forced
            .changed_entries(&workspace, &[lore_query(vec![])], Some(&marker))
            .is_ok()
    );
}

#[test]
fn git_tracker_diffs_per_entry_content() {
    let workspace = sample_workspace();
    // The historical revision had entry B with different metadata; A is
    // unchanged relative to it, and the note entry never matched the query.
    let old = "2026-01-05T18:00Z create lore \"A\" ^a #core\n  subject: ^s1\n\n2026-01-03T09:00Z create lore \"B\" ^b\n  subject: ^OLD\n";
    let client = FakeGit {
        head: "deadbee".to_string(),
        uncommitted: vec![],
        changed: vec!["entries.thalo".to_string()],
        old_content: Some(old.to_string()),
    };
    let tracker = GitTracker::new(client);
    let marker = Marker { kind: TrackerKind::Git, value: "0123abc".to_string() };
    let hits = tracker
        .changed_entries(&workspace, &[lore_query(vec![])], Some(&marker))
        .unwrap_or_default();
    assert_eq!(hits.len(), 1);
    assert_eq!(
        hits[0].entry.header.title.as_ref().and_then(|t| t.ok()).map(String::as_str),
        Some("B"),
    );
}

#[test]
fn git_tracker_treats_foreign_markers_as_migration() {
    let workspace = sample_workspace();
    let client = FakeGit {
        head: "deadbee".to_string(),
        uncommitted: vec![],
        changed: vec![],
        old_content: None,
    };
    let tracker = GitTracker::new(client);
    let marker = Marker { kind: TrackerKind::Ts, value: "2026-01-04T00:00Z".to_string() };
    let hits = tracker
        .changed_entries(&workspace, &[lore_query(vec![])], Some(&marker))
        .unwrap_or_default();
    assert_eq!(hits.len(), 2);
}
