//! Change tracking: which instance entries changed since a marker.
//!
//! Two implementations share one trait: the timestamp tracker compares entry
//! instants against an ISO marker; the git tracker asks an external
//! collaborator which files changed since a commit and diffs per-entry
//! content, keyed the same way the merge driver keys entries.

use rustc_hash::{FxHashMap, FxHashSet};
use thalo_ast::{EntryKey, Query, Timestamp};
use thalo_cancel::CancelToken;
use thalo_workspace_index::Workspace;
use thiserror::Error;

use crate::query::{QueryHit, QueryOptions, execute_queries};

/// Which tracker produced a marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerKind {
    Git,
    Ts,
}

/// An opaque point-in-history: `ts:<ISO minute>` or `git:<commit>` without
/// the prefix; the kind carries the discriminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    pub kind: TrackerKind,
    pub value: String,
}

/// Change-tracker failures. Malformed markers are not errors: an
/// incompatible marker degrades to "everything changed" so callers can
/// migrate between tracker kinds.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackerError {
    #[error("working tree has uncommitted changes in {files:?}")]
    UncommittedChanges { files: Vec<String> },
    #[error("not inside a git repository")]
    NotInGitRepo,
    #[error("git collaborator failed: {0}")]
    Collaborator(String),
    #[error("system clock is before the Unix epoch")]
    ClockSkew,
}

/// A tracker answers "what changed since this marker".
pub trait ChangeTracker {
    fn kind(&self) -> TrackerKind;

    /// The marker a caller should store to resume from the present state.
    fn current_marker(&self) -> Result<Marker, TrackerError>;

    /// Instance entries matching `queries` that changed since `marker`.
    /// A missing or incompatible marker returns all matching entries.
    fn changed_entries<'a>(
        &self,
        workspace: &'a Workspace,
        queries: &[Query],
        marker: Option<&Marker>,
    ) -> Result<Vec<QueryHit<'a>>, TrackerError>;
}

/// Tracks change by entry timestamp: an entry "changed" if its instant is
/// after the marker.
#[derive(Debug, Default)]
pub struct TimestampTracker;

impl TimestampTracker {
    pub fn new() -> Self {
        Self
    }
}

impl ChangeTracker for TimestampTracker {
    fn kind(&self) -> TrackerKind {
        TrackerKind::Ts
    }

    fn current_marker(&self) -> Result<Marker, TrackerError> {
        let elapsed = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_err(|_| TrackerError::ClockSkew)?;
        let now = Timestamp::from_utc_minutes((elapsed.as_secs() / 60) as i64);
        Ok(Marker { kind: TrackerKind::Ts, value: now.canonical() })
    }

    fn changed_entries<'a>(
        &self,
        workspace: &'a Workspace,
        queries: &[Query],
        marker: Option<&Marker>,
    ) -> Result<Vec<QueryHit<'a>>, TrackerError> {
        let after_timestamp = marker
            .filter(|m| m.kind == TrackerKind::Ts)
            .and_then(|m| Timestamp::parse(&m.value));
        let options = QueryOptions { after_timestamp };
        Ok(execute_queries(workspace, queries, &options, &CancelToken::new()).hits)
    }
}

/// The git collaborator interface. The engine never runs git itself; hosts
/// implement this against a subprocess, libgit2, or a test double.
pub trait GitClient {
    fn is_repository(&self) -> bool;

    fn head_commit(&self) -> Result<String, TrackerError>;

    /// Paths with uncommitted modifications.
    fn uncommitted_files(&self) -> Result<Vec<String>, TrackerError>;

    /// Files changed between `commit` and HEAD, excluding changes introduced
    /// solely by `ignore_revs` (the `.git-blame-ignore-revs` contract).
    fn changed_files_since(
        &self,
        commit: &str,
        ignore_revs: &[String],
    ) -> Result<Vec<String>, TrackerError>;

    /// A file's content at a commit; `None` when it did not exist yet.
    fn file_at(&self, commit: &str, path: &str) -> Result<Option<String>, TrackerError>;

    /// Revisions listed in `.git-blame-ignore-revs`.
    fn ignore_revs(&self) -> Result<Vec<String>, TrackerError>;
}

/// Tracks change by git history, diffing per-entry content.
pub struct GitTracker<C> {
    client: C,
    /// Proceed despite uncommitted changes.
    force: bool,
}

impl<C: GitClient> GitTracker<C> {
    pub fn new(client: C) -> Self {
        Self { client, force: false }
    }

    pub fn forced(client: C) -> Self {
        Self { client, force: true }
    }

    /// Keys present in `current` that are absent from `old_source`, or whose
    /// text differs from their counterpart there.
    fn changed_keys(&self, old_source: Option<&str>, current: &FxHashMap<EntryKey, String>) -> FxHashSet<EntryKey> {
        let old: FxHashMap<EntryKey, String> = match old_source {
            Some(source) => keyed_texts(source),
            None => FxHashMap::default(),
        };
        current
            .iter()
            .filter(|(key, text)| old.get(*key) != Some(*text))
            .map(|(key, _)| key.clone())
            .collect()
    }
}

impl<C: GitClient> ChangeTracker for GitTracker<C> {
    fn kind(&self) -> TrackerKind {
        TrackerKind::Git
    }

    fn current_marker(&self) -> Result<Marker, TrackerError> {
        if !self.client.is_repository() {
            return Err(TrackerError::NotInGitRepo);
        }
        Ok(Marker { kind: TrackerKind::Git, value: self.client.head_commit()? })
    }

    fn changed_entries<'a>(
        &self,
        workspace: &'a Workspace,
        queries: &[Query],
        marker: Option<&Marker>,
    ) -> Result<Vec<QueryHit<'a>>, TrackerError> {
        if !self.client.is_repository() {
            return Err(TrackerError::NotInGitRepo);
        }
        let uncommitted = self.client.uncommitted_files()?;
        if !uncommitted.is_empty() && !self.force {
            return Err(TrackerError::UncommittedChanges { files: uncommitted });
        }

        let options = QueryOptions::default();
        let cancel = CancelToken::new();
        let all = execute_queries(workspace, queries, &options, &cancel).hits;

        // No marker, or one from another tracker kind: report everything so
        // callers can migrate.
        let Some(since) = marker.filter(|m| m.kind == TrackerKind::Git) else {
            return Ok(all);
        };

        let ignore = self.client.ignore_revs()?;
        let changed_files = self.client.changed_files_since(&since.value, &ignore)?;

        let mut changed: FxHashMap<String, FxHashSet<EntryKey>> = FxHashMap::default();
        for path in changed_files {
            let Some(document) = workspace.get_document(&path) else { continue };
            let Some(model) = workspace.get_model(&path) else { continue };
            let current: FxHashMap<EntryKey, String> = model
                .entries()
                .iter()
                .filter_map(|analyzed| {
                    let key = analyzed.entry.key()?;
                    let location = analyzed.file_location();
                    let text = document
                        .source()
                        .get(location.start_index..location.end_index.min(document.source().len()))
                        .unwrap_or("")
                        .trim_end()
                        .to_string();
                    Some((key, text))
                })
                .collect();
            let old = self.client.file_at(&since.value, &path)?;
            changed.insert(path, self.changed_keys(old.as_deref(), &current));
        }

        Ok(all
            .into_iter()
            .filter(|hit| {
                changed
                    .get(hit.file)
                    .is_some_and(|keys| hit.entry_key().is_some_and(|k| keys.contains(&k)))
            })
            .collect())
    }
}

impl QueryHit<'_> {
    /// The merge-style identity of the hit's entry.
    pub fn entry_key(&self) -> Option<EntryKey> {
        self.analyzed.entry.key()
    }
}

/// Keys every entry of a historical source revision to its trimmed text.
fn keyed_texts(source: &str) -> FxHashMap<EntryKey, String> {
    let tree = thalo_syntax::parse(source);
    thalo_parser::extract(&tree, source)
        .into_iter()
        .filter_map(|entry| {
            let key = entry.key()?;
            let location = entry.location();
            let text = source
                .get(location.start_index..location.end_index.min(source.len()))
                .unwrap_or("")
                .trim_end()
                .to_string();
            Some((key, text))
        })
        .collect()
}
