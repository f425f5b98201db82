//! Three-way merge of thalo files, keyed on entry identity.
//!
//! Entries merge as units: each side is parsed, every entry keyed by
//! `(canonical timestamp, kind, explicit link id)`, and the keys classified
//! against the base. Conflicts are data, not errors; the only failure modes
//! are a side whose entries cannot be keyed (whole-file conflict) and a side
//! that holds the same key twice (typed pre-merge error).

use thalo_ast::{Entry, EntryKey};
use thalo_cancel::CancelToken;
use thalo_position_tracking::{ByteSpan, Location};
use thalo_syntax::NodeKind;
use thiserror::Error;

use serde::Serialize;

/// Which input a message refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MergeSide {
    Base,
    Ours,
    Theirs,
}

impl MergeSide {
    const fn label(self) -> &'static str {
        match self {
            MergeSide::Base => "base",
            MergeSide::Ours => "ours",
            MergeSide::Theirs => "theirs",
        }
    }
}

/// Pre-merge failures. Conflicts are not errors; see [`MergeConflict`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MergeError {
    /// One input holds two entries with identical identity, so the keyed
    /// view is ambiguous (a duplicate-timestamp condition).
    #[error(
        "{side} contains two entries with identity {timestamp}/{kind}",
        side = .side.label(),
        timestamp = .key.timestamp,
        kind = .key.kind.as_str(),
    )]
    DuplicateEntryKey { side: MergeSide, key: EntryKey },
}

/// Why a region conflicted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConflictReason {
    /// Both sides changed the entry, differently.
    BothModified,
    /// One side changed the entry, the other deleted it.
    ModifiedAndDeleted,
    /// Both sides added different entries under one identity.
    BothAdded,
    /// A side could not be keyed at all; the whole file conflicts.
    UnparseableInput,
}

/// One unmerged region, with the location of each side's version inside its
/// own input.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergeConflict {
    pub reason: ConflictReason,
    pub key: Option<EntryKey>,
    pub base: Option<Location>,
    pub ours: Option<Location>,
    pub theirs: Option<Location>,
}

/// Merge accounting, relative to the base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MergeStats {
    pub added: usize,
    pub removed: usize,
    pub modified: usize,
    pub conflicted: usize,
}

/// The merge result. `merged_source` carries git-style conflict markers for
/// every entry in `conflicts`, so it can be handed straight back to a VCS.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub merged_source: String,
    pub conflicts: Vec<MergeConflict>,
    pub stats: MergeStats,
    pub cancelled: bool,
}

/// One keyed entry of one input.
#[derive(Debug, Clone)]
struct KeyedEntry {
    key: EntryKey,
    /// The entry's text, trailing whitespace trimmed.
    text: String,
    location: Location,
    /// Source-order position within its input.
    ordinal: usize,
}

#[derive(Debug)]
struct KeyedSide {
    entries: Vec<KeyedEntry>,
}

impl KeyedSide {
    fn find(&self, key: &EntryKey) -> Option<&KeyedEntry> {
        self.entries.iter().find(|e| &e.key == key)
    }
}

/// Merges `ours` and `theirs` against their common ancestor `base`.
pub fn merge(
    base: &str,
    ours: &str,
    theirs: &str,
    cancel: &CancelToken,
) -> Result<MergeOutcome, MergeError> {
    let sides = [
        (MergeSide::Base, base),
        (MergeSide::Ours, ours),
        (MergeSide::Theirs, theirs),
    ];
    let mut keyed = Vec::with_capacity(3);
    for (side, source) in sides {
        match key_side(side, source)? {
            Some(entries) => keyed.push(entries),
            // A side that cannot be keyed conflicts as a whole file.
            None => return Ok(whole_file_conflict(base, ours, theirs)),
        }
    }
    let (base_side, ours_side, theirs_side) = match (keyed.pop(), keyed.pop(), keyed.pop()) {
        (Some(t), Some(o), Some(b)) => (b, o, t),
        _ => return Ok(whole_file_conflict(base, ours, theirs)),
    };

    let mut plan = MergePlan::default();
    for key in key_union(&base_side, &ours_side, &theirs_side) {
        if cancel.is_cancelled() {
            return Ok(plan.render(true));
        }
        plan.classify(
            &key,
            base_side.find(&key),
            ours_side.find(&key),
            theirs_side.find(&key),
        );
    }
    Ok(plan.render(false))
}

/// Extracts and keys one side. `None` means the side has structure the keyed
/// view cannot express: stray top-level text or entries without identity.
fn key_side(side: MergeSide, source: &str) -> Result<Option<KeyedSide>, MergeError> {
    let tree = thalo_syntax::parse(source);
    if tree.root.children.iter().any(|c| c.kind == NodeKind::StrayLine) {
        return Ok(None);
    }
    let entries = thalo_parser::extract(&tree, source);
    let mut keyed = Vec::with_capacity(entries.len());
    for (ordinal, entry) in entries.iter().enumerate() {
        let Some(key) = entry.key() else {
            return Ok(None);
        };
        if keyed.iter().any(|e: &KeyedEntry| e.key == key) {
            return Err(MergeError::DuplicateEntryKey { side, key });
        }
        keyed.push(KeyedEntry {
            key,
            text: entry_text(entry, source),
            location: entry.location(),
            ordinal,
        });
    }
    Ok(Some(KeyedSide { entries: keyed }))
}

fn entry_text(entry: &Entry, source: &str) -> String {
    let location = entry.location();
    ByteSpan::new(location.start_index, location.end_index.min(source.len()))
        .try_slice(source)
        .unwrap_or("")
        .trim_end()
        .to_string()
}

/// Union of keys, ordered by canonical timestamp with source order as the
/// tie-break (ours first, then theirs, then base).
fn key_union(base: &KeyedSide, ours: &KeyedSide, theirs: &KeyedSide) -> Vec<EntryKey> {
    let mut keys: Vec<(String, usize, EntryKey)> = Vec::new();
    let mut push = |entry: &KeyedEntry, bias: usize| {
        if keys.iter().any(|(_, _, k)| k == &entry.key) {
            return;
        }
        keys.push((entry.key.timestamp.clone(), entry.ordinal * 3 + bias, entry.key.clone()));
    };
    for entry in &ours.entries {
        push(entry, 0);
    }
    for entry in &theirs.entries {
        push(entry, 1);
    }
    for entry in &base.entries {
        push(entry, 2);
    }
    keys.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
    keys.into_iter().map(|(_, _, k)| k).collect()
}

#[derive(Debug)]
enum MergedItem {
    Text(String),
    Conflict { ours: Option<String>, theirs: Option<String> },
}

#[derive(Debug, Default)]
struct MergePlan {
    items: Vec<MergedItem>,
    conflicts: Vec<MergeConflict>,
    stats: MergeStats,
}

impl MergePlan {
    fn classify(
        &mut self,
        key: &EntryKey,
        base: Option<&KeyedEntry>,
        ours: Option<&KeyedEntry>,
        theirs: Option<&KeyedEntry>,
    ) {
        match (base, ours, theirs) {
            // Present in the ancestor.
            (Some(base), ours, theirs) => {
                let ours_changed = ours.is_none_or(|e| e.text != base.text);
                let theirs_changed = theirs.is_none_or(|e| e.text != base.text);
                match (ours, theirs) {
                    _ if !ours_changed && !theirs_changed => {
                        self.keep(base.text.clone());
                    }
                    (None, None) => self.stats.removed += 1,
                    (Some(ours), Some(theirs)) => {
                        if !ours_changed {
                            self.modified(theirs.text.clone());
                        } else if !theirs_changed {
                            self.modified(ours.text.clone());
                        } else if ours.text == theirs.text {
                            self.modified(ours.text.clone());
                        } else {
                            self.conflict(
                                ConflictReason::BothModified,
                                Some(key.clone()),
                                Some(base),
                                Some(ours),
                                Some(theirs),
                            );
                        }
                    }
                    (Some(ours), None) => {
                        if ours_changed {
                            self.conflict(
                                ConflictReason::ModifiedAndDeleted,
                                Some(key.clone()),
                                Some(base),
                                Some(ours),
                                None,
                            );
                        } else {
                            self.stats.removed += 1;
                        }
                    }
                    (None, Some(theirs)) => {
                        if theirs_changed {
                            self.conflict(
                                ConflictReason::ModifiedAndDeleted,
                                Some(key.clone()),
                                Some(base),
                                None,
                                Some(theirs),
                            );
                        } else {
                            self.stats.removed += 1;
                        }
                    }
                }
            }
            // New on one or both sides.
            (None, Some(ours), Some(theirs)) => {
                if ours.text == theirs.text {
                    self.added(ours.text.clone());
                } else {
                    self.conflict(
                        ConflictReason::BothAdded,
                        Some(key.clone()),
                        None,
                        Some(ours),
                        Some(theirs),
                    );
                }
            }
            (None, Some(ours), None) => self.added(ours.text.clone()),
            (None, None, Some(theirs)) => self.added(theirs.text.clone()),
            (None, None, None) => {}
        }
    }

    fn keep(&mut self, text: String) {
        self.items.push(MergedItem::Text(text));
    }

    fn added(&mut self, text: String) {
        self.stats.added += 1;
        self.items.push(MergedItem::Text(text));
    }

    fn modified(&mut self, text: String) {
        self.stats.modified += 1;
        self.items.push(MergedItem::Text(text));
    }

    fn conflict(
        &mut self,
        reason: ConflictReason,
        key: Option<EntryKey>,
        base: Option<&KeyedEntry>,
        ours: Option<&KeyedEntry>,
        theirs: Option<&KeyedEntry>,
    ) {
        self.stats.conflicted += 1;
        self.conflicts.push(MergeConflict {
            reason,
            key,
            base: base.map(|e| e.location),
            ours: ours.map(|e| e.location),
            theirs: theirs.map(|e| e.location),
        });
        self.items.push(MergedItem::Conflict {
            ours: ours.map(|e| e.text.clone()),
            theirs: theirs.map(|e| e.text.clone()),
        });
    }

    fn render(self, cancelled: bool) -> MergeOutcome {
        let mut pieces: Vec<String> = Vec::with_capacity(self.items.len());
        for item in &self.items {
            match item {
                MergedItem::Text(text) => pieces.push(text.clone()),
                MergedItem::Conflict { ours, theirs } => {
                    pieces.push(render_conflict(ours.as_deref(), theirs.as_deref()));
                }
            }
        }
        let mut merged_source = pieces.join("\n\n");
        if !merged_source.is_empty() {
            merged_source.push('\n');
        }
        MergeOutcome {
            merged_source,
            conflicts: self.conflicts,
            stats: self.stats,
            cancelled,
        }
    }
}

fn render_conflict(ours: Option<&str>, theirs: Option<&str>) -> String {
    let mut out = String::new();
    out.push_str("<<<<<<< ours\n");
    if let Some(text) = ours {
        out.push_str(text);
        out.push('\n');
    }
    out.push_str("=======\n");
    if let Some(text) = theirs {
        out.push_str(text);
        out.push('\n');
    }
    out.push_str(">>>>>>> theirs");
    out
}

fn whole_file_conflict(base: &str, ours: &str, theirs: &str) -> MergeOutcome {
    let whole = |source: &str| {
        let tree = thalo_syntax::parse(source);
        tree.root.location
    };
    MergeOutcome {
        merged_source: format!(
            "{}\n",
            render_conflict(Some(ours.trim_end()), Some(theirs.trim_end())),
        ),
        conflicts: vec![MergeConflict {
            reason: ConflictReason::UnparseableInput,
            key: None,
            base: Some(whole(base)),
            ours: Some(whole(ours)),
            theirs: Some(whole(theirs)),
        }],
        stats: MergeStats { conflicted: 1, ..MergeStats::default() },
        cancelled: false,
    }
}
