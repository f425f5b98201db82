//! The single-pass visitor driver.

use crate::context::{CheckContext, EntryContext};
use crate::diagnostic::Reporter;
use thalo_ast::{ActualizeEntry, Entry, InstanceEntry, SchemaEntry, SynthesisEntry};
use thalo_cancel::CancelToken;
use thalo_diagnostics_codes::{RuleCode, Severity};
use thalo_semantic_analyzer::{AnalyzedEntry, DocumentModel};
use thalo_workspace_index::{Workspace, WorkspaceIndex};

/// A rule's visitor: a record of optional handlers. The driver dispatches to
/// whichever are overridden; the defaults do nothing.
///
/// Rules must not mutate shared state or retain the reporter; whole-workspace
/// visibility comes from `after_check` reading the precomputed index.
pub trait RuleVisitor {
    fn before_check(&mut self, _ctx: &CheckContext<'_>, _out: &mut Reporter) {}

    fn visit_instance_entry(
        &mut self,
        _entry: &InstanceEntry,
        _ctx: &EntryContext<'_>,
        _out: &mut Reporter,
    ) {
    }

    fn visit_schema_entry(
        &mut self,
        _entry: &SchemaEntry,
        _ctx: &EntryContext<'_>,
        _out: &mut Reporter,
    ) {
    }

    fn visit_synthesis_entry(
        &mut self,
        _entry: &SynthesisEntry,
        _ctx: &EntryContext<'_>,
        _out: &mut Reporter,
    ) {
    }

    fn visit_actualize_entry(
        &mut self,
        _entry: &ActualizeEntry,
        _ctx: &EntryContext<'_>,
        _out: &mut Reporter,
    ) {
    }

    fn after_check(&mut self, _ctx: &CheckContext<'_>, _out: &mut Reporter) {}
}

/// One instantiated rule, ready to run at its effective severity.
pub struct ActiveRule {
    pub registration: usize,
    pub code: RuleCode,
    pub severity: Severity,
    pub visitor: Box<dyn RuleVisitor>,
}

/// Full run: `before_check` on all rules, every entry of every model in
/// order, then `after_check` on all rules. Returns true when cancelled;
/// diagnostics gathered so far remain in the reporter.
pub fn run_visitors(
    rules: &mut [ActiveRule],
    workspace: &Workspace,
    index: &WorkspaceIndex<'_>,
    out: &mut Reporter,
    cancel: &CancelToken,
) -> bool {
    let ctx = CheckContext { workspace, index };
    for rule in rules.iter_mut() {
        out.activate(rule.registration, rule.code, rule.severity);
        rule.visitor.before_check(&ctx, out);
    }
    for model in workspace.all_models() {
        if dispatch_model(rules, workspace, model, model.entries(), out, cancel) {
            return true;
        }
    }
    for rule in rules.iter_mut() {
        if cancel.is_cancelled() {
            return true;
        }
        out.activate(rule.registration, rule.code, rule.severity);
        rule.visitor.after_check(&ctx, out);
    }
    false
}

/// Document-scoped run. Skips `before_check` / `after_check`, which need
/// full workspace data.
pub fn run_visitors_on_model(
    rules: &mut [ActiveRule],
    workspace: &Workspace,
    model: &DocumentModel,
    out: &mut Reporter,
    cancel: &CancelToken,
) -> bool {
    dispatch_model(rules, workspace, model, model.entries(), out, cancel)
}

/// Incremental run over a subset of one model's entries. Skips hooks.
pub fn run_visitors_on_entries<'e>(
    rules: &mut [ActiveRule],
    workspace: &Workspace,
    model: &DocumentModel,
    entries: impl IntoIterator<Item = &'e AnalyzedEntry>,
    out: &mut Reporter,
    cancel: &CancelToken,
) -> bool {
    for analyzed in entries {
        if cancel.is_cancelled() {
            return true;
        }
        dispatch_entry(rules, workspace, model, analyzed, out);
    }
    false
}

fn dispatch_model<'e>(
    rules: &mut [ActiveRule],
    workspace: &Workspace,
    model: &DocumentModel,
    entries: impl IntoIterator<Item = &'e AnalyzedEntry>,
    out: &mut Reporter,
    cancel: &CancelToken,
) -> bool {
    for analyzed in entries {
        // Cancellation is probed between entries, never inside one, so a
        // cancelled run still holds only whole-entry results.
        if cancel.is_cancelled() {
            return true;
        }
        dispatch_entry(rules, workspace, model, analyzed, out);
    }
    false
}

fn dispatch_entry(
    rules: &mut [ActiveRule],
    workspace: &Workspace,
    model: &DocumentModel,
    analyzed: &AnalyzedEntry,
    out: &mut Reporter,
) {
    let ctx = EntryContext {
        file: model.path(),
        model,
        analyzed,
        schemas: workspace.schema_registry(),
        links: workspace.link_index(),
    };
    for rule in rules.iter_mut() {
        out.activate(rule.registration, rule.code, rule.severity);
        match &analyzed.entry {
            Entry::Instance(entry) => rule.visitor.visit_instance_entry(entry, &ctx, out),
            Entry::Schema(entry) => rule.visitor.visit_schema_entry(entry, &ctx, out),
            Entry::Synthesis(entry) => rule.visitor.visit_synthesis_entry(entry, &ctx, out),
            Entry::Actualize(entry) => rule.visitor.visit_actualize_entry(entry, &ctx, out),
        }
    }
}
