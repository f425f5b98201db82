//! The `check` / `check_document` entry points.

use crate::config::CheckConfig;
use crate::diagnostic::{Diagnostic, Reporter};
use crate::rules::ALL_RULES;
use crate::visitor::{ActiveRule, run_visitors, run_visitors_on_model};
use thalo_cancel::CancelToken;
use thalo_diagnostics_codes::{RuleScope, Severity};
use thalo_workspace_index::{Workspace, WorkspaceError, WorkspaceIndex};

/// The outcome of a check run. A cancelled run carries the diagnostics
/// gathered before the cancellation point.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckReport {
    pub diagnostics: Vec<Diagnostic>,
    pub cancelled: bool,
}

/// Runs every enabled rule over the whole workspace.
pub fn check(workspace: &Workspace, config: &CheckConfig, cancel: &CancelToken) -> CheckReport {
    let mut rules = active_rules(config, None);
    let index = WorkspaceIndex::build(workspace);
    let mut reporter = Reporter::new();
    let cancelled = run_visitors(&mut rules, workspace, &index, &mut reporter, cancel);
    CheckReport { diagnostics: reporter.finish(), cancelled }
}

/// Runs entry- and document-scoped rules over a single document.
/// Workspace-scoped rules need the full pass and are skipped here.
pub fn check_document(
    workspace: &Workspace,
    path: &str,
    config: &CheckConfig,
    cancel: &CancelToken,
) -> Result<CheckReport, WorkspaceError> {
    let model = workspace
        .get_model(path)
        .ok_or_else(|| WorkspaceError::DocumentNotFound { path: path.to_string() })?;
    let mut rules = active_rules(config, Some(&[RuleScope::Entry, RuleScope::Document]));
    let mut reporter = Reporter::new();
    let cancelled = run_visitors_on_model(&mut rules, workspace, model, &mut reporter, cancel);
    Ok(CheckReport { diagnostics: reporter.finish(), cancelled })
}

/// Instantiates the rules the configuration leaves enabled, optionally
/// filtered to the given scopes. Registration order is preserved.
fn active_rules(config: &CheckConfig, scopes: Option<&[RuleScope]>) -> Vec<ActiveRule> {
    ALL_RULES
        .iter()
        .enumerate()
        .filter_map(|(registration, rule)| {
            let severity = config.effective(rule.code);
            if severity == Severity::Off {
                return None;
            }
            if scopes.is_some_and(|scopes| !scopes.contains(&rule.code.scope())) {
                return None;
            }
            Some(ActiveRule {
                registration,
                code: rule.code,
                severity,
                visitor: (rule.build)(),
            })
        })
        .collect()
}
