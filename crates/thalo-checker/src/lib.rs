//! Rule-based checking for thalo workspaces.
//!
//! A check is one pass: `before_check` hooks, every entry of every model
//! dispatched to every enabled rule, then `after_check` hooks for rules that
//! need whole-workspace visibility via the precomputed [`WorkspaceIndex`].
//! Diagnostics come back ordered by rule registration, stable within a rule,
//! and the checker never fails on malformed input.
//!
//! [`WorkspaceIndex`]: thalo_workspace_index::WorkspaceIndex

mod check;
mod config;
mod context;
mod diagnostic;
mod rules;
mod visitor;

pub use check::{CheckReport, check, check_document};
pub use config::CheckConfig;
pub use context::{CheckContext, EntryContext};
pub use diagnostic::{Diagnostic, Draft, Reporter};
pub use rules::{ALL_RULES, Rule};
pub use visitor::{
    ActiveRule, RuleVisitor, run_visitors, run_visitors_on_entries, run_visitors_on_model,
};

pub use thalo_cancel::CancelToken;
pub use thalo_diagnostics_codes::{RuleCategory, RuleCode, RuleScope, Severity};
