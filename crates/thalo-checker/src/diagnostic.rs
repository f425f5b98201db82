//! Diagnostics and the reporter that collects them.

use serde::Serialize;
use thalo_diagnostics_codes::{RuleCode, Severity};
use thalo_position_tracking::{Location, SourceMap};

/// One finding. Locations are file-absolute; the reporter translated them
/// through the block's source map on emission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub code: RuleCode,
    pub severity: Severity,
    pub message: String,
    pub file: String,
    pub location: Location,
    /// Machine-readable extras, e.g. a suggested fix value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// A diagnostic as a rule states it: block-relative, with the map needed to
/// translate it.
#[derive(Debug, Clone)]
pub struct Draft {
    pub file: String,
    pub source_map: SourceMap,
    pub location: Location,
    pub message: String,
    pub data: Option<serde_json::Value>,
}

impl Draft {
    pub fn new(
        file: impl Into<String>,
        source_map: SourceMap,
        location: Location,
        message: impl Into<String>,
    ) -> Self {
        Self {
            file: file.into(),
            source_map,
            location,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Collects drafts, stamping each with the active rule's code and effective
/// severity and translating its location to file coordinates.
///
/// Rules receive the reporter only for the duration of a call and must not
/// retain it.
#[derive(Debug, Default)]
pub struct Reporter {
    collected: Vec<(usize, Diagnostic)>,
    active: Option<(usize, RuleCode, Severity)>,
}

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `code` the active rule for subsequent reports.
    pub(crate) fn activate(&mut self, registration: usize, code: RuleCode, severity: Severity) {
        self.active = Some((registration, code, severity));
    }

    /// Emits a draft under the active rule.
    pub fn report(&mut self, draft: Draft) {
        let Some((registration, code, severity)) = self.active else {
            return;
        };
        self.collected.push((
            registration,
            Diagnostic {
                code,
                severity,
                message: draft.message,
                file: draft.file,
                location: draft.source_map.to_file_location(draft.location),
                data: draft.data,
            },
        ));
    }

    /// Diagnostics ordered by rule registration, stable within a rule.
    pub fn finish(mut self) -> Vec<Diagnostic> {
        self.collected.sort_by_key(|(registration, _)| *registration);
        self.collected.into_iter().map(|(_, d)| d).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use thalo_position_tracking::{ByteSpan, Position};

    fn loc() -> Location {
        Location::new(ByteSpan::new(2, 5), Position::new(0, 2), Position::new(0, 5))
    }

    #[test]
    fn reports_translate_through_the_source_map() {
        let mut reporter = Reporter::new();
        reporter.activate(0, RuleCode::UnknownEntity, Severity::Error);
        reporter.report(Draft::new("a.md", SourceMap::block(3, 0, 40), loc(), "nope"));
        let diagnostics = reporter.finish();
        assert_eq!(diagnostics[0].location.start_index, 42);
        assert_eq!(diagnostics[0].location.start_position.row, 3);
        assert_eq!(diagnostics[0].code, RuleCode::UnknownEntity);
    }

    #[test]
    fn finish_orders_by_rule_registration() {
        let mut reporter = Reporter::new();
        reporter.activate(1, RuleCode::UnknownField, Severity::Warning);
        reporter.report(Draft::new("a", SourceMap::identity(), loc(), "second"));
        reporter.activate(0, RuleCode::UnknownEntity, Severity::Error);
        reporter.report(Draft::new("a", SourceMap::identity(), loc(), "first"));
        let messages: Vec<String> =
            reporter.finish().into_iter().map(|d| d.message).collect();
        assert_eq!(messages, vec!["first".to_string(), "second".to_string()]);
    }

    #[test]
    fn reports_without_an_active_rule_are_dropped() {
        let mut reporter = Reporter::new();
        reporter.report(Draft::new("a", SourceMap::identity(), loc(), "orphan"));
        assert!(reporter.finish().is_empty());
    }
}
