//! Checker configuration: per-rule severity overrides.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thalo_diagnostics_codes::{RuleCode, Severity};

/// Per-rule severities. Missing entries use each rule's default; `off`
/// disables a rule entirely. Keys are the stable kebab-case code strings, so
/// configurations survive in JSON untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckConfig {
    #[serde(default)]
    pub rules: FxHashMap<String, Severity>,
}

impl CheckConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `{"rules": {"unknown-field": "off", ...}}`. Unknown rule codes
    /// are retained but never consulted.
    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Sets one rule's severity.
    pub fn set(&mut self, code: RuleCode, severity: Severity) -> &mut Self {
        self.rules.insert(code.as_str().to_string(), severity);
        self
    }

    /// The severity a rule runs at under this configuration.
    pub fn effective(&self, code: RuleCode) -> Severity {
        self.rules.get(code.as_str()).copied().unwrap_or_else(|| code.default_severity())
    }
}
