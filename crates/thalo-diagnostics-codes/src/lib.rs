//! Stable diagnostic codes and severity levels for the thalo checker.
//!
//! These codes are the public contract between the engine, configuration
//! files, and editors: they appear verbatim in `CheckConfig.rules` keys and
//! in emitted diagnostics, so variants are added but never renamed.
//!
//! # Categories
//!
//! | Category | Concern |
//! |----------|---------|
//! | instance | entries against their schemas and each other |
//! | link     | `^id` definitions and references |
//! | schema   | `define-entity` / `alter-entity` consistency |
//! | metadata | key/value lines |
//! | content  | sections and paragraphs |
//!
//! # Example
//!
//! ```
//! use thalo_diagnostics_codes::{RuleCode, Severity};
//!
//! let code = RuleCode::UnknownEntity;
//! assert_eq!(code.as_str(), "unknown-entity");
//! assert_eq!(code.default_severity(), Severity::Error);
//! assert_eq!(RuleCode::parse("unknown-entity"), Some(code));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a diagnostic, or `Off` to disable its rule entirely.
///
/// Maps to LSP DiagnosticSeverity values (1=Error, 2=Warning, 3=Info).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Critical problem; the source does not mean what it says.
    Error,
    /// Suspicious but usable.
    Warning,
    /// Informational note.
    Info,
    /// The rule is skipped entirely.
    Off,
}

impl Severity {
    /// The LSP numeric value; `None` for `Off`.
    pub fn to_lsp_value(self) -> Option<u8> {
        match self {
            Severity::Error => Some(1),
            Severity::Warning => Some(2),
            Severity::Info => Some(3),
            Severity::Off => None,
        }
    }

    /// Parses the configuration string form.
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "error" => Some(Severity::Error),
            "warning" => Some(Severity::Warning),
            "info" => Some(Severity::Info),
            "off" => Some(Severity::Off),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
            Severity::Off => write!(f, "off"),
        }
    }
}

/// The rule taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleCategory {
    Instance,
    Link,
    Schema,
    Metadata,
    Content,
}

impl RuleCategory {
    pub const fn as_str(self) -> &'static str {
        match self {
            RuleCategory::Instance => "instance",
            RuleCategory::Link => "link",
            RuleCategory::Schema => "schema",
            RuleCategory::Metadata => "metadata",
            RuleCategory::Content => "content",
        }
    }
}

/// How much of the workspace a rule needs to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleScope {
    /// A single entry at a time.
    Entry,
    /// All entries of one document.
    Document,
    /// Cross-document data via the workspace index.
    Workspace,
}

macro_rules! rule_codes {
    ($( $variant:ident => $code:literal, $category:ident, $severity:ident, $scope:ident; )+) => {
        /// Stable identifiers for every checker rule.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "kebab-case")]
        pub enum RuleCode {
            $( $variant, )+
        }

        impl RuleCode {
            /// Every code, in registration (and therefore emission) order.
            pub const ALL: &'static [RuleCode] = &[ $( RuleCode::$variant, )+ ];

            /// The stable kebab-case string form.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $( RuleCode::$variant => $code, )+
                }
            }

            /// Parses the string form back to a code.
            pub fn parse(text: &str) -> Option<Self> {
                match text {
                    $( $code => Some(RuleCode::$variant), )+
                    _ => None,
                }
            }

            /// The rule's category.
            pub const fn category(self) -> RuleCategory {
                match self {
                    $( RuleCode::$variant => RuleCategory::$category, )+
                }
            }

            /// Severity applied when the configuration does not override it.
            pub const fn default_severity(self) -> Severity {
                match self {
                    $( RuleCode::$variant => Severity::$severity, )+
                }
            }

            /// The widest data the rule reads.
            pub const fn scope(self) -> RuleScope {
                match self {
                    $( RuleCode::$variant => RuleScope::$scope, )+
                }
            }
        }
    };
}

rule_codes! {
    SyntaxError => "syntax-error", Content, Error, Entry;
    UnknownEntity => "unknown-entity", Instance, Error, Entry;
    MissingRequiredField => "missing-required-field", Instance, Error, Entry;
    UnknownField => "unknown-field", Instance, Warning, Entry;
    InvalidFieldType => "invalid-field-type", Instance, Error, Entry;
    MissingRequiredSection => "missing-required-section", Instance, Error, Entry;
    UnknownSection => "unknown-section", Instance, Warning, Entry;
    CreateRequiresSection => "create-requires-section", Instance, Error, Entry;
    UpdateWithoutCreate => "update-without-create", Instance, Warning, Workspace;
    TimestampOutOfOrder => "timestamp-out-of-order", Instance, Warning, Document;
    DuplicateTimestamp => "duplicate-timestamp", Instance, Error, Document;
    MissingTitle => "missing-title", Instance, Warning, Entry;
    UnresolvedLink => "unresolved-link", Link, Warning, Workspace;
    DuplicateLinkId => "duplicate-link-id", Link, Error, Workspace;
    DuplicateEntityDefinition => "duplicate-entity-definition", Schema, Error, Workspace;
    AlterUndefinedEntity => "alter-undefined-entity", Schema, Error, Workspace;
    AlterBeforeDefine => "alter-before-define", Schema, Error, Workspace;
    DuplicateFieldInSchema => "duplicate-field-in-schema", Schema, Error, Entry;
    DuplicateSectionInSchema => "duplicate-section-in-schema", Schema, Error, Entry;
    RemoveUndefinedField => "remove-undefined-field", Schema, Warning, Workspace;
    RemoveUndefinedSection => "remove-undefined-section", Schema, Warning, Workspace;
    InvalidDefaultValue => "invalid-default-value", Schema, Error, Entry;
    DuplicateMetadataKey => "duplicate-metadata-key", Metadata, Warning, Entry;
    EmptyRequiredValue => "empty-required-value", Metadata, Error, Entry;
    InvalidDateRangeValue => "invalid-date-range-value", Metadata, Error, Entry;
    DuplicateSectionHeading => "duplicate-section-heading", Content, Warning, Entry;
    EmptySection => "empty-section", Content, Warning, Entry;
    SynthesisMissingSources => "synthesis-missing-sources", Instance, Error, Entry;
    SynthesisMissingPrompt => "synthesis-missing-prompt", Instance, Error, Entry;
    SynthesisEmptyQuery => "synthesis-empty-query", Instance, Error, Entry;
    SynthesisUnknownQueryEntity => "synthesis-unknown-query-entity", Instance, Error, Entry;
    ActualizeUnresolvedTarget => "actualize-unresolved-target", Link, Error, Workspace;
    ActualizeMissingUpdated => "actualize-missing-updated", Metadata, Error, Entry;
}

impl fmt::Display for RuleCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
