//! The rule registry and helpers shared across rule categories.

mod content;
mod instance;
mod links;
mod metadata;
mod schema;
mod synthesis;

use crate::visitor::RuleVisitor;
use thalo_ast::{ElementType, FieldOrError, Query, ScalarType, TypeExpr, ValueContent};
use thalo_diagnostics_codes::RuleCode;

/// A registered rule: identity plus a factory for its (possibly stateful)
/// visitor. Category, default severity, and scope live on [`RuleCode`].
pub struct Rule {
    pub code: RuleCode,
    pub name: &'static str,
    pub description: &'static str,
    pub needs_schemas: bool,
    pub needs_links: bool,
    pub build: fn() -> Box<dyn RuleVisitor>,
}

/// Every rule, in registration order. Diagnostic emission follows this order.
pub const ALL_RULES: &[Rule] = &[
    Rule {
        code: RuleCode::SyntaxError,
        name: "Syntax error",
        description: "Surfaces structured syntax errors embedded in partially-parsed entries",
        needs_schemas: false,
        needs_links: false,
        build: content::SyntaxErrorRule::boxed,
    },
    Rule {
        code: RuleCode::UnknownEntity,
        name: "Unknown entity",
        description: "Instance entries must name an entity with a define-entity schema",
        needs_schemas: true,
        needs_links: false,
        build: instance::UnknownEntityRule::boxed,
    },
    Rule {
        code: RuleCode::MissingRequiredField,
        name: "Missing required field",
        description: "Required schema fields without defaults must be present",
        needs_schemas: true,
        needs_links: false,
        build: instance::MissingRequiredFieldRule::boxed,
    },
    Rule {
        code: RuleCode::UnknownField,
        name: "Unknown field",
        description: "Metadata keys must be declared by the entity's schema",
        needs_schemas: true,
        needs_links: false,
        build: instance::UnknownFieldRule::boxed,
    },
    Rule {
        code: RuleCode::InvalidFieldType,
        name: "Invalid field type",
        description: "Metadata values must match their declared field type",
        needs_schemas: true,
        needs_links: false,
        build: instance::InvalidFieldTypeRule::boxed,
    },
    Rule {
        code: RuleCode::MissingRequiredSection,
        name: "Missing required section",
        description: "Required schema sections must appear as content headings",
        needs_schemas: true,
        needs_links: false,
        build: instance::MissingRequiredSectionRule::boxed,
    },
    Rule {
        code: RuleCode::UnknownSection,
        name: "Unknown section",
        description: "Content headings must be declared by the entity's schema",
        needs_schemas: true,
        needs_links: false,
        build: instance::UnknownSectionRule::boxed,
    },
    Rule {
        code: RuleCode::CreateRequiresSection,
        name: "Create requires section",
        description: "A create entry must carry at least one content section",
        needs_schemas: false,
        needs_links: false,
        build: instance::CreateRequiresSectionRule::boxed,
    },
    Rule {
        code: RuleCode::UpdateWithoutCreate,
        name: "Update without create",
        description: "An update must follow a create for the same instance",
        needs_schemas: false,
        needs_links: true,
        build: instance::UpdateWithoutCreateRule::boxed,
    },
    Rule {
        code: RuleCode::TimestampOutOfOrder,
        name: "Timestamp out of order",
        description: "Entries within a file should carry ascending timestamps",
        needs_schemas: false,
        needs_links: false,
        build: instance::TimestampOutOfOrderRule::boxed,
    },
    Rule {
        code: RuleCode::DuplicateTimestamp,
        name: "Duplicate timestamp",
        description: "Entries of one kind in one file must not share a timestamp without link ids",
        needs_schemas: false,
        needs_links: false,
        build: instance::DuplicateTimestampRule::boxed,
    },
    Rule {
        code: RuleCode::MissingTitle,
        name: "Missing title",
        description: "Create and define-entity entries should carry a title",
        needs_schemas: false,
        needs_links: false,
        build: instance::MissingTitleRule::boxed,
    },
    Rule {
        code: RuleCode::UnresolvedLink,
        name: "Unresolved link",
        description: "Link references must resolve to a definition",
        needs_schemas: false,
        needs_links: true,
        build: links::UnresolvedLinkRule::boxed,
    },
    Rule {
        code: RuleCode::DuplicateLinkId,
        name: "Duplicate link id",
        description: "An explicit link id may be defined once workspace-wide",
        needs_schemas: false,
        needs_links: true,
        build: links::DuplicateLinkIdRule::boxed,
    },
    Rule {
        code: RuleCode::DuplicateEntityDefinition,
        name: "Duplicate entity definition",
        description: "An entity may have one define-entity entry",
        needs_schemas: true,
        needs_links: false,
        build: schema::DuplicateEntityDefinitionRule::boxed,
    },
    Rule {
        code: RuleCode::AlterUndefinedEntity,
        name: "Alter undefined entity",
        description: "alter-entity must name a defined entity",
        needs_schemas: true,
        needs_links: false,
        build: schema::AlterUndefinedEntityRule::boxed,
    },
    Rule {
        code: RuleCode::AlterBeforeDefine,
        name: "Alter before define",
        description: "Alterations must not predate the entity's definition",
        needs_schemas: true,
        needs_links: false,
        build: schema::AlterBeforeDefineRule::boxed,
    },
    Rule {
        code: RuleCode::DuplicateFieldInSchema,
        name: "Duplicate field in schema",
        description: "A schema entry must not declare a field twice",
        needs_schemas: false,
        needs_links: false,
        build: schema::DuplicateFieldInSchemaRule::boxed,
    },
    Rule {
        code: RuleCode::DuplicateSectionInSchema,
        name: "Duplicate section in schema",
        description: "A schema entry must not declare a section twice",
        needs_schemas: false,
        needs_links: false,
        build: schema::DuplicateSectionInSchemaRule::boxed,
    },
    Rule {
        code: RuleCode::RemoveUndefinedField,
        name: "Remove undefined field",
        description: "Removals must name fields the schema has at that point",
        needs_schemas: true,
        needs_links: false,
        build: schema::RemoveUndefinedFieldRule::boxed,
    },
    Rule {
        code: RuleCode::RemoveUndefinedSection,
        name: "Remove undefined section",
        description: "Removals must name sections the schema has at that point",
        needs_schemas: true,
        needs_links: false,
        build: schema::RemoveUndefinedSectionRule::boxed,
    },
    Rule {
        code: RuleCode::InvalidDefaultValue,
        name: "Invalid default value",
        description: "A field's default must match its declared type",
        needs_schemas: false,
        needs_links: false,
        build: schema::InvalidDefaultValueRule::boxed,
    },
    Rule {
        code: RuleCode::DuplicateMetadataKey,
        name: "Duplicate metadata key",
        description: "A metadata key should appear once per entry",
        needs_schemas: false,
        needs_links: false,
        build: metadata::DuplicateMetadataKeyRule::boxed,
    },
    Rule {
        code: RuleCode::EmptyRequiredValue,
        name: "Empty required value",
        description: "Required fields must not carry empty values",
        needs_schemas: true,
        needs_links: false,
        build: metadata::EmptyRequiredValueRule::boxed,
    },
    Rule {
        code: RuleCode::InvalidDateRangeValue,
        name: "Invalid date range value",
        description: "Date ranges must not end before they start",
        needs_schemas: false,
        needs_links: false,
        build: metadata::InvalidDateRangeValueRule::boxed,
    },
    Rule {
        code: RuleCode::DuplicateSectionHeading,
        name: "Duplicate section heading",
        description: "A section heading should appear once per entry",
        needs_schemas: false,
        needs_links: false,
        build: content::DuplicateSectionHeadingRule::boxed,
    },
    Rule {
        code: RuleCode::EmptySection,
        name: "Empty section",
        description: "Sections should contain content",
        needs_schemas: false,
        needs_links: false,
        build: content::EmptySectionRule::boxed,
    },
    Rule {
        code: RuleCode::SynthesisMissingSources,
        name: "Synthesis missing sources",
        description: "A synthesis must declare a sources query",
        needs_schemas: false,
        needs_links: false,
        build: synthesis::SynthesisMissingSourcesRule::boxed,
    },
    Rule {
        code: RuleCode::SynthesisMissingPrompt,
        name: "Synthesis missing prompt",
        description: "A synthesis must carry a non-empty Prompt section",
        needs_schemas: false,
        needs_links: false,
        build: synthesis::SynthesisMissingPromptRule::boxed,
    },
    Rule {
        code: RuleCode::SynthesisEmptyQuery,
        name: "Synthesis empty query",
        description: "A sources value must contain at least one usable query",
        needs_schemas: false,
        needs_links: false,
        build: synthesis::SynthesisEmptyQueryRule::boxed,
    },
    Rule {
        code: RuleCode::SynthesisUnknownQueryEntity,
        name: "Synthesis unknown query entity",
        description: "Source queries must name defined entities",
        needs_schemas: true,
        needs_links: false,
        build: synthesis::SynthesisUnknownQueryEntityRule::boxed,
    },
    Rule {
        code: RuleCode::ActualizeUnresolvedTarget,
        name: "Actualize unresolved target",
        description: "actualize-synthesis must target a defined link",
        needs_schemas: false,
        needs_links: true,
        build: synthesis::ActualizeUnresolvedTargetRule::boxed,
    },
    Rule {
        code: RuleCode::ActualizeMissingUpdated,
        name: "Actualize missing checkpoint",
        description: "actualize-synthesis must carry a ts:/git: checkpoint",
        needs_schemas: false,
        needs_links: false,
        build: synthesis::ActualizeMissingUpdatedRule::boxed,
    },
];

/// Whether a parsed value satisfies a declared type.
pub(crate) fn value_matches_type(value: &ValueContent, ty: &TypeExpr) -> bool {
    match ty {
        TypeExpr::Primitive(primitive) => {
            scalar_matches(value, &ScalarType::Primitive(*primitive))
        }
        TypeExpr::Literal(text) => scalar_matches(value, &ScalarType::Literal(text.clone())),
        TypeExpr::Union(members) => members.iter().any(|m| scalar_matches(value, m)),
        TypeExpr::Array(element) => match value {
            ValueContent::Array { elements, .. } => elements.iter().all(|e| {
                e.ok().is_some_and(|v| element_matches(v, element))
            }),
            _ => false,
        },
    }
}

fn element_matches(value: &ValueContent, element: &ElementType) -> bool {
    match element {
        ElementType::Scalar(scalar) => scalar_matches(value, scalar),
        ElementType::Union(members) => members.iter().any(|m| scalar_matches(value, m)),
    }
}

fn scalar_matches(value: &ValueContent, scalar: &ScalarType) -> bool {
    use thalo_ast::PrimitiveType as P;
    match scalar {
        ScalarType::Primitive(P::String) => matches!(value, ValueContent::Quoted { .. }),
        ScalarType::Primitive(P::Number) => matches!(value, ValueContent::Number { .. }),
        ScalarType::Primitive(P::Datetime) => matches!(value, ValueContent::Datetime { .. }),
        ScalarType::Primitive(P::Daterange) => matches!(value, ValueContent::DateRange { .. }),
        ScalarType::Primitive(P::Link) => matches!(value, ValueContent::Link { .. }),
        ScalarType::Literal(text) => {
            matches!(value, ValueContent::Quoted { value, .. } if value == text)
        }
    }
}

/// The queries inside a `sources`-style value: a query, or an array of them.
pub(crate) fn queries_in(value: &ValueContent) -> Vec<&Query> {
    match value {
        ValueContent::Query(query) => vec![query],
        ValueContent::Array { elements, .. } => elements
            .iter()
            .filter_map(FieldOrError::ok)
            .flat_map(queries_in)
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thalo_ast::{Location, PrimitiveType};

    fn quoted(text: &str) -> ValueContent {
        ValueContent::Quoted { value: text.into(), location: Location::default() }
    }

    #[test]
    fn literal_union_membership() {
        let ty = TypeExpr::Union(vec![
            ScalarType::Literal("fact".into()),
            ScalarType::Literal("insight".into()),
        ]);
        assert!(value_matches_type(&quoted("fact"), &ty));
        assert!(!value_matches_type(&quoted("other"), &ty));
    }

    #[test]
    fn arrays_check_every_element() {
        let ty = TypeExpr::Array(ElementType::Scalar(ScalarType::Primitive(
            PrimitiveType::String,
        )));
        let good = ValueContent::Array {
            elements: vec![
                FieldOrError::value(quoted("a"), Location::default()),
                FieldOrError::value(quoted("b"), Location::default()),
            ],
            location: Location::default(),
        };
        let bad = ValueContent::Array {
            elements: vec![FieldOrError::value(
                ValueContent::Number { value: 1.0, location: Location::default() },
                Location::default(),
            )],
            location: Location::default(),
        };
        assert!(value_matches_type(&good, &ty));
        assert!(!value_matches_type(&bad, &ty));
        assert!(!value_matches_type(&quoted("a"), &ty));
    }

    #[test]
    fn registration_covers_every_code() {
        assert_eq!(ALL_RULES.len(), RuleCode::ALL.len());
        for (rule, code) in ALL_RULES.iter().zip(RuleCode::ALL) {
            assert_eq!(rule.code, *code, "registry order must match code order");
        }
    }
}
