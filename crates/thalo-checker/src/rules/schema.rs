//! Schema rules: definition uniqueness, alteration ordering, declaration
//! consistency.

use crate::context::{CheckContext, EntryContext};
use crate::diagnostic::{Draft, Reporter};
use crate::rules::value_matches_type;
use crate::visitor::RuleVisitor;
use rustc_hash::FxHashSet;
use thalo_ast::{FieldOrError, SchemaDirective, SchemaEntry};

/// `duplicate-entity-definition`: all define-entity entries for an already
/// defined name are reported, including the winner.
#[derive(Default)]
pub(crate) struct DuplicateEntityDefinitionRule;

impl DuplicateEntityDefinitionRule {
    pub(crate) fn boxed() -> Box<dyn RuleVisitor> {
        Box::new(Self)
    }
}

impl RuleVisitor for DuplicateEntityDefinitionRule {
    fn after_check(&mut self, ctx: &CheckContext<'_>, out: &mut Reporter) {
        for name in ctx.index.defined_entity_names() {
            let Some(defines) = ctx.index.define_entities_by_name.get(name) else { continue };
            if defines.len() < 2 {
                continue;
            }
            for define in defines {
                out.report(Draft::new(
                    define.file,
                    define.analyzed.source_map,
                    define.entry.header.entity_name.location(),
                    format!("entity `{name}` has {} definitions", defines.len()),
                ));
            }
        }
    }
}

/// `alter-undefined-entity`: alterations of never-defined entities.
#[derive(Default)]
pub(crate) struct AlterUndefinedEntityRule;

impl AlterUndefinedEntityRule {
    pub(crate) fn boxed() -> Box<dyn RuleVisitor> {
        Box::new(Self)
    }
}

impl RuleVisitor for AlterUndefinedEntityRule {
    fn after_check(&mut self, ctx: &CheckContext<'_>, out: &mut Reporter) {
        for name in ctx.index.altered_entity_names() {
            if ctx.index.define_entities_by_name.contains_key(name) {
                continue;
            }
            let Some(alters) = ctx.index.alter_entities_by_name.get(name) else { continue };
            for alter in alters {
                out.report(Draft::new(
                    alter.file,
                    alter.analyzed.source_map,
                    alter.entry.header.entity_name.location(),
                    format!("alter-entity names `{name}`, which is never defined"),
                ));
            }
        }
    }
}

/// `alter-before-define`: an alteration timestamped before the earliest
/// definition of its entity.
#[derive(Default)]
pub(crate) struct AlterBeforeDefineRule;

impl AlterBeforeDefineRule {
    pub(crate) fn boxed() -> Box<dyn RuleVisitor> {
        Box::new(Self)
    }
}

impl RuleVisitor for AlterBeforeDefineRule {
    fn after_check(&mut self, ctx: &CheckContext<'_>, out: &mut Reporter) {
        for name in ctx.index.altered_entity_names() {
            let Some(defines) = ctx.index.define_entities_by_name.get(name) else { continue };
            let Some(defined_at) = defines
                .iter()
                .filter_map(|d| d.entry.header.timestamp.ok())
                .map(|t| t.canonical())
                .min()
            else {
                continue;
            };
            let Some(alters) = ctx.index.alter_entities_by_name.get(name) else { continue };
            for alter in alters {
                let Some(altered_at) = alter.entry.header.timestamp.ok() else { continue };
                if altered_at.canonical() < defined_at {
                    out.report(Draft::new(
                        alter.file,
                        alter.analyzed.source_map,
                        alter.entry.header.timestamp.location(),
                        format!(
                            "alteration at {} predates the definition of `{name}` at {}",
                            altered_at.canonical(),
                            defined_at,
                        ),
                    ));
                }
            }
        }
    }
}

/// `duplicate-field-in-schema`: the same field declared twice in one entry.
#[derive(Default)]
pub(crate) struct DuplicateFieldInSchemaRule;

impl DuplicateFieldInSchemaRule {
    pub(crate) fn boxed() -> Box<dyn RuleVisitor> {
        Box::new(Self)
    }
}

impl RuleVisitor for DuplicateFieldInSchemaRule {
    fn visit_schema_entry(
        &mut self,
        entry: &SchemaEntry,
        ctx: &EntryContext<'_>,
        out: &mut Reporter,
    ) {
        let Some(block) = &entry.metadata_block else { return };
        let mut seen = FxHashSet::default();
        for field in &block.fields {
            if !seen.insert(field.name.as_str()) {
                out.report(ctx.draft(
                    field.name_location,
                    format!("field `{}` is declared twice in this entry", field.name),
                ));
            }
        }
    }
}

/// `duplicate-section-in-schema`: the same section declared twice.
#[derive(Default)]
pub(crate) struct DuplicateSectionInSchemaRule;

impl DuplicateSectionInSchemaRule {
    pub(crate) fn boxed() -> Box<dyn RuleVisitor> {
        Box::new(Self)
    }
}

impl RuleVisitor for DuplicateSectionInSchemaRule {
    fn visit_schema_entry(
        &mut self,
        entry: &SchemaEntry,
        ctx: &EntryContext<'_>,
        out: &mut Reporter,
    ) {
        let Some(block) = &entry.sections_block else { return };
        let mut seen = FxHashSet::default();
        for section in &block.sections {
            if !seen.insert(section.name.as_str()) {
                out.report(ctx.draft(
                    section.name_location,
                    format!("section `{}` is declared twice in this entry", section.name),
                ));
            }
        }
    }
}

/// `remove-undefined-field`: a removal naming a field the schema does not
/// have at the alteration's point in time.
#[derive(Default)]
pub(crate) struct RemoveUndefinedFieldRule;

impl RemoveUndefinedFieldRule {
    pub(crate) fn boxed() -> Box<dyn RuleVisitor> {
        Box::new(Self)
    }
}

impl RuleVisitor for RemoveUndefinedFieldRule {
    fn visit_schema_entry(
        &mut self,
        entry: &SchemaEntry,
        ctx: &EntryContext<'_>,
        out: &mut Reporter,
    ) {
        let Some(block) = &entry.remove_metadata_block else { return };
        let Some(snapshot) = schema_before_alter(entry, ctx) else { return };
        for name in &block.names {
            // Additions in this same alter apply before removals.
            let added_here = entry
                .metadata_block
                .as_ref()
                .is_some_and(|b| b.fields.iter().any(|f| f.name == name.name));
            if !added_here && snapshot.field(&name.name).is_none() {
                out.report(ctx.draft(
                    name.location,
                    format!("`{}` is not a field of `{}` at this point", name.name, snapshot.name),
                ));
            }
        }
    }
}

/// `remove-undefined-section`: the section analogue.
#[derive(Default)]
pub(crate) struct RemoveUndefinedSectionRule;

impl RemoveUndefinedSectionRule {
    pub(crate) fn boxed() -> Box<dyn RuleVisitor> {
        Box::new(Self)
    }
}

impl RuleVisitor for RemoveUndefinedSectionRule {
    fn visit_schema_entry(
        &mut self,
        entry: &SchemaEntry,
        ctx: &EntryContext<'_>,
        out: &mut Reporter,
    ) {
        let Some(block) = &entry.remove_sections_block else { return };
        let Some(snapshot) = schema_before_alter(entry, ctx) else { return };
        for name in &block.names {
            let added_here = entry
                .sections_block
                .as_ref()
                .is_some_and(|b| b.sections.iter().any(|s| s.name == name.name));
            if !added_here && snapshot.section(&name.name).is_none() {
                out.report(ctx.draft(
                    name.location,
                    format!(
                        "`{}` is not a section of `{}` at this point",
                        name.name, snapshot.name,
                    ),
                ));
            }
        }
    }
}

/// The effective schema as it stood before this alteration; `None` when the
/// entry is not a usable alter (other rules own those reports).
fn schema_before_alter(
    entry: &SchemaEntry,
    ctx: &EntryContext<'_>,
) -> Option<thalo_workspace_index::EntitySchema> {
    if entry.header.directive.ok() != Some(&SchemaDirective::AlterEntity) {
        return None;
    }
    let name = entry.header.entity_name.ok()?;
    let timestamp = entry.header.timestamp.ok()?;
    ctx.schemas.get_before(name, &timestamp.canonical())
}

/// `invalid-default-value`: a declared default that its own type rejects.
#[derive(Default)]
pub(crate) struct InvalidDefaultValueRule;

impl InvalidDefaultValueRule {
    pub(crate) fn boxed() -> Box<dyn RuleVisitor> {
        Box::new(Self)
    }
}

impl RuleVisitor for InvalidDefaultValueRule {
    fn visit_schema_entry(
        &mut self,
        entry: &SchemaEntry,
        ctx: &EntryContext<'_>,
        out: &mut Reporter,
    ) {
        let Some(block) = &entry.metadata_block else { return };
        for field in &block.fields {
            let (Some(ty), Some(default)) = (
                field.ty.ok(),
                field.default_value.as_ref().and_then(FieldOrError::ok),
            ) else {
                continue;
            };
            if !value_matches_type(default, ty) {
                out.report(ctx.draft(
                    default.location(),
                    format!(
                        "default {} does not match `{}`'s type {}",
                        default.describe(),
                        field.name,
                        ty,
                    ),
                ));
            }
        }
    }
}
