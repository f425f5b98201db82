//! Instance rules: entries against their schemas and against each other.

use crate::context::EntryContext;
use crate::diagnostic::Reporter;
use crate::rules::value_matches_type;
use crate::visitor::RuleVisitor;
use rustc_hash::{FxHashMap, FxHashSet};
use serde_json::json;
use thalo_ast::{
    Entry, EntryKind, FieldOrError, InstanceDirective, InstanceEntry, SchemaDirective,
    SchemaEntry, Timestamp, metadata_value,
};
use thalo_position_tracking::{Location, SourceMap};

/// `unknown-entity`: the instance's entity has no effective schema.
#[derive(Default)]
pub(crate) struct UnknownEntityRule;

impl UnknownEntityRule {
    pub(crate) fn boxed() -> Box<dyn RuleVisitor> {
        Box::new(Self)
    }
}

impl RuleVisitor for UnknownEntityRule {
    fn visit_instance_entry(
        &mut self,
        entry: &InstanceEntry,
        ctx: &EntryContext<'_>,
        out: &mut Reporter,
    ) {
        let Some(entity) = entry.header.entity.ok() else { return };
        if !ctx.schemas.has(entity) {
            out.report(ctx.draft(
                entry.header.entity.location(),
                format!("unknown entity `{entity}`; no define-entity declares it"),
            ));
        }
    }
}

/// `missing-required-field`: required, default-less schema fields must appear.
#[derive(Default)]
pub(crate) struct MissingRequiredFieldRule;

impl MissingRequiredFieldRule {
    pub(crate) fn boxed() -> Box<dyn RuleVisitor> {
        Box::new(Self)
    }
}

impl RuleVisitor for MissingRequiredFieldRule {
    fn visit_instance_entry(
        &mut self,
        entry: &InstanceEntry,
        ctx: &EntryContext<'_>,
        out: &mut Reporter,
    ) {
        let Some(entity) = entry.header.entity.ok() else { return };
        // When the entity itself is unknown, unknown-entity owns the report.
        let Some(schema) = ctx.schemas.get(entity) else { return };
        for field in &schema.fields {
            if field.optional || field.default_value.is_some() {
                continue;
            }
            if metadata_value(&entry.metadata, &field.name).is_none() {
                out.report(
                    ctx.draft(
                        entry.header.location,
                        format!("missing required field `{}`", field.name),
                    )
                    .with_data(json!({ "field": field.name })),
                );
            }
        }
    }
}

/// `unknown-field`: metadata keys the schema does not declare.
#[derive(Default)]
pub(crate) struct UnknownFieldRule;

impl UnknownFieldRule {
    pub(crate) fn boxed() -> Box<dyn RuleVisitor> {
        Box::new(Self)
    }
}

impl RuleVisitor for UnknownFieldRule {
    fn visit_instance_entry(
        &mut self,
        entry: &InstanceEntry,
        ctx: &EntryContext<'_>,
        out: &mut Reporter,
    ) {
        let Some(entity) = entry.header.entity.ok() else { return };
        let Some(schema) = ctx.schemas.get(entity) else { return };
        for metadata in &entry.metadata {
            if schema.field(&metadata.key).is_none() {
                out.report(ctx.draft(
                    metadata.key_location,
                    format!("`{}` is not a field of `{}`", metadata.key, schema.name),
                ));
            }
        }
    }
}

/// `invalid-field-type`: a parsed value incompatible with the declared type.
#[derive(Default)]
pub(crate) struct InvalidFieldTypeRule;

impl InvalidFieldTypeRule {
    pub(crate) fn boxed() -> Box<dyn RuleVisitor> {
        Box::new(Self)
    }
}

impl RuleVisitor for InvalidFieldTypeRule {
    fn visit_instance_entry(
        &mut self,
        entry: &InstanceEntry,
        ctx: &EntryContext<'_>,
        out: &mut Reporter,
    ) {
        let Some(entity) = entry.header.entity.ok() else { return };
        let Some(schema) = ctx.schemas.get(entity) else { return };
        for metadata in &entry.metadata {
            let Some(field) = schema.field(&metadata.key) else { continue };
            // Unparsed values are the syntax-error rule's report; empty
            // values belong to empty-required-value.
            let Some(value) = metadata.value.as_ref().and_then(FieldOrError::ok) else {
                continue;
            };
            if !value_matches_type(value, &field.ty) {
                out.report(ctx.draft(
                    value.location(),
                    format!(
                        "{} is not a valid `{}` value; expected {}",
                        value.describe(),
                        field.name,
                        field.ty,
                    ),
                ));
            }
        }
    }
}

/// `missing-required-section`: required schema sections must appear.
#[derive(Default)]
pub(crate) struct MissingRequiredSectionRule;

impl MissingRequiredSectionRule {
    pub(crate) fn boxed() -> Box<dyn RuleVisitor> {
        Box::new(Self)
    }
}

impl RuleVisitor for MissingRequiredSectionRule {
    fn visit_instance_entry(
        &mut self,
        entry: &InstanceEntry,
        ctx: &EntryContext<'_>,
        out: &mut Reporter,
    ) {
        let Some(entity) = entry.header.entity.ok() else { return };
        let Some(schema) = ctx.schemas.get(entity) else { return };
        let present: FxHashSet<&str> =
            entry.sections().into_iter().map(|s| s.name).collect();
        for section in &schema.sections {
            if !section.optional && !present.contains(section.name.as_str()) {
                out.report(
                    ctx.draft(
                        entry.header.location,
                        format!("missing required section `{}`", section.name),
                    )
                    .with_data(json!({ "section": section.name })),
                );
            }
        }
    }
}

/// `unknown-section`: headings the schema does not declare.
#[derive(Default)]
pub(crate) struct UnknownSectionRule;

impl UnknownSectionRule {
    pub(crate) fn boxed() -> Box<dyn RuleVisitor> {
        Box::new(Self)
    }
}

impl RuleVisitor for UnknownSectionRule {
    fn visit_instance_entry(
        &mut self,
        entry: &InstanceEntry,
        ctx: &EntryContext<'_>,
        out: &mut Reporter,
    ) {
        let Some(entity) = entry.header.entity.ok() else { return };
        let Some(schema) = ctx.schemas.get(entity) else { return };
        for section in entry.sections() {
            if schema.section(section.name).is_none() {
                out.report(ctx.draft(
                    section.location,
                    format!("`{}` is not a section of `{}`", section.name, schema.name),
                ));
            }
        }
    }
}

/// `create-requires-section`: create entries need at least one section.
#[derive(Default)]
pub(crate) struct CreateRequiresSectionRule;

impl CreateRequiresSectionRule {
    pub(crate) fn boxed() -> Box<dyn RuleVisitor> {
        Box::new(Self)
    }
}

impl RuleVisitor for CreateRequiresSectionRule {
    fn visit_instance_entry(
        &mut self,
        entry: &InstanceEntry,
        ctx: &EntryContext<'_>,
        out: &mut Reporter,
    ) {
        if entry.header.directive.ok() != Some(&InstanceDirective::Create) {
            return;
        }
        if entry.sections().is_empty() {
            out.report(ctx.draft(
                entry.header.location,
                "a create entry must carry at least one content section",
            ));
        }
    }
}

/// `update-without-create`: updates must follow a create. With an explicit
/// link the create may live anywhere in the workspace; without one it must
/// precede the update in the same file.
#[derive(Default)]
pub(crate) struct UpdateWithoutCreateRule {
    creates_seen: FxHashSet<(String, String)>,
}

impl UpdateWithoutCreateRule {
    pub(crate) fn boxed() -> Box<dyn RuleVisitor> {
        Box::new(Self::default())
    }
}

impl RuleVisitor for UpdateWithoutCreateRule {
    fn visit_instance_entry(
        &mut self,
        entry: &InstanceEntry,
        ctx: &EntryContext<'_>,
        out: &mut Reporter,
    ) {
        let entity = entry.header.entity.ok().cloned().unwrap_or_default();
        match entry.header.directive.ok() {
            Some(InstanceDirective::Create) => {
                self.creates_seen.insert((ctx.file.to_string(), entity));
            }
            Some(InstanceDirective::Update) => {
                if let Some(link) = entry.header.explicit_link.as_ref() {
                    let Some(id) = link.ok() else { return };
                    let created = ctx
                        .links
                        .definitions(id)
                        .iter()
                        .any(|d| d.entry.kind == EntryKind::Instance);
                    if !created {
                        out.report(ctx.draft(
                            link.location(),
                            format!("update targets `^{id}`, which no create entry defines"),
                        ));
                    }
                } else if !self.creates_seen.contains(&(ctx.file.to_string(), entity.clone())) {
                    out.report(ctx.draft(
                        entry.header.location,
                        format!("update of `{entity}` has no preceding create in this file"),
                    ));
                }
            }
            None => {}
        }
    }
}

/// `timestamp-out-of-order`: warns where a file's timestamps go backwards.
#[derive(Default)]
pub(crate) struct TimestampOutOfOrderRule {
    max_seen: FxHashMap<String, Timestamp>,
}

impl TimestampOutOfOrderRule {
    pub(crate) fn boxed() -> Box<dyn RuleVisitor> {
        Box::new(Self::default())
    }

    fn observe(
        &mut self,
        timestamp: &FieldOrError<Timestamp>,
        ctx: &EntryContext<'_>,
        out: &mut Reporter,
    ) {
        let Some(current) = timestamp.ok().copied() else { return };
        match self.max_seen.get(ctx.file) {
            Some(max) if current < *max => {
                out.report(
                    ctx.draft(
                        timestamp.location(),
                        format!(
                            "timestamp {} is earlier than preceding {}",
                            current.canonical(),
                            max.canonical(),
                        ),
                    )
                    .with_data(json!({
                        "current": current.canonical(),
                        "previous": max.canonical(),
                    })),
                );
            }
            Some(_) => {
                if let Some(max) = self.max_seen.get_mut(ctx.file) {
                    if current > *max {
                        *max = current;
                    }
                }
            }
            None => {
                self.max_seen.insert(ctx.file.to_string(), current);
            }
        }
    }
}

impl RuleVisitor for TimestampOutOfOrderRule {
    fn visit_instance_entry(
        &mut self,
        entry: &InstanceEntry,
        ctx: &EntryContext<'_>,
        out: &mut Reporter,
    ) {
        self.observe(&entry.header.timestamp, ctx, out);
    }

    fn visit_schema_entry(
        &mut self,
        entry: &SchemaEntry,
        ctx: &EntryContext<'_>,
        out: &mut Reporter,
    ) {
        self.observe(&entry.header.timestamp, ctx, out);
    }

    fn visit_synthesis_entry(
        &mut self,
        entry: &thalo_ast::SynthesisEntry,
        ctx: &EntryContext<'_>,
        out: &mut Reporter,
    ) {
        self.observe(&entry.header.timestamp, ctx, out);
    }

    fn visit_actualize_entry(
        &mut self,
        entry: &thalo_ast::ActualizeEntry,
        ctx: &EntryContext<'_>,
        out: &mut Reporter,
    ) {
        self.observe(&entry.header.timestamp, ctx, out);
    }
}

struct TimestampOccurrence {
    file: String,
    source_map: SourceMap,
    location: Location,
    reported: bool,
}

/// `duplicate-timestamp`: same canonical timestamp and kind in one file, for
/// entries without explicit link ids. Both occurrences are reported.
#[derive(Default)]
pub(crate) struct DuplicateTimestampRule {
    seen: FxHashMap<(String, String, EntryKind), TimestampOccurrence>,
}

impl DuplicateTimestampRule {
    pub(crate) fn boxed() -> Box<dyn RuleVisitor> {
        Box::new(Self::default())
    }

    fn observe(&mut self, entry: &Entry, ctx: &EntryContext<'_>, out: &mut Reporter) {
        // Entries with explicit ids are distinct by identity.
        if entry.explicit_link().is_some() {
            return;
        }
        let Some(timestamp) = entry.timestamp() else { return };
        let key = (ctx.file.to_string(), timestamp.canonical(), entry.kind());
        let location = entry.timestamp_field().location();
        let message = format!(
            "duplicate timestamp {} for {} entries in this file",
            timestamp.canonical(),
            entry.kind().as_str(),
        );
        match self.seen.get_mut(&key) {
            Some(first) => {
                if !first.reported {
                    out.report(
                        crate::diagnostic::Draft::new(
                            first.file.clone(),
                            first.source_map,
                            first.location,
                            message.clone(),
                        ),
                    );
                    first.reported = true;
                }
                out.report(ctx.draft(location, message));
            }
            None => {
                self.seen.insert(
                    key,
                    TimestampOccurrence {
                        file: ctx.file.to_string(),
                        source_map: ctx.analyzed.source_map,
                        location,
                        reported: false,
                    },
                );
            }
        }
    }
}

impl RuleVisitor for DuplicateTimestampRule {
    fn visit_instance_entry(
        &mut self,
        _entry: &InstanceEntry,
        ctx: &EntryContext<'_>,
        out: &mut Reporter,
    ) {
        self.observe(&ctx.analyzed.entry, ctx, out);
    }

    fn visit_schema_entry(
        &mut self,
        _entry: &SchemaEntry,
        ctx: &EntryContext<'_>,
        out: &mut Reporter,
    ) {
        self.observe(&ctx.analyzed.entry, ctx, out);
    }

    fn visit_synthesis_entry(
        &mut self,
        _entry: &thalo_ast::SynthesisEntry,
        ctx: &EntryContext<'_>,
        out: &mut Reporter,
    ) {
        self.observe(&ctx.analyzed.entry, ctx, out);
    }

    fn visit_actualize_entry(
        &mut self,
        _entry: &thalo_ast::ActualizeEntry,
        ctx: &EntryContext<'_>,
        out: &mut Reporter,
    ) {
        self.observe(&ctx.analyzed.entry, ctx, out);
    }
}

/// `missing-title`: create and define-entity entries should carry a title.
#[derive(Default)]
pub(crate) struct MissingTitleRule;

impl MissingTitleRule {
    pub(crate) fn boxed() -> Box<dyn RuleVisitor> {
        Box::new(Self)
    }
}

impl RuleVisitor for MissingTitleRule {
    fn visit_instance_entry(
        &mut self,
        entry: &InstanceEntry,
        ctx: &EntryContext<'_>,
        out: &mut Reporter,
    ) {
        if entry.header.directive.ok() == Some(&InstanceDirective::Create)
            && entry.header.title.is_none()
        {
            out.report(ctx.draft(entry.header.location, "create entry has no title"));
        }
    }

    fn visit_schema_entry(
        &mut self,
        entry: &SchemaEntry,
        ctx: &EntryContext<'_>,
        out: &mut Reporter,
    ) {
        if entry.header.directive.ok() == Some(&SchemaDirective::DefineEntity)
            && entry.header.title.is_none()
        {
            out.report(ctx.draft(entry.header.location, "define-entity has no title"));
        }
    }
}
