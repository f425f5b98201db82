//! Metadata rules: key/value line hygiene.

use crate::context::EntryContext;
use crate::diagnostic::Reporter;
use crate::visitor::RuleVisitor;
use rustc_hash::FxHashSet;
use thalo_ast::{
    ActualizeEntry, FieldOrError, InstanceEntry, MetadataEntry, SynthesisEntry, ValueContent,
};

/// `duplicate-metadata-key`: a key repeated within one entry. The extractor
/// retains every occurrence; lookup is last-wins, so earlier lines are dead.
#[derive(Default)]
pub(crate) struct DuplicateMetadataKeyRule;

impl DuplicateMetadataKeyRule {
    pub(crate) fn boxed() -> Box<dyn RuleVisitor> {
        Box::new(Self)
    }

    fn check(&self, metadata: &[MetadataEntry], ctx: &EntryContext<'_>, out: &mut Reporter) {
        let mut seen = FxHashSet::default();
        for entry in metadata {
            if !seen.insert(entry.key.as_str()) {
                out.report(ctx.draft(
                    entry.key_location,
                    format!("`{}` appears more than once; the last value wins", entry.key),
                ));
            }
        }
    }
}

impl RuleVisitor for DuplicateMetadataKeyRule {
    fn visit_instance_entry(
        &mut self,
        entry: &InstanceEntry,
        ctx: &EntryContext<'_>,
        out: &mut Reporter,
    ) {
        self.check(&entry.metadata, ctx, out);
    }

    fn visit_synthesis_entry(
        &mut self,
        entry: &SynthesisEntry,
        ctx: &EntryContext<'_>,
        out: &mut Reporter,
    ) {
        self.check(&entry.metadata, ctx, out);
    }

    fn visit_actualize_entry(
        &mut self,
        entry: &ActualizeEntry,
        ctx: &EntryContext<'_>,
        out: &mut Reporter,
    ) {
        self.check(&entry.metadata, ctx, out);
    }
}

/// `empty-required-value`: a required field present but carrying nothing.
#[derive(Default)]
pub(crate) struct EmptyRequiredValueRule;

impl EmptyRequiredValueRule {
    pub(crate) fn boxed() -> Box<dyn RuleVisitor> {
        Box::new(Self)
    }
}

impl RuleVisitor for EmptyRequiredValueRule {
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
            if field.optional {
                continue;
            }
            let empty = match metadata.value.as_ref() {
                None => true,
                Some(value) => matches!(
                    value.ok(),
                    Some(ValueContent::Quoted { value, .. }) if value.is_empty()
                ),
            };
            if empty {
                out.report(ctx.draft(
                    metadata.key_location,
                    format!("required field `{}` has an empty value", metadata.key),
                ));
            }
        }
    }
}

/// `invalid-date-range-value`: a range that ends before it starts.
#[derive(Default)]
pub(crate) struct InvalidDateRangeValueRule;

impl InvalidDateRangeValueRule {
    pub(crate) fn boxed() -> Box<dyn RuleVisitor> {
        Box::new(Self)
    }

    fn check(&self, metadata: &[MetadataEntry], ctx: &EntryContext<'_>, out: &mut Reporter) {
        for entry in metadata {
            let Some(value) = entry.value.as_ref().and_then(FieldOrError::ok) else { continue };
            check_value(value, ctx, out);
        }
    }
}

fn check_value(value: &ValueContent, ctx: &EntryContext<'_>, out: &mut Reporter) {
    match value {
        ValueContent::DateRange { start, end, location } => {
            if start > end {
                out.report(ctx.draft(
                    *location,
                    format!("date range {start}..{end} ends before it starts"),
                ));
            }
        }
        ValueContent::Array { elements, .. } => {
            for element in elements.iter().filter_map(FieldOrError::ok) {
                check_value(element, ctx, out);
            }
        }
        _ => {}
    }
}

impl RuleVisitor for InvalidDateRangeValueRule {
    fn visit_instance_entry(
        &mut self,
        entry: &InstanceEntry,
        ctx: &EntryContext<'_>,
        out: &mut Reporter,
    ) {
        self.check(&entry.metadata, ctx, out);
    }

    fn visit_synthesis_entry(
        &mut self,
        entry: &SynthesisEntry,
        ctx: &EntryContext<'_>,
        out: &mut Reporter,
    ) {
        self.check(&entry.metadata, ctx, out);
    }

    fn visit_actualize_entry(
        &mut self,
        entry: &ActualizeEntry,
        ctx: &EntryContext<'_>,
        out: &mut Reporter,
    ) {
        self.check(&entry.metadata, ctx, out);
    }
}
