//! Content rules, plus the syntax-error surfacing rule.

use crate::context::EntryContext;
use crate::diagnostic::Reporter;
use crate::visitor::RuleVisitor;
use rustc_hash::FxHashSet;
use serde_json::json;
use thalo_ast::{
    ActualizeEntry, ContentNode, Entry, FieldOrError, InstanceEntry, SchemaEntry, SectionView,
    SynthesisEntry, SyntaxError, ValueContent,
};

/// `syntax-error`: every structured parse error embedded in an entry.
#[derive(Default)]
pub(crate) struct SyntaxErrorRule;

impl SyntaxErrorRule {
    pub(crate) fn boxed() -> Box<dyn RuleVisitor> {
        Box::new(Self)
    }

    fn emit(&self, ctx: &EntryContext<'_>, out: &mut Reporter) {
        for error in collect_syntax_errors(&ctx.analyzed.entry) {
            out.report(
                ctx.draft(error.location, error.message.clone())
                    .with_data(json!({ "code": error.code })),
            );
        }
    }
}

impl RuleVisitor for SyntaxErrorRule {
    fn visit_instance_entry(
        &mut self,
        _entry: &InstanceEntry,
        ctx: &EntryContext<'_>,
        out: &mut Reporter,
    ) {
        self.emit(ctx, out);
    }

    fn visit_schema_entry(
        &mut self,
        _entry: &SchemaEntry,
        ctx: &EntryContext<'_>,
        out: &mut Reporter,
    ) {
        self.emit(ctx, out);
    }

    fn visit_synthesis_entry(
        &mut self,
        _entry: &SynthesisEntry,
        ctx: &EntryContext<'_>,
        out: &mut Reporter,
    ) {
        self.emit(ctx, out);
    }

    fn visit_actualize_entry(
        &mut self,
        _entry: &ActualizeEntry,
        ctx: &EntryContext<'_>,
        out: &mut Reporter,
    ) {
        self.emit(ctx, out);
    }
}

/// Walks every `FieldOrError` slot of an entry.
fn collect_syntax_errors(entry: &Entry) -> Vec<&SyntaxError> {
    let mut errors = Vec::new();
    match entry {
        Entry::Instance(e) => {
            collect_field(&e.header.timestamp, &mut errors);
            collect_field(&e.header.directive, &mut errors);
            collect_field(&e.header.entity, &mut errors);
            if let Some(title) = &e.header.title {
                collect_field(title, &mut errors);
            }
            if let Some(link) = &e.header.explicit_link {
                collect_field(link, &mut errors);
            }
            collect_metadata(&e.metadata, &mut errors);
        }
        Entry::Schema(e) => {
            collect_field(&e.header.timestamp, &mut errors);
            collect_field(&e.header.directive, &mut errors);
            collect_field(&e.header.entity_name, &mut errors);
            if let Some(title) = &e.header.title {
                collect_field(title, &mut errors);
            }
            if let Some(link) = &e.header.explicit_link {
                collect_field(link, &mut errors);
            }
            if let Some(block) = &e.metadata_block {
                for field in &block.fields {
                    collect_field(&field.ty, &mut errors);
                    if let Some(default) = &field.default_value {
                        collect_field(default, &mut errors);
                    }
                }
            }
        }
        Entry::Synthesis(e) => {
            collect_field(&e.header.timestamp, &mut errors);
            collect_field(&e.header.title, &mut errors);
            collect_field(&e.header.link_id, &mut errors);
            collect_metadata(&e.metadata, &mut errors);
        }
        Entry::Actualize(e) => {
            collect_field(&e.header.timestamp, &mut errors);
            collect_field(&e.header.target, &mut errors);
            collect_metadata(&e.metadata, &mut errors);
        }
    }
    errors
}

fn collect_field<'a, T>(field: &'a FieldOrError<T>, errors: &mut Vec<&'a SyntaxError>) {
    if let Some(error) = field.err() {
        errors.push(error);
    }
}

fn collect_metadata<'a>(
    metadata: &'a [thalo_ast::MetadataEntry],
    errors: &mut Vec<&'a SyntaxError>,
) {
    for entry in metadata {
        if let Some(value) = &entry.value {
            collect_field(value, errors);
            if let Some(content) = value.ok() {
                collect_value(content, errors);
            }
        }
    }
}

fn collect_value<'a>(value: &'a ValueContent, errors: &mut Vec<&'a SyntaxError>) {
    if let ValueContent::Array { elements, .. } = value {
        for element in elements {
            collect_field(element, errors);
            if let Some(content) = element.ok() {
                collect_value(content, errors);
            }
        }
    }
}

/// `duplicate-section-heading`: the same heading twice in one entry.
#[derive(Default)]
pub(crate) struct DuplicateSectionHeadingRule;

impl DuplicateSectionHeadingRule {
    pub(crate) fn boxed() -> Box<dyn RuleVisitor> {
        Box::new(Self)
    }

    fn check(&self, sections: &[SectionView<'_>], ctx: &EntryContext<'_>, out: &mut Reporter) {
        let mut seen = FxHashSet::default();
        for section in sections {
            if !seen.insert(section.name) {
                out.report(ctx.draft(
                    section.location,
                    format!("section `{}` appears more than once", section.name),
                ));
            }
        }
    }
}

impl RuleVisitor for DuplicateSectionHeadingRule {
    fn visit_instance_entry(
        &mut self,
        entry: &InstanceEntry,
        ctx: &EntryContext<'_>,
        out: &mut Reporter,
    ) {
        self.check(&entry.sections(), ctx, out);
    }

    fn visit_synthesis_entry(
        &mut self,
        entry: &SynthesisEntry,
        ctx: &EntryContext<'_>,
        out: &mut Reporter,
    ) {
        self.check(&entry.sections(), ctx, out);
    }
}

/// `empty-section`: a heading with no paragraphs under it.
#[derive(Default)]
pub(crate) struct EmptySectionRule;

impl EmptySectionRule {
    pub(crate) fn boxed() -> Box<dyn RuleVisitor> {
        Box::new(Self)
    }

    fn check(&self, sections: &[SectionView<'_>], ctx: &EntryContext<'_>, out: &mut Reporter) {
        for section in sections {
            let has_text = section.paragraphs.iter().any(|p| match p {
                ContentNode::Paragraph { text, .. } => !text.is_empty(),
                ContentNode::Heading { .. } => false,
            });
            if !has_text {
                out.report(ctx.draft(
                    section.location,
                    format!("section `{}` has no content", section.name),
                ));
            }
        }
    }
}

impl RuleVisitor for EmptySectionRule {
    fn visit_instance_entry(
        &mut self,
        entry: &InstanceEntry,
        ctx: &EntryContext<'_>,
        out: &mut Reporter,
    ) {
        self.check(&entry.sections(), ctx, out);
    }

    fn visit_synthesis_entry(
        &mut self,
        entry: &SynthesisEntry,
        ctx: &EntryContext<'_>,
        out: &mut Reporter,
    ) {
        self.check(&entry.sections(), ctx, out);
    }
}
