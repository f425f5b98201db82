//! Synthesis and actualization rules.

use crate::context::EntryContext;
use crate::diagnostic::Reporter;
use crate::rules::queries_in;
use crate::visitor::RuleVisitor;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;
use thalo_ast::{
    ActualizeEntry, FieldOrError, SynthesisEntry, Timestamp, ValueContent, metadata_value,
};

/// `checkpoint: "git:<hex>"` — short or full commit hashes.
static GIT_CHECKPOINT: Lazy<Regex> = Lazy::new(|| {
    match Regex::new(r"^git:[0-9a-f]{7,40}$") {
        Ok(re) => re,
        Err(_) => unreachable!("static checkpoint pattern must compile"),
    }
});

/// `synthesis-missing-sources`: the `sources` key must be present.
#[derive(Default)]
pub(crate) struct SynthesisMissingSourcesRule;

impl SynthesisMissingSourcesRule {
    pub(crate) fn boxed() -> Box<dyn RuleVisitor> {
        Box::new(Self)
    }
}

impl RuleVisitor for SynthesisMissingSourcesRule {
    fn visit_synthesis_entry(
        &mut self,
        entry: &SynthesisEntry,
        ctx: &EntryContext<'_>,
        out: &mut Reporter,
    ) {
        if metadata_value(&entry.metadata, "sources").is_none() {
            out.report(ctx.draft(
                entry.header.location,
                "synthesis declares no `sources` query",
            ));
        }
    }
}

/// `synthesis-missing-prompt`: a non-empty `Prompt` section is required.
#[derive(Default)]
pub(crate) struct SynthesisMissingPromptRule;

impl SynthesisMissingPromptRule {
    pub(crate) fn boxed() -> Box<dyn RuleVisitor> {
        Box::new(Self)
    }
}

impl RuleVisitor for SynthesisMissingPromptRule {
    fn visit_synthesis_entry(
        &mut self,
        entry: &SynthesisEntry,
        ctx: &EntryContext<'_>,
        out: &mut Reporter,
    ) {
        let has_prompt = entry.sections().iter().any(|section| {
            section.name == "Prompt"
                && section.paragraphs.iter().any(|p| match p {
                    thalo_ast::ContentNode::Paragraph { text, .. } => !text.is_empty(),
                    thalo_ast::ContentNode::Heading { .. } => false,
                })
        });
        if !has_prompt {
            out.report(ctx.draft(
                entry.header.location,
                "synthesis has no non-empty `# Prompt` section",
            ));
        }
    }
}

/// `synthesis-empty-query`: `sources` present but holding no usable query.
#[derive(Default)]
pub(crate) struct SynthesisEmptyQueryRule;

impl SynthesisEmptyQueryRule {
    pub(crate) fn boxed() -> Box<dyn RuleVisitor> {
        Box::new(Self)
    }
}

impl RuleVisitor for SynthesisEmptyQueryRule {
    fn visit_synthesis_entry(
        &mut self,
        entry: &SynthesisEntry,
        ctx: &EntryContext<'_>,
        out: &mut Reporter,
    ) {
        let Some(sources) = metadata_value(&entry.metadata, "sources") else { return };
        let queries = sources
            .value
            .as_ref()
            .and_then(FieldOrError::ok)
            .map(queries_in)
            .unwrap_or_default();
        if queries.is_empty() {
            let location = sources
                .value
                .as_ref()
                .map(|v| v.location())
                .unwrap_or(sources.key_location);
            out.report(ctx.draft(location, "`sources` contains no usable query"));
        }
    }
}

/// `synthesis-unknown-query-entity`: source queries over undefined entities.
#[derive(Default)]
pub(crate) struct SynthesisUnknownQueryEntityRule;

impl SynthesisUnknownQueryEntityRule {
    pub(crate) fn boxed() -> Box<dyn RuleVisitor> {
        Box::new(Self)
    }
}

impl RuleVisitor for SynthesisUnknownQueryEntityRule {
    fn visit_synthesis_entry(
        &mut self,
        entry: &SynthesisEntry,
        ctx: &EntryContext<'_>,
        out: &mut Reporter,
    ) {
        let Some(sources) = metadata_value(&entry.metadata, "sources") else { return };
        let Some(value) = sources.value.as_ref().and_then(FieldOrError::ok) else { return };
        for query in queries_in(value) {
            if !ctx.schemas.has(&query.entity) {
                out.report(ctx.draft(
                    query.entity_location,
                    format!("query names unknown entity `{}`", query.entity),
                ));
            }
        }
    }
}

/// `actualize-unresolved-target`: the target `^id` must be defined.
#[derive(Default)]
pub(crate) struct ActualizeUnresolvedTargetRule;

impl ActualizeUnresolvedTargetRule {
    pub(crate) fn boxed() -> Box<dyn RuleVisitor> {
        Box::new(Self)
    }
}

impl RuleVisitor for ActualizeUnresolvedTargetRule {
    fn visit_actualize_entry(
        &mut self,
        entry: &ActualizeEntry,
        ctx: &EntryContext<'_>,
        out: &mut Reporter,
    ) {
        let Some(id) = entry.header.target.ok() else { return };
        if ctx.links.definitions(id).is_empty() {
            out.report(ctx.draft(
                entry.header.target.location(),
                format!("actualize target `^{id}` is not defined anywhere"),
            ));
        }
    }
}

/// `actualize-missing-updated`: a `checkpoint` of the form `ts:<timestamp>`
/// or `git:<hash>` is required, recording what state the synthesis output
/// reflects.
#[derive(Default)]
pub(crate) struct ActualizeMissingUpdatedRule;

impl ActualizeMissingUpdatedRule {
    pub(crate) fn boxed() -> Box<dyn RuleVisitor> {
        Box::new(Self)
    }
}

impl RuleVisitor for ActualizeMissingUpdatedRule {
    fn visit_actualize_entry(
        &mut self,
        entry: &ActualizeEntry,
        ctx: &EntryContext<'_>,
        out: &mut Reporter,
    ) {
        let suggested = entry
            .header
            .timestamp
            .ok()
            .map(|t| format!("ts:{}", t.canonical()));
        let suggestion = suggested
            .as_deref()
            .map(|s| format!("; add `checkpoint: \"{s}\"`"))
            .unwrap_or_default();

        let Some(checkpoint) = metadata_value(&entry.metadata, "checkpoint") else {
            out.report(
                ctx.draft(
                    entry.header.location,
                    format!("actualize-synthesis has no `checkpoint`{suggestion}"),
                )
                .with_data(json!({ "suggested": suggested })),
            );
            return;
        };
        let valid = matches!(
            checkpoint.value.as_ref().and_then(FieldOrError::ok),
            Some(ValueContent::Quoted { value, .. }) if checkpoint_is_valid(value)
        );
        if !valid {
            out.report(
                ctx.draft(
                    checkpoint.location,
                    format!(
                        "`checkpoint` must be `ts:<timestamp>` or `git:<hash>`{suggestion}"
                    ),
                )
                .with_data(json!({ "suggested": suggested })),
            );
        }
    }
}

fn checkpoint_is_valid(value: &str) -> bool {
    if let Some(timestamp) = value.strip_prefix("ts:") {
        return Timestamp::parse(timestamp).is_some();
    }
    GIT_CHECKPOINT.is_match(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkpoint_syntax() {
        assert!(checkpoint_is_valid("ts:2026-01-07T12:00Z"));
        assert!(checkpoint_is_valid("ts:2026-01-07T12:00+02:00"));
        assert!(checkpoint_is_valid("git:0123abc"));
        assert!(checkpoint_is_valid("git:0123456789abcdef0123456789abcdef01234567"));
        assert!(!checkpoint_is_valid("ts:2026-01-07"));
        assert!(!checkpoint_is_valid("git:XYZ"));
        assert!(!checkpoint_is_valid("2026-01-07T12:00Z"));
    }
}
