//! Link rules: cross-document reference resolution and definition
//! uniqueness. Both run in `after_check` over the workspace link index,
//! whose locations are already file-absolute.

use crate::context::CheckContext;
use crate::diagnostic::{Draft, Reporter};
use crate::visitor::RuleVisitor;
use thalo_position_tracking::SourceMap;

/// `unresolved-link`: a reference with no definition anywhere.
#[derive(Default)]
pub(crate) struct UnresolvedLinkRule;

impl UnresolvedLinkRule {
    pub(crate) fn boxed() -> Box<dyn RuleVisitor> {
        Box::new(Self)
    }
}

/// `^self` always resolves: it names the entry that carries it.
const SELF_LINK: &str = "self";

impl RuleVisitor for UnresolvedLinkRule {
    fn after_check(&mut self, ctx: &CheckContext<'_>, out: &mut Reporter) {
        let links = ctx.links();
        for reference in links.all_references() {
            if reference.link_id == SELF_LINK {
                continue;
            }
            if links.definitions(&reference.link_id).is_empty() {
                out.report(Draft::new(
                    reference.file.clone(),
                    SourceMap::identity(),
                    reference.location,
                    format!("`^{}` does not resolve to any definition", reference.link_id),
                ));
            }
        }
    }
}

/// `duplicate-link-id`: more than one explicit definition of an id.
#[derive(Default)]
pub(crate) struct DuplicateLinkIdRule;

impl DuplicateLinkIdRule {
    pub(crate) fn boxed() -> Box<dyn RuleVisitor> {
        Box::new(Self)
    }
}

impl RuleVisitor for DuplicateLinkIdRule {
    fn after_check(&mut self, ctx: &CheckContext<'_>, out: &mut Reporter) {
        let links = ctx.links();
        for id in links.defined_ids() {
            let definitions = links.definitions(id);
            if definitions.len() < 2 {
                continue;
            }
            for definition in definitions {
                out.report(Draft::new(
                    definition.file.clone(),
                    SourceMap::identity(),
                    definition.location,
                    format!(
                        "`^{id}` is defined {} times across the workspace",
                        definitions.len(),
                    ),
                ));
            }
        }
    }
}
