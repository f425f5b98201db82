//! Projection of the concrete tree onto the typed AST.
//!
//! Extraction never fails: enum-like positions are validated against their
//! closed sets and mismatches become `SyntaxError` values while sibling
//! fields keep extracting.

mod header;
mod schema;
mod values;

pub use values::unquote;

use header::{
    HeaderShape, actualize_header, header_shape, instance_header, schema_header, synthesis_header,
};
use schema::extract_schema_body;
use thalo_ast::{
    ActualizeEntry, ContentNode, Entry, FieldOrError, InstanceEntry, MetadataEntry, SchemaEntry,
    SynthesisEntry,
};
use thalo_syntax::{NodeKind, SyntaxNode, SyntaxTree, TokenKind};
use values::{TokenCursor, parse_value};

/// Extracts the typed entries of one parsed block.
pub fn extract(tree: &SyntaxTree, source: &str) -> Vec<Entry> {
    tree.entries().filter_map(|node| extract_entry(node, source)).collect()
}

fn extract_entry(entry: &SyntaxNode, source: &str) -> Option<Entry> {
    let header = entry.children.first().filter(|c| c.kind == NodeKind::HeaderLine)?;
    let location = entry.location;
    Some(match header_shape(header, source) {
        HeaderShape::Instance => {
            let (metadata, content) = extract_body(entry, source);
            Entry::Instance(InstanceEntry {
                header: instance_header(header, source),
                metadata,
                content,
                location,
            })
        }
        HeaderShape::Schema => {
            let body = extract_schema_body(entry, source);
            Entry::Schema(SchemaEntry {
                header: schema_header(header, source),
                metadata_block: body.metadata_block,
                sections_block: body.sections_block,
                remove_metadata_block: body.remove_metadata_block,
                remove_sections_block: body.remove_sections_block,
                location,
            })
        }
        HeaderShape::Synthesis => {
            let (metadata, content) = extract_body(entry, source);
            Entry::Synthesis(SynthesisEntry {
                header: synthesis_header(header, source),
                metadata,
                content,
                location,
            })
        }
        HeaderShape::Actualize => {
            let (metadata, _) = extract_body(entry, source);
            Entry::Actualize(ActualizeEntry {
                header: actualize_header(header, source),
                metadata,
                location,
            })
        }
    })
}

/// Metadata lines and content nodes of an instance-shaped body.
fn extract_body(entry: &SyntaxNode, source: &str) -> (Vec<MetadataEntry>, Vec<ContentNode>) {
    let mut metadata = Vec::new();
    let mut content = Vec::new();
    for line in entry.children.iter().skip(1) {
        match line.kind {
            NodeKind::MetadataLine => {
                if let Some(parsed) = extract_metadata_line(line, source) {
                    metadata.push(parsed);
                }
            }
            NodeKind::HeadingLine => {
                let (name, location) = line
                    .tokens
                    .iter()
                    .find(|t| t.kind == TokenKind::HeadingName)
                    .map(|t| (t.text(source).to_string(), t.location))
                    .unwrap_or_else(|| (String::new(), line.location));
                content.push(ContentNode::Heading { name, location });
            }
            NodeKind::TextLine => {
                content.push(ContentNode::Paragraph {
                    text: line_text(line, source).trim().to_string(),
                    location: line.location,
                });
            }
            _ => {}
        }
    }
    (metadata, content)
}

fn extract_metadata_line(line: &SyntaxNode, source: &str) -> Option<MetadataEntry> {
    let mut cur = TokenCursor::new(&line.tokens, source);
    let key_token = cur.take(TokenKind::Word)?;
    cur.take(TokenKind::Question);
    cur.take(TokenKind::Colon)?;
    let value: Option<FieldOrError<_>> = if cur.is_done() { None } else { Some(parse_value(&mut cur)) };
    Some(MetadataEntry {
        key: key_token.text(source).to_string(),
        key_location: key_token.location,
        value,
        location: line.location,
    })
}

fn line_text<'a>(line: &SyntaxNode, source: &'a str) -> &'a str {
    source
        .get(line.location.start_index..line.location.end_index)
        .unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use thalo_ast::{
        InstanceDirective, PrimitiveType, SchemaDirective, TypeExpr, ValueContent,
    };

    fn entries(source: &str) -> Vec<Entry> {
        extract(&thalo_syntax::parse(source), source)
    }

    #[test]
    fn extracts_a_full_instance_entry() {
        let source = "2026-01-05T18:00Z create lore \"E\" ^e1 #core\n  type: \"fact\"\n  subject: ^self\n\n  # Content\n  Hi\n";
        let all = entries(source);
        assert_eq!(all.len(), 1);
        let Entry::Instance(entry) = &all[0] else {
            return assert!(matches!(all[0], Entry::Instance(_)));
        };
        assert_eq!(entry.header.directive.ok(), Some(&InstanceDirective::Create));
        assert_eq!(entry.header.entity.ok().map(String::as_str), Some("lore"));
        assert_eq!(
            entry.header.title.as_ref().and_then(|t| t.ok()).map(String::as_str),
            Some("E"),
        );
        assert_eq!(
            entry.header.explicit_link.as_ref().and_then(|l| l.ok()).map(String::as_str),
            Some("e1"),
        );
        assert_eq!(entry.header.tags.len(), 1);
        assert_eq!(entry.metadata.len(), 2);
        let views = entry.sections();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].name, "Content");
        assert_eq!(views[0].paragraphs.len(), 1);
    }

    #[test]
    fn extracts_schema_declarations() {
        let source = "2026-01-01T00:00Z define-entity lore \"Lore\"\n  # Metadata\n  type: \"fact\" | \"insight\"\n  subject: link\n  note?: string -- free text\n  # Sections\n  Content\n  Notes? -- optional notes\n";
        let all = entries(source);
        let Entry::Schema(entry) = &all[0] else {
            return assert!(matches!(all[0], Entry::Schema(_)));
        };
        assert_eq!(entry.header.directive.ok(), Some(&SchemaDirective::DefineEntity));
        let Some(block) = entry.metadata_block.as_ref() else {
            return assert!(entry.metadata_block.is_some());
        };
        let fields = &block.fields;
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[0].name, "type");
        assert!(matches!(fields[0].ty.ok(), Some(TypeExpr::Union(members)) if members.len() == 2));
        assert_eq!(
            fields[1].ty.ok(),
            Some(&TypeExpr::Primitive(PrimitiveType::Link)),
        );
        assert!(fields[2].optional);
        assert_eq!(fields[2].description.as_deref(), Some("free text"));

        let sections = match entry.sections_block.as_ref() {
            Some(b) => &b.sections,
            None => return assert!(entry.sections_block.is_some()),
        };
        assert_eq!(sections.len(), 2);
        assert!(!sections[0].optional);
        assert!(sections[1].optional);
        assert_eq!(sections[1].description.as_deref(), Some("optional notes"));
    }

    #[test]
    fn extracts_remove_blocks() {
        let source = "2026-02-01T00:00Z alter-entity lore\n  # Remove Metadata\n  note\n  # Remove Sections\n  Notes\n";
        let all = entries(source);
        let Entry::Schema(entry) = &all[0] else {
            return assert!(matches!(all[0], Entry::Schema(_)));
        };
        assert_eq!(
            entry.remove_metadata_block.as_ref().map(|b| b.names[0].name.as_str()),
            Some("note"),
        );
        assert_eq!(
            entry.remove_sections_block.as_ref().map(|b| b.names[0].name.as_str()),
            Some("Notes"),
        );
    }

    #[test]
    fn extracts_synthesis_and_actualize() {
        let source = "2026-01-07T10:00Z define-synthesis \"P\" ^p\n  sources: lore where subject = ^self\n\n  # Prompt\n  x\n\n2026-01-07T12:00Z actualize-synthesis ^p\n  checkpoint: \"ts:2026-01-07T12:00Z\"\n";
        let all = entries(source);
        assert_eq!(all.len(), 2);
        let Entry::Synthesis(synthesis) = &all[0] else {
            return assert!(matches!(all[0], Entry::Synthesis(_)));
        };
        assert_eq!(synthesis.header.title.ok().map(String::as_str), Some("P"));
        assert_eq!(synthesis.header.link_id.ok().map(String::as_str), Some("p"));
        assert!(matches!(
            synthesis.metadata[0].value.as_ref().and_then(|v| v.ok()),
            Some(ValueContent::Query(_)),
        ));

        let Entry::Actualize(actualize) = &all[1] else {
            return assert!(matches!(all[1], Entry::Actualize(_)));
        };
        assert_eq!(actualize.header.target.ok().map(String::as_str), Some("p"));
        assert_eq!(actualize.metadata[0].key, "checkpoint");
    }

    #[test]
    fn unknown_directive_degrades_to_instance_with_error() {
        let all = entries("2026-01-05T18:00Z belabor lore\n");
        let Entry::Instance(entry) = &all[0] else {
            return assert!(matches!(all[0], Entry::Instance(_)));
        };
        assert_eq!(
            entry.header.directive.err().map(|e| e.code.as_str()),
            Some("unknown_directive"),
        );
        assert_eq!(entry.header.entity.ok().map(String::as_str), Some("lore"));
    }

    #[test]
    fn missing_timestamp_is_an_error_field() {
        let all = entries("create lore\n");
        let Entry::Instance(entry) = &all[0] else {
            return assert!(matches!(all[0], Entry::Instance(_)));
        };
        assert_eq!(
            entry.header.timestamp.err().map(|e| e.code.as_str()),
            Some("missing_timestamp"),
        );
        assert_eq!(entry.header.directive.ok(), Some(&InstanceDirective::Create));
    }

    #[test]
    fn duplicate_metadata_keys_are_retained_in_order() {
        let source = "2026-01-05T18:00Z create lore\n  k: 1\n  k: 2\n";
        let all = entries(source);
        let Entry::Instance(entry) = &all[0] else {
            return assert!(matches!(all[0], Entry::Instance(_)));
        };
        assert_eq!(entry.metadata.len(), 2);
        let last = thalo_ast::metadata_value(&entry.metadata, "k");
        assert!(matches!(
            last.and_then(|m| m.value.as_ref()).and_then(|v| v.ok()),
            Some(ValueContent::Number { value, .. }) if *value == 2.0,
        ));
    }

    #[test]
    fn empty_value_is_none() {
        let all = entries("2026-01-05T18:00Z create lore\n  k:\n");
        let Entry::Instance(entry) = &all[0] else {
            return assert!(matches!(all[0], Entry::Instance(_)));
        };
        assert!(entry.metadata[0].value.is_none());
    }

    #[test]
    fn bad_enum_value_stays_present_as_a_query() {
        let all = entries("2026-01-05T18:00Z create lore\n  type: invalid\n");
        let Entry::Instance(entry) = &all[0] else {
            return assert!(matches!(all[0], Entry::Instance(_)));
        };
        assert!(matches!(
            entry.metadata[0].value.as_ref().and_then(|v| v.ok()),
            Some(ValueContent::Query(_)),
        ));
    }
}
