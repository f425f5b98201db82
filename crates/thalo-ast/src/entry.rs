//! Top-level entry types: the `Entry` sum and its four shapes.

use crate::{FieldOrError, Timestamp, TypeExpr, ValueContent};
use serde::{Deserialize, Serialize};
use thalo_position_tracking::Location;

/// The four kinds of top-level entry. This is the `entry-kind` component of
/// cross-layer identity and merge keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryKind {
    Instance,
    Schema,
    Synthesis,
    Actualize,
}

impl EntryKind {
    /// Stable name used in messages and merge keys.
    pub const fn as_str(self) -> &'static str {
        match self {
            EntryKind::Instance => "instance",
            EntryKind::Schema => "schema",
            EntryKind::Synthesis => "synthesis",
            EntryKind::Actualize => "actualize",
        }
    }
}

/// `create` or `update`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InstanceDirective {
    Create,
    Update,
}

/// `define-entity` or `alter-entity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SchemaDirective {
    DefineEntity,
    AlterEntity,
}

/// A `#tag` attached to an entry header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub location: Location,
}

/// One `key: value` metadata line. Duplicate keys are retained in order;
/// lookup helpers apply last-occurrence-wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataEntry {
    pub key: String,
    pub key_location: Location,
    /// `None` when the line is `key:` with no value text.
    pub value: Option<FieldOrError<ValueContent>>,
    pub location: Location,
}

/// Content body node: a `# Heading` or a paragraph of text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentNode {
    Heading { name: String, location: Location },
    Paragraph { text: String, location: Location },
}

impl ContentNode {
    /// The node's location.
    pub fn location(&self) -> Location {
        match self {
            ContentNode::Heading { location, .. } | ContentNode::Paragraph { location, .. } => {
                *location
            }
        }
    }
}

/// A named section view over content nodes: a heading plus the paragraphs
/// that follow it, up to the next heading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionView<'a> {
    pub name: &'a str,
    pub location: Location,
    pub paragraphs: Vec<&'a ContentNode>,
}

/// Groups content nodes into named sections. Paragraphs before the first
/// heading belong to no section and are not returned.
pub fn sections(content: &[ContentNode]) -> Vec<SectionView<'_>> {
    let mut result: Vec<SectionView<'_>> = Vec::new();
    for node in content {
        match node {
            ContentNode::Heading { name, location } => {
                result.push(SectionView { name, location: *location, paragraphs: Vec::new() });
            }
            ContentNode::Paragraph { .. } => {
                if let Some(current) = result.last_mut() {
                    current.paragraphs.push(node);
                }
            }
        }
    }
    result
}

/// Last-occurrence-wins metadata lookup.
pub fn metadata_value<'a>(metadata: &'a [MetadataEntry], key: &str) -> Option<&'a MetadataEntry> {
    metadata.iter().rev().find(|entry| entry.key == key)
}

/// Header of a `create` / `update` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceHeader {
    pub timestamp: FieldOrError<Timestamp>,
    pub directive: FieldOrError<InstanceDirective>,
    pub entity: FieldOrError<String>,
    pub title: Option<FieldOrError<String>>,
    pub explicit_link: Option<FieldOrError<String>>,
    pub tags: Vec<Tag>,
    pub location: Location,
}

/// A `create` or `update` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceEntry {
    pub header: InstanceHeader,
    pub metadata: Vec<MetadataEntry>,
    pub content: Vec<ContentNode>,
    pub location: Location,
}

impl InstanceEntry {
    /// Named sections of this entry's content.
    pub fn sections(&self) -> Vec<SectionView<'_>> {
        sections(&self.content)
    }
}

/// One field declaration inside a schema entry's `# Metadata` block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name: String,
    pub name_location: Location,
    pub optional: bool,
    pub ty: FieldOrError<TypeExpr>,
    pub default_value: Option<FieldOrError<ValueContent>>,
    pub description: Option<String>,
    pub location: Location,
}

/// One section declaration inside a schema entry's `# Sections` block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionDecl {
    pub name: String,
    pub name_location: Location,
    pub optional: bool,
    pub description: Option<String>,
    pub location: Location,
}

/// An ordered block of field declarations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDeclBlock {
    pub fields: Vec<FieldDecl>,
    pub location: Location,
}

/// An ordered block of section declarations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionDeclBlock {
    pub sections: Vec<SectionDecl>,
    pub location: Location,
}

/// A referenced name inside a removal block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameRef {
    pub name: String,
    pub location: Location,
}

/// A `# Remove Metadata` / `# Remove Sections` block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameListBlock {
    pub names: Vec<NameRef>,
    pub location: Location,
}

/// Header of a `define-entity` / `alter-entity` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaHeader {
    pub timestamp: FieldOrError<Timestamp>,
    pub directive: FieldOrError<SchemaDirective>,
    pub entity_name: FieldOrError<String>,
    pub title: Option<FieldOrError<String>>,
    pub explicit_link: Option<FieldOrError<String>>,
    pub tags: Vec<Tag>,
    pub location: Location,
}

/// A `define-entity` or `alter-entity` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaEntry {
    pub header: SchemaHeader,
    pub metadata_block: Option<FieldDeclBlock>,
    pub sections_block: Option<SectionDeclBlock>,
    pub remove_metadata_block: Option<NameListBlock>,
    pub remove_sections_block: Option<NameListBlock>,
    pub location: Location,
}

/// Header of a `define-synthesis` entry; title and link are required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisHeader {
    pub timestamp: FieldOrError<Timestamp>,
    pub title: FieldOrError<String>,
    pub link_id: FieldOrError<String>,
    pub tags: Vec<Tag>,
    pub location: Location,
}

/// A `define-synthesis` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisEntry {
    pub header: SynthesisHeader,
    pub metadata: Vec<MetadataEntry>,
    pub content: Vec<ContentNode>,
    pub location: Location,
}

impl SynthesisEntry {
    /// Named sections of this entry's content.
    pub fn sections(&self) -> Vec<SectionView<'_>> {
        sections(&self.content)
    }
}

/// Header of an `actualize-synthesis` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActualizeHeader {
    pub timestamp: FieldOrError<Timestamp>,
    pub target: FieldOrError<String>,
    pub location: Location,
}

/// An `actualize-synthesis` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActualizeEntry {
    pub header: ActualizeHeader,
    pub metadata: Vec<MetadataEntry>,
    pub location: Location,
}

/// A top-level entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Entry {
    Instance(InstanceEntry),
    Schema(SchemaEntry),
    Synthesis(SynthesisEntry),
    Actualize(ActualizeEntry),
}

/// The file-independent part of entry identity:
/// `(canonical timestamp, kind, explicit link id)`.
///
/// Higher layers key on this (plus the file path) instead of object
/// identity, because entries are reconstructed on every re-parse.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryKey {
    pub timestamp: String,
    pub kind: EntryKind,
    pub link_id: Option<String>,
}

impl Entry {
    /// The entry's kind tag.
    pub fn kind(&self) -> EntryKind {
        match self {
            Entry::Instance(_) => EntryKind::Instance,
            Entry::Schema(_) => EntryKind::Schema,
            Entry::Synthesis(_) => EntryKind::Synthesis,
            Entry::Actualize(_) => EntryKind::Actualize,
        }
    }

    /// The entry's full block-relative location.
    pub fn location(&self) -> Location {
        match self {
            Entry::Instance(e) => e.location,
            Entry::Schema(e) => e.location,
            Entry::Synthesis(e) => e.location,
            Entry::Actualize(e) => e.location,
        }
    }

    /// The header line's location.
    pub fn header_location(&self) -> Location {
        match self {
            Entry::Instance(e) => e.header.location,
            Entry::Schema(e) => e.header.location,
            Entry::Synthesis(e) => e.header.location,
            Entry::Actualize(e) => e.header.location,
        }
    }

    /// The parsed timestamp, if the header's timestamp parsed.
    pub fn timestamp(&self) -> Option<&Timestamp> {
        match self {
            Entry::Instance(e) => e.header.timestamp.ok(),
            Entry::Schema(e) => e.header.timestamp.ok(),
            Entry::Synthesis(e) => e.header.timestamp.ok(),
            Entry::Actualize(e) => e.header.timestamp.ok(),
        }
    }

    /// The timestamp field including its location or error.
    pub fn timestamp_field(&self) -> &FieldOrError<Timestamp> {
        match self {
            Entry::Instance(e) => &e.header.timestamp,
            Entry::Schema(e) => &e.header.timestamp,
            Entry::Synthesis(e) => &e.header.timestamp,
            Entry::Actualize(e) => &e.header.timestamp,
        }
    }

    /// The explicit `^id` this entry defines, if present and well-formed.
    /// Actualize targets are references, not definitions.
    pub fn explicit_link(&self) -> Option<&str> {
        match self {
            Entry::Instance(e) => e.header.explicit_link.as_ref().and_then(|l| l.ok()),
            Entry::Schema(e) => e.header.explicit_link.as_ref().and_then(|l| l.ok()),
            Entry::Synthesis(e) => e.header.link_id.ok(),
            Entry::Actualize(_) => None,
        }
        .map(String::as_str)
    }

    /// The entry's metadata lines; empty for schema entries, whose body is
    /// declaration blocks instead.
    pub fn metadata(&self) -> &[MetadataEntry] {
        match self {
            Entry::Instance(e) => &e.metadata,
            Entry::Schema(_) => &[],
            Entry::Synthesis(e) => &e.metadata,
            Entry::Actualize(e) => &e.metadata,
        }
    }

    /// Header tags; actualize entries carry none.
    pub fn tags(&self) -> &[Tag] {
        match self {
            Entry::Instance(e) => &e.header.tags,
            Entry::Schema(e) => &e.header.tags,
            Entry::Synthesis(e) => &e.header.tags,
            Entry::Actualize(_) => &[],
        }
    }

    /// Merge/identity key, available once the timestamp parsed.
    pub fn key(&self) -> Option<EntryKey> {
        Some(EntryKey {
            timestamp: self.timestamp()?.canonical(),
            kind: self.kind(),
            link_id: self.explicit_link().map(str::to_owned),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn heading(name: &str) -> ContentNode {
        ContentNode::Heading { name: name.into(), location: Location::default() }
    }

    fn paragraph(text: &str) -> ContentNode {
        ContentNode::Paragraph { text: text.into(), location: Location::default() }
    }

    #[test]
    fn sections_group_paragraphs_under_headings() {
        let content = vec![
            paragraph("preamble"),
            heading("Content"),
            paragraph("one"),
            paragraph("two"),
            heading("Notes"),
        ];
        let views = sections(&content);
        assert_eq!(views.len(), 2);
        assert_eq!(views[0].name, "Content");
        assert_eq!(views[0].paragraphs.len(), 2);
        assert_eq!(views[1].name, "Notes");
        assert!(views[1].paragraphs.is_empty());
    }

    #[test]
    fn metadata_lookup_is_last_wins() {
        let loc = Location::default();
        let entries = vec![
            MetadataEntry { key: "k".into(), key_location: loc, value: None, location: loc },
            MetadataEntry {
                key: "k".into(),
                key_location: loc,
                value: Some(FieldOrError::value(
                    ValueContent::Number { value: 2.0, location: loc },
                    loc,
                )),
                location: loc,
            },
        ];
        let found = metadata_value(&entries, "k");
        assert!(found.is_some_and(|e| e.value.is_some()));
        assert!(metadata_value(&entries, "missing").is_none());
    }
}
