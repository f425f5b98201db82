//! Schema entry bodies: field declarations, section declarations, removals.

use crate::extract::values::{TokenCursor, parse_value, unquote};
use thalo_ast::{
    ElementType, FieldDecl, FieldDeclBlock, FieldOrError, Location, NameListBlock, NameRef,
    PrimitiveType, ScalarType, SectionDecl, SectionDeclBlock, SyntaxError, TypeExpr,
};
use thalo_position_tracking::{ByteSpan, Position};
use thalo_syntax::{NodeKind, SyntaxNode, TokenKind};

/// The four declaration blocks a schema entry may carry.
#[derive(Debug, Default)]
pub struct SchemaBody {
    pub metadata_block: Option<FieldDeclBlock>,
    pub sections_block: Option<SectionDeclBlock>,
    pub remove_metadata_block: Option<NameListBlock>,
    pub remove_sections_block: Option<NameListBlock>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    Metadata,
    Sections,
    RemoveMetadata,
    RemoveSections,
    Unknown,
}

/// Walks a schema entry's body lines, grouping declarations under the
/// `# Metadata` / `# Sections` / `# Remove Metadata` / `# Remove Sections`
/// headings. Repeated headings append to the existing block.
pub fn extract_schema_body(entry: &SyntaxNode, source: &str) -> SchemaBody {
    let mut body = SchemaBody::default();
    let mut current = BlockKind::Unknown;

    for line in entry.children.iter().skip(1) {
        match line.kind {
            NodeKind::HeadingLine => {
                let name = line
                    .tokens
                    .iter()
                    .find(|t| t.kind == TokenKind::HeadingName)
                    .map(|t| t.text(source))
                    .unwrap_or_default();
                current = match name {
                    "Metadata" => BlockKind::Metadata,
                    "Sections" => BlockKind::Sections,
                    "Remove Metadata" => BlockKind::RemoveMetadata,
                    "Remove Sections" => BlockKind::RemoveSections,
                    _ => BlockKind::Unknown,
                };
                extend_block_location(&mut body, current, line.location);
            }
            NodeKind::MetadataLine if current == BlockKind::Metadata => {
                let decl = parse_field_decl(line, source);
                let block = body.metadata_block.get_or_insert_with(|| FieldDeclBlock {
                    fields: Vec::new(),
                    location: line.location,
                });
                block.location = block.location.union(&line.location);
                block.fields.push(decl);
            }
            NodeKind::MetadataLine | NodeKind::TextLine => match current {
                BlockKind::Sections => {
                    if let Some(decl) = parse_section_decl(line, source) {
                        let block = body.sections_block.get_or_insert_with(|| {
                            SectionDeclBlock { sections: Vec::new(), location: line.location }
                        });
                        block.location = block.location.union(&line.location);
                        block.sections.push(decl);
                    }
                }
                BlockKind::RemoveMetadata | BlockKind::RemoveSections => {
                    if let Some(name) = parse_name_ref(line, source) {
                        let slot = if current == BlockKind::RemoveMetadata {
                            &mut body.remove_metadata_block
                        } else {
                            &mut body.remove_sections_block
                        };
                        let block = slot.get_or_insert_with(|| NameListBlock {
                            names: Vec::new(),
                            location: line.location,
                        });
                        block.location = block.location.union(&line.location);
                        block.names.push(name);
                    }
                }
                // Prose outside a known block is ignored.
                _ => {}
            },
            _ => {}
        }
    }
    body
}

fn extend_block_location(body: &mut SchemaBody, kind: BlockKind, location: Location) {
    match kind {
        BlockKind::Metadata => {
            if let Some(block) = body.metadata_block.as_mut() {
                block.location = block.location.union(&location);
            } else {
                body.metadata_block = Some(FieldDeclBlock { fields: Vec::new(), location });
            }
        }
        BlockKind::Sections => {
            if let Some(block) = body.sections_block.as_mut() {
                block.location = block.location.union(&location);
            } else {
                body.sections_block = Some(SectionDeclBlock { sections: Vec::new(), location });
            }
        }
        BlockKind::RemoveMetadata => {
            if let Some(block) = body.remove_metadata_block.as_mut() {
                block.location = block.location.union(&location);
            } else {
                body.remove_metadata_block = Some(NameListBlock { names: Vec::new(), location });
            }
        }
        BlockKind::RemoveSections => {
            if let Some(block) = body.remove_sections_block.as_mut() {
                block.location = block.location.union(&location);
            } else {
                body.remove_sections_block = Some(NameListBlock { names: Vec::new(), location });
            }
        }
        BlockKind::Unknown => {}
    }
}

/// Parses `name ('?')? ':' type-expr ('=' default)? ('--' description)?`.
fn parse_field_decl(line: &SyntaxNode, source: &str) -> FieldDecl {
    let mut cur = TokenCursor::new(&line.tokens, source);
    let (name, name_location) = match cur.take(TokenKind::Word) {
        Some(token) => (token.text(source).to_string(), token.location),
        None => (String::new(), line.location),
    };
    let optional = cur.take(TokenKind::Question).is_some();
    cur.take(TokenKind::Colon);

    let ty = parse_type_expr(&mut cur, line.location);

    let default_value = cur
        .take(TokenKind::Equals)
        .map(|_| parse_value(&mut cur));

    let description = cur.take(TokenKind::DashDash).and_then(|dd| {
        let end = content_end(line, source);
        source
            .get(dd.span.end..end)
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string)
    });

    FieldDecl {
        name,
        name_location,
        optional,
        ty,
        default_value,
        description,
        location: line.location,
    }
}

/// Parses a type expression. Stops before `=` and `--`.
fn parse_type_expr(cur: &mut TokenCursor<'_>, fallback: Location) -> FieldOrError<TypeExpr> {
    // Parenthesized union followed by `[]`: an array of union elements.
    if cur.take(TokenKind::LParen).is_some() {
        let members = match parse_union_members(cur, fallback) {
            Ok(members) => members,
            Err(error) => return FieldOrError::Error(error),
        };
        cur.take(TokenKind::RParen);
        if cur.take(TokenKind::LBracket).is_some() {
            cur.take(TokenKind::RBracket);
        }
        let location = fallback;
        return FieldOrError::value(TypeExpr::Array(ElementType::Union(members)), location);
    }

    let first = match parse_scalar(cur, fallback) {
        Ok(scalar) => scalar,
        Err(error) => return FieldOrError::Error(error),
    };
    let location = fallback;

    // `scalar[]`
    if cur.take(TokenKind::LBracket).is_some() {
        cur.take(TokenKind::RBracket);
        return FieldOrError::value(
            TypeExpr::Array(ElementType::Scalar(first.0)),
            first.1,
        );
    }

    // `scalar | scalar | ...`
    if cur.peek_kind() == Some(TokenKind::Pipe) {
        let mut members = vec![first.0];
        while cur.take(TokenKind::Pipe).is_some() {
            match parse_scalar(cur, fallback) {
                Ok((scalar, _)) => members.push(scalar),
                Err(error) => return FieldOrError::Error(error),
            }
        }
        return FieldOrError::value(TypeExpr::Union(members), location);
    }

    let expr = match first.0 {
        ScalarType::Primitive(p) => TypeExpr::Primitive(p),
        ScalarType::Literal(text) => TypeExpr::Literal(text),
    };
    FieldOrError::value(expr, first.1)
}

fn parse_union_members(
    cur: &mut TokenCursor<'_>,
    fallback: Location,
) -> Result<Vec<ScalarType>, SyntaxError> {
    let mut members = vec![parse_scalar(cur, fallback)?.0];
    while cur.take(TokenKind::Pipe).is_some() {
        members.push(parse_scalar(cur, fallback)?.0);
    }
    Ok(members)
}

fn parse_scalar(
    cur: &mut TokenCursor<'_>,
    fallback: Location,
) -> Result<(ScalarType, Location), SyntaxError> {
    match cur.peek_kind() {
        Some(TokenKind::Word) => {
            let token = match cur.bump() {
                Some(t) => t,
                None => return Err(missing_type(fallback)),
            };
            let text = cur.text(token);
            match PrimitiveType::parse(text) {
                Some(primitive) => Ok((ScalarType::Primitive(primitive), token.location)),
                None => Err(SyntaxError::new(
                    "unknown_type",
                    format!(
                        "`{text}` is not a type; expected string, number, datetime, daterange, \
                         link, or a quoted literal"
                    ),
                    text,
                    token.location,
                )),
            }
        }
        Some(TokenKind::Quoted) => {
            let token = match cur.bump() {
                Some(t) => t,
                None => return Err(missing_type(fallback)),
            };
            Ok((ScalarType::Literal(unquote(cur.text(token))), token.location))
        }
        _ => Err(missing_type(fallback)),
    }
}

fn missing_type(location: Location) -> SyntaxError {
    SyntaxError::new("missing_type", "field declaration is missing its type", "", location)
}

/// Parses `Name ('?')? ('--' description)?` from a raw declaration line.
fn parse_section_decl(line: &SyntaxNode, source: &str) -> Option<SectionDecl> {
    let end = content_end(line, source);
    let raw = source.get(line.location.start_index..end)?;
    let indent = raw.len() - raw.trim_start().len();
    let content = raw.trim_start();
    if content.is_empty() {
        return None;
    }

    let (name_part, description) = match content.split_once("--") {
        Some((name, desc)) => (name, Some(desc.trim()).filter(|d| !d.is_empty())),
        None => (content, None),
    };
    let trimmed = name_part.trim_end();
    let (name, optional) = match trimmed.strip_suffix('?') {
        Some(stripped) => (stripped.trim_end(), true),
        None => (trimmed, false),
    };
    if name.is_empty() {
        return None;
    }

    let start = line.location.start_index + indent;
    let row = line.location.start_position.row;
    let span = ByteSpan::new(start, start + name.len());
    let name_location = Location::new(
        span,
        Position::new(row, indent as u32),
        Position::new(row, (indent + name.chars().map(char::len_utf16).sum::<usize>()) as u32),
    );

    Some(SectionDecl {
        name: name.to_string(),
        name_location,
        optional,
        description: description.map(str::to_string),
        location: line.location,
    })
}

/// Parses one removal name from a raw line.
fn parse_name_ref(line: &SyntaxNode, source: &str) -> Option<NameRef> {
    let end = content_end(line, source);
    let raw = source.get(line.location.start_index..end)?;
    let name = raw.trim();
    if name.is_empty() {
        return None;
    }
    Some(NameRef { name: name.to_string(), location: line.location })
}

/// The line's content end: its end index minus the terminating newline.
fn content_end(line: &SyntaxNode, source: &str) -> usize {
    let mut end = line.location.end_index.min(source.len());
    let bytes = source.as_bytes();
    while end > line.location.start_index && matches!(bytes[end - 1], b'\n' | b'\r') {
        end -= 1;
    }
    end
}
