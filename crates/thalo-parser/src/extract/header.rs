//! Header-line extraction for the four entry kinds.

use crate::extract::values::{TokenCursor, timestamp_from_token, unquote};
use thalo_ast::{
    ActualizeHeader, FieldOrError, InstanceDirective, InstanceHeader, Location, SchemaDirective,
    SchemaHeader, SynthesisHeader, SyntaxError, Tag, Timestamp,
};
use thalo_syntax::{SyntaxNode, TokenKind};

/// Which header shape to extract, decided by the directive word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderShape {
    Instance,
    Schema,
    Synthesis,
    Actualize,
}

/// Reads the directive word of a header line to pick the entry shape.
pub fn header_shape(header: &SyntaxNode, source: &str) -> HeaderShape {
    let directive = header
        .tokens
        .iter()
        .find(|t| t.kind == TokenKind::Word)
        .map(|t| t.text(source))
        .unwrap_or_default();
    match directive {
        "define-entity" | "alter-entity" => HeaderShape::Schema,
        "define-synthesis" => HeaderShape::Synthesis,
        "actualize-synthesis" => HeaderShape::Actualize,
        _ => HeaderShape::Instance,
    }
}

fn take_timestamp(cur: &mut TokenCursor<'_>, fallback: Location) -> FieldOrError<Timestamp> {
    match cur.peek_kind() {
        Some(TokenKind::Timestamp) => {
            let token = match cur.bump() {
                Some(t) => t,
                None => return missing_timestamp(fallback),
            };
            timestamp_from_token(cur.text(token), token.location)
        }
        Some(TokenKind::Date) => {
            let token = match cur.bump() {
                Some(t) => t,
                None => return missing_timestamp(fallback),
            };
            FieldOrError::Error(SyntaxError::new(
                "invalid_timestamp",
                "expected a timestamp, found a bare date",
                cur.text(token),
                token.location,
            ))
        }
        _ => missing_timestamp(fallback),
    }
}

fn missing_timestamp(location: Location) -> FieldOrError<Timestamp> {
    FieldOrError::Error(SyntaxError::new(
        "missing_timestamp",
        "entry header must begin with a timestamp",
        "",
        location,
    ))
}

/// Collects title / explicit link / tags from the remaining header tokens,
/// in any order; the first quoted token is the title, the first link token
/// the explicit link. Unplaceable tokens are skipped.
struct HeaderTail {
    title: Option<FieldOrError<String>>,
    link: Option<FieldOrError<String>>,
    tags: Vec<Tag>,
}

fn take_tail(cur: &mut TokenCursor<'_>) -> HeaderTail {
    let mut tail = HeaderTail { title: None, link: None, tags: Vec::new() };
    while let Some(token) = cur.bump() {
        match token.kind {
            TokenKind::Quoted if tail.title.is_none() => {
                tail.title = Some(FieldOrError::value(
                    unquote(cur.text(token)),
                    token.location,
                ));
            }
            TokenKind::UnterminatedQuoted if tail.title.is_none() => {
                tail.title = Some(FieldOrError::Error(SyntaxError::new(
                    "unterminated_string",
                    "title string is missing its closing quote",
                    cur.text(token),
                    token.location,
                )));
            }
            TokenKind::Link if tail.link.is_none() => {
                tail.link = Some(FieldOrError::value(
                    cur.text(token)[1..].to_string(),
                    token.location,
                ));
            }
            TokenKind::Error if cur.text(token).starts_with('^') && tail.link.is_none() => {
                tail.link = Some(FieldOrError::Error(SyntaxError::new(
                    "invalid_link_id",
                    "link id may only contain letters, digits, `_`, `.`, `/`, and `-`",
                    cur.text(token),
                    token.location,
                )));
            }
            TokenKind::Tag => {
                tail.tags.push(Tag {
                    name: cur.text(token)[1..].to_string(),
                    location: token.location,
                });
            }
            _ => {}
        }
    }
    tail
}

/// Extracts a `create` / `update` header. Also used for headers whose
/// directive is unrecognized, which surface as directive errors.
pub fn instance_header(header: &SyntaxNode, source: &str) -> InstanceHeader {
    let mut cur = TokenCursor::new(&header.tokens, source);
    let location = header.location;
    let timestamp = take_timestamp(&mut cur, location);
    let directive = match cur.peek_kind() {
        Some(TokenKind::Word) => {
            let token = cur.bump();
            match token.map(|t| t.text(source)) {
                Some("create") => {
                    FieldOrError::value(InstanceDirective::Create, token_loc(token, location))
                }
                Some("update") => {
                    FieldOrError::value(InstanceDirective::Update, token_loc(token, location))
                }
                Some(text) => FieldOrError::Error(SyntaxError::new(
                    "unknown_directive",
                    format!("`{text}` is not a directive"),
                    text,
                    token_loc(token, location),
                )),
                None => missing_directive(location),
            }
        }
        _ => missing_directive(location),
    };
    let entity = match cur.take(TokenKind::Word) {
        Some(token) => FieldOrError::value(cur.text(token).to_string(), token.location),
        None => FieldOrError::Error(SyntaxError::new(
            "missing_entity",
            "expected an entity name after the directive",
            "",
            location,
        )),
    };
    let tail = take_tail(&mut cur);
    InstanceHeader {
        timestamp,
        directive,
        entity,
        title: tail.title,
        explicit_link: tail.link,
        tags: tail.tags,
        location,
    }
}

/// Extracts a `define-entity` / `alter-entity` header.
pub fn schema_header(header: &SyntaxNode, source: &str) -> SchemaHeader {
    let mut cur = TokenCursor::new(&header.tokens, source);
    let location = header.location;
    let timestamp = take_timestamp(&mut cur, location);
    let directive = match cur.take(TokenKind::Word) {
        Some(token) => match cur.text(token) {
            "define-entity" => FieldOrError::value(SchemaDirective::DefineEntity, token.location),
            "alter-entity" => FieldOrError::value(SchemaDirective::AlterEntity, token.location),
            text => FieldOrError::Error(SyntaxError::new(
                "unknown_directive",
                format!("`{text}` is not a schema directive"),
                text,
                token.location,
            )),
        },
        None => missing_directive(location),
    };
    let entity_name = match cur.take(TokenKind::Word) {
        Some(token) => FieldOrError::value(cur.text(token).to_string(), token.location),
        None => FieldOrError::Error(SyntaxError::new(
            "missing_entity",
            "expected an entity name after the directive",
            "",
            location,
        )),
    };
    let tail = take_tail(&mut cur);
    SchemaHeader {
        timestamp,
        directive,
        entity_name,
        title: tail.title,
        explicit_link: tail.link,
        tags: tail.tags,
        location,
    }
}

/// Extracts a `define-synthesis` header; title and link are required.
pub fn synthesis_header(header: &SyntaxNode, source: &str) -> SynthesisHeader {
    let mut cur = TokenCursor::new(&header.tokens, source);
    let location = header.location;
    let timestamp = take_timestamp(&mut cur, location);
    cur.take_keyword("define-synthesis");
    let tail = take_tail(&mut cur);
    let title = tail.title.unwrap_or_else(|| {
        FieldOrError::Error(SyntaxError::new(
            "missing_title",
            "a synthesis must have a quoted title",
            "",
            location,
        ))
    });
    let link_id = tail.link.unwrap_or_else(|| {
        FieldOrError::Error(SyntaxError::new(
            "missing_link_id",
            "a synthesis must declare an explicit `^id`",
            "",
            location,
        ))
    });
    SynthesisHeader { timestamp, title, link_id, tags: tail.tags, location }
}

/// Extracts an `actualize-synthesis` header.
pub fn actualize_header(header: &SyntaxNode, source: &str) -> ActualizeHeader {
    let mut cur = TokenCursor::new(&header.tokens, source);
    let location = header.location;
    let timestamp = take_timestamp(&mut cur, location);
    cur.take_keyword("actualize-synthesis");
    let tail = take_tail(&mut cur);
    let target = tail.link.unwrap_or_else(|| {
        FieldOrError::Error(SyntaxError::new(
            "missing_target",
            "actualize-synthesis must name its target `^id`",
            "",
            location,
        ))
    });
    ActualizeHeader { timestamp, target, location }
}

fn missing_directive<T>(location: Location) -> FieldOrError<T> {
    FieldOrError::Error(SyntaxError::new(
        "missing_directive",
        "expected a directive after the timestamp",
        "",
        location,
    ))
}

fn token_loc(token: Option<&thalo_syntax::Token>, fallback: Location) -> Location {
    token.map_or(fallback, |t| t.location)
}
