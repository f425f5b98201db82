//! Metadata value extraction from lexed tokens.

use thalo_ast::{
    Date, FieldOrError, Location, Query, QueryCondition, SyntaxError, Timestamp, ValueContent,
};
use thalo_syntax::{Token, TokenKind};

/// A cursor over one line's value tokens.
pub struct TokenCursor<'a> {
    tokens: &'a [Token],
    source: &'a str,
    pos: usize,
}

impl<'a> TokenCursor<'a> {
    pub fn new(tokens: &'a [Token], source: &'a str) -> Self {
        Self { tokens, source, pos: 0 }
    }

    pub fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    pub fn peek_kind(&self) -> Option<TokenKind> {
        self.peek().map(|t| t.kind)
    }

    pub fn bump(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos)?;
        self.pos += 1;
        Some(token)
    }

    pub fn take(&mut self, kind: TokenKind) -> Option<&'a Token> {
        if self.peek_kind() == Some(kind) { self.bump() } else { None }
    }

    /// Consumes a `Word` token whose text equals `word`.
    pub fn take_keyword(&mut self, word: &str) -> bool {
        match self.peek() {
            Some(t) if t.kind == TokenKind::Word && t.text(self.source) == word => {
                self.pos += 1;
                true
            }
            _ => false,
        }
    }

    pub fn is_done(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    pub fn text(&self, token: &Token) -> &'a str {
        token.text(self.source)
    }
}

/// Strips the quotes from a `Quoted` token and resolves `\"` / `\\` escapes.
pub fn unquote(text: &str) -> String {
    let inner = text.strip_prefix('"').unwrap_or(text);
    let inner = inner.strip_suffix('"').unwrap_or(inner);
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some(escaped) => out.push(escaped),
                None => out.push('\\'),
            }
        } else {
            out.push(ch);
        }
    }
    out
}

/// Converts a lexed timestamp token into a value or a structured error.
pub fn timestamp_from_token(text: &str, location: Location) -> FieldOrError<Timestamp> {
    match Timestamp::parse(text) {
        Some(ts) => FieldOrError::value(ts, location),
        None => {
            let (code, message) = if text.len() == 16 {
                ("missing_timezone", "timestamp is missing a timezone (`Z` or `±HH:MM`)")
            } else {
                ("invalid_timestamp", "timestamp has out-of-range or malformed components")
            };
            FieldOrError::Error(SyntaxError::new(code, message, text, location))
        }
    }
}

/// Parses one value from the cursor. Never consumes past what it understands;
/// trailing tokens are the caller's concern.
pub fn parse_value(cur: &mut TokenCursor<'_>) -> FieldOrError<ValueContent> {
    let Some(first) = cur.peek() else {
        return FieldOrError::Error(SyntaxError::new(
            "missing_value",
            "expected a value",
            "",
            Location::default(),
        ));
    };
    let location = first.location;
    match first.kind {
        TokenKind::Quoted => {
            let text = cur.text(first);
            cur.bump();
            FieldOrError::value(
                ValueContent::Quoted { value: unquote(text), location },
                location,
            )
        }
        TokenKind::UnterminatedQuoted => {
            let text = cur.text(first);
            cur.bump();
            FieldOrError::Error(SyntaxError::new(
                "unterminated_string",
                "string is missing its closing quote",
                text,
                location,
            ))
        }
        TokenKind::Link => {
            let id = cur.text(first)[1..].to_string();
            cur.bump();
            FieldOrError::value(ValueContent::Link { id, location }, location)
        }
        TokenKind::Timestamp => {
            let text = cur.text(first);
            cur.bump();
            timestamp_from_token(text, location)
                .map(|value| ValueContent::Datetime { value, location })
        }
        TokenKind::Date => parse_date_range(cur),
        TokenKind::Number => {
            let text = cur.text(first);
            cur.bump();
            match text.parse::<f64>() {
                Ok(value) => {
                    FieldOrError::value(ValueContent::Number { value, location }, location)
                }
                Err(_) => FieldOrError::Error(SyntaxError::new(
                    "invalid_number",
                    "not a valid number",
                    text,
                    location,
                )),
            }
        }
        TokenKind::LBracket => parse_array(cur),
        TokenKind::Word => parse_query(cur),
        _ => {
            let text = cur.text(first);
            cur.bump();
            FieldOrError::Error(SyntaxError::new(
                "unknown_value",
                "not a recognizable value",
                text,
                location,
            ))
        }
    }
}

fn parse_date_range(cur: &mut TokenCursor<'_>) -> FieldOrError<ValueContent> {
    let Some(start_token) = cur.take(TokenKind::Date) else {
        return FieldOrError::Error(SyntaxError::new(
            "invalid_date_range",
            "expected a date",
            "",
            Location::default(),
        ));
    };
    let start_text = cur.text(start_token);
    let mut location = start_token.location;

    if cur.take(TokenKind::DotDot).is_none() {
        return FieldOrError::Error(SyntaxError::new(
            "incomplete_date_range",
            "a bare date is not a value; expected `start..end`",
            start_text,
            location,
        ));
    }
    let Some(end_token) = cur.take(TokenKind::Date) else {
        return FieldOrError::Error(SyntaxError::new(
            "incomplete_date_range",
            "date range is missing its end date",
            start_text,
            location,
        ));
    };
    let end_text = cur.text(end_token);
    location = location.union(&end_token.location);

    match (Date::parse(start_text), Date::parse(end_text)) {
        (Some(start), Some(end)) => FieldOrError::value(
            ValueContent::DateRange { start, end, location },
            location,
        ),
        _ => FieldOrError::Error(SyntaxError::new(
            "invalid_date",
            "date has out-of-range components",
            format!("{start_text}..{end_text}"),
            location,
        )),
    }
}

fn parse_array(cur: &mut TokenCursor<'_>) -> FieldOrError<ValueContent> {
    let Some(open) = cur.take(TokenKind::LBracket) else {
        return FieldOrError::Error(SyntaxError::new(
            "unknown_value",
            "expected `[`",
            "",
            Location::default(),
        ));
    };
    let mut location = open.location;
    let mut elements = Vec::new();
    loop {
        if let Some(close) = cur.take(TokenKind::RBracket) {
            location = location.union(&close.location);
            break;
        }
        if cur.is_done() {
            // Unterminated array: keep what parsed.
            break;
        }
        let element = parse_value(cur);
        location = location.union(&element.location());
        elements.push(element);
        if cur.take(TokenKind::Comma).is_none() && cur.peek_kind() != Some(TokenKind::RBracket) {
            if cur.is_done() {
                break;
            }
            // Tolerate a missing comma and keep consuming elements.
        }
    }
    FieldOrError::value(ValueContent::Array { elements, location }, location)
}

fn parse_query(cur: &mut TokenCursor<'_>) -> FieldOrError<ValueContent> {
    let Some(entity_token) = cur.take(TokenKind::Word) else {
        return FieldOrError::Error(SyntaxError::new(
            "unknown_value",
            "expected an entity name",
            "",
            Location::default(),
        ));
    };
    let entity = cur.text(entity_token).to_string();
    let entity_location = entity_token.location;
    let mut location = entity_location;
    let mut conditions = Vec::new();

    if cur.take_keyword("where") {
        loop {
            let Some(condition) = parse_condition(cur) else {
                break;
            };
            location = location.union(&condition.location());
            conditions.push(condition);
            if !cur.take_keyword("and") {
                break;
            }
        }
    }

    let query = Query { entity, entity_location, conditions, location };
    FieldOrError::value(ValueContent::Query(query), location)
}

fn parse_condition(cur: &mut TokenCursor<'_>) -> Option<QueryCondition> {
    match cur.peek_kind()? {
        TokenKind::Tag => {
            let token = cur.bump()?;
            Some(QueryCondition::Tag {
                name: cur.text(token)[1..].to_string(),
                location: token.location,
            })
        }
        TokenKind::Link => {
            let token = cur.bump()?;
            Some(QueryCondition::Link {
                id: cur.text(token)[1..].to_string(),
                location: token.location,
            })
        }
        TokenKind::Word => {
            let key_token = cur.bump()?;
            cur.take(TokenKind::Equals)?;
            let value = parse_value(cur).ok().cloned()?;
            let location = key_token.location.union(&value.location());
            Some(QueryCondition::Field {
                key: cur.text(key_token).to_string(),
                key_location: key_token.location,
                value: Box::new(value),
                location,
            })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use thalo_syntax::Lexer;

    fn value_of(text: &str) -> FieldOrError<ValueContent> {
        let tokens = Lexer::new(text, 0, 0, 0).tokens();
        let mut cur = TokenCursor::new(&tokens, text);
        parse_value(&mut cur)
    }

    #[test]
    fn quoted_values_unescape() {
        match value_of(r#""a \"b\" c""#).ok() {
            Some(ValueContent::Quoted { value, .. }) => assert_eq!(value, "a \"b\" c"),
            other => assert!(other.is_none(), "unexpected value {other:?}"),
        }
    }

    #[test]
    fn link_values_strip_the_sigil() {
        match value_of("^self").ok() {
            Some(ValueContent::Link { id, .. }) => assert_eq!(id, "self"),
            other => assert!(other.is_none(), "unexpected value {other:?}"),
        }
    }

    #[test]
    fn datetime_values_parse() {
        assert!(matches!(value_of("2026-01-05T18:00Z").ok(), Some(ValueContent::Datetime { .. })));
        assert_eq!(
            value_of("2026-01-05T18:00").err().map(|e| e.code.as_str()),
            Some("missing_timezone"),
        );
    }

    #[test]
    fn date_ranges_validate_both_endpoints() {
        assert!(matches!(
            value_of("2026-01-01..2026-02-01").ok(),
            Some(ValueContent::DateRange { .. }),
        ));
        assert_eq!(
            value_of("2026-01-01").err().map(|e| e.code.as_str()),
            Some("incomplete_date_range"),
        );
        assert_eq!(
            value_of("2026-01-01..2026-13-01").err().map(|e| e.code.as_str()),
            Some("invalid_date"),
        );
    }

    #[test]
    fn arrays_hold_mixed_elements() {
        match value_of(r#"["a", ^b, 3]"#).ok() {
            Some(ValueContent::Array { elements, .. }) => {
                assert_eq!(elements.len(), 3);
                assert!(elements.iter().all(|e| e.ok().is_some()));
            }
            other => assert!(other.is_none(), "unexpected value {other:?}"),
        }
    }

    #[test]
    fn bare_word_is_an_entity_query() {
        match value_of("lore").ok() {
            Some(ValueContent::Query(query)) => {
                assert_eq!(query.entity, "lore");
                assert!(query.conditions.is_empty());
            }
            other => assert!(other.is_none(), "unexpected value {other:?}"),
        }
    }

    #[test]
    fn query_with_conditions() {
        match value_of("lore where subject = ^self and #core").ok() {
            Some(ValueContent::Query(query)) => {
                assert_eq!(query.entity, "lore");
                assert_eq!(query.conditions.len(), 2);
                assert!(matches!(query.conditions[0], QueryCondition::Field { .. }));
                assert!(matches!(query.conditions[1], QueryCondition::Tag { .. }));
            }
            other => assert!(other.is_none(), "unexpected value {other:?}"),
        }
    }

    #[test]
    fn unterminated_strings_are_errors() {
        assert_eq!(
            value_of("\"oops").err().map(|e| e.code.as_str()),
            Some("unterminated_string"),
        );
    }
}
