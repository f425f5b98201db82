//! Lexical tokens produced for header and metadata-shaped lines.

use thalo_position_tracking::{ByteSpan, Location};

/// Token kinds. The lexer checks shapes only; validity (timestamp ranges,
/// closed directive sets) is the extractor's job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// `YYYY-MM-DDThh:mm` with an optional trailing timezone shape
    Timestamp,
    /// `YYYY-MM-DD`
    Date,
    /// `42`, `-1.5`
    Number,
    /// `[A-Za-z_][A-Za-z0-9_-]*` — directives, entity names, keys, keywords
    Word,
    /// `"..."` including the quotes
    Quoted,
    /// A `"` that never closed; runs to end of line
    UnterminatedQuoted,
    /// `^id`
    Link,
    /// `#tag`
    Tag,
    Colon,
    Comma,
    Pipe,
    Equals,
    Question,
    LBracket,
    RBracket,
    LParen,
    RParen,
    /// `..` between date-range endpoints
    DotDot,
    /// `--` before a declaration description
    DashDash,
    /// `#` opening a heading line
    Hash,
    /// The text of a heading after `# `
    HeadingName,
    /// A maximal run of characters the lexer cannot place
    Error,
}

/// A lexed token. Spans and positions are block-relative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: ByteSpan,
    pub location: Location,
}

impl Token {
    /// The token's source text.
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        self.span.try_slice(source).unwrap_or("")
    }
}
