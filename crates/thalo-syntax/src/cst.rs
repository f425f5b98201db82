//! Concrete syntax tree: a line-structured tree with lexed tokens on the
//! lines that carry grammar.

use crate::token::Token;
use thalo_position_tracking::Location;

/// Node kinds of the concrete tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Root; children are entries, blank separators, and stray lines.
    SourceFile,
    /// One entry: a header line plus its body lines.
    Entry,
    /// The `timestamp directive ...` line opening an entry. Tokenized.
    HeaderLine,
    /// A `key: value`-shaped body line (metadata or field declaration). Tokenized.
    MetadataLine,
    /// A `# Name` body line. Tokens: `Hash` and optionally `HeadingName`.
    HeadingLine,
    /// Any other body line: paragraph text, section declarations, removal names.
    TextLine,
    /// A line of only whitespace.
    BlankLine,
    /// An indented line with no entry to attach to.
    StrayLine,
}

/// A node in the concrete tree. Equality is structural; re-parses produce
/// equal nodes for unchanged regions.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxNode {
    pub kind: NodeKind,
    /// Block-relative; line nodes include their terminating newline.
    pub location: Location,
    pub children: Vec<SyntaxNode>,
    pub tokens: Vec<Token>,
}

impl SyntaxNode {
    /// Depth-first iteration over all tokens in this subtree.
    pub fn all_tokens(&self) -> impl Iterator<Item = &Token> {
        let mut stack: Vec<&SyntaxNode> = vec![self];
        std::iter::from_fn(move || {
            while let Some(node) = stack.pop() {
                // Children pushed in reverse keep source order on pop.
                for child in node.children.iter().rev() {
                    stack.push(child);
                }
                if !node.tokens.is_empty() {
                    return Some(node.tokens.iter());
                }
            }
            None
        })
        .flatten()
    }

    /// The token whose span contains the given block-relative byte offset.
    pub fn token_at_offset(&self, offset: usize) -> Option<&Token> {
        self.all_tokens().find(|t| t.span.contains(offset))
    }
}

/// A parsed block of thalo source.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxTree {
    pub root: SyntaxNode,
}

impl SyntaxTree {
    /// The top-level entry nodes in source order.
    pub fn entries(&self) -> impl Iterator<Item = &SyntaxNode> {
        self.root.children.iter().filter(|c| c.kind == NodeKind::Entry)
    }
}
