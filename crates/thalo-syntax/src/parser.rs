//! Line-grouping parser: full parse and incremental re-parse.
//!
//! Entries are delimited by non-indented header lines; indented lines and
//! interior blanks attach to the open entry. Incremental parsing reuses the
//! prefix of top-level nodes that the edit provably cannot affect and
//! re-parses the rest, so it produces exactly the tree a full parse would.

use crate::cst::{NodeKind, SyntaxNode, SyntaxTree};
use crate::lexer::Lexer;
use crate::token::{Token, TokenKind};
use thalo_position_tracking::{ByteSpan, Location, Position};

/// A tree-sitter-shaped edit summary: byte offsets before and after.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputEdit {
    pub start_byte: usize,
    pub old_end_byte: usize,
    pub new_end_byte: usize,
}

/// Parses a block of thalo source. Never fails; unplaceable lines become
/// `StrayLine` nodes and unlexable characters `Error` tokens.
pub fn parse(source: &str) -> SyntaxTree {
    let children = parse_from(source, 0, 0);
    SyntaxTree { root: root_node(source, children) }
}

/// Re-parses after an edit, reusing the unaffected prefix of `old_tree`.
///
/// The result is structurally identical to `parse(source)`; only node
/// provenance differs.
pub fn parse_incremental(source: &str, old_tree: &SyntaxTree, edit: InputEdit) -> SyntaxTree {
    let anchor = edit.start_byte.min(source.len());
    let cut = source[..anchor].rfind('\n').map_or(0, |i| i + 1);

    let mut kept: Vec<SyntaxNode> = Vec::new();
    for child in &old_tree.root.children {
        if child.location.end_index <= cut {
            kept.push(child.clone());
        } else {
            break;
        }
    }
    // The entry immediately before the edited line can gain or lose body
    // lines, so it always re-parses; separators after it re-parse with it.
    while kept.last().is_some_and(|n| n.kind != NodeKind::Entry) {
        kept.pop();
    }
    kept.pop();
    // Step further back until the resume point cannot attach to kept nodes:
    // the first non-blank line at or after it must open a new top-level
    // construct rather than continue the previous entry.
    while let Some(last) = kept.last() {
        if safe_resume(source, last.location.end_index) {
            break;
        }
        kept.pop();
    }

    let resume = kept.last().map_or(0, |n| n.location.end_index);
    let resume_row = kept.last().map_or(0, |n| n.location.end_position.row);
    let mut children = kept;
    children.extend(parse_from(source, resume, resume_row));
    SyntaxTree { root: root_node(source, children) }
}

/// True when re-parsing from `offset` reproduces what a full parse yields:
/// the next non-blank line must not be indented.
fn safe_resume(source: &str, offset: usize) -> bool {
    for line in LineCursor::new(source, offset, 0) {
        let content = &source[line.start..line.content_end];
        if content.trim().is_empty() {
            continue;
        }
        return !content.starts_with(' ') && !content.starts_with('\t');
    }
    true
}

fn root_node(source: &str, children: Vec<SyntaxNode>) -> SyntaxNode {
    let end_position = children.last().map_or(Position::new(0, 0), |c| c.location.end_position);
    SyntaxNode {
        kind: NodeKind::SourceFile,
        location: Location::new(ByteSpan::whole(source), Position::new(0, 0), end_position),
        children,
        tokens: Vec::new(),
    }
}

/// Body-line treatment, decided by the header's directive word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyMode {
    /// Metadata before the first heading, paragraphs after.
    Instance,
    /// Declaration blocks: metadata-shaped lines lex anywhere.
    Schema,
    /// Metadata-shaped lines lex anywhere; no content follows.
    Actualize,
}

struct EntryBuilder {
    lines: Vec<SyntaxNode>,
    mode: BodyMode,
    seen_heading: bool,
    /// Blank lines held until the next line decides their owner.
    pending_blanks: Vec<SyntaxNode>,
}

impl EntryBuilder {
    /// Closes the entry: the entry node, then its trailing blank separators.
    fn finish(self, out: &mut Vec<SyntaxNode>) {
        let location = match (self.lines.first(), self.lines.last()) {
            (Some(first), Some(last)) => first.location.union(&last.location),
            _ => Location::default(),
        };
        out.push(SyntaxNode {
            kind: NodeKind::Entry,
            location,
            children: self.lines,
            tokens: Vec::new(),
        });
        out.extend(self.pending_blanks);
    }
}

fn parse_from(source: &str, start_offset: usize, start_row: u32) -> Vec<SyntaxNode> {
    let mut out: Vec<SyntaxNode> = Vec::new();
    let mut current: Option<EntryBuilder> = None;

    for line in LineCursor::new(source, start_offset, start_row) {
        let content = &source[line.start..line.content_end];
        if content.trim().is_empty() {
            let blank = line_node(NodeKind::BlankLine, &line, Vec::new(), source);
            match current.as_mut() {
                Some(entry) => entry.pending_blanks.push(blank),
                None => out.push(blank),
            }
        } else if content.starts_with(' ') || content.starts_with('\t') {
            match current.as_mut() {
                Some(entry) => {
                    let blanks = std::mem::take(&mut entry.pending_blanks);
                    entry.lines.extend(blanks);
                    let node = parse_body_line(source, &line, entry.mode, entry.seen_heading);
                    if node.kind == NodeKind::HeadingLine {
                        entry.seen_heading = true;
                    }
                    entry.lines.push(node);
                }
                None => out.push(line_node(NodeKind::StrayLine, &line, Vec::new(), source)),
            }
        } else {
            if let Some(entry) = current.take() {
                entry.finish(&mut out);
            }
            let tokens = Lexer::new(content, line.start, line.row, 0).tokens();
            let mode = detect_mode(&tokens, source);
            let header = line_node(NodeKind::HeaderLine, &line, tokens, source);
            current = Some(EntryBuilder {
                lines: vec![header],
                mode,
                seen_heading: false,
                pending_blanks: Vec::new(),
            });
        }
    }
    if let Some(entry) = current.take() {
        entry.finish(&mut out);
    }
    out
}

fn parse_body_line(source: &str, line: &LineInfo, mode: BodyMode, seen_heading: bool) -> SyntaxNode {
    let content = &source[line.start..line.content_end];
    let indent_bytes = content.len() - content.trim_start_matches([' ', '\t']).len();
    let body = &content[indent_bytes..];
    let body_start = line.start + indent_bytes;
    // Indentation is ASCII, so byte count and UTF-16 count agree.
    let body_col = indent_bytes as u32;

    if let Some(rest) = body.strip_prefix('#') {
        if rest.is_empty() || rest.starts_with(' ') {
            return heading_line(line, body_start, body_col, rest, source);
        }
    }

    let metadata_shaped = is_metadata_shaped(body);
    let lex = match mode {
        BodyMode::Instance => metadata_shaped && !seen_heading,
        BodyMode::Schema | BodyMode::Actualize => metadata_shaped,
    };
    if lex {
        let tokens = Lexer::new(body, body_start, line.row, body_col).tokens();
        line_node(NodeKind::MetadataLine, line, tokens, source)
    } else {
        line_node(NodeKind::TextLine, line, Vec::new(), source)
    }
}

fn heading_line(
    line: &LineInfo,
    body_start: usize,
    body_col: u32,
    rest: &str,
    source: &str,
) -> SyntaxNode {
    let mut tokens = Vec::new();
    let hash_span = ByteSpan::new(body_start, body_start + 1);
    tokens.push(Token {
        kind: TokenKind::Hash,
        span: hash_span,
        location: Location::new(
            hash_span,
            Position::new(line.row, body_col),
            Position::new(line.row, body_col + 1),
        ),
    });
    let name = rest.trim();
    if !name.is_empty() {
        let name_offset = 1 + (rest.len() - rest.trim_start().len());
        let name_start = body_start + name_offset;
        let span = ByteSpan::new(name_start, name_start + name.len());
        // The skipped prefix is '#' plus ASCII spaces.
        let start_col = body_col + name_offset as u32;
        let end_col = start_col + name.chars().map(char::len_utf16).sum::<usize>() as u32;
        tokens.push(Token {
            kind: TokenKind::HeadingName,
            span,
            location: Location::new(
                span,
                Position::new(line.row, start_col),
                Position::new(line.row, end_col),
            ),
        });
    }
    line_node(NodeKind::HeadingLine, line, tokens, source)
}

/// `key:` / `key?:` with a word-shaped key.
fn is_metadata_shaped(body: &str) -> bool {
    match body.chars().next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    let mut rest = body;
    for (i, c) in body.char_indices().skip(1) {
        if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
            continue;
        }
        rest = &body[i..];
        break;
    }
    if rest == body {
        return false;
    }
    rest.strip_prefix('?').unwrap_or(rest).starts_with(':')
}

fn detect_mode(tokens: &[Token], source: &str) -> BodyMode {
    let directive = tokens
        .iter()
        .find(|t| t.kind == TokenKind::Word)
        .map(|t| t.text(source))
        .unwrap_or_default();
    match directive {
        "define-entity" | "alter-entity" => BodyMode::Schema,
        "actualize-synthesis" => BodyMode::Actualize,
        // create, update, define-synthesis, and anything unrecognized
        _ => BodyMode::Instance,
    }
}

fn line_node(kind: NodeKind, line: &LineInfo, tokens: Vec<Token>, source: &str) -> SyntaxNode {
    let span = ByteSpan::new(line.start, line.end);
    let end_position = if line.end > line.content_end {
        Position::new(line.row + 1, 0)
    } else {
        let width: usize =
            source[line.start..line.content_end].chars().map(char::len_utf16).sum();
        Position::new(line.row, width as u32)
    };
    SyntaxNode {
        kind,
        location: Location::new(span, Position::new(line.row, 0), end_position),
        children: Vec::new(),
        tokens,
    }
}

/// One physical line: `[start, content_end)` is the text, `[start, end)`
/// includes the terminating newline when present.
struct LineInfo {
    start: usize,
    content_end: usize,
    end: usize,
    row: u32,
}

struct LineCursor<'a> {
    source: &'a str,
    offset: usize,
    row: u32,
}

impl<'a> LineCursor<'a> {
    fn new(source: &'a str, offset: usize, row: u32) -> Self {
        Self { source, offset, row }
    }
}

impl Iterator for LineCursor<'_> {
    type Item = LineInfo;

    fn next(&mut self) -> Option<LineInfo> {
        if self.offset >= self.source.len() {
            return None;
        }
        let start = self.offset;
        let rest = &self.source[start..];
        let (content_len, end) = match rest.find('\n') {
            Some(nl) => {
                let content = if nl > 0 && rest.as_bytes()[nl - 1] == b'\r' { nl - 1 } else { nl };
                (content, start + nl + 1)
            }
            None => (rest.len(), start + rest.len()),
        };
        let line = LineInfo { start, content_end: start + content_len, end, row: self.row };
        self.offset = end;
        self.row += 1;
        Some(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(tree: &SyntaxTree) -> Vec<NodeKind> {
        tree.root.children.iter().map(|c| c.kind).collect()
    }

    #[test]
    fn groups_lines_into_entries() {
        let source = "2026-01-05T18:00Z create lore \"E\" ^e1\n  type: \"fact\"\n\n  # Content\n  Hi\n\n2026-01-06T09:00Z update lore\n";
        let tree = parse(source);
        assert_eq!(kinds(&tree), vec![NodeKind::Entry, NodeKind::BlankLine, NodeKind::Entry]);

        let first = &tree.root.children[0];
        let child_kinds: Vec<NodeKind> = first.children.iter().map(|c| c.kind).collect();
        assert_eq!(
            child_kinds,
            vec![
                NodeKind::HeaderLine,
                NodeKind::MetadataLine,
                NodeKind::BlankLine,
                NodeKind::HeadingLine,
                NodeKind::TextLine,
            ],
        );
    }

    #[test]
    fn paragraph_with_colon_is_not_metadata_after_heading() {
        let source = "2026-01-05T18:00Z create lore\n  # Content\n  note: this is prose\n";
        let tree = parse(source);
        let entry = &tree.root.children[0];
        assert_eq!(entry.children[2].kind, NodeKind::TextLine);
    }

    #[test]
    fn schema_mode_lexes_declarations_under_headings() {
        let source = "2026-01-01T00:00Z define-entity lore \"Lore\"\n  # Metadata\n  type: \"fact\" | \"insight\"\n  # Sections\n  Content\n";
        let tree = parse(source);
        let entry = &tree.root.children[0];
        let child_kinds: Vec<NodeKind> = entry.children.iter().map(|c| c.kind).collect();
        assert_eq!(
            child_kinds,
            vec![
                NodeKind::HeaderLine,
                NodeKind::HeadingLine,
                NodeKind::MetadataLine,
                NodeKind::HeadingLine,
                NodeKind::TextLine,
            ],
        );
    }

    #[test]
    fn stray_indented_lines_without_an_entry() {
        let tree = parse("  floating\n2026-01-05T18:00Z create lore\n");
        assert_eq!(kinds(&tree), vec![NodeKind::StrayLine, NodeKind::Entry]);
    }

    #[test]
    fn trailing_blanks_stay_top_level() {
        let tree = parse("2026-01-05T18:00Z create lore\n  k: 1\n\n\n");
        assert_eq!(
            kinds(&tree),
            vec![NodeKind::Entry, NodeKind::BlankLine, NodeKind::BlankLine],
        );
        // Entry span stops after its last body line's newline.
        assert_eq!(tree.root.children[0].location.end_index, 37);
    }

    #[test]
    fn crlf_lines_parse() {
        let tree = parse("2026-01-05T18:00Z create lore\r\n  k: 1\r\n");
        let entry = &tree.root.children[0];
        assert_eq!(entry.children.len(), 2);
        assert_eq!(entry.children[1].kind, NodeKind::MetadataLine);
    }

    fn apply(source: &str, start: usize, end: usize, insert: &str) -> (String, InputEdit) {
        let mut next = source.to_string();
        next.replace_range(start..end, insert);
        (
            next,
            InputEdit {
                start_byte: start,
                old_end_byte: end,
                new_end_byte: start + insert.len(),
            },
        )
    }

    #[test]
    fn incremental_edit_inside_one_entry() {
        let source = "2026-01-05T18:00Z create lore\n  k: 1\n\n2026-01-06T09:00Z create lore\n  k: 2\n";
        let old = parse(source);
        // Change `k: 2` to `k: 3`.
        let pos = source.rfind('2').unwrap_or(0);
        let (next, edit) = apply(source, pos, pos + 1, "3");
        assert_eq!(parse_incremental(&next, &old, edit), parse(&next));
    }

    #[test]
    fn incremental_edit_that_splits_an_entry() {
        let source = "2026-01-05T18:00Z create lore\n  k: 1\n  j: 2\n";
        let old = parse(source);
        // De-indent the last line: it becomes a new (malformed) header.
        let pos = match source.find("  j") {
            Some(p) => p,
            None => 0,
        };
        let (next, edit) = apply(source, pos, pos + 2, "");
        assert_eq!(parse_incremental(&next, &old, edit), parse(&next));
    }

    #[test]
    fn incremental_append_attaches_to_previous_entry() {
        let source = "2026-01-05T18:00Z create lore\n  k: 1\n\n";
        let old = parse(source);
        let (next, edit) = apply(source, source.len(), source.len(), "  j: 2\n");
        assert_eq!(parse_incremental(&next, &old, edit), parse(&next));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        /// Lines drawn from the shapes the grammar cares about.
        fn arbitrary_source() -> impl Strategy<Value = String> {
            let line = prop_oneof![
                Just("2026-01-05T18:00Z create lore \"E\" ^e1".to_string()),
                Just("2026-01-06T09:00Z define-entity lore".to_string()),
                Just("  k: 1".to_string()),
                Just("  # Content".to_string()),
                Just("  plain text".to_string()),
                Just(String::new()),
                Just("stray words".to_string()),
            ];
            proptest::collection::vec(line, 0..12).prop_map(|lines| {
                let mut s = lines.join("\n");
                s.push('\n');
                s
            })
        }

        proptest! {
            /// Incremental re-parse equals full re-parse for any single edit.
            #[test]
            fn incremental_matches_full(
                source in arbitrary_source(),
                insert in prop_oneof![
                    Just("x".to_string()),
                    Just("\n".to_string()),
                    Just("  k: 2\n".to_string()),
                    Just("2026-01-07T10:00Z create lore\n".to_string()),
                    Just(String::new()),
                ],
                a in 0usize..200,
                b in 0usize..8,
            ) {
                let old = parse(&source);
                let start = a.min(source.len());
                let end = (start + b).min(source.len());
                let mut next = source.clone();
                next.replace_range(start..end, &insert);
                let edit = InputEdit {
                    start_byte: start,
                    old_end_byte: end,
                    new_end_byte: start + insert.len(),
                };
                prop_assert_eq!(parse_incremental(&next, &old, edit), parse(&next));
            }
        }
    }
}
