//! LSP semantic tokens: classification and delta encoding.

use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;
use thalo_parser::DocumentBlock;
use thalo_syntax::{NodeKind, SyntaxNode, Token, TokenKind};
use thalo_workspace_index::Workspace;

/// `[delta_line, delta_start, length, token_type, token_modifiers]` per the
/// LSP wire format.
pub type EncodedToken = [u32; 5];

/// The fixed legend shared with clients.
pub struct TokensLegend {
    pub token_types: Vec<&'static str>,
    pub modifiers: Vec<&'static str>,
    /// Token type name → index.
    pub map: FxHashMap<&'static str, u32>,
}

const TOKEN_TYPES: [&str; 10] = [
    "namespace", "type", "class", "function", "property", "string", "keyword", "comment",
    "variable", "number",
];
const MODIFIERS: [&str; 3] = ["declaration", "definition", "documentation"];

const T_NAMESPACE: u32 = 0;
const T_TYPE: u32 = 1;
const T_CLASS: u32 = 2;
const T_PROPERTY: u32 = 4;
const T_STRING: u32 = 5;
const T_KEYWORD: u32 = 6;
const T_COMMENT: u32 = 7;
const T_VARIABLE: u32 = 8;
const T_NUMBER: u32 = 9;

const M_DECLARATION: u32 = 1 << 0;
const M_DEFINITION: u32 = 1 << 1;
const M_DOCUMENTATION: u32 = 1 << 2;

static LEGEND: Lazy<TokensLegend> = Lazy::new(|| {
    let token_types: Vec<&'static str> = TOKEN_TYPES.to_vec();
    let map = token_types.iter().enumerate().map(|(i, t)| (*t, i as u32)).collect();
    TokensLegend { token_types, modifiers: MODIFIERS.to_vec(), map }
});

/// The fixed legend; register it once per client session.
pub fn legend() -> &'static TokensLegend {
    &LEGEND
}

/// Delta-encoded semantic tokens for one document, all blocks merged and
/// translated to file coordinates.
pub fn semantic_tokens(workspace: &Workspace, path: &str) -> Option<Vec<EncodedToken>> {
    let document = workspace.get_document(path)?;
    let mut classified: Vec<(u32, u32, u32, u32, u32)> = Vec::new();
    for block in document.blocks() {
        collect_block(block, &mut classified);
    }
    classified.sort_unstable();
    Some(delta_encode(&classified))
}

fn collect_block(block: &DocumentBlock, out: &mut Vec<(u32, u32, u32, u32, u32)>) {
    for child in &block.tree.root.children {
        if child.kind != NodeKind::Entry {
            continue;
        }
        for line in &child.children {
            match line.kind {
                NodeKind::HeaderLine => classify_header(line, block, out),
                NodeKind::MetadataLine => classify_metadata(line, block, out),
                NodeKind::HeadingLine => {
                    for token in &line.tokens {
                        push(block, token, T_CLASS, 0, out);
                    }
                }
                _ => {}
            }
        }
    }
}

fn classify_header(
    line: &SyntaxNode,
    block: &DocumentBlock,
    out: &mut Vec<(u32, u32, u32, u32, u32)>,
) {
    let directive = line
        .tokens
        .iter()
        .find(|t| t.kind == TokenKind::Word)
        .map(|t| t.text(&block.sub_source))
        .unwrap_or_default();
    // Update headers reference an existing entry; everything else declares.
    let link_modifiers =
        if directive == "update" { 0 } else { M_DECLARATION | M_DEFINITION };

    let mut words_seen = 0;
    for token in &line.tokens {
        match token.kind {
            TokenKind::Timestamp => push(block, token, T_NUMBER, 0, out),
            TokenKind::Word => {
                words_seen += 1;
                let ty = if words_seen == 1 { T_KEYWORD } else { T_TYPE };
                push(block, token, ty, 0, out);
            }
            TokenKind::Quoted | TokenKind::UnterminatedQuoted => {
                push(block, token, T_STRING, 0, out);
            }
            TokenKind::Link => push(block, token, T_VARIABLE, link_modifiers, out),
            TokenKind::Tag => push(block, token, T_NAMESPACE, 0, out),
            _ => {}
        }
    }
}

fn classify_metadata(
    line: &SyntaxNode,
    block: &DocumentBlock,
    out: &mut Vec<(u32, u32, u32, u32, u32)>,
) {
    let mut key_seen = false;
    let mut in_description = false;
    for token in &line.tokens {
        if in_description {
            push(block, token, T_COMMENT, M_DOCUMENTATION, out);
            continue;
        }
        match token.kind {
            TokenKind::DashDash => in_description = true,
            TokenKind::Word => {
                let text = token.text(&block.sub_source);
                let ty = if !key_seen {
                    key_seen = true;
                    T_PROPERTY
                } else if text == "where" || text == "and" {
                    T_KEYWORD
                } else {
                    // Primitive type names, entity selectors, condition keys.
                    T_TYPE
                };
                push(block, token, ty, 0, out);
            }
            TokenKind::Quoted | TokenKind::UnterminatedQuoted => {
                push(block, token, T_STRING, 0, out);
            }
            TokenKind::Link => push(block, token, T_VARIABLE, 0, out),
            TokenKind::Tag => push(block, token, T_NAMESPACE, 0, out),
            TokenKind::Number | TokenKind::Timestamp | TokenKind::Date => {
                push(block, token, T_NUMBER, 0, out);
            }
            _ => {}
        }
    }
}

fn push(
    block: &DocumentBlock,
    token: &Token,
    token_type: u32,
    modifiers: u32,
    out: &mut Vec<(u32, u32, u32, u32, u32)>,
) {
    let start = block.source_map.to_file_position(token.location.start_position);
    let end = block.source_map.to_file_position(token.location.end_position);
    // Tokens never span lines; clamp defensively all the same.
    let length = if end.row == start.row {
        end.column.saturating_sub(start.column)
    } else {
        token.location.end_position.column
    };
    if length > 0 {
        out.push((start.row, start.column, length, token_type, modifiers));
    }
}

fn delta_encode(tokens: &[(u32, u32, u32, u32, u32)]) -> Vec<EncodedToken> {
    let mut encoded = Vec::with_capacity(tokens.len());
    let mut prev_row = 0;
    let mut prev_col = 0;
    for &(row, col, length, token_type, modifiers) in tokens {
        let delta_line = row - prev_row;
        let delta_start = if delta_line == 0 { col - prev_col } else { col };
        encoded.push([delta_line, delta_start, length, token_type, modifiers]);
        prev_row = row;
        prev_col = col;
    }
    encoded
}
