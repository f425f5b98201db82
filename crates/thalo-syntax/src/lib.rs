//! Error-tolerant concrete syntax for thalo.
//!
//! The grammar is implemented in pure Rust: a single-line lexer feeds a
//! line-grouping parser that produces a [`SyntaxTree`] with `Error` tokens
//! and stray-line nodes instead of failures. [`parse_incremental`] re-parses
//! after an edit with prefix reuse and is guaranteed to match a full parse.

mod blocks;
mod cst;
mod lexer;
mod parser;
mod token;

pub use blocks::{FenceRegion, FileType, scan_thalo_fences};
pub use cst::{NodeKind, SyntaxNode, SyntaxTree};
pub use lexer::{Lexer, is_link_id_char};
pub use parser::{InputEdit, parse, parse_incremental};
pub use token::{Token, TokenKind};
