//! Parsing front end: typed-AST extraction over the concrete tree, and the
//! editable [`Document`] that owns a file's blocks.

mod document;
mod extract;

pub use document::{Document, DocumentBlock, DocumentEdit, EditOutcome};
pub use extract::{extract, unquote};

pub use thalo_syntax::{FileType, InputEdit};
