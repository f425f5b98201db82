//! Byte/UTF-16 position tracking for the thalo analysis engine.
mod line_index;
mod position;
mod source_map;
mod span;

pub use line_index::LineIndex;
pub use position::{Location, Position};
pub use source_map::SourceMap;
pub use span::ByteSpan;
