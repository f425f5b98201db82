//! Editor-native positions and the four-coordinate location carried on AST nodes.

use crate::ByteSpan;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A 0-based `(row, column)` position. Columns count UTF-16 code units, the
/// unit editors speak.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Position {
    /// 0-based line number
    pub row: u32,
    /// 0-based column in UTF-16 code units
    pub column: u32,
}

impl Position {
    /// Creates a position.
    #[inline]
    pub const fn new(row: u32, column: u32) -> Self {
        Self { row, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.row, self.column)
    }
}

/// Full source location: byte offsets and row/column positions together.
///
/// Every AST node carries one because downstream consumers need both views:
/// byte offsets for slicing and diffing, positions for editor protocols.
/// Locations are relative to the enclosing block's coordinate system until a
/// [`SourceMap`](crate::SourceMap) translates them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Location {
    /// Starting byte offset (inclusive)
    pub start_index: usize,
    /// Ending byte offset (exclusive)
    pub end_index: usize,
    /// Position of `start_index`
    pub start_position: Position,
    /// Position of `end_index`
    pub end_position: Position,
}

impl Location {
    /// Creates a location from a span and its two resolved positions.
    pub fn new(span: ByteSpan, start_position: Position, end_position: Position) -> Self {
        Self { start_index: span.start, end_index: span.end, start_position, end_position }
    }

    /// The byte span of this location.
    #[inline]
    pub const fn span(&self) -> ByteSpan {
        ByteSpan { start: self.start_index, end: self.end_index }
    }

    /// True if the location covers the given byte offset.
    #[inline]
    pub const fn contains_offset(&self, offset: usize) -> bool {
        self.span().contains(offset)
    }

    /// The smallest location covering both inputs. Positions follow the
    /// winning offsets.
    pub fn union(&self, other: &Location) -> Location {
        let (start_index, start_position) = if self.start_index <= other.start_index {
            (self.start_index, self.start_position)
        } else {
            (other.start_index, other.start_position)
        };
        let (end_index, end_position) = if self.end_index >= other.end_index {
            (self.end_index, self.end_position)
        } else {
            (other.end_index, other.end_position)
        };
        Location { start_index, end_index, start_position, end_position }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start_position, self.end_position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_round_trip() {
        let loc = Location::new(ByteSpan::new(3, 9), Position::new(0, 3), Position::new(1, 2));
        assert_eq!(loc.span(), ByteSpan::new(3, 9));
        assert!(loc.contains_offset(3));
        assert!(!loc.contains_offset(9));
    }

    #[test]
    fn union_takes_outermost_coordinates() {
        let a = Location::new(ByteSpan::new(0, 5), Position::new(0, 0), Position::new(0, 5));
        let b = Location::new(ByteSpan::new(3, 12), Position::new(0, 3), Position::new(1, 4));
        let u = a.union(&b);
        assert_eq!(u.start_index, 0);
        assert_eq!(u.end_index, 12);
        assert_eq!(u.end_position, Position::new(1, 4));
    }
}
