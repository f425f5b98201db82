//! Mapping between block-relative and file-absolute coordinates.
//!
//! A `.thalo` file is one block with the identity map. A markdown file holds
//! one block per ```` ```thalo ```` fence, each with an offset map describing
//! where the fenced content sits inside the file.

use crate::{Location, Position};
use serde::{Deserialize, Serialize};

/// Translates positions, offsets, and locations between a block's coordinate
/// system and its enclosing file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceMap {
    /// Whole-file block: every coordinate maps to itself.
    Identity,
    /// A fenced block embedded at an offset within the file.
    Block {
        /// File row of the block's first content row
        line_offset: u32,
        /// File column of the block's first content column (applies to row 0 only)
        column_offset: u32,
        /// File byte offset of the block's first content byte
        content_start_index: usize,
    },
}

impl SourceMap {
    /// The identity map.
    pub const fn identity() -> Self {
        SourceMap::Identity
    }

    /// An offset map for an embedded block.
    pub const fn block(line_offset: u32, column_offset: u32, content_start_index: usize) -> Self {
        SourceMap::Block { line_offset, column_offset, content_start_index }
    }

    /// True for the identity map.
    pub const fn is_identity(&self) -> bool {
        matches!(self, SourceMap::Identity)
    }

    /// Block-relative position → file-absolute position.
    pub fn to_file_position(&self, position: Position) -> Position {
        match *self {
            SourceMap::Identity => position,
            SourceMap::Block { line_offset, column_offset, .. } => Position {
                row: position.row + line_offset,
                column: if position.row == 0 {
                    position.column + column_offset
                } else {
                    position.column
                },
            },
        }
    }

    /// File-absolute position → block-relative position. Inverse of
    /// [`SourceMap::to_file_position`] for positions inside the block.
    pub fn to_block_position(&self, position: Position) -> Position {
        match *self {
            SourceMap::Identity => position,
            SourceMap::Block { line_offset, column_offset, .. } => {
                let row = position.row.saturating_sub(line_offset);
                Position {
                    row,
                    column: if position.row == line_offset {
                        position.column.saturating_sub(column_offset)
                    } else {
                        position.column
                    },
                }
            }
        }
    }

    /// Block-relative byte offset → file-absolute byte offset.
    pub fn to_file_offset(&self, offset: usize) -> usize {
        match *self {
            SourceMap::Identity => offset,
            SourceMap::Block { content_start_index, .. } => offset + content_start_index,
        }
    }

    /// File-absolute byte offset → block-relative byte offset.
    pub fn to_block_offset(&self, offset: usize) -> usize {
        match *self {
            SourceMap::Identity => offset,
            SourceMap::Block { content_start_index, .. } => {
                offset.saturating_sub(content_start_index)
            }
        }
    }

    /// Block-relative location → file-absolute location.
    pub fn to_file_location(&self, location: Location) -> Location {
        Location {
            start_index: self.to_file_offset(location.start_index),
            end_index: self.to_file_offset(location.end_index),
            start_position: self.to_file_position(location.start_position),
            end_position: self.to_file_position(location.end_position),
        }
    }

    /// File-absolute location → block-relative location.
    pub fn to_block_location(&self, location: Location) -> Location {
        Location {
            start_index: self.to_block_offset(location.start_index),
            end_index: self.to_block_offset(location.end_index),
            start_position: self.to_block_position(location.start_position),
            end_position: self.to_block_position(location.end_position),
        }
    }
}

impl Default for SourceMap {
    fn default() -> Self {
        SourceMap::Identity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ByteSpan;
    use pretty_assertions::assert_eq;

    #[test]
    fn identity_maps_to_self() {
        let map = SourceMap::identity();
        let pos = Position::new(3, 7);
        assert_eq!(map.to_file_position(pos), pos);
        assert_eq!(map.to_block_position(pos), pos);
        assert_eq!(map.to_file_offset(42), 42);
    }

    #[test]
    fn block_map_offsets_first_row_columns_only() {
        let map = SourceMap::block(10, 4, 120);
        assert_eq!(map.to_file_position(Position::new(0, 2)), Position::new(10, 6));
        assert_eq!(map.to_file_position(Position::new(3, 2)), Position::new(13, 2));
    }

    #[test]
    fn block_map_round_trips() {
        let map = SourceMap::block(5, 2, 80);
        for pos in [Position::new(0, 0), Position::new(0, 9), Position::new(4, 3)] {
            assert_eq!(map.to_block_position(map.to_file_position(pos)), pos);
        }
        let loc = Location::new(ByteSpan::new(4, 19), Position::new(0, 4), Position::new(2, 3));
        assert_eq!(map.to_block_location(map.to_file_location(loc)), loc);
    }
}
