//! Editable documents: one parsed block for `.thalo` files, one per fenced
//! region for markdown files.

use thalo_position_tracking::{ByteSpan, LineIndex, Position, SourceMap};
use thalo_syntax::{
    FileType, InputEdit, SyntaxTree, parse, parse_incremental, scan_thalo_fences,
};
use tracing::debug;

/// One contiguous region of thalo source inside a document.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentBlock {
    /// Translates this block's coordinates to file coordinates.
    pub source_map: SourceMap,
    /// The block's own copy of its content; trees index into it.
    pub sub_source: String,
    pub tree: SyntaxTree,
}

/// A positional edit in editor coordinates (rows, UTF-16 columns).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentEdit {
    pub start_row: u32,
    pub start_col: u32,
    pub end_row: u32,
    pub end_col: u32,
    pub new_text: String,
}

/// What an edit did to the document's block structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditOutcome {
    /// Indices of blocks whose trees were re-parsed.
    pub modified_blocks: Vec<usize>,
    /// True when fences moved and all blocks were re-derived.
    pub block_boundaries_changed: bool,
    /// True when the whole document was re-parsed from scratch.
    pub full_reparse: bool,
}

/// A single source file: raw text, line index, and parsed blocks.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    path: String,
    file_type: FileType,
    line_index: LineIndex,
    blocks: Vec<DocumentBlock>,
}

impl Document {
    /// Parses a document. The file type comes from `file_type` if given,
    /// otherwise from the filename extension.
    pub fn new(source: String, path: impl Into<String>, file_type: Option<FileType>) -> Self {
        let path = path.into();
        let file_type = FileType::detect(&path, file_type);
        let line_index = LineIndex::new(source);
        let blocks = build_blocks(line_index.text(), file_type);
        Self { path, file_type, line_index, blocks }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn file_type(&self) -> FileType {
        self.file_type
    }

    pub fn source(&self) -> &str {
        self.line_index.text()
    }

    pub fn line_index(&self) -> &LineIndex {
        &self.line_index
    }

    pub fn blocks(&self) -> &[DocumentBlock] {
        &self.blocks
    }

    /// The index of the block whose file-absolute content range contains the
    /// given offset.
    pub fn block_at_offset(&self, offset: usize) -> Option<usize> {
        self.blocks.iter().position(|block| {
            let start = block.source_map.to_file_offset(0);
            let end = start + block.sub_source.len();
            offset >= start && offset <= end
        })
    }

    /// Applies a positional edit.
    pub fn apply_edit(&mut self, edit: &DocumentEdit) -> EditOutcome {
        let start = self.line_index.offset_at(Position::new(edit.start_row, edit.start_col));
        let end = self.line_index.offset_at(Position::new(edit.end_row, edit.end_col));
        let span = ByteSpan::new(start.min(end), start.max(end));
        self.apply_span_edit(span, &edit.new_text)
    }

    /// Applies an edit the host already expressed in byte offsets.
    pub fn apply_edit_range(&mut self, edit: InputEdit, new_text: &str) -> EditOutcome {
        self.apply_span_edit(ByteSpan::new(edit.start_byte, edit.old_end_byte), new_text)
    }

    /// Replaces the entire source and rebuilds every block.
    pub fn replace_content(&mut self, new_source: String) -> EditOutcome {
        self.line_index = LineIndex::new(new_source);
        self.blocks = build_blocks(self.line_index.text(), self.file_type);
        EditOutcome {
            modified_blocks: (0..self.blocks.len()).collect(),
            block_boundaries_changed: true,
            full_reparse: true,
        }
    }

    fn apply_span_edit(&mut self, old_span: ByteSpan, new_text: &str) -> EditOutcome {
        let len = self.line_index.text().len();
        let start = old_span.start.min(len);
        let end = old_span.end.clamp(start, len);
        let old_span = ByteSpan::new(start, end);

        let deleted_rows = self.line_index.text()[start..end].matches('\n').count() as i64;
        let inserted_rows = new_text.matches('\n').count() as i64;
        let row_delta = inserted_rows - deleted_rows;
        let delta = new_text.len() as isize - old_span.len() as isize;

        self.line_index.apply_edit(old_span, new_text);

        match self.file_type {
            FileType::Thalo => self.reparse_whole_file_block(old_span, new_text),
            FileType::Markdown => self.apply_markdown_edit(old_span, new_text, delta, row_delta),
        }
    }

    fn reparse_whole_file_block(&mut self, old_span: ByteSpan, new_text: &str) -> EditOutcome {
        let source = self.line_index.text().to_string();
        let edit = InputEdit {
            start_byte: old_span.start,
            old_end_byte: old_span.end,
            new_end_byte: old_span.start + new_text.len(),
        };
        match self.blocks.first_mut() {
            Some(block) => {
                block.tree = parse_incremental(&source, &block.tree, edit);
                block.sub_source = source;
                EditOutcome {
                    modified_blocks: vec![0],
                    block_boundaries_changed: false,
                    full_reparse: false,
                }
            }
            None => self.rebuild_all(),
        }
    }

    fn apply_markdown_edit(
        &mut self,
        old_span: ByteSpan,
        new_text: &str,
        delta: isize,
        row_delta: i64,
    ) -> EditOutcome {
        let source = self.line_index.text().to_string();
        let regions = scan_thalo_fences(&source);

        // The block whose content fully contains the edit, if any.
        let target = self.blocks.iter().position(|block| {
            let start = block.source_map.to_file_offset(0);
            let end = start + block.sub_source.len();
            old_span.start >= start && old_span.end <= end
        });

        if !self.layout_is_stable(&regions, target, old_span, delta, row_delta) {
            debug!(path = %self.path, "fence layout changed; re-deriving all blocks");
            return self.rebuild_all();
        }

        // Shift the maps of blocks past the edit.
        for (block, region) in self.blocks.iter_mut().zip(&regions) {
            block.source_map =
                SourceMap::block(region.line_offset, 0, region.content_span.start);
        }

        match target {
            Some(index) => {
                let Some(block) = self.blocks.get_mut(index) else {
                    return self.rebuild_all();
                };
                let content_start = block.source_map.to_file_offset(0);
                let content_end = content_start + (block.sub_source.len() as isize + delta)
                    .max(0) as usize;
                let Some(sub) = source.get(content_start..content_end.min(source.len())) else {
                    return self.rebuild_all();
                };
                let edit = InputEdit {
                    start_byte: old_span.start - content_start,
                    old_end_byte: old_span.end - content_start,
                    new_end_byte: old_span.start - content_start + new_text.len(),
                };
                block.tree = parse_incremental(sub, &block.tree, edit);
                block.sub_source = sub.to_string();
                EditOutcome {
                    modified_blocks: vec![index],
                    block_boundaries_changed: false,
                    full_reparse: false,
                }
            }
            None => EditOutcome {
                modified_blocks: Vec::new(),
                block_boundaries_changed: false,
                full_reparse: false,
            },
        }
    }

    /// True when the new fence layout is the old layout with the edit's byte
    /// and row deltas applied — i.e. no fence appeared, vanished, or moved.
    fn layout_is_stable(
        &self,
        regions: &[thalo_syntax::FenceRegion],
        target: Option<usize>,
        old_span: ByteSpan,
        delta: isize,
        row_delta: i64,
    ) -> bool {
        if regions.len() != self.blocks.len() {
            return false;
        }
        for (index, (block, region)) in self.blocks.iter().zip(regions).enumerate() {
            let old_start = block.source_map.to_file_offset(0);
            let old_len = block.sub_source.len();
            let old_rows = match block.source_map {
                SourceMap::Block { line_offset, .. } => line_offset,
                SourceMap::Identity => 0,
            };
            let edited = target == Some(index);
            let after_edit = old_start >= old_span.end && !edited;
            let expected_start = if after_edit {
                old_start.saturating_add_signed(delta)
            } else {
                old_start
            };
            let expected_len = if edited {
                (old_len as isize + delta).max(0) as usize
            } else {
                old_len
            };
            let expected_rows = if after_edit {
                (i64::from(old_rows) + row_delta).max(0) as u32
            } else {
                old_rows
            };
            if region.content_span.start != expected_start
                || region.content_span.len() != expected_len
                || region.line_offset != expected_rows
            {
                return false;
            }
            // A block neither edited nor past the edit must sit before it.
            if !edited && !after_edit && old_start + old_len > old_span.start {
                return false;
            }
        }
        true
    }

    fn rebuild_all(&mut self) -> EditOutcome {
        self.blocks = build_blocks(self.line_index.text(), self.file_type);
        EditOutcome {
            modified_blocks: (0..self.blocks.len()).collect(),
            block_boundaries_changed: true,
            full_reparse: true,
        }
    }
}

fn build_blocks(source: &str, file_type: FileType) -> Vec<DocumentBlock> {
    match file_type {
        FileType::Thalo => vec![DocumentBlock {
            source_map: SourceMap::identity(),
            sub_source: source.to_string(),
            tree: parse(source),
        }],
        FileType::Markdown => scan_thalo_fences(source)
            .into_iter()
            .map(|region| {
                let sub = source.get(region.content_span.to_range()).unwrap_or("");
                DocumentBlock {
                    source_map: SourceMap::block(
                        region.line_offset,
                        0,
                        region.content_span.start,
                    ),
                    sub_source: sub.to_string(),
                    tree: parse(sub),
                }
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn edit(start_row: u32, start_col: u32, end_row: u32, end_col: u32, text: &str) -> DocumentEdit {
        DocumentEdit {
            start_row,
            start_col,
            end_row,
            end_col,
            new_text: text.to_string(),
        }
    }

    #[test]
    fn thalo_file_has_one_identity_block() {
        let doc = Document::new(
            "2026-01-05T18:00Z create lore\n".to_string(),
            "entries.thalo",
            None,
        );
        assert_eq!(doc.blocks().len(), 1);
        assert!(doc.blocks()[0].source_map.is_identity());
    }

    #[test]
    fn thalo_edit_reparses_incrementally_and_matches_full_parse() {
        let mut doc = Document::new(
            "2026-01-05T18:00Z create lore\n  k: 1\n".to_string(),
            "entries.thalo",
            None,
        );
        let outcome = doc.apply_edit(&edit(1, 5, 1, 6, "2"));
        assert_eq!(outcome.modified_blocks, vec![0]);
        assert!(!outcome.full_reparse);
        assert_eq!(doc.source(), "2026-01-05T18:00Z create lore\n  k: 2\n");
        assert_eq!(doc.blocks()[0].tree, parse(doc.source()));
    }

    #[test]
    fn markdown_blocks_carry_offset_maps() {
        let source = "prose\n\n```thalo\n2026-01-05T18:00Z create lore\n```\n\n```thalo\n2026-01-06T09:00Z create lore\n```\n";
        let doc = Document::new(source.to_string(), "notes.md", None);
        assert_eq!(doc.blocks().len(), 2);
        assert_eq!(doc.blocks()[0].sub_source, "2026-01-05T18:00Z create lore\n");
        let map = doc.blocks()[0].source_map;
        assert_eq!(map.to_file_position(Position::new(0, 0)), Position::new(3, 0));
    }

    #[test]
    fn markdown_edit_inside_a_block_shifts_later_blocks() {
        let source = "```thalo\n2026-01-05T18:00Z create lore\n```\n```thalo\n2026-01-06T09:00Z create lore\n```\n";
        let mut doc = Document::new(source.to_string(), "notes.md", None);
        // Insert "  k: 1\n" inside the first block (after its header line).
        let outcome = doc.apply_edit(&edit(2, 0, 2, 0, "  k: 1\n"));
        assert_eq!(outcome.modified_blocks, vec![0]);
        assert!(!outcome.block_boundaries_changed);

        let rebuilt = Document::new(doc.source().to_string(), "notes.md", None);
        assert_eq!(doc.blocks(), rebuilt.blocks());
    }

    #[test]
    fn markdown_prose_edit_touches_no_block() {
        let source = "intro\n```thalo\n2026-01-05T18:00Z create lore\n```\n";
        let mut doc = Document::new(source.to_string(), "notes.md", None);
        let outcome = doc.apply_edit(&edit(0, 0, 0, 0, "longer "));
        assert!(outcome.modified_blocks.is_empty());
        assert!(!outcome.block_boundaries_changed);
        let rebuilt = Document::new(doc.source().to_string(), "notes.md", None);
        assert_eq!(doc.blocks(), rebuilt.blocks());
    }

    #[test]
    fn inserting_a_fence_rebuilds_all_blocks() {
        let source = "intro\n```thalo\n2026-01-05T18:00Z create lore\n```\n";
        let mut doc = Document::new(source.to_string(), "notes.md", None);
        let outcome = doc.apply_edit(&edit(0, 5, 0, 5, "\n```thalo\n2026-01-04T00:00Z create lore\n```"));
        assert!(outcome.block_boundaries_changed);
        assert!(outcome.full_reparse);
        assert_eq!(doc.blocks().len(), 2);
        let rebuilt = Document::new(doc.source().to_string(), "notes.md", None);
        assert_eq!(doc.blocks(), rebuilt.blocks());
    }

    #[test]
    fn editing_the_fence_info_string_rebuilds() {
        let source = "```thalo\n2026-01-05T18:00Z create lore\n```\n";
        let mut doc = Document::new(source.to_string(), "notes.md", None);
        // "```thalo" -> "```thalox": the block disappears.
        let outcome = doc.apply_edit(&edit(0, 8, 0, 8, "x"));
        assert!(outcome.block_boundaries_changed);
        assert!(doc.blocks().is_empty());
    }

    #[test]
    fn replace_content_rebuilds() {
        let mut doc = Document::new("old\n".to_string(), "entries.thalo", None);
        let outcome = doc.replace_content("2026-01-05T18:00Z create lore\n".to_string());
        assert!(outcome.full_reparse);
        assert_eq!(doc.blocks()[0].tree, parse(doc.source()));
    }

    #[test]
    fn edit_outcomes_keep_source_and_index_consistent() {
        let mut doc = Document::new(
            "2026-01-05T18:00Z create lore\n  k: 1\n".to_string(),
            "entries.thalo",
            None,
        );
        doc.apply_edit(&edit(1, 0, 1, 6, ""));
        doc.apply_edit(&edit(0, 0, 0, 0, "  "));
        let rebuilt = Document::new(doc.source().to_string(), "entries.thalo", None);
        assert_eq!(doc.blocks(), rebuilt.blocks());
    }
}
