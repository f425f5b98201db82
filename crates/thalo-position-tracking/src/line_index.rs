//! Line index for O(log n) byte-offset ↔ UTF-16-position conversion.

use crate::{ByteSpan, Position};

/// Owns the source text and a sorted vector of line-start byte offsets.
///
/// Conversions binary-search the line starts, then count UTF-16 code units
/// within the single affected line. [`LineIndex::apply_edit`] splices the
/// text and recomputes only the line starts at or after the edit, so the
/// index stays consistent with the document under any edit sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex {
    /// Byte offset of each line start; always begins with 0
    line_starts: Vec<usize>,
    /// The source text the offsets index into
    text: String,
}

impl LineIndex {
    /// Builds an index over the given text.
    pub fn new(text: String) -> Self {
        let line_starts = scan_line_starts(&text);
        Self { line_starts, text }
    }

    /// The indexed source text.
    #[inline]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Total number of rows. A trailing newline opens a final empty row.
    #[inline]
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Converts a byte offset to a position. Offsets past the end clamp to
    /// the final position.
    pub fn position_at(&self, offset: usize) -> Position {
        let offset = clamp_to_char_boundary(&self.text, offset);
        let line = self.line_of_offset(offset);
        let line_start = self.line_starts[line];
        let column: usize = self.text[line_start..offset].chars().map(char::len_utf16).sum();
        Position::new(line as u32, column as u32)
    }

    /// Converts a position to a byte offset. Rows past the last line clamp to
    /// the end of text; columns past the end of a line clamp to the line's
    /// content end (before its newline).
    pub fn offset_at(&self, position: Position) -> usize {
        let row = position.row as usize;
        if row >= self.line_starts.len() {
            return self.text.len();
        }
        let line_start = self.line_starts[row];
        let line_end = self.content_end_of_line(row);
        let line_text = &self.text[line_start..line_end];

        let mut utf16 = 0usize;
        for (byte, ch) in line_text.char_indices() {
            if utf16 >= position.column as usize {
                return line_start + byte;
            }
            utf16 += ch.len_utf16();
        }
        line_end
    }

    /// Convenience: the location (offsets + positions) of a byte span.
    pub fn location_of(&self, span: ByteSpan) -> crate::Location {
        crate::Location::new(span, self.position_at(span.start), self.position_at(span.end))
    }

    /// Replaces `old_span` with `new_text`, keeping line starts consistent.
    ///
    /// Line starts strictly before the edited line survive untouched; the
    /// edited region is re-scanned; line starts past the deleted range shift
    /// by the length delta.
    pub fn apply_edit(&mut self, old_span: ByteSpan, new_text: &str) {
        let start = clamp_to_char_boundary(&self.text, old_span.start);
        let end = clamp_to_char_boundary(&self.text, old_span.end.max(start));

        let mut text =
            String::with_capacity(self.text.len() - (end - start) + new_text.len());
        text.push_str(&self.text[..start]);
        text.push_str(new_text);
        text.push_str(&self.text[end..]);

        let first_line = self.line_of_offset(start);
        let delta = new_text.len() as isize - (end - start) as isize;

        let mut line_starts = Vec::with_capacity(self.line_starts.len());
        line_starts.extend_from_slice(&self.line_starts[..=first_line]);
        // Newlines inside the inserted text open new lines.
        let inserted_end = start + new_text.len();
        for (i, b) in text.as_bytes()[start..inserted_end].iter().enumerate() {
            if *b == b'\n' {
                line_starts.push(start + i + 1);
            }
        }
        // Line starts sourced from newlines at or past the deleted end survive,
        // shifted. A start exactly at `end` came from a deleted newline.
        for &s in &self.line_starts {
            if s > end {
                line_starts.push(s.saturating_add_signed(delta));
            }
        }

        self.text = text;
        self.line_starts = line_starts;
    }

    /// The line containing `offset` (clamped).
    fn line_of_offset(&self, offset: usize) -> usize {
        match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(insert) => insert.saturating_sub(1),
        }
    }

    /// End of a row's content, excluding its terminating newline.
    fn content_end_of_line(&self, row: usize) -> usize {
        if row + 1 < self.line_starts.len() {
            let next = self.line_starts[row + 1];
            // next - 1 is the '\n'; also strip a preceding '\r'
            let mut end = next - 1;
            if end > self.line_starts[row] && self.text.as_bytes()[end - 1] == b'\r' {
                end -= 1;
            }
            end
        } else {
            self.text.len()
        }
    }
}

fn scan_line_starts(text: &str) -> Vec<usize> {
    let mut starts = vec![0];
    for (i, b) in text.bytes().enumerate() {
        if b == b'\n' {
            starts.push(i + 1);
        }
    }
    starts
}

fn clamp_to_char_boundary(text: &str, offset: usize) -> usize {
    let mut offset = offset.min(text.len());
    while offset > 0 && !text.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn position_at_counts_utf16_columns() {
        // '𝕊' is two UTF-16 code units, three UTF-8 bytes follow it per char.
        let index = LineIndex::new("a𝕊b\ncd".to_string());
        assert_eq!(index.position_at(0), Position::new(0, 0));
        assert_eq!(index.position_at(1), Position::new(0, 1));
        assert_eq!(index.position_at(5), Position::new(0, 3)); // after the surrogate pair
        assert_eq!(index.position_at(7), Position::new(1, 0));
    }

    #[test]
    fn offset_at_clamps_past_line_end() {
        let index = LineIndex::new("ab\ncde".to_string());
        assert_eq!(index.offset_at(Position::new(0, 99)), 2); // before the newline
        assert_eq!(index.offset_at(Position::new(9, 0)), 6);
    }

    #[test]
    fn line_count_includes_trailing_empty_row() {
        assert_eq!(LineIndex::new("a\nb".to_string()).line_count(), 2);
        assert_eq!(LineIndex::new("a\nb\n".to_string()).line_count(), 3);
        assert_eq!(LineIndex::new(String::new()).line_count(), 1);
    }

    #[test]
    fn apply_edit_single_line() {
        let mut index = LineIndex::new("hello world".to_string());
        index.apply_edit(ByteSpan::new(6, 11), "thalo");
        assert_eq!(index.text(), "hello thalo");
        assert_eq!(index, LineIndex::new("hello thalo".to_string()));
    }

    #[test]
    fn apply_edit_inserting_newlines() {
        let mut index = LineIndex::new("one two".to_string());
        index.apply_edit(ByteSpan::new(3, 4), "\nmid\n");
        assert_eq!(index.text(), "one\nmid\ntwo");
        assert_eq!(index, LineIndex::new("one\nmid\ntwo".to_string()));
    }

    #[test]
    fn apply_edit_deleting_across_lines() {
        let mut index = LineIndex::new("aa\nbb\ncc\ndd".to_string());
        index.apply_edit(ByteSpan::new(1, 7), "");
        assert_eq!(index.text(), "ac\ndd");
        assert_eq!(index, LineIndex::new("ac\ndd".to_string()));
    }

    #[test]
    fn apply_edit_at_end_of_text() {
        let mut index = LineIndex::new("aa\n".to_string());
        index.apply_edit(ByteSpan::new(3, 3), "bb");
        assert_eq!(index.text(), "aa\nbb");
        assert_eq!(index, LineIndex::new("aa\nbb".to_string()));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// After any single edit, the incrementally-maintained index is
            /// equivalent to one rebuilt from scratch.
            #[test]
            fn edit_matches_rebuild(
                text in "[a-z\\n]{0,40}",
                insert in "[a-z\\n]{0,10}",
                a in 0usize..41,
                b in 0usize..41,
            ) {
                let start = a.min(b).min(text.len());
                let end = a.max(b).min(text.len());
                let mut index = LineIndex::new(text.clone());
                index.apply_edit(ByteSpan::new(start, end), &insert);

                let mut expected = text.clone();
                expected.replace_range(start..end, &insert);
                prop_assert_eq!(index, LineIndex::new(expected));
            }

            /// position_at/offset_at round-trip on char boundaries.
            #[test]
            fn offset_position_round_trip(text in "[a-zé𝕊\\n]{0,30}", raw in 0usize..40) {
                let index = LineIndex::new(text.clone());
                let mut offset = raw.min(text.len());
                while offset > 0 && !text.is_char_boundary(offset) {
                    offset -= 1;
                }
                let pos = index.position_at(offset);
                prop_assert_eq!(index.offset_at(pos), offset);
            }
        }
    }
}
