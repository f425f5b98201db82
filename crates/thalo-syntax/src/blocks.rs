//! Detection of embedded ```` ```thalo ```` fences in markdown files.

use thalo_position_tracking::ByteSpan;

/// How a document's source should be blocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
    /// One block with the identity source map.
    Thalo,
    /// One block per ```` ```thalo ```` fenced region.
    Markdown,
}

impl FileType {
    /// Resolves the file type: an explicit override wins, otherwise the
    /// filename extension decides (`.md` / `.markdown` → markdown).
    pub fn detect(filename: &str, explicit: Option<FileType>) -> FileType {
        if let Some(file_type) = explicit {
            return file_type;
        }
        let lower = filename.to_ascii_lowercase();
        if lower.ends_with(".md") || lower.ends_with(".markdown") {
            FileType::Markdown
        } else {
            FileType::Thalo
        }
    }
}

/// One fenced thalo region inside a markdown file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FenceRegion {
    /// The content between the fences: starts after the opening fence's
    /// newline, ends at the start of the closing fence line.
    pub content_span: ByteSpan,
    /// File row of the first content line.
    pub line_offset: u32,
}

/// Scans for ```` ```thalo ```` fences. The opening fence sits at the start
/// of its line; the closing fence is a line beginning with ```` ``` ```` on
/// its own. Nested fences are not supported; an unclosed fence runs to the
/// end of the file.
pub fn scan_thalo_fences(source: &str) -> Vec<FenceRegion> {
    let mut regions = Vec::new();
    let mut row: u32 = 0;
    let mut offset = 0usize;
    let mut open: Option<(usize, u32)> = None; // (content start, content row)

    while offset < source.len() {
        let rest = &source[offset..];
        let (line, next_offset) = match rest.find('\n') {
            Some(nl) => (&rest[..nl], offset + nl + 1),
            None => (rest, source.len()),
        };
        match open {
            None => {
                if is_opening_fence(line) {
                    open = Some((next_offset, row + 1));
                }
            }
            Some((content_start, content_row)) => {
                if line.trim_end().starts_with("```") {
                    regions.push(FenceRegion {
                        content_span: ByteSpan::new(content_start, offset),
                        line_offset: content_row,
                    });
                    open = None;
                }
            }
        }
        offset = next_offset;
        row += 1;
    }
    if let Some((content_start, content_row)) = open {
        regions.push(FenceRegion {
            content_span: ByteSpan::new(content_start, source.len()),
            line_offset: content_row,
        });
    }
    regions
}

fn is_opening_fence(line: &str) -> bool {
    line.strip_prefix("```thalo")
        .is_some_and(|rest| rest.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn detect_prefers_explicit_type() {
        assert_eq!(FileType::detect("notes.md", None), FileType::Markdown);
        assert_eq!(FileType::detect("notes.thalo", None), FileType::Thalo);
        assert_eq!(FileType::detect("notes.md", Some(FileType::Thalo)), FileType::Thalo);
    }

    #[test]
    fn scans_a_single_fence() {
        let source = "# Notes\n\n```thalo\n2026-01-05T18:00Z create lore\n```\ntail\n";
        let regions = scan_thalo_fences(source);
        assert_eq!(regions.len(), 1);
        let region = regions[0];
        assert_eq!(
            &source[region.content_span.to_range()],
            "2026-01-05T18:00Z create lore\n",
        );
        assert_eq!(region.line_offset, 3);
    }

    #[test]
    fn scans_multiple_fences_and_ignores_other_languages() {
        let source = "```rust\nfn x() {}\n```\n```thalo\nA\n```\ntext\n```thalo\nB\n```\n";
        let regions = scan_thalo_fences(source);
        assert_eq!(regions.len(), 2);
        assert_eq!(&source[regions[0].content_span.to_range()], "A\n");
        assert_eq!(&source[regions[1].content_span.to_range()], "B\n");
    }

    #[test]
    fn unclosed_fence_runs_to_eof() {
        let source = "```thalo\nA\nB";
        let regions = scan_thalo_fences(source);
        assert_eq!(regions.len(), 1);
        assert_eq!(&source[regions[0].content_span.to_range()], "A\nB");
    }

    #[test]
    fn fence_with_trailing_info_is_not_thalo() {
        assert!(scan_thalo_fences("```thalox\nA\n```\n").is_empty());
        assert_eq!(scan_thalo_fences("```thalo  \nA\n```\n").len(), 1);
    }
}
