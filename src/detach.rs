//! Detachment classification.
//!
//! Decides whether comments at the edges of a statement list are glued to
//! the adjacent statement (attached) or separated from it by a blank line
//! (detached). Detached groups end up on placeholder statements instead of
//! real nodes; the heuristic is the blank-line spacing rule used for
//! license-header detection in compiler comment handling.

use crate::comments::{CommentRange, scan_comment_ranges};
use crate::source_file::SourceFile;

/// Classify the leading comments of a statement list.
///
/// Scans `[scan_pos, ..)` up to the first statement's token start, or to
/// `container_end` when the list is empty. Comments accumulate into one
/// candidate group; a comment starting two or more lines below the previous
/// comment's end closes the group. The group counts as detached only when a
/// blank line also separates it from the following statement — otherwise it
/// belongs to that statement and the result is empty.
pub fn leading_detached_comments(
    file: &SourceFile,
    scan_pos: u32,
    first_statement_start: Option<u32>,
    container_end: u32,
) -> Vec<CommentRange> {
    let scan_end = first_statement_start.unwrap_or(container_end);
    let comments = scan_comment_ranges(&file.text, scan_pos, scan_end);
    if comments.is_empty() {
        return Vec::new();
    }

    let mut group: Vec<CommentRange> = Vec::new();
    for comment in comments {
        if let Some(last) = group.last() {
            if file.line_of(comment.pos) >= file.line_of(last.end) + 2 {
                break;
            }
        }
        group.push(comment);
    }

    if let (Some(start), Some(last)) = (first_statement_start, group.last()) {
        // No blank line before the statement: the run documents it instead.
        if file.line_of(start) < file.line_of(last.end) + 2 {
            return Vec::new();
        }
    }

    group
}

/// Classify the comments after the last statement of a list.
///
/// `scan_pos` must point past the last statement's own same-line trailing
/// comments. All comments up to the container end form a single group; no
/// blank-line segmentation is applied inside it. Returns the group plus
/// whether it is detached from the preceding statement (a blank line in
/// between). An attached group belongs on the preceding statement's
/// trailing list rather than on a placeholder.
pub fn trailing_detached_comments(
    file: &SourceFile,
    prev_end: u32,
    container_end: u32,
) -> Option<(Vec<CommentRange>, bool)> {
    let comments = scan_comment_ranges(&file.text, prev_end, container_end);
    let first = comments.first()?;
    let detached = file.line_of(first.pos) >= file.line_of(prev_end) + 2;
    Some((comments, detached))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_with_blank_line_is_detached() {
        let src = "// license a\n// license b\n\nlet x;\n";
        let file = SourceFile::new("t.ts", src);
        let group = leading_detached_comments(&file, 0, Some(27), file.len());
        assert_eq!(group.len(), 2);
    }

    #[test]
    fn header_glued_to_statement_is_attached() {
        let src = "// doc a\n// doc b\nlet x;\n";
        let file = SourceFile::new("t.ts", src);
        let group = leading_detached_comments(&file, 0, Some(18), file.len());
        assert!(group.is_empty());
    }

    #[test]
    fn blank_line_inside_run_splits_group() {
        // First comment detached, second belongs to the statement.
        let src = "// header\n\n// doc\nlet x;\n";
        let file = SourceFile::new("t.ts", src);
        let group = leading_detached_comments(&file, 0, Some(18), file.len());
        assert_eq!(group.len(), 1);
        assert_eq!(group[0].text(src), "// header");
    }

    #[test]
    fn comment_only_container_is_all_detached() {
        let src = "// just a comment\n";
        let file = SourceFile::new("t.ts", src);
        let group = leading_detached_comments(&file, 0, None, file.len());
        assert_eq!(group.len(), 1);
    }

    #[test]
    fn footer_after_blank_line_is_detached() {
        let src = "let x;\n\n// footer\n";
        let file = SourceFile::new("t.ts", src);
        let (group, detached) = trailing_detached_comments(&file, 6, file.len()).unwrap();
        assert_eq!(group.len(), 1);
        assert!(detached);
    }

    #[test]
    fn footer_on_next_line_is_attached() {
        let src = "let x;\n// close to x\n";
        let file = SourceFile::new("t.ts", src);
        let (group, detached) = trailing_detached_comments(&file, 6, file.len()).unwrap();
        assert_eq!(group.len(), 1);
        assert!(!detached);
    }

    #[test]
    fn no_footer_comments() {
        let src = "let x;\n";
        let file = SourceFile::new("t.ts", src);
        assert!(trailing_detached_comments(&file, 6, file.len()).is_none());
    }
}
