//! Comment ranges and synthesized comments.
//!
//! Comments are not part of the AST; they are scanned out of the raw text
//! and re-attached to nodes as synthesized comments. A `CommentRange` is a
//! pure text fact and is never mutated; a `SynthesizedComment` is the
//! delimiter-stripped form the printer consumes.

use serde::Serialize;

/// Kind of a comment token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum CommentKind {
    /// `// ...`
    SingleLine,
    /// `/* ... */`
    MultiLine,
}

/// A range representing a comment in the source text.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CommentRange {
    pub kind: CommentKind,
    /// Start position (byte offset of the opening delimiter).
    pub pos: u32,
    /// End position (one past the closing delimiter or line end).
    pub end: u32,
    /// Whether a newline follows the comment.
    pub has_trailing_new_line: bool,
}

impl CommentRange {
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        let start = self.pos as usize;
        let end = self.end as usize;
        if end <= source.len() && start < end {
            &source[start..end]
        } else {
            ""
        }
    }
}

/// Scan all comment tokens in `[pos, end)` of the source text, in order.
///
/// Unlike a leading-trivia scanner that skips everything up to the first
/// newline, this never skips a comment — even one at the very first byte of
/// the range — because callers hand it arbitrary sub-ranges that do not
/// start at statement boundaries. Absence of comments yields an empty vec.
pub fn scan_comment_ranges(source: &str, pos: u32, end: u32) -> Vec<CommentRange> {
    let bytes = source.as_bytes();
    let limit = (end as usize).min(bytes.len());
    let mut comments = Vec::new();
    let mut i = pos as usize;

    while i < limit {
        let ch = bytes[i];

        if ch == b' ' || ch == b'\t' || ch == b'\r' || ch == b'\n' {
            i += 1;
            continue;
        }

        if ch == b'/' && i + 1 < limit {
            match bytes[i + 1] {
                b'/' => {
                    let start = i as u32;
                    i += 2;
                    while i < limit && bytes[i] != b'\n' && bytes[i] != b'\r' {
                        i += 1;
                    }
                    let has_trailing_new_line = i < bytes.len();
                    comments.push(CommentRange {
                        kind: CommentKind::SingleLine,
                        pos: start,
                        end: i as u32,
                        has_trailing_new_line,
                    });
                    continue;
                }
                b'*' => {
                    let start = i as u32;
                    i += 2;
                    let mut closed = false;
                    while i + 1 < limit {
                        if bytes[i] == b'*' && bytes[i + 1] == b'/' {
                            i += 2;
                            closed = true;
                            break;
                        }
                        i += 1;
                    }
                    if !closed {
                        // Unterminated block comment: claim the rest of the range.
                        i = limit;
                    }
                    let has_trailing_new_line =
                        i < bytes.len() && (bytes[i] == b'\n' || bytes[i] == b'\r');
                    comments.push(CommentRange {
                        kind: CommentKind::MultiLine,
                        pos: start,
                        end: i as u32,
                        has_trailing_new_line,
                    });
                    continue;
                }
                _ => {}
            }
        }

        // Anything else ends the trivia run.
        break;
    }

    comments
}

/// Scan comments on the same line starting at `pos` (after a node's end).
/// Stops at the first newline or non-trivia byte.
pub fn scan_trailing_comment_ranges(source: &str, pos: u32) -> Vec<CommentRange> {
    let bytes = source.as_bytes();
    let len = bytes.len();
    let mut comments = Vec::new();
    let mut i = (pos as usize).min(len);

    while i < len {
        let ch = bytes[i];

        if ch == b' ' || ch == b'\t' {
            i += 1;
            continue;
        }
        if ch == b'\n' || ch == b'\r' {
            break;
        }

        if ch == b'/' && i + 1 < len {
            match bytes[i + 1] {
                b'/' => {
                    let start = i as u32;
                    i += 2;
                    while i < len && bytes[i] != b'\n' && bytes[i] != b'\r' {
                        i += 1;
                    }
                    comments.push(CommentRange {
                        kind: CommentKind::SingleLine,
                        pos: start,
                        end: i as u32,
                        has_trailing_new_line: i < len,
                    });
                    break;
                }
                b'*' => {
                    let start = i as u32;
                    i += 2;
                    let mut closed = false;
                    while i + 1 < len {
                        if bytes[i] == b'*' && bytes[i + 1] == b'/' {
                            i += 2;
                            closed = true;
                            break;
                        }
                        i += 1;
                    }
                    if !closed {
                        i = len;
                    }
                    let has_trailing_new_line =
                        i < len && (bytes[i] == b'\n' || bytes[i] == b'\r');
                    comments.push(CommentRange {
                        kind: CommentKind::MultiLine,
                        pos: start,
                        end: i as u32,
                        has_trailing_new_line,
                    });
                    continue;
                }
                _ => break,
            }
        }

        break;
    }

    comments
}

/// A comment normalized for attachment: delimiter-stripped text, attached
/// to exactly one node as a leading or trailing entry. Immutable once
/// created; it carries no source position of its own.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SynthesizedComment {
    pub kind: CommentKind,
    /// Comment text without `//` or `/* */` delimiters.
    pub text: String,
    pub has_trailing_new_line: bool,
}

/// Convert raw comment ranges into synthesized comments.
///
/// Strips the line-comment delimiter from `//` comments and the delimiter
/// pair from `/* */` comments. Comments written with the triple-slash
/// directive form (`/// <reference .../>` and friends) are documentation
/// tooling annotations, not output, and are discarded entirely.
pub fn synthesize_comment_ranges(source: &str, ranges: &[CommentRange]) -> Vec<SynthesizedComment> {
    let mut out = Vec::with_capacity(ranges.len());
    for range in ranges {
        let raw = range.text(source);
        match range.kind {
            CommentKind::SingleLine => {
                if raw.starts_with("///") {
                    continue;
                }
                let text = raw.strip_prefix("//").unwrap_or(raw).to_string();
                out.push(SynthesizedComment {
                    kind: CommentKind::SingleLine,
                    text,
                    has_trailing_new_line: range.has_trailing_new_line,
                });
            }
            CommentKind::MultiLine => {
                let text = raw
                    .strip_prefix("/*")
                    .unwrap_or(raw)
                    .strip_suffix("*/")
                    .unwrap_or_else(|| raw.strip_prefix("/*").unwrap_or(raw))
                    .to_string();
                out.push(SynthesizedComment {
                    kind: CommentKind::MultiLine,
                    text,
                    has_trailing_new_line: range.has_trailing_new_line,
                });
            }
        }
    }
    out
}
