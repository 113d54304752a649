//! Immutable source file: raw text plus a line-offset table.
//!
//! Many trees may reference the same `SourceFile`, so it is never mutated
//! after construction. The line table is computed once with `memchr`.

use std::sync::Arc;

use serde::Serialize;

#[derive(Clone, Debug, Serialize)]
pub struct SourceFile {
    pub file_name: String,
    #[serde(serialize_with = "serialize_arc_str")]
    pub text: Arc<str>,
    /// Byte offset of the first character of each line.
    line_starts: Vec<u32>,
}

fn serialize_arc_str<S>(arc: &Arc<str>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(arc)
}

impl SourceFile {
    pub fn new(file_name: impl Into<String>, text: impl Into<Arc<str>>) -> SourceFile {
        let text = text.into();
        let mut line_starts = vec![0u32];
        for nl in memchr::memchr_iter(b'\n', text.as_bytes()) {
            line_starts.push(nl as u32 + 1);
        }
        SourceFile {
            file_name: file_name.into(),
            text,
            line_starts,
        }
    }

    pub fn len(&self) -> u32 {
        self.text.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Zero-based line number containing the byte offset.
    pub fn line_of(&self, pos: u32) -> u32 {
        match self.line_starts.binary_search(&pos) {
            Ok(line) => line as u32,
            Err(insert) => insert as u32 - 1,
        }
    }

    /// Zero-based (line, column) for diagnostics.
    pub fn line_and_column(&self, pos: u32) -> (u32, u32) {
        let line = self.line_of(pos);
        (line, pos - self.line_starts[line as usize])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_table() {
        let file = SourceFile::new("test.ts", "ab\ncd\n\nef");
        assert_eq!(file.line_of(0), 0);
        assert_eq!(file.line_of(2), 0);
        assert_eq!(file.line_of(3), 1);
        assert_eq!(file.line_of(6), 2);
        assert_eq!(file.line_of(7), 3);
        assert_eq!(file.line_and_column(4), (1, 1));
    }

    #[test]
    fn empty_file_has_one_line() {
        let file = SourceFile::new("empty.ts", "");
        assert_eq!(file.line_of(0), 0);
    }
}
