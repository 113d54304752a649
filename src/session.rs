//! Per-file session state threaded through the three passes.
//!
//! One `FileSession` exists per file per transform run. It is created at
//! the start of the pre-pass, mutated in place by all three passes, and
//! dropped when the file's output has been printed. Reusing it for another
//! file is a pipeline-ordering bug and fails loudly rather than silently
//! corrupting attachment state.

use rustc_hash::FxHashMap;
use std::fmt;

use crate::ast::{NodeArena, NodeIndex};
use crate::comments::SynthesizedComment;
use crate::emit_info::EmitInfoTable;
use crate::source_file::SourceFile;

/// Illegal pipeline state. These are not recoverable: they mean the passes
/// ran out of order or against mismatched files.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionError {
    /// A pass expected session state but none exists — the pre-pass was
    /// never run for this file.
    Missing { file_name: String },
    /// The session was created for a different file than the one being
    /// visited.
    FileMismatch { expected: String, found: String },
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Missing { file_name } => {
                write!(
                    f,
                    "no comment session for '{file_name}': the pre-pass must run before any other pass"
                )
            }
            SessionError::FileMismatch { expected, found } => {
                write!(
                    f,
                    "comment session for '{expected}' used while visiting '{found}'"
                )
            }
        }
    }
}

impl std::error::Error for SessionError {}

/// Mutable per-file context shared by the pre-pass, the semantic rewrite,
/// and the post-pass.
#[derive(Debug)]
pub struct FileSession {
    file_name: String,
    /// Parents for every node the pre-pass walked plus synthetic nodes
    /// registered during rewriting. Freshly created nodes have no parent
    /// field of their own, and the emitter requires every reachable node
    /// to have one.
    parent_of: FxHashMap<NodeIndex, NodeIndex>,
    /// Import and re-export declarations that carry a module specifier,
    /// in source order. The post-pass matches lowered require calls back
    /// to these by original start position.
    module_refs: Vec<NodeIndex>,
    /// Source offset up to which leading comments have been claimed.
    /// Monotonically non-decreasing across the pre-pass walk; comments at
    /// or before it must not be attached again.
    comment_cursor: u32,
    /// Footer comments that classified as attached to a statement, parked
    /// until that statement's own trailing synthesis runs so list order
    /// matches source order.
    deferred_trailing: FxHashMap<NodeIndex, Vec<SynthesizedComment>>,
    pub emit: EmitInfoTable,
}

impl FileSession {
    pub fn new(file: &SourceFile) -> FileSession {
        tracing::debug!(file = %file.file_name, "creating comment session");
        FileSession {
            file_name: file.file_name.clone(),
            parent_of: FxHashMap::default(),
            module_refs: Vec::new(),
            comment_cursor: 0,
            deferred_trailing: FxHashMap::default(),
            emit: EmitInfoTable::new(),
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Assert this session belongs to the file being visited.
    pub fn check_file(&self, file: &SourceFile) -> Result<(), SessionError> {
        if self.file_name != file.file_name {
            return Err(SessionError::FileMismatch {
                expected: self.file_name.clone(),
                found: file.file_name.clone(),
            });
        }
        Ok(())
    }

    // =========================================================================
    // Parent tracking
    // =========================================================================

    pub fn set_parent(&mut self, child: NodeIndex, parent: NodeIndex) {
        self.parent_of.insert(child, parent);
    }

    /// Parent lookup covering synthetic nodes: the session map first, then
    /// the parser-assigned parent field.
    pub fn parent_of(&self, node: NodeIndex, arena: &NodeArena) -> NodeIndex {
        if let Some(&parent) = self.parent_of.get(&node) {
            return parent;
        }
        arena.parent(node)
    }

    // =========================================================================
    // Import / re-export tracking
    // =========================================================================

    pub fn record_module_ref(&mut self, node: NodeIndex) {
        self.module_refs.push(node);
    }

    pub fn module_refs(&self) -> &[NodeIndex] {
        &self.module_refs
    }

    /// Find the recorded import/re-export whose original token start is
    /// `start`.
    pub fn module_ref_at(&self, arena: &NodeArena, start: u32) -> Option<NodeIndex> {
        self.module_refs
            .iter()
            .copied()
            .find(|&idx| arena.base(idx).is_some_and(|b| b.start == start))
    }

    // =========================================================================
    // Comment cursor
    // =========================================================================

    pub fn comment_cursor(&self) -> u32 {
        self.comment_cursor
    }

    /// Advance the claimed-comments high-water mark. The cursor never moves
    /// backwards; a lower value is ignored.
    pub fn advance_cursor(&mut self, pos: u32) {
        if pos > self.comment_cursor {
            tracing::trace!(from = self.comment_cursor, to = pos, "advancing comment cursor");
            self.comment_cursor = pos;
        }
    }

    // =========================================================================
    // Deferred trailing comments
    // =========================================================================

    pub fn defer_trailing(&mut self, node: NodeIndex, comments: Vec<SynthesizedComment>) {
        if !comments.is_empty() {
            self.deferred_trailing.entry(node).or_default().extend(comments);
        }
    }

    pub fn take_deferred_trailing(&mut self, node: NodeIndex) -> Vec<SynthesizedComment> {
        self.deferred_trailing.remove(&node).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_is_monotone() {
        let file = SourceFile::new("a.ts", "let x;");
        let mut session = FileSession::new(&file);
        session.advance_cursor(10);
        session.advance_cursor(4);
        assert_eq!(session.comment_cursor(), 10);
    }

    #[test]
    fn file_mismatch_fails_loudly() {
        let a = SourceFile::new("a.ts", "");
        let b = SourceFile::new("b.ts", "");
        let session = FileSession::new(&a);
        assert!(session.check_file(&a).is_ok());
        let err = session.check_file(&b).unwrap_err();
        assert_eq!(
            err,
            SessionError::FileMismatch {
                expected: "a.ts".to_string(),
                found: "b.ts".to_string(),
            }
        );
        assert!(err.to_string().contains("b.ts"));
    }

    #[test]
    fn parent_lookup_prefers_session_map() {
        let file = SourceFile::new("a.ts", "");
        let arena = NodeArena::new();
        let mut session = FileSession::new(&file);
        session.set_parent(NodeIndex(3), NodeIndex(7));
        assert_eq!(session.parent_of(NodeIndex(3), &arena), NodeIndex(7));
        assert_eq!(session.parent_of(NodeIndex(4), &arena), NodeIndex::NONE);
    }
}
