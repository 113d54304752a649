//! Base types shared by all AST nodes.

use bitflags::bitflags;
use serde::Serialize;

/// Sentinel byte offset meaning "no position".
///
/// Synthetic nodes start out with all positions invalid; a node whose
/// displayed range has been neutralized keeps its positions but is marked
/// in the emit-info table instead, so original parse positions survive for
/// source mapping.
pub const INVALID_POS: u32 = u32::MAX;

/// Index of a node in the [`NodeArena`](super::arena::NodeArena).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeIndex(pub u32);

impl NodeIndex {
    pub const NONE: NodeIndex = NodeIndex(u32::MAX);

    #[inline]
    pub fn is_none(self) -> bool {
        self == NodeIndex::NONE
    }

    #[inline]
    pub fn is_some(self) -> bool {
        self != NodeIndex::NONE
    }
}

/// A half-open byte range `[pos, end)` into the source text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct TextRange {
    pub pos: u32,
    pub end: u32,
}

impl TextRange {
    pub fn new(pos: u32, end: u32) -> TextRange {
        TextRange { pos, end }
    }
}

bitflags! {
    /// Per-node flag word.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct NodeFlags: u16 {
        /// Node was created during rewriting rather than by the parser.
        const SYNTHETIC = 1 << 0;
        /// `export` modifier was present.
        const EXPORT = 1 << 1;
        /// `static` modifier was present.
        const STATIC = 1 << 2;
    }
}

// bitflags does not implement Serialize for the declared struct, only for
// its macro-internal type; serialize the raw bits.
impl Serialize for NodeFlags {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u16(self.bits())
    }
}

/// Syntax kind tags. Mirrors the `Node` enum variants; kept as a separate
/// enum so passes can dispatch on kind without matching the full node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum SyntaxKind {
    SourceFile,
    Block,
    VariableStatement,
    VariableDeclarationList,
    VariableDeclaration,
    ExpressionStatement,
    ClassDeclaration,
    PropertyDeclaration,
    ImportDeclaration,
    ExportDeclaration,
    ReturnStatement,
    NotEmittedStatement,
    Identifier,
    StringLiteral,
    NumericLiteral,
    CallExpression,
    PropertyAccessExpression,
    BinaryExpression,
    ParenthesizedExpression,
    ArrowFunction,
}

impl SyntaxKind {
    /// Statement-list containers get detached-comment handling instead of
    /// the per-node attached synthesis.
    pub fn is_statement_container(self) -> bool {
        matches!(self, SyntaxKind::SourceFile | SyntaxKind::Block)
    }
}

/// Common fields present in every AST node.
///
/// `pos` is the *full* start (end of the previous token, so leading trivia
/// is included), `start` is the first token of the node itself, and `end`
/// is one past the last token. Comment scans for a node run over
/// `[pos, start)`.
#[derive(Clone, Debug, Serialize)]
pub struct NodeBase {
    pub flags: NodeFlags,
    /// Full start: first byte after the previous token.
    pub pos: u32,
    /// Token start: first byte of the node's own first token.
    pub start: u32,
    /// One past the last byte of the node's last token.
    pub end: u32,
    /// Parent node, set by the parser for original nodes. Synthetic nodes
    /// keep `NONE` here; their parents live in the session parent map.
    pub parent: NodeIndex,
}

impl Default for NodeBase {
    fn default() -> Self {
        NodeBase {
            flags: NodeFlags::empty(),
            pos: INVALID_POS,
            start: INVALID_POS,
            end: INVALID_POS,
            parent: NodeIndex::NONE,
        }
    }
}

impl NodeBase {
    pub fn new(pos: u32, start: u32, end: u32) -> NodeBase {
        NodeBase {
            flags: NodeFlags::empty(),
            pos,
            start,
            end,
            parent: NodeIndex::NONE,
        }
    }

    /// Base for a node created during rewriting. No positions, no parent.
    pub fn synthetic() -> NodeBase {
        NodeBase {
            flags: NodeFlags::SYNTHETIC,
            ..NodeBase::default()
        }
    }

    #[inline]
    pub fn is_synthetic(&self) -> bool {
        self.flags.contains(NodeFlags::SYNTHETIC)
    }

    #[inline]
    pub fn has_valid_range(&self) -> bool {
        self.start != INVALID_POS && self.end != INVALID_POS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_index_sentinel() {
        assert!(NodeIndex::NONE.is_none());
        assert!(!NodeIndex::NONE.is_some());
        assert!(NodeIndex(0).is_some());
    }

    #[test]
    fn synthetic_base_has_no_range() {
        let base = NodeBase::synthetic();
        assert!(base.is_synthetic());
        assert!(!base.has_valid_range());
        assert!(base.parent.is_none());
    }

    #[test]
    fn node_base_serializes_flags_as_bits() {
        let mut base = NodeBase::new(1, 4, 9);
        base.flags |= NodeFlags::EXPORT;
        let json = serde_json::to_value(&base).unwrap();
        assert_eq!(json["flags"], 2);
        assert_eq!(json["pos"], 1);
        assert_eq!(json["start"], 4);
        assert_eq!(json["end"], 9);
    }
}
