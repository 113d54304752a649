//! Node arena for AST storage.
//!
//! Nodes are stored contiguously and referenced by index. Original nodes
//! (those produced by the parser) are treated as read-only for the lifetime
//! of the arena; rewrites allocate new nodes instead of mutating in place.

use serde::Serialize;

use super::base::{NodeBase, NodeIndex, SyntaxKind};
use super::node::Node;

#[derive(Debug, Default, Serialize)]
pub struct NodeArena {
    nodes: Vec<Node>,
}

impl NodeArena {
    pub fn new() -> NodeArena {
        NodeArena { nodes: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> NodeArena {
        NodeArena {
            nodes: Vec::with_capacity(capacity),
        }
    }

    /// Add a node to the arena and return its index.
    pub fn add(&mut self, node: Node) -> NodeIndex {
        let index = self.nodes.len() as u32;
        self.nodes.push(node);
        NodeIndex(index)
    }

    pub fn get(&self, index: NodeIndex) -> Option<&Node> {
        if index.is_none() {
            None
        } else {
            self.nodes.get(index.0 as usize)
        }
    }

    /// Parser-only: wire a child's parent field while the tree is still
    /// being built. Once a tree is published, parents of original nodes
    /// never change; synthetic nodes get parents via the session map.
    pub(crate) fn set_parent(&mut self, child: NodeIndex, parent: NodeIndex) {
        if child.is_none() {
            return;
        }
        if let Some(node) = self.nodes.get_mut(child.0 as usize) {
            node.base_mut().parent = parent;
        }
    }

    pub fn kind(&self, index: NodeIndex) -> Option<SyntaxKind> {
        self.get(index).map(|n| n.kind())
    }

    pub fn base(&self, index: NodeIndex) -> Option<&NodeBase> {
        self.get(index).map(|n| n.base())
    }

    /// Parent recorded on the node itself (parser-assigned). Synthetic
    /// nodes return `NONE`; their parents live in the session map.
    pub fn parent(&self, index: NodeIndex) -> NodeIndex {
        self.base(index).map_or(NodeIndex::NONE, |b| b.parent)
    }

    pub fn identifier_text(&self, index: NodeIndex) -> Option<&str> {
        match self.get(index)? {
            Node::Identifier(ident) => Some(&ident.text),
            _ => None,
        }
    }

    pub fn string_literal_text(&self, index: NodeIndex) -> Option<&str> {
        match self.get(index)? {
            Node::StringLiteral(lit) => Some(&lit.text),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::super::node::IdentifierNode;
    use super::*;

    #[test]
    fn add_and_get() {
        let mut arena = NodeArena::new();
        let idx = arena.add(Node::Identifier(IdentifierNode {
            base: NodeBase::new(0, 0, 3),
            text: "foo".to_string(),
        }));
        assert_eq!(arena.kind(idx), Some(SyntaxKind::Identifier));
        assert_eq!(arena.identifier_text(idx), Some("foo"));
        assert!(arena.get(NodeIndex::NONE).is_none());
    }

    #[test]
    fn parent_wiring() {
        let mut arena = NodeArena::new();
        let child = arena.add(Node::Identifier(IdentifierNode {
            base: NodeBase::new(0, 0, 1),
            text: "a".to_string(),
        }));
        let parent = arena.add(Node::Identifier(IdentifierNode {
            base: NodeBase::new(0, 0, 1),
            text: "b".to_string(),
        }));
        arena.set_parent(child, parent);
        assert_eq!(arena.parent(child), parent);
        assert_eq!(arena.parent(parent), NodeIndex::NONE);
    }
}
