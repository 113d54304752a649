//! Post-pass: comment repair after the semantic rewrite.
//!
//! The rewrite reuses original name and initializer nodes inside brand-new
//! statements and never moves comment data. This pass walks the lowered
//! tree with an explicit ancestor path and re-homes the stranded
//! synthesized comments:
//!
//! - an identifier whose parse-time parent is a property declaration with
//!   an initializer marks the prototype/constructor assignment built from
//!   that member;
//! - an identifier whose parse-time great-grandparent is an exported
//!   variable statement marks an `exports.x` assignment built from that
//!   group;
//! - a statement sharing its start position with a recorded import or
//!   re-export is its lowered `require` form.
//!
//! Pattern misses are normal (most identifiers match nothing) and skip
//! silently. A missing or mismatched session is a pipeline bug and fails
//! loudly.

use tracing::{debug, trace};

use crate::ast::{Node, NodeArena, NodeFlags, NodeIndex, SyntaxKind};
use crate::session::{FileSession, SessionError};
use crate::source_file::SourceFile;

pub struct PostPass<'a> {
    file: &'a SourceFile,
    arena: &'a NodeArena,
    session: &'a mut FileSession,
    /// Ancestors of the node currently being visited, outermost first.
    path: Vec<NodeIndex>,
}

impl<'a> PostPass<'a> {
    pub fn new(
        file: &'a SourceFile,
        arena: &'a NodeArena,
        session: &'a mut FileSession,
    ) -> PostPass<'a> {
        PostPass {
            file,
            arena,
            session,
            path: Vec::new(),
        }
    }

    pub fn run(&mut self, root: NodeIndex) -> Result<(), SessionError> {
        self.session.check_file(self.file)?;
        self.visit(root);
        debug!(file = %self.file.file_name, "post-pass complete");
        Ok(())
    }

    fn visit(&mut self, node: NodeIndex) {
        if node.is_none() {
            return;
        }
        match self.arena.kind(node) {
            Some(SyntaxKind::Identifier) => self.repair_identifier(node),
            Some(SyntaxKind::ExpressionStatement) | Some(SyntaxKind::VariableStatement) => {
                self.repair_module_ref(node)
            }
            _ => {}
        }

        let children = self.arena.get(node).map(|n| n.children()).unwrap_or_default();
        self.path.push(node);
        for child in children {
            self.visit(child);
        }
        self.path.pop();
    }

    /// The nearest expression statement on the current ancestor path. The
    /// path, not parent links: the reused identifier's parse-time parents
    /// point back into the original construct.
    fn enclosing_expression_statement(&self) -> Option<NodeIndex> {
        self.path
            .iter()
            .rev()
            .copied()
            .find(|&n| self.arena.kind(n) == Some(SyntaxKind::ExpressionStatement))
    }

    fn repair_identifier(&mut self, node: NodeIndex) {
        let parent = self.arena.parent(node);

        // Member name reused inside `C.prototype.x = init`.
        if let Some(Node::PropertyDeclaration(prop)) = self.arena.get(parent) {
            if prop.name == node && prop.initializer.is_some() {
                let Some(stmt) = self.enclosing_expression_statement() else {
                    trace!(node = node.0, "member name outside any expression statement");
                    return;
                };
                trace!(node = node.0, stmt = stmt.0, "repairing property initializer comments");
                self.session.emit.move_comments(parent, stmt);
                return;
            }
        }

        // Declared name reused inside `exports.x = init`: the parse-time
        // chain climbs declaration, declaration list, statement.
        if let Some(Node::VariableDeclaration(decl)) = self.arena.get(parent) {
            if decl.name != node {
                return;
            }
            let list = self.arena.parent(parent);
            if self.arena.kind(list) != Some(SyntaxKind::VariableDeclarationList) {
                return;
            }
            let var_stmt = self.arena.parent(list);
            let exported = self
                .arena
                .base(var_stmt)
                .is_some_and(|b| b.flags.contains(NodeFlags::EXPORT));
            if self.arena.kind(var_stmt) != Some(SyntaxKind::VariableStatement) || !exported {
                return;
            }
            let Some(stmt) = self.enclosing_expression_statement() else {
                trace!(node = node.0, "exported name outside any expression statement");
                return;
            };
            trace!(node = node.0, stmt = stmt.0, "repairing exported variable comments");
            self.session.emit.move_comments(var_stmt, stmt);
        }
    }

    /// A statement synthesized at an import's original position is its
    /// lowered `require` form: give it the import's comments and close the
    /// duplication window its carried-over range left open.
    fn repair_module_ref(&mut self, node: NodeIndex) {
        let Some(base) = self.arena.base(node) else {
            return;
        };
        if !base.is_synthetic() || !base.has_valid_range() || !self.is_require_statement(node) {
            return;
        }
        let Some(import) = self.session.module_ref_at(self.arena, base.start) else {
            trace!(start = base.start, "require statement matches no recorded module ref");
            return;
        };
        trace!(node = node.0, import = import.0, "repairing module ref comments");
        self.session.emit.move_comments(import, node);
        self.session.emit.neutralize_text_range(node, self.arena);
    }

    fn is_require_statement(&self, node: NodeIndex) -> bool {
        let call = match self.arena.get(node) {
            Some(Node::ExpressionStatement(es)) => es.expression,
            Some(Node::VariableStatement(vs)) => {
                let Some(Node::VariableDeclarationList(list)) = self.arena.get(vs.decl_list) else {
                    return false;
                };
                let &[declaration] = &list.declarations[..] else {
                    return false;
                };
                match self.arena.get(declaration) {
                    Some(Node::VariableDeclaration(decl)) => decl.initializer,
                    _ => return false,
                }
            }
            _ => return false,
        };
        // Only the canonical form counts: `require` called with exactly one
        // string literal. Anything else is user code that happens to share
        // the name.
        match self.arena.get(call) {
            Some(Node::CallExpression(c)) => {
                self.arena.identifier_text(c.expression) == Some("require")
                    && c.arguments.len() == 1
                    && self.arena.kind(c.arguments[0]) == Some(SyntaxKind::StringLiteral)
            }
            _ => false,
        }
    }
}
