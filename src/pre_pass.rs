//! Pre-pass: comment capture and attachment.
//!
//! Runs over the original tree before any semantic rewrite touches it.
//! For every node it records parents and import/re-export declarations in
//! the session, synthesizes attached comments out of the surrounding
//! trivia, synthesizes detached header/footer groups for statement-list
//! containers onto placeholder statements, and finally neutralizes the
//! node's text range so the printer cannot emit the original comment text
//! a second time.
//!
//! The walk is strictly source-ordered; the session's comment cursor
//! enforces that a comment range is claimed by at most one node.

use tracing::{debug, trace};

use crate::ast::{
    Node, NodeArena, NodeBase, NodeFlags, NodeIndex, NotEmittedStatementNode, SyntaxKind,
};
use crate::comments::{
    scan_comment_ranges, scan_trailing_comment_ranges, synthesize_comment_ranges,
};
use crate::detach::{leading_detached_comments, trailing_detached_comments};
use crate::session::{FileSession, SessionError};
use crate::source_file::SourceFile;

pub struct PrePass<'a> {
    file: &'a SourceFile,
    arena: &'a mut NodeArena,
    session: &'a mut FileSession,
}

impl<'a> PrePass<'a> {
    pub fn new(
        file: &'a SourceFile,
        arena: &'a mut NodeArena,
        session: &'a mut FileSession,
    ) -> PrePass<'a> {
        PrePass {
            file,
            arena,
            session,
        }
    }

    /// Process a source file tree. Returns the (possibly rebuilt) root.
    pub fn run(&mut self, root: NodeIndex) -> Result<NodeIndex, SessionError> {
        self.session.check_file(self.file)?;
        let result = self.visit_node(root);
        debug!(
            file = %self.file.file_name,
            nodes_with_emit_data = self.session.emit.len(),
            module_refs = self.session.module_refs().len(),
            "pre-pass complete"
        );
        Ok(result)
    }

    fn visit_node(&mut self, node: NodeIndex) -> NodeIndex {
        let Some(base) = self.arena.base(node) else {
            return node;
        };
        if base.is_synthetic() {
            return node;
        }
        let kind = self.arena.kind(node).unwrap_or(SyntaxKind::NotEmittedStatement);

        if kind.is_statement_container() {
            return self.visit_container(node, kind);
        }

        match self.arena.get(node) {
            Some(Node::ImportDeclaration(_)) => self.session.record_module_ref(node),
            Some(Node::ExportDeclaration(decl)) if decl.module_specifier.is_some() => {
                self.session.record_module_ref(node)
            }
            _ => {}
        }

        // A single-expression lambda body is exempt from synthesis: pulling
        // its leading comments onto synthesized lists would let the emitter
        // place a line comment where automatic statement termination breaks
        // the code that follows.
        if self.is_arrow_expression_body(node) {
            return self.visit_children(node);
        }

        let trailing_claim_end = self.synthesize_attached(node);
        let result = self.visit_children(node);
        if let Some(end) = trailing_claim_end {
            self.session.advance_cursor(end);
        }

        if keeps_range_through_rewrite(self.arena, result) {
            self.session.emit.suppress_original_comments(result);
        } else {
            self.session.emit.neutralize_text_range(result, self.arena);
        }
        result
    }

    fn is_arrow_expression_body(&self, node: NodeIndex) -> bool {
        let parent = self.arena.parent(node);
        match self.arena.get(parent) {
            Some(Node::ArrowFunction(arrow)) => {
                arrow.body == node && self.arena.kind(node) != Some(SyntaxKind::Block)
            }
            _ => false,
        }
    }

    // =========================================================================
    // Attached comment synthesis (per node)
    // =========================================================================

    /// Synthesize the comments glued to this node. Leading comments advance
    /// the cursor immediately; the trailing claim is returned so the caller
    /// can apply it after the node's children have been walked.
    fn synthesize_attached(&mut self, node: NodeIndex) -> Option<u32> {
        let base = self.arena.base(node)?.clone();
        if !base.has_valid_range() {
            return None;
        }
        let parent_base = self.arena.base(base.parent);
        let parent_is_container = self
            .arena
            .kind(base.parent)
            .is_some_and(|k| k.is_statement_container());

        // Leading: skipped when the node is the first token of its parent —
        // the parent's own synthesis already covers that region. Container
        // parents never cover it, so they don't count.
        let shares_full_start = !parent_is_container
            && parent_base.is_some_and(|p| p.pos == base.pos);
        if !shares_full_start {
            let scan_from = base.pos.max(self.session.comment_cursor());
            if scan_from < base.start {
                let ranges = scan_comment_ranges(&self.file.text, scan_from, base.start);
                if !ranges.is_empty() {
                    let synthesized = synthesize_comment_ranges(&self.file.text, &ranges);
                    trace!(
                        node = node.0,
                        count = synthesized.len(),
                        "attaching leading comments"
                    );
                    self.session.emit.append_leading(node, synthesized);
                    self.session.advance_cursor(base.start);
                }
            }
        }

        // Trailing: same-line comments after the node's end, unless the
        // parent ends at the same offset and claims them itself.
        let shares_end = !parent_is_container && parent_base.is_some_and(|p| p.end == base.end);
        let mut claim_end = None;
        if !shares_end {
            let ranges = scan_trailing_comment_ranges(&self.file.text, base.end);
            if let Some(last) = ranges.last() {
                claim_end = Some(last.end);
                let synthesized = synthesize_comment_ranges(&self.file.text, &ranges);
                trace!(
                    node = node.0,
                    count = synthesized.len(),
                    "attaching trailing comments"
                );
                self.session.emit.append_trailing(node, synthesized);
            }
        }
        // Footer comments parked by the container pass come after the
        // node's own same-line trailers.
        let deferred = self.session.take_deferred_trailing(node);
        self.session.emit.append_trailing(node, deferred);

        claim_end
    }

    // =========================================================================
    // Child visitation (copy-on-write)
    // =========================================================================

    fn visit_children(&mut self, node: NodeIndex) -> NodeIndex {
        let children = self.arena.get(node).map(|n| n.children()).unwrap_or_default();
        let mut replacements: Vec<(NodeIndex, NodeIndex)> = Vec::new();
        for child in &children {
            let new_child = self.visit_node(*child);
            if new_child != *child {
                replacements.push((*child, new_child));
            }
        }

        let result = if replacements.is_empty() {
            node
        } else {
            let mut clone = self.arena.get(node).expect("node exists").clone();
            for (old, new) in &replacements {
                clone.replace_child(*old, *new);
            }
            clone.base_mut().flags |= NodeFlags::SYNTHETIC;
            let idx = self.arena.add(clone);
            self.session.emit.transfer(node, idx);
            self.session.set_parent(idx, self.arena.parent(node));
            idx
        };

        // Record the final parent relation for every child so ancestor
        // lookups cover rebuilt and synthetic nodes.
        let final_children = self.arena.get(result).map(|n| n.children()).unwrap_or_default();
        for child in final_children {
            self.session.set_parent(child, result);
        }
        result
    }

    // =========================================================================
    // Detached (container-level) comment synthesis
    // =========================================================================

    fn visit_container(&mut self, node: NodeIndex, kind: SyntaxKind) -> NodeIndex {
        let base = self.arena.base(node).expect("container exists").clone();
        // A block is itself a statement and claims the comments glued to
        // its braces before its interior is scanned.
        let trailing_claim_end = if kind == SyntaxKind::Block {
            self.synthesize_attached(node)
        } else {
            None
        };
        let statements: Vec<NodeIndex> = self
            .arena
            .get(node)
            .and_then(|n| n.statements().map(|s| s.to_vec()))
            .unwrap_or_default();

        // The scannable interior of the container: the whole file, or the
        // region between the braces.
        let (scan_pos, scan_limit) = if kind == SyntaxKind::SourceFile {
            (0, self.file.len())
        } else {
            (base.start + 1, base.end.saturating_sub(1))
        };

        let front = self.synthesize_detached_leading(&statements, scan_pos, scan_limit);
        let back = self.synthesize_detached_trailing(&statements, scan_limit);

        let mut changed = front.is_some() || back.is_some();
        let mut new_statements = Vec::with_capacity(statements.len() + 2);
        if let Some(placeholder) = front {
            new_statements.push(placeholder);
        }
        for stmt in &statements {
            let new_stmt = self.visit_node(*stmt);
            if new_stmt != *stmt {
                changed = true;
            }
            new_statements.push(new_stmt);
        }
        if let Some(placeholder) = back {
            new_statements.push(placeholder);
        }

        // Rebuild only when the statement list actually changed, so
        // downstream logic keyed off node identity is not disturbed.
        let result = if changed {
            let mut clone = self.arena.get(node).expect("container exists").clone();
            match &mut clone {
                Node::SourceFile(n) => n.statements = new_statements.clone(),
                Node::Block(n) => n.statements = new_statements.clone(),
                _ => unreachable!("statement container"),
            }
            clone.base_mut().flags |= NodeFlags::SYNTHETIC;
            let idx = self.arena.add(clone);
            self.session.emit.transfer(node, idx);
            self.session.set_parent(idx, self.arena.parent(node));
            for stmt in &new_statements {
                self.session.set_parent(*stmt, idx);
            }
            idx
        } else {
            for stmt in &new_statements {
                self.session.set_parent(*stmt, node);
            }
            node
        };

        if let Some(end) = trailing_claim_end {
            self.session.advance_cursor(end);
        }
        self.session.emit.neutralize_text_range(result, self.arena);
        result
    }

    /// Detached header: a comment group separated from the first statement
    /// by a blank line becomes the trailing comments of a placeholder
    /// spliced in front of the statements.
    fn synthesize_detached_leading(
        &mut self,
        statements: &[NodeIndex],
        scan_pos: u32,
        scan_limit: u32,
    ) -> Option<NodeIndex> {
        let first_start = statements
            .first()
            .and_then(|&s| self.arena.base(s))
            .map(|b| b.start);
        let group = match first_start {
            Some(_) => leading_detached_comments(self.file, scan_pos, first_start, scan_limit),
            // No statements: every comment in the container belongs to the
            // header, blank-line gaps between groups included.
            None => scan_comment_ranges(&self.file.text, scan_pos, scan_limit),
        };
        let last_end = group.last()?.end;
        let synthesized = synthesize_comment_ranges(&self.file.text, &group);
        self.session.advance_cursor(last_end);
        if synthesized.is_empty() {
            return None;
        }
        trace!(count = synthesized.len(), "detached header group");
        let placeholder = self.create_placeholder(scan_pos);
        self.session.emit.append_trailing(placeholder, synthesized);
        Some(placeholder)
    }

    /// Detached footer: comments after the last statement. A group on the
    /// very next line still belongs to that statement and is parked for
    /// its trailing synthesis; a group past a blank line gets a
    /// placeholder at the back of the list.
    fn synthesize_detached_trailing(
        &mut self,
        statements: &[NodeIndex],
        scan_limit: u32,
    ) -> Option<NodeIndex> {
        let last = *statements.last()?;
        let last_end = self.arena.base(last)?.end;
        let same_line = scan_trailing_comment_ranges(&self.file.text, last_end);
        let scan_from = same_line.last().map_or(last_end, |c| c.end);
        let (ranges, detached) = trailing_detached_comments(self.file, scan_from, scan_limit)?;
        let synthesized = synthesize_comment_ranges(&self.file.text, &ranges);
        if synthesized.is_empty() {
            return None;
        }
        if detached {
            trace!(count = synthesized.len(), "detached footer group");
            let placeholder = self.create_placeholder(scan_limit);
            self.session.emit.append_leading(placeholder, synthesized);
            Some(placeholder)
        } else {
            trace!(count = synthesized.len(), "footer attached to last statement");
            self.session.defer_trailing(last, synthesized);
            None
        }
    }

    /// A zero-width statement that emits nothing and exists only to carry
    /// synthesized comments.
    fn create_placeholder(&mut self, at: u32) -> NodeIndex {
        let mut base = NodeBase::synthetic();
        base.pos = at;
        base.start = at;
        base.end = at;
        self.arena
            .add(Node::NotEmittedStatement(NotEmittedStatementNode { base }))
    }
}

/// Declarations whose desugared output must be correlated back to the
/// original construct by byte position keep their range through the
/// semantic rewrite; everything else has its displayed range reset as soon
/// as its comments are synthesized.
fn keeps_range_through_rewrite(arena: &NodeArena, node: NodeIndex) -> bool {
    match arena.get(node) {
        Some(Node::ClassDeclaration(_)) => true,
        Some(Node::VariableDeclaration(_)) => true,
        Some(Node::VariableStatement(stmt)) => stmt.base.flags.contains(NodeFlags::EXPORT),
        Some(Node::PropertyDeclaration(prop)) => prop.initializer.is_some(),
        Some(Node::ImportDeclaration(_)) => true,
        Some(Node::ExportDeclaration(decl)) => decl.module_specifier.is_some(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit_info::EmitFlags;
    use crate::parser::ParserState;

    fn run_pre_pass(source: &str) -> (SourceFile, NodeArena, FileSession, NodeIndex) {
        let mut parser = ParserState::new("test.ts", source);
        let root = parser.parse_source_file().expect("parse failed");
        let (file, mut arena) = parser.into_parts();
        let mut session = FileSession::new(&file);
        let root = PrePass::new(&file, &mut arena, &mut session)
            .run(root)
            .expect("pre-pass failed");
        (file, arena, session, root)
    }

    fn statements(arena: &NodeArena, root: NodeIndex) -> Vec<NodeIndex> {
        arena.get(root).unwrap().statements().unwrap().to_vec()
    }

    #[test]
    fn comment_only_file_claims_every_group() {
        let (_file, arena, session, root) = run_pre_pass("// a\n\n// b\n");
        let stmts = statements(&arena, root);
        assert_eq!(stmts.len(), 1);
        assert_eq!(arena.kind(stmts[0]), Some(SyntaxKind::NotEmittedStatement));
        let trailing = session.emit.trailing_comments(stmts[0]);
        assert_eq!(trailing.len(), 2);
        assert_eq!(trailing[0].text, " a");
        assert_eq!(trailing[1].text, " b");
    }

    #[test]
    fn attaches_leading_comment_to_statement() {
        let (_file, arena, session, root) = run_pre_pass("// doc\nlet x;\n");
        let stmts = statements(&arena, root);
        assert_eq!(stmts.len(), 1);
        let leading = session.emit.leading_comments(stmts[0]);
        assert_eq!(leading.len(), 1);
        assert_eq!(leading[0].text, " doc");
    }

    #[test]
    fn detached_header_gets_placeholder() {
        let (_file, arena, session, root) = run_pre_pass("// license\n\nlet x;\n");
        let stmts = statements(&arena, root);
        assert_eq!(stmts.len(), 2);
        assert_eq!(arena.kind(stmts[0]), Some(SyntaxKind::NotEmittedStatement));
        let trailing = session.emit.trailing_comments(stmts[0]);
        assert_eq!(trailing.len(), 1);
        assert_eq!(trailing[0].text, " license");
        // The statement itself claims nothing.
        assert!(session.emit.leading_comments(stmts[1]).is_empty());
    }

    #[test]
    fn detached_footer_gets_placeholder() {
        let (_file, arena, session, root) = run_pre_pass("let x;\n\n// footer\n");
        let stmts = statements(&arena, root);
        assert_eq!(stmts.len(), 2);
        assert_eq!(arena.kind(stmts[1]), Some(SyntaxKind::NotEmittedStatement));
        assert_eq!(session.emit.leading_comments(stmts[1])[0].text, " footer");
    }

    #[test]
    fn near_footer_attaches_to_last_statement() {
        let (_file, arena, session, root) = run_pre_pass("let x; // same line\n// next line\n");
        let stmts = statements(&arena, root);
        assert_eq!(stmts.len(), 1);
        let trailing = session.emit.trailing_comments(stmts[0]);
        assert_eq!(trailing.len(), 2);
        assert_eq!(trailing[0].text, " same line");
        assert_eq!(trailing[1].text, " next line");
    }

    #[test]
    fn cursor_prevents_double_attachment() {
        // The header is claimed by the placeholder; the statement must not
        // claim it again even though its full start covers the region.
        let (_file, _arena, session, root) = run_pre_pass("// header\n\nlet x;\n");
        let mut total = 0;
        for (_, info) in session.emit.iter() {
            total += info.leading.len() + info.trailing.len();
        }
        assert_eq!(total, 1);
        assert!(root.is_some());
    }

    #[test]
    fn trailing_comment_attaches_to_statement() {
        let (_file, arena, session, root) = run_pre_pass("let x = 1; // note\nlet y = 2;\n");
        let stmts = statements(&arena, root);
        let trailing = session.emit.trailing_comments(stmts[0]);
        assert_eq!(trailing.len(), 1);
        assert_eq!(trailing[0].text, " note");
        assert!(session.emit.leading_comments(stmts[1]).is_empty());
    }

    #[test]
    fn import_is_recorded_and_keeps_range() {
        let (_file, _arena, session, root) = run_pre_pass("// keep\nimport {a} from 'm';\n");
        assert_eq!(session.module_refs().len(), 1);
        let import = session.module_refs()[0];
        assert_eq!(session.emit.leading_comments(import).len(), 1);
        let flags = session.emit.flags(import);
        assert!(flags.contains(EmitFlags::NO_ORIGINAL_COMMENTS));
        assert!(!flags.contains(EmitFlags::RANGE_RESET));
        assert!(root.is_some());
    }

    #[test]
    fn plain_statement_range_is_reset() {
        let (_file, arena, session, root) = run_pre_pass("// doc\nf();\n");
        let stmts = statements(&arena, root);
        let flags = session.emit.flags(stmts[0]);
        assert!(flags.contains(EmitFlags::NO_ORIGINAL_COMMENTS));
        assert!(flags.contains(EmitFlags::RANGE_RESET));
        let info = session.emit.get(stmts[0]).unwrap();
        assert!(info.source_map_range.is_some());
    }

    #[test]
    fn arrow_expression_body_is_exempt() {
        let (_file, arena, session, root) = run_pre_pass("var f = () => /* c */ 1 + 2;\n");
        let stmts = statements(&arena, root);
        assert_eq!(stmts.len(), 1);
        // No synthesized comment anywhere: the body carve-out leaves the
        // block comment alone.
        for (_, info) in session.emit.iter() {
            assert!(info.leading.is_empty());
            assert!(info.trailing.is_empty());
        }
    }

    #[test]
    fn block_gets_its_own_detached_header() {
        let (_file, arena, session, root) = run_pre_pass("{\n  // header\n\n  f();\n}\n");
        let stmts = statements(&arena, root);
        let block_stmts = statements(&arena, stmts[0]);
        assert_eq!(block_stmts.len(), 2);
        assert_eq!(
            arena.kind(block_stmts[0]),
            Some(SyntaxKind::NotEmittedStatement)
        );
        assert_eq!(
            session.emit.trailing_comments(block_stmts[0])[0].text,
            " header"
        );
    }

    #[test]
    fn rebuilt_container_keeps_comment_data() {
        // The file is rebuilt (placeholder spliced); the statement keeps
        // its synthesized comments through the rebuild.
        let (_file, arena, session, root) = run_pre_pass("// h\n\n// doc\nlet x;\n");
        let stmts = statements(&arena, root);
        assert_eq!(stmts.len(), 2);
        assert!(arena.base(root).unwrap().is_synthetic());
        assert_eq!(session.emit.leading_comments(stmts[1])[0].text, " doc");
    }

    #[test]
    fn session_for_wrong_file_is_rejected() {
        let mut parser = ParserState::new("a.ts", "let x;");
        let root = parser.parse_source_file().unwrap();
        let (file, mut arena) = parser.into_parts();
        let other = SourceFile::new("b.ts", "let x;");
        let mut session = FileSession::new(&other);
        let err = PrePass::new(&file, &mut arena, &mut session)
            .run(root)
            .unwrap_err();
        assert!(matches!(err, SessionError::FileMismatch { .. }));
    }
}
