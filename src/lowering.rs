//! Reference semantic rewrite.
//!
//! Desugars the three construct families whose comments the surrounding
//! machinery has to rescue: class property initializers become prototype
//! or constructor-function assignments after the class, exported variable
//! groups become `exports.x` assignments, and module declarations become
//! CommonJS `require` calls.
//!
//! The rewrite deliberately reuses the original name and initializer
//! nodes without touching their parse-time parents, and it never copies
//! synthesized comment lists onto its replacements. Both are load-bearing:
//! the post-pass recognizes the lowered output purely through original
//! parent chains and recorded source positions.

use tracing::{debug, trace};

use crate::ast::{
    BinaryExpressionNode, BinaryOperator, CallExpressionNode, DeclarationKind,
    ExpressionStatementNode, IdentifierNode, ImportBindings, Node, NodeArena, NodeBase, NodeFlags,
    NodeIndex, PropertyAccessExpressionNode, SyntaxKind, VariableDeclarationListNode,
    VariableDeclarationNode, VariableStatementNode,
};
use crate::session::FileSession;

pub struct LoweringPass<'a> {
    arena: &'a mut NodeArena,
    session: &'a mut FileSession,
    /// Counter for generated module-local names (`m_1`, `fs_2`, ...).
    next_module_local: u32,
}

impl<'a> LoweringPass<'a> {
    pub fn new(arena: &'a mut NodeArena, session: &'a mut FileSession) -> LoweringPass<'a> {
        LoweringPass {
            arena,
            session,
            next_module_local: 0,
        }
    }

    pub fn run(&mut self, root: NodeIndex) -> NodeIndex {
        let result = self.lower_container(root);
        debug!(
            file = %self.session.file_name(),
            "semantic rewrite complete"
        );
        result
    }

    fn lower_container(&mut self, container: NodeIndex) -> NodeIndex {
        let statements: Vec<NodeIndex> = self
            .arena
            .get(container)
            .and_then(|n| n.statements().map(|s| s.to_vec()))
            .unwrap_or_default();

        let mut changed = false;
        let mut lowered: Vec<NodeIndex> = Vec::with_capacity(statements.len());
        for stmt in statements {
            match self.arena.kind(stmt) {
                Some(SyntaxKind::Block) => {
                    let new_stmt = self.lower_container(stmt);
                    changed |= new_stmt != stmt;
                    lowered.push(new_stmt);
                }
                Some(SyntaxKind::ClassDeclaration) => {
                    changed |= self.lower_class(stmt, &mut lowered);
                }
                Some(SyntaxKind::VariableStatement)
                    if self
                        .arena
                        .base(stmt)
                        .is_some_and(|b| b.flags.contains(NodeFlags::EXPORT)) =>
                {
                    self.lower_exported_variables(stmt, &mut lowered);
                    changed = true;
                }
                Some(SyntaxKind::ImportDeclaration) | Some(SyntaxKind::ExportDeclaration)
                    if self.has_module_specifier(stmt) =>
                {
                    lowered.push(self.lower_module_ref(stmt));
                    changed = true;
                }
                _ => lowered.push(stmt),
            }
        }

        if !changed {
            return container;
        }
        let mut clone = self.arena.get(container).expect("container exists").clone();
        match &mut clone {
            Node::SourceFile(n) => n.statements = lowered.clone(),
            Node::Block(n) => n.statements = lowered.clone(),
            _ => unreachable!("statement container"),
        }
        clone.base_mut().flags |= NodeFlags::SYNTHETIC;
        let idx = self.arena.add(clone);
        self.session.emit.transfer(container, idx);
        self.session
            .set_parent(idx, self.session.parent_of(container, self.arena));
        for stmt in &lowered {
            self.session.set_parent(*stmt, idx);
        }
        idx
    }

    fn has_module_specifier(&self, stmt: NodeIndex) -> bool {
        match self.arena.get(stmt) {
            Some(Node::ImportDeclaration(_)) => true,
            Some(Node::ExportDeclaration(decl)) => decl.module_specifier.is_some(),
            _ => false,
        }
    }

    // =========================================================================
    // (a) class property initializers
    // =========================================================================

    /// Strip initialized property members out of the class and emit
    /// `C.prototype.x = init;` (or `C.x = init;` for statics) after it.
    /// Returns true when the class changed.
    fn lower_class(&mut self, class: NodeIndex, out: &mut Vec<NodeIndex>) -> bool {
        let Some(Node::ClassDeclaration(decl)) = self.arena.get(class) else {
            out.push(class);
            return false;
        };
        let class_name = self.arena.identifier_text(decl.name).unwrap_or_default().to_string();
        let members = decl.members.clone();

        let mut kept = Vec::with_capacity(members.len());
        let mut assignments: Vec<(NodeIndex, NodeIndex, bool)> = Vec::new();
        for member in members {
            match self.arena.get(member) {
                Some(Node::PropertyDeclaration(prop)) if prop.initializer.is_some() => {
                    let is_static = prop.base.flags.contains(NodeFlags::STATIC);
                    assignments.push((prop.name, prop.initializer, is_static));
                }
                _ => kept.push(member),
            }
        }
        if assignments.is_empty() {
            out.push(class);
            return false;
        }
        trace!(class = %class_name, count = assignments.len(), "lowering property initializers");

        let mut clone = self.arena.get(class).expect("class exists").clone();
        if let Node::ClassDeclaration(n) = &mut clone {
            n.members = kept.clone();
        }
        clone.base_mut().flags |= NodeFlags::SYNTHETIC;
        let new_class = self.arena.add(clone);
        self.session.emit.transfer(class, new_class);
        for member in &kept {
            self.session.set_parent(*member, new_class);
        }
        out.push(new_class);

        for (name, initializer, is_static) in assignments {
            // `C` / `C.prototype` receiver, then the reused member name.
            let mut receiver = self.synthetic_identifier(&class_name);
            if !is_static {
                let prototype = self.synthetic_identifier("prototype");
                receiver = self.synthetic_property_access(receiver, prototype);
            }
            let target = self.synthetic_property_access(receiver, name);
            let assignment = self.synthetic_assignment(target, initializer);
            out.push(self.synthetic_expression_statement(assignment));
        }
        true
    }

    // =========================================================================
    // (b) exported variable groups
    // =========================================================================

    /// `export var x = 1, y = 2;` becomes one `exports.x = 1;` statement
    /// per initialized declarator, reusing the declared name nodes.
    fn lower_exported_variables(&mut self, stmt: NodeIndex, out: &mut Vec<NodeIndex>) {
        let declarations: Vec<NodeIndex> = match self.arena.get(stmt) {
            Some(Node::VariableStatement(vs)) => match self.arena.get(vs.decl_list) {
                Some(Node::VariableDeclarationList(list)) => list.declarations.clone(),
                _ => Vec::new(),
            },
            _ => {
                out.push(stmt);
                return;
            }
        };
        trace!(count = declarations.len(), "lowering exported variable group");
        for declaration in declarations {
            let Some(Node::VariableDeclaration(decl)) = self.arena.get(declaration) else {
                continue;
            };
            let (name, initializer) = (decl.name, decl.initializer);
            if initializer.is_none() {
                continue;
            }
            let exports = self.synthetic_identifier("exports");
            let target = self.synthetic_property_access(exports, name);
            let assignment = self.synthetic_assignment(target, initializer);
            out.push(self.synthetic_expression_statement(assignment));
        }
    }

    // =========================================================================
    // (c) module references
    // =========================================================================

    /// Rewrite an import or re-export into its CommonJS form. The new
    /// statement keeps the original declaration's source range; that is
    /// the position the post-pass correlates on.
    fn lower_module_ref(&mut self, stmt: NodeIndex) -> NodeIndex {
        let original_base = self.arena.base(stmt).expect("module ref exists").clone();
        let (specifier, side_effect_only) = match self.arena.get(stmt) {
            Some(Node::ImportDeclaration(import)) => (
                import.module_specifier,
                matches!(import.bindings, ImportBindings::SideEffect),
            ),
            Some(Node::ExportDeclaration(export)) => (export.module_specifier, false),
            _ => return stmt,
        };
        let module_text = self
            .arena
            .string_literal_text(specifier)
            .unwrap_or_default()
            .to_string();

        let require = self.synthetic_identifier("require");
        let argument = self.synthetic_string_literal(&module_text);
        let call = self.arena.add(Node::CallExpression(CallExpressionNode {
            base: NodeBase::synthetic(),
            expression: require,
            arguments: vec![argument],
        }));
        self.wire(require, call);
        self.wire(argument, call);

        let mut base = NodeBase::synthetic();
        base.pos = original_base.pos;
        base.start = original_base.start;
        base.end = original_base.end;

        let new_stmt = if side_effect_only {
            trace!(module = %module_text, "lowering side-effect import");
            let stmt = self
                .arena
                .add(Node::ExpressionStatement(ExpressionStatementNode {
                    base,
                    expression: call,
                }));
            self.wire(call, stmt);
            stmt
        } else {
            trace!(module = %module_text, "lowering module import to require");
            self.next_module_local += 1;
            let local = format!(
                "{}_{}",
                sanitize_module_name(&module_text),
                self.next_module_local
            );
            let name = self.synthetic_identifier(&local);
            let declaration = self
                .arena
                .add(Node::VariableDeclaration(VariableDeclarationNode {
                    base: NodeBase::synthetic(),
                    name,
                    initializer: call,
                }));
            self.wire(name, declaration);
            self.wire(call, declaration);
            let list = self
                .arena
                .add(Node::VariableDeclarationList(VariableDeclarationListNode {
                    base: NodeBase::synthetic(),
                    kind: DeclarationKind::Var,
                    declarations: vec![declaration],
                }));
            self.wire(declaration, list);
            let stmt = self.arena.add(Node::VariableStatement(VariableStatementNode {
                base,
                decl_list: list,
            }));
            self.wire(list, stmt);
            stmt
        };
        new_stmt
    }

    // =========================================================================
    // Node construction helpers
    // =========================================================================

    fn wire(&mut self, child: NodeIndex, parent: NodeIndex) {
        self.session.set_parent(child, parent);
    }

    fn synthetic_identifier(&mut self, text: &str) -> NodeIndex {
        self.arena.add(Node::Identifier(IdentifierNode {
            base: NodeBase::synthetic(),
            text: text.to_string(),
        }))
    }

    fn synthetic_string_literal(&mut self, text: &str) -> NodeIndex {
        self.arena.add(Node::StringLiteral(crate::ast::LiteralNode {
            base: NodeBase::synthetic(),
            text: text.to_string(),
        }))
    }

    fn synthetic_property_access(&mut self, expression: NodeIndex, name: NodeIndex) -> NodeIndex {
        let access = self
            .arena
            .add(Node::PropertyAccessExpression(PropertyAccessExpressionNode {
                base: NodeBase::synthetic(),
                expression,
                name,
            }));
        self.wire(expression, access);
        access
    }

    fn synthetic_assignment(&mut self, left: NodeIndex, right: NodeIndex) -> NodeIndex {
        let assignment = self.arena.add(Node::BinaryExpression(BinaryExpressionNode {
            base: NodeBase::synthetic(),
            left,
            operator: BinaryOperator::Assign,
            right,
        }));
        self.wire(left, assignment);
        assignment
    }

    fn synthetic_expression_statement(&mut self, expression: NodeIndex) -> NodeIndex {
        let stmt = self
            .arena
            .add(Node::ExpressionStatement(ExpressionStatementNode {
                base: NodeBase::synthetic(),
                expression,
            }));
        self.wire(expression, stmt);
        stmt
    }
}

/// Derive an identifier-safe local name from a module specifier:
/// `"./a/b-c"` contributes `b_c`.
fn sanitize_module_name(specifier: &str) -> String {
    let tail = specifier.rsplit('/').next().unwrap_or(specifier);
    let mut name: String = tail
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if name.is_empty() || name.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        name.insert(0, 'm');
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ParserState;
    use crate::source_file::SourceFile;

    fn lower(source: &str) -> (NodeArena, FileSession, NodeIndex) {
        let mut parser = ParserState::new("test.ts", source);
        let root = parser.parse_source_file().expect("parse failed");
        let (file, mut arena) = parser.into_parts();
        let mut session = FileSession::new(&file);
        record_module_refs(&arena, root, &mut session);
        let root = LoweringPass::new(&mut arena, &mut session).run(root);
        (arena, session, root)
    }

    // Stand-in for the pre-pass: the lowering only needs module_refs.
    fn record_module_refs(arena: &NodeArena, root: NodeIndex, session: &mut FileSession) {
        let Some(stmts) = arena.get(root).and_then(|n| n.statements()) else {
            return;
        };
        for &stmt in stmts {
            match arena.get(stmt) {
                Some(Node::ImportDeclaration(_)) => session.record_module_ref(stmt),
                Some(Node::ExportDeclaration(d)) if d.module_specifier.is_some() => {
                    session.record_module_ref(stmt)
                }
                _ => {}
            }
        }
    }

    fn statements(arena: &NodeArena, root: NodeIndex) -> Vec<NodeIndex> {
        arena.get(root).unwrap().statements().unwrap().to_vec()
    }

    #[test]
    fn property_initializer_becomes_prototype_assignment() {
        let (arena, _session, root) = lower("class C { x = 1; }\n");
        let stmts = statements(&arena, root);
        assert_eq!(stmts.len(), 2);
        assert_eq!(arena.kind(stmts[0]), Some(SyntaxKind::ClassDeclaration));
        let Some(Node::ClassDeclaration(class)) = arena.get(stmts[0]) else {
            panic!("expected class");
        };
        assert!(class.members.is_empty());
        // C.prototype.x = 1 with the original name node reused.
        let Some(Node::ExpressionStatement(es)) = arena.get(stmts[1]) else {
            panic!("expected expression statement");
        };
        let Some(Node::BinaryExpression(assign)) = arena.get(es.expression) else {
            panic!("expected assignment");
        };
        assert_eq!(assign.operator, BinaryOperator::Assign);
        let Some(Node::PropertyAccessExpression(access)) = arena.get(assign.left) else {
            panic!("expected property access");
        };
        assert_eq!(arena.identifier_text(access.name), Some("x"));
        // The reused name still reports its parse-time parent.
        assert_eq!(
            arena.kind(arena.parent(access.name)),
            Some(SyntaxKind::PropertyDeclaration)
        );
    }

    #[test]
    fn static_member_skips_prototype() {
        let (arena, _session, root) = lower("class C { static x = 1; }\n");
        let stmts = statements(&arena, root);
        let Some(Node::ExpressionStatement(es)) = arena.get(stmts[1]) else {
            panic!("expected expression statement");
        };
        let Some(Node::BinaryExpression(assign)) = arena.get(es.expression) else {
            panic!("expected assignment");
        };
        let Some(Node::PropertyAccessExpression(access)) = arena.get(assign.left) else {
            panic!("expected property access");
        };
        assert_eq!(arena.identifier_text(access.expression), Some("C"));
        assert_eq!(arena.identifier_text(access.name), Some("x"));
    }

    #[test]
    fn uninitialized_member_is_kept() {
        let (arena, _session, root) = lower("class C { x; y = 2; }\n");
        let stmts = statements(&arena, root);
        assert_eq!(stmts.len(), 2);
        let Some(Node::ClassDeclaration(class)) = arena.get(stmts[0]) else {
            panic!("expected class");
        };
        assert_eq!(class.members.len(), 1);
    }

    #[test]
    fn exported_variables_become_exports_assignments() {
        let (arena, _session, root) = lower("export var a = 1, b = 2;\n");
        let stmts = statements(&arena, root);
        assert_eq!(stmts.len(), 2);
        for (stmt, expected) in stmts.iter().zip(["a", "b"]) {
            let Some(Node::ExpressionStatement(es)) = arena.get(*stmt) else {
                panic!("expected expression statement");
            };
            let Some(Node::BinaryExpression(assign)) = arena.get(es.expression) else {
                panic!("expected assignment");
            };
            let Some(Node::PropertyAccessExpression(access)) = arena.get(assign.left) else {
                panic!("expected property access");
            };
            assert_eq!(arena.identifier_text(access.expression), Some("exports"));
            assert_eq!(arena.identifier_text(access.name), Some(expected));
            // Original ancestor chain intact for the post-pass.
            let decl = arena.parent(access.name);
            assert_eq!(arena.kind(decl), Some(SyntaxKind::VariableDeclaration));
        }
    }

    #[test]
    fn plain_variable_statement_is_untouched() {
        let (arena, _session, root) = lower("var a = 1;\n");
        let stmts = statements(&arena, root);
        assert_eq!(stmts.len(), 1);
        assert_eq!(arena.kind(stmts[0]), Some(SyntaxKind::VariableStatement));
    }

    #[test]
    fn named_import_becomes_require_var() {
        let (arena, session, root) = lower("import {a} from './m';\n");
        let stmts = statements(&arena, root);
        assert_eq!(stmts.len(), 1);
        let Some(Node::VariableStatement(vs)) = arena.get(stmts[0]) else {
            panic!("expected var statement");
        };
        let Some(Node::VariableDeclarationList(list)) = arena.get(vs.decl_list) else {
            panic!("expected declaration list");
        };
        let Some(Node::VariableDeclaration(decl)) = arena.get(list.declarations[0]) else {
            panic!("expected declaration");
        };
        assert_eq!(arena.identifier_text(decl.name), Some("m_1"));
        let Some(Node::CallExpression(call)) = arena.get(decl.initializer) else {
            panic!("expected require call");
        };
        assert_eq!(arena.identifier_text(call.expression), Some("require"));
        assert_eq!(arena.string_literal_text(call.arguments[0]), Some("./m"));
        // Range carried over so the statement correlates to the import.
        let import = session.module_refs()[0];
        assert_eq!(
            arena.base(stmts[0]).unwrap().start,
            arena.base(import).unwrap().start
        );
    }

    #[test]
    fn side_effect_import_becomes_bare_require() {
        let (arena, _session, root) = lower("import 'polyfill';\n");
        let stmts = statements(&arena, root);
        let Some(Node::ExpressionStatement(es)) = arena.get(stmts[0]) else {
            panic!("expected expression statement");
        };
        let Some(Node::CallExpression(call)) = arena.get(es.expression) else {
            panic!("expected require call");
        };
        assert_eq!(arena.identifier_text(call.expression), Some("require"));
    }

    #[test]
    fn reexport_is_lowered_like_an_import() {
        let (arena, _session, root) = lower("export {a} from 'dep';\n");
        let stmts = statements(&arena, root);
        assert_eq!(arena.kind(stmts[0]), Some(SyntaxKind::VariableStatement));
    }

    #[test]
    fn module_locals_are_numbered() {
        let (arena, _session, root) = lower("import {a} from 'x';\nimport {b} from 'x';\n");
        let stmts = statements(&arena, root);
        let name_of = |stmt: NodeIndex| -> String {
            let Some(Node::VariableStatement(vs)) = arena.get(stmt) else {
                panic!("expected var statement");
            };
            let Some(Node::VariableDeclarationList(list)) = arena.get(vs.decl_list) else {
                panic!("expected list");
            };
            let Some(Node::VariableDeclaration(decl)) = arena.get(list.declarations[0]) else {
                panic!("expected declaration");
            };
            arena.identifier_text(decl.name).unwrap().to_string()
        };
        assert_eq!(name_of(stmts[0]), "x_1");
        assert_eq!(name_of(stmts[1]), "x_2");
    }
}
