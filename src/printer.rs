//! Output printer.
//!
//! Stands in for the black-box emitter downstream of the passes. Code is
//! printed from the tree; comments come from two sources, exactly as the
//! emit contract describes:
//!
//! - synthesized comments from the emit-info table, always;
//! - original-text comments scanned around the node's range, but only
//!   while the node's range is valid and `NO_ORIGINAL_COMMENTS` is unset.
//!
//! The second source is the duplication hazard the pre-pass neutralizes
//! node by node. The printer keeps it faithful rather than papering over
//! it, so a missed neutralization shows up in output instead of hiding.

use crate::ast::{ExportDeclarationNode, ImportBindings, Node, NodeArena, NodeFlags, NodeIndex};
use crate::comments::{
    CommentKind, SynthesizedComment, scan_comment_ranges, scan_trailing_comment_ranges,
};
use crate::emit_info::{EmitFlags, EmitInfoTable};
use crate::source_file::SourceFile;

const INDENT: &str = "    ";

pub struct Printer<'a> {
    file: &'a SourceFile,
    arena: &'a NodeArena,
    emit: &'a EmitInfoTable,
    out: String,
    indent: usize,
}

impl<'a> Printer<'a> {
    pub fn new(file: &'a SourceFile, arena: &'a NodeArena, emit: &'a EmitInfoTable) -> Printer<'a> {
        Printer {
            file,
            arena,
            emit,
            out: String::new(),
            indent: 0,
        }
    }

    pub fn print_source_file(mut self, root: NodeIndex) -> String {
        let statements = self
            .arena
            .get(root)
            .and_then(|n| n.statements().map(|s| s.to_vec()))
            .unwrap_or_default();
        for stmt in statements {
            self.print_statement(stmt);
        }
        self.out
    }

    fn write_indent(&mut self) {
        for _ in 0..self.indent {
            self.out.push_str(INDENT);
        }
    }

    fn line_break(&mut self) {
        if !self.out.ends_with('\n') {
            self.out.push('\n');
        }
    }

    // =========================================================================
    // Comments
    // =========================================================================

    fn original_comments_allowed(&self, node: NodeIndex) -> bool {
        let valid = self.arena.base(node).is_some_and(|b| b.has_valid_range());
        valid && !self.emit.flags(node).contains(EmitFlags::NO_ORIGINAL_COMMENTS)
    }

    fn write_synthesized(&mut self, comment: &SynthesizedComment, leading: bool) {
        match comment.kind {
            CommentKind::SingleLine => {
                self.out.push_str("//");
                self.out.push_str(&comment.text);
                self.out.push('\n');
            }
            CommentKind::MultiLine => {
                self.out.push_str("/*");
                self.out.push_str(&comment.text);
                self.out.push_str("*/");
                if comment.has_trailing_new_line {
                    self.out.push('\n');
                } else if leading {
                    self.out.push(' ');
                }
            }
        }
    }

    fn print_leading_comments(&mut self, node: NodeIndex) {
        for comment in self.emit.leading_comments(node).to_vec() {
            self.write_indent();
            self.write_synthesized(&comment, true);
        }
        if self.original_comments_allowed(node) {
            let Some(base) = self.arena.base(node) else {
                return;
            };
            let ranges = scan_comment_ranges(&self.file.text, base.pos, base.start);
            for range in ranges {
                self.write_indent();
                self.out.push_str(range.text(&self.file.text));
                if range.has_trailing_new_line {
                    self.out.push('\n');
                } else {
                    self.out.push(' ');
                }
            }
        }
    }

    fn print_trailing_comments(&mut self, node: NodeIndex) {
        if self.original_comments_allowed(node) {
            let end = self.arena.base(node).map_or(0, |b| b.end);
            for range in scan_trailing_comment_ranges(&self.file.text, end) {
                self.out.push(' ');
                self.out.push_str(range.text(&self.file.text));
            }
        }
        for comment in self.emit.trailing_comments(node).to_vec() {
            self.out.push(' ');
            match comment.kind {
                CommentKind::SingleLine => {
                    self.out.push_str("//");
                    self.out.push_str(&comment.text);
                }
                CommentKind::MultiLine => {
                    self.out.push_str("/*");
                    self.out.push_str(&comment.text);
                    self.out.push_str("*/");
                }
            }
        }
    }

    /// Synthesized comments claimed by a node printed mid-line. A
    /// single-line comment still has to end its line, so it forces a break
    /// before the code continues.
    fn write_inline_leading(&mut self, node: NodeIndex) {
        for comment in self.emit.leading_comments(node).to_vec() {
            match comment.kind {
                CommentKind::SingleLine => {
                    self.out.push_str("//");
                    self.out.push_str(&comment.text);
                    self.out.push('\n');
                    self.write_indent();
                }
                CommentKind::MultiLine => {
                    self.out.push_str("/*");
                    self.out.push_str(&comment.text);
                    self.out.push_str("*/ ");
                }
            }
        }
    }

    fn write_inline_trailing(&mut self, node: NodeIndex) {
        for comment in self.emit.trailing_comments(node).to_vec() {
            match comment.kind {
                CommentKind::SingleLine => {
                    self.out.push_str(" //");
                    self.out.push_str(&comment.text);
                    self.out.push('\n');
                    self.write_indent();
                }
                CommentKind::MultiLine => {
                    self.out.push_str(" /*");
                    self.out.push_str(&comment.text);
                    self.out.push_str("*/");
                }
            }
        }
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn print_statement(&mut self, node: NodeIndex) {
        self.print_leading_comments(node);

        let Some(n) = self.arena.get(node) else {
            return;
        };
        match n.clone() {
            Node::NotEmittedStatement(_) => {
                // No code on the line, so the trailing list renders the
                // same way leading comments do.
                for comment in self.emit.trailing_comments(node).to_vec() {
                    self.write_indent();
                    self.write_synthesized(&comment, true);
                }
                self.line_break();
                return;
            }
            Node::VariableStatement(vs) => {
                self.write_indent();
                if vs.base.flags.contains(NodeFlags::EXPORT) {
                    self.out.push_str("export ");
                }
                self.print_declaration_list(vs.decl_list);
                self.out.push(';');
            }
            Node::ExpressionStatement(es) => {
                self.write_indent();
                self.print_expression(es.expression);
                self.out.push(';');
            }
            Node::ReturnStatement(ret) => {
                self.write_indent();
                self.out.push_str("return");
                if ret.expression.is_some() {
                    self.out.push(' ');
                    self.print_expression(ret.expression);
                }
                self.out.push(';');
            }
            Node::Block(block) => {
                self.write_indent();
                self.out.push_str("{\n");
                self.indent += 1;
                for stmt in block.statements {
                    self.print_statement(stmt);
                }
                self.indent -= 1;
                self.write_indent();
                self.out.push('}');
            }
            Node::ClassDeclaration(class) => {
                self.write_indent();
                if class.base.flags.contains(NodeFlags::EXPORT) {
                    self.out.push_str("export ");
                }
                self.out.push_str("class ");
                self.print_expression(class.name);
                self.out.push_str(" {\n");
                self.indent += 1;
                for member in class.members {
                    self.print_class_member(member);
                }
                self.indent -= 1;
                self.write_indent();
                self.out.push('}');
            }
            Node::ImportDeclaration(import) => {
                self.write_indent();
                self.print_import(&import.bindings, import.module_specifier);
            }
            Node::ExportDeclaration(export) => {
                self.write_indent();
                self.print_export(&export);
            }
            _ => {
                // Expressions never sit directly in a statement list.
                return;
            }
        }

        self.print_trailing_comments(node);
        self.line_break();
    }

    fn print_declaration_list(&mut self, list: NodeIndex) {
        let Some(Node::VariableDeclarationList(node)) = self.arena.get(list) else {
            return;
        };
        let (kind, declarations) = (node.kind, node.declarations.clone());
        self.out.push_str(kind.keyword());
        self.out.push(' ');
        self.write_inline_leading(list);
        for (i, declaration) in declarations.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            let Some(Node::VariableDeclaration(decl)) = self.arena.get(*declaration) else {
                continue;
            };
            let (name, initializer) = (decl.name, decl.initializer);
            self.write_inline_leading(*declaration);
            self.print_expression(name);
            if initializer.is_some() {
                self.out.push_str(" = ");
                self.print_expression(initializer);
            }
            self.write_inline_trailing(*declaration);
        }
        self.write_inline_trailing(list);
    }

    fn print_class_member(&mut self, member: NodeIndex) {
        self.print_leading_comments(member);
        let Some(Node::PropertyDeclaration(prop)) = self.arena.get(member) else {
            return;
        };
        let (is_static, name, initializer) = (
            prop.base.flags.contains(NodeFlags::STATIC),
            prop.name,
            prop.initializer,
        );
        self.write_indent();
        if is_static {
            self.out.push_str("static ");
        }
        self.print_expression(name);
        if initializer.is_some() {
            self.out.push_str(" = ");
            self.print_expression(initializer);
        }
        self.out.push(';');
        self.print_trailing_comments(member);
        self.line_break();
    }

    fn print_import(&mut self, bindings: &ImportBindings, specifier: NodeIndex) {
        self.out.push_str("import ");
        match bindings {
            ImportBindings::SideEffect => {}
            ImportBindings::Default(name) => {
                self.print_expression(*name);
                self.out.push_str(" from ");
            }
            ImportBindings::Namespace(name) => {
                self.out.push_str("* as ");
                self.print_expression(*name);
                self.out.push_str(" from ");
            }
            ImportBindings::Named(names) => {
                self.out.push('{');
                for (i, name) in names.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.print_expression(*name);
                }
                self.out.push_str("} from ");
            }
        }
        self.print_expression(specifier);
        self.out.push(';');
    }

    fn print_export(&mut self, export: &ExportDeclarationNode) {
        self.out.push_str("export ");
        if export.is_star {
            self.out.push('*');
        } else {
            self.out.push('{');
            for (i, name) in export.names.iter().enumerate() {
                if i > 0 {
                    self.out.push_str(", ");
                }
                self.print_expression(*name);
            }
            self.out.push('}');
        }
        if export.module_specifier.is_some() {
            self.out.push_str(" from ");
            self.print_expression(export.module_specifier);
        }
        self.out.push(';');
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    fn print_expression(&mut self, node: NodeIndex) {
        let Some(n) = self.arena.get(node) else {
            return;
        };
        self.write_inline_leading(node);
        match n.clone() {
            Node::Identifier(id) => self.out.push_str(&id.text),
            Node::NumericLiteral(lit) => self.out.push_str(&lit.text),
            Node::StringLiteral(lit) => {
                self.out.push('"');
                self.out.push_str(&lit.text);
                self.out.push('"');
            }
            Node::CallExpression(call) => {
                self.print_expression(call.expression);
                self.out.push('(');
                for (i, arg) in call.arguments.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.print_expression(*arg);
                }
                self.out.push(')');
            }
            Node::PropertyAccessExpression(access) => {
                self.print_expression(access.expression);
                self.out.push('.');
                self.print_expression(access.name);
            }
            Node::BinaryExpression(binary) => {
                self.print_expression(binary.left);
                self.out.push(' ');
                self.out.push_str(binary.operator.text());
                self.out.push(' ');
                self.print_expression(binary.right);
            }
            Node::ParenthesizedExpression(paren) => {
                self.out.push('(');
                self.print_expression(paren.expression);
                self.out.push(')');
            }
            Node::ArrowFunction(arrow) => {
                self.out.push('(');
                for (i, param) in arrow.parameters.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.print_expression(*param);
                }
                self.out.push_str(") => ");
                if self.arena.get(arrow.body).is_some_and(|b| matches!(b, Node::Block(_))) {
                    self.print_arrow_block(arrow.body);
                } else {
                    self.print_expression(arrow.body);
                }
            }
            _ => {}
        }
        self.write_inline_trailing(node);
    }

    fn print_arrow_block(&mut self, block: NodeIndex) {
        let Some(Node::Block(block)) = self.arena.get(block) else {
            return;
        };
        let statements = block.statements.clone();
        self.out.push_str("{\n");
        self.indent += 1;
        for stmt in statements {
            self.print_statement(stmt);
        }
        self.indent -= 1;
        self.write_indent();
        self.out.push('}');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ParserState;
    use crate::pre_pass::PrePass;
    use crate::session::FileSession;

    fn parse(source: &str) -> (SourceFile, NodeArena, NodeIndex) {
        let mut parser = ParserState::new("test.ts", source);
        let root = parser.parse_source_file().expect("parse failed");
        let (file, arena) = parser.into_parts();
        (file, arena, root)
    }

    #[test]
    fn prints_code_without_emit_data() {
        let (file, arena, root) = parse("var a = 1 + 2;\nf(a);\n");
        let emit = EmitInfoTable::new();
        let out = Printer::new(&file, &arena, &emit).print_source_file(root);
        assert_eq!(out, "var a = 1 + 2;\nf(a);\n");
    }

    #[test]
    fn prints_original_comments_when_range_is_live() {
        // No pre-pass ran, so nothing suppressed the original text.
        let (file, arena, root) = parse("// note\nvar a = 1; // tail\n");
        let emit = EmitInfoTable::new();
        let out = Printer::new(&file, &arena, &emit).print_source_file(root);
        assert_eq!(out, "// note\nvar a = 1; // tail\n");
    }

    #[test]
    fn suppression_hides_original_comments() {
        let (file, arena, root) = parse("// note\nvar a = 1;\n");
        let stmt = arena.get(root).unwrap().statements().unwrap()[0];
        let mut emit = EmitInfoTable::new();
        emit.suppress_original_comments(stmt);
        let out = Printer::new(&file, &arena, &emit).print_source_file(root);
        assert_eq!(out, "var a = 1;\n");
    }

    #[test]
    fn synthesized_comments_come_from_the_table() {
        let (file, arena, root) = parse("var a = 1;\n");
        let stmt = arena.get(root).unwrap().statements().unwrap()[0];
        let mut emit = EmitInfoTable::new();
        emit.append_leading(
            stmt,
            vec![SynthesizedComment {
                kind: CommentKind::SingleLine,
                text: " synthesized".to_string(),
                has_trailing_new_line: true,
            }],
        );
        let out = Printer::new(&file, &arena, &emit).print_source_file(root);
        assert_eq!(out, "// synthesized\nvar a = 1;\n");
    }

    #[test]
    fn pre_passed_file_round_trips_comments_once() {
        let source = "// doc\nvar a = 1; // tail\n";
        let mut parser = ParserState::new("test.ts", source);
        let root = parser.parse_source_file().unwrap();
        let (file, mut arena) = parser.into_parts();
        let mut session = FileSession::new(&file);
        let root = PrePass::new(&file, &mut arena, &mut session).run(root).unwrap();
        let out = Printer::new(&file, &arena, &session.emit).print_source_file(root);
        assert_eq!(out, "// doc\nvar a = 1; // tail\n");
    }

    #[test]
    fn expression_comments_print_inline() {
        let source = "f(/* c */ a);\n";
        let mut parser = ParserState::new("test.ts", source);
        let root = parser.parse_source_file().unwrap();
        let (file, mut arena) = parser.into_parts();
        let mut session = FileSession::new(&file);
        let root = PrePass::new(&file, &mut arena, &mut session).run(root).unwrap();
        let out = Printer::new(&file, &arena, &session.emit).print_source_file(root);
        assert_eq!(out, "f(/* c */ a);\n");
    }

    #[test]
    fn class_and_block_printing() {
        let (file, arena, root) = parse("class C {\n    static x = 1;\n    y;\n}\n{\n    f();\n}\n");
        let emit = EmitInfoTable::new();
        let out = Printer::new(&file, &arena, &emit).print_source_file(root);
        assert_eq!(
            out,
            "class C {\n    static x = 1;\n    y;\n}\n{\n    f();\n}\n"
        );
    }

    #[test]
    fn import_forms_round_trip() {
        let (file, arena, root) = parse(
            "import \"p\";\nimport d from \"m\";\nimport * as ns from \"m\";\nimport {a, b} from \"m\";\nexport * from \"m\";\n",
        );
        let emit = EmitInfoTable::new();
        let out = Printer::new(&file, &arena, &emit).print_source_file(root);
        assert_eq!(
            out,
            "import \"p\";\nimport d from \"m\";\nimport * as ns from \"m\";\nimport {a, b} from \"m\";\nexport * from \"m\";\n"
        );
    }

    #[test]
    fn arrow_bodies_print_both_ways() {
        let (file, arena, root) = parse("var f = (a) => a + 1;\nvar g = () => {\n    return 1;\n};\n");
        let emit = EmitInfoTable::new();
        let out = Printer::new(&file, &arena, &emit).print_source_file(root);
        assert_eq!(
            out,
            "var f = (a) => a + 1;\nvar g = () => {\n    return 1;\n};\n"
        );
    }
}
