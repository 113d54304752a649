//! AST node definitions.
//!
//! One data struct per node kind, each embedding a [`NodeBase`], gathered
//! into the `Node` enum stored in the arena. Child links are `NodeIndex`
//! handles; nodes never own other nodes directly.

use serde::Serialize;

use super::base::{NodeBase, NodeIndex, SyntaxKind};

/// Root container for a parsed file.
#[derive(Clone, Debug, Serialize)]
pub struct SourceFileNode {
    pub base: NodeBase,
    pub statements: Vec<NodeIndex>,
}

/// `{ ... }` used in statement position or as an arrow-function body.
#[derive(Clone, Debug, Serialize)]
pub struct BlockNode {
    pub base: NodeBase,
    pub statements: Vec<NodeIndex>,
}

/// Declaration keyword of a variable statement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum DeclarationKind {
    Var,
    Let,
    Const,
}

impl DeclarationKind {
    pub fn keyword(self) -> &'static str {
        match self {
            DeclarationKind::Var => "var",
            DeclarationKind::Let => "let",
            DeclarationKind::Const => "const",
        }
    }
}

/// `var x = 1, y;` — `export` shows up as a flag on the base.
#[derive(Clone, Debug, Serialize)]
pub struct VariableStatementNode {
    pub base: NodeBase,
    pub decl_list: NodeIndex,
}

/// The declaration group of a variable statement.
#[derive(Clone, Debug, Serialize)]
pub struct VariableDeclarationListNode {
    pub base: NodeBase,
    pub kind: DeclarationKind,
    pub declarations: Vec<NodeIndex>,
}

/// A single `name = initializer` declarator.
#[derive(Clone, Debug, Serialize)]
pub struct VariableDeclarationNode {
    pub base: NodeBase,
    pub name: NodeIndex,
    /// `NONE` when the declarator has no initializer.
    pub initializer: NodeIndex,
}

#[derive(Clone, Debug, Serialize)]
pub struct ExpressionStatementNode {
    pub base: NodeBase,
    pub expression: NodeIndex,
}

#[derive(Clone, Debug, Serialize)]
pub struct ClassDeclarationNode {
    pub base: NodeBase,
    pub name: NodeIndex,
    pub members: Vec<NodeIndex>,
}

/// A class property member, optionally `static`, optionally initialized.
#[derive(Clone, Debug, Serialize)]
pub struct PropertyDeclarationNode {
    pub base: NodeBase,
    pub name: NodeIndex,
    pub initializer: NodeIndex,
}

/// What an import declaration binds.
#[derive(Clone, Debug, Serialize)]
pub enum ImportBindings {
    /// `import "m";`
    SideEffect,
    /// `import d from "m";`
    Default(NodeIndex),
    /// `import * as ns from "m";`
    Namespace(NodeIndex),
    /// `import {a, b} from "m";`
    Named(Vec<NodeIndex>),
}

#[derive(Clone, Debug, Serialize)]
pub struct ImportDeclarationNode {
    pub base: NodeBase,
    pub bindings: ImportBindings,
    /// Always a `StringLiteral`.
    pub module_specifier: NodeIndex,
}

/// `export {a} from "m";` / `export * from "m";` re-exports, and plain
/// `export {a};` (no specifier).
#[derive(Clone, Debug, Serialize)]
pub struct ExportDeclarationNode {
    pub base: NodeBase,
    /// Empty for `export *`.
    pub names: Vec<NodeIndex>,
    pub is_star: bool,
    /// `NONE` for a plain export list without a module specifier.
    pub module_specifier: NodeIndex,
}

#[derive(Clone, Debug, Serialize)]
pub struct ReturnStatementNode {
    pub base: NodeBase,
    pub expression: NodeIndex,
}

/// A statement that emits no text of its own. Exists purely to carry
/// synthesized comments that belong to no surviving construct (detached
/// file headers and footers).
#[derive(Clone, Debug, Serialize)]
pub struct NotEmittedStatementNode {
    pub base: NodeBase,
}

#[derive(Clone, Debug, Serialize)]
pub struct IdentifierNode {
    pub base: NodeBase,
    pub text: String,
}

/// String and numeric literals share a shape; the kind tag disambiguates.
#[derive(Clone, Debug, Serialize)]
pub struct LiteralNode {
    pub base: NodeBase,
    pub text: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct CallExpressionNode {
    pub base: NodeBase,
    pub expression: NodeIndex,
    pub arguments: Vec<NodeIndex>,
}

#[derive(Clone, Debug, Serialize)]
pub struct PropertyAccessExpressionNode {
    pub base: NodeBase,
    pub expression: NodeIndex,
    pub name: NodeIndex,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum BinaryOperator {
    Assign,
    Plus,
    Minus,
    Asterisk,
    Slash,
    LessThan,
}

impl BinaryOperator {
    pub fn text(self) -> &'static str {
        match self {
            BinaryOperator::Assign => "=",
            BinaryOperator::Plus => "+",
            BinaryOperator::Minus => "-",
            BinaryOperator::Asterisk => "*",
            BinaryOperator::Slash => "/",
            BinaryOperator::LessThan => "<",
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct BinaryExpressionNode {
    pub base: NodeBase,
    pub left: NodeIndex,
    pub operator: BinaryOperator,
    pub right: NodeIndex,
}

#[derive(Clone, Debug, Serialize)]
pub struct ParenthesizedExpressionNode {
    pub base: NodeBase,
    pub expression: NodeIndex,
}

/// `(a, b) => body` where the body is either an expression or a block.
#[derive(Clone, Debug, Serialize)]
pub struct ArrowFunctionNode {
    pub base: NodeBase,
    pub parameters: Vec<NodeIndex>,
    pub body: NodeIndex,
}

/// An AST node. Stored by value in the arena, referenced by `NodeIndex`.
#[derive(Clone, Debug, Serialize)]
pub enum Node {
    SourceFile(SourceFileNode),
    Block(BlockNode),
    VariableStatement(VariableStatementNode),
    VariableDeclarationList(VariableDeclarationListNode),
    VariableDeclaration(VariableDeclarationNode),
    ExpressionStatement(ExpressionStatementNode),
    ClassDeclaration(ClassDeclarationNode),
    PropertyDeclaration(PropertyDeclarationNode),
    ImportDeclaration(ImportDeclarationNode),
    ExportDeclaration(ExportDeclarationNode),
    ReturnStatement(ReturnStatementNode),
    NotEmittedStatement(NotEmittedStatementNode),
    Identifier(IdentifierNode),
    StringLiteral(LiteralNode),
    NumericLiteral(LiteralNode),
    CallExpression(CallExpressionNode),
    PropertyAccessExpression(PropertyAccessExpressionNode),
    BinaryExpression(BinaryExpressionNode),
    ParenthesizedExpression(ParenthesizedExpressionNode),
    ArrowFunction(ArrowFunctionNode),
}

impl Node {
    pub fn kind(&self) -> SyntaxKind {
        match self {
            Node::SourceFile(_) => SyntaxKind::SourceFile,
            Node::Block(_) => SyntaxKind::Block,
            Node::VariableStatement(_) => SyntaxKind::VariableStatement,
            Node::VariableDeclarationList(_) => SyntaxKind::VariableDeclarationList,
            Node::VariableDeclaration(_) => SyntaxKind::VariableDeclaration,
            Node::ExpressionStatement(_) => SyntaxKind::ExpressionStatement,
            Node::ClassDeclaration(_) => SyntaxKind::ClassDeclaration,
            Node::PropertyDeclaration(_) => SyntaxKind::PropertyDeclaration,
            Node::ImportDeclaration(_) => SyntaxKind::ImportDeclaration,
            Node::ExportDeclaration(_) => SyntaxKind::ExportDeclaration,
            Node::ReturnStatement(_) => SyntaxKind::ReturnStatement,
            Node::NotEmittedStatement(_) => SyntaxKind::NotEmittedStatement,
            Node::Identifier(_) => SyntaxKind::Identifier,
            Node::StringLiteral(_) => SyntaxKind::StringLiteral,
            Node::NumericLiteral(_) => SyntaxKind::NumericLiteral,
            Node::CallExpression(_) => SyntaxKind::CallExpression,
            Node::PropertyAccessExpression(_) => SyntaxKind::PropertyAccessExpression,
            Node::BinaryExpression(_) => SyntaxKind::BinaryExpression,
            Node::ParenthesizedExpression(_) => SyntaxKind::ParenthesizedExpression,
            Node::ArrowFunction(_) => SyntaxKind::ArrowFunction,
        }
    }

    pub fn base(&self) -> &NodeBase {
        match self {
            Node::SourceFile(n) => &n.base,
            Node::Block(n) => &n.base,
            Node::VariableStatement(n) => &n.base,
            Node::VariableDeclarationList(n) => &n.base,
            Node::VariableDeclaration(n) => &n.base,
            Node::ExpressionStatement(n) => &n.base,
            Node::ClassDeclaration(n) => &n.base,
            Node::PropertyDeclaration(n) => &n.base,
            Node::ImportDeclaration(n) => &n.base,
            Node::ExportDeclaration(n) => &n.base,
            Node::ReturnStatement(n) => &n.base,
            Node::NotEmittedStatement(n) => &n.base,
            Node::Identifier(n) => &n.base,
            Node::StringLiteral(n) => &n.base,
            Node::NumericLiteral(n) => &n.base,
            Node::CallExpression(n) => &n.base,
            Node::PropertyAccessExpression(n) => &n.base,
            Node::BinaryExpression(n) => &n.base,
            Node::ParenthesizedExpression(n) => &n.base,
            Node::ArrowFunction(n) => &n.base,
        }
    }

    pub fn base_mut(&mut self) -> &mut NodeBase {
        match self {
            Node::SourceFile(n) => &mut n.base,
            Node::Block(n) => &mut n.base,
            Node::VariableStatement(n) => &mut n.base,
            Node::VariableDeclarationList(n) => &mut n.base,
            Node::VariableDeclaration(n) => &mut n.base,
            Node::ExpressionStatement(n) => &mut n.base,
            Node::ClassDeclaration(n) => &mut n.base,
            Node::PropertyDeclaration(n) => &mut n.base,
            Node::ImportDeclaration(n) => &mut n.base,
            Node::ExportDeclaration(n) => &mut n.base,
            Node::ReturnStatement(n) => &mut n.base,
            Node::NotEmittedStatement(n) => &mut n.base,
            Node::Identifier(n) => &mut n.base,
            Node::StringLiteral(n) => &mut n.base,
            Node::NumericLiteral(n) => &mut n.base,
            Node::CallExpression(n) => &mut n.base,
            Node::PropertyAccessExpression(n) => &mut n.base,
            Node::BinaryExpression(n) => &mut n.base,
            Node::ParenthesizedExpression(n) => &mut n.base,
            Node::ArrowFunction(n) => &mut n.base,
        }
    }

    /// Child node indices in source order. `NONE` links are skipped.
    pub fn children(&self) -> Vec<NodeIndex> {
        let mut out = Vec::new();
        let mut push = |idx: NodeIndex| {
            if idx.is_some() {
                out.push(idx);
            }
        };
        match self {
            Node::SourceFile(n) => n.statements.iter().copied().for_each(&mut push),
            Node::Block(n) => n.statements.iter().copied().for_each(&mut push),
            Node::VariableStatement(n) => push(n.decl_list),
            Node::VariableDeclarationList(n) => {
                n.declarations.iter().copied().for_each(&mut push)
            }
            Node::VariableDeclaration(n) => {
                push(n.name);
                push(n.initializer);
            }
            Node::ExpressionStatement(n) => push(n.expression),
            Node::ClassDeclaration(n) => {
                push(n.name);
                n.members.iter().copied().for_each(&mut push);
            }
            Node::PropertyDeclaration(n) => {
                push(n.name);
                push(n.initializer);
            }
            Node::ImportDeclaration(n) => {
                match &n.bindings {
                    ImportBindings::SideEffect => {}
                    ImportBindings::Default(name) | ImportBindings::Namespace(name) => {
                        push(*name)
                    }
                    ImportBindings::Named(names) => names.iter().copied().for_each(&mut push),
                }
                push(n.module_specifier);
            }
            Node::ExportDeclaration(n) => {
                n.names.iter().copied().for_each(&mut push);
                push(n.module_specifier);
            }
            Node::ReturnStatement(n) => push(n.expression),
            Node::NotEmittedStatement(_) => {}
            Node::Identifier(_) | Node::StringLiteral(_) | Node::NumericLiteral(_) => {}
            Node::CallExpression(n) => {
                push(n.expression);
                n.arguments.iter().copied().for_each(&mut push);
            }
            Node::PropertyAccessExpression(n) => {
                push(n.expression);
                push(n.name);
            }
            Node::BinaryExpression(n) => {
                push(n.left);
                push(n.right);
            }
            Node::ParenthesizedExpression(n) => push(n.expression),
            Node::ArrowFunction(n) => {
                n.parameters.iter().copied().for_each(&mut push);
                push(n.body);
            }
        }
        out
    }

    /// Replace every child slot holding `old` with `new`. Used when a
    /// rebuilt child forces its parent to be rebuilt as well (copy-on-write
    /// — the original node is never touched).
    pub fn replace_child(&mut self, old: NodeIndex, new: NodeIndex) {
        let swap = |slot: &mut NodeIndex| {
            if *slot == old {
                *slot = new;
            }
        };
        let swap_list = |list: &mut Vec<NodeIndex>| {
            for slot in list {
                if *slot == old {
                    *slot = new;
                }
            }
        };
        match self {
            Node::SourceFile(n) => swap_list(&mut n.statements),
            Node::Block(n) => swap_list(&mut n.statements),
            Node::VariableStatement(n) => swap(&mut n.decl_list),
            Node::VariableDeclarationList(n) => swap_list(&mut n.declarations),
            Node::VariableDeclaration(n) => {
                swap(&mut n.name);
                swap(&mut n.initializer);
            }
            Node::ExpressionStatement(n) => swap(&mut n.expression),
            Node::ClassDeclaration(n) => {
                swap(&mut n.name);
                swap_list(&mut n.members);
            }
            Node::PropertyDeclaration(n) => {
                swap(&mut n.name);
                swap(&mut n.initializer);
            }
            Node::ImportDeclaration(n) => {
                match &mut n.bindings {
                    ImportBindings::SideEffect => {}
                    ImportBindings::Default(name) | ImportBindings::Namespace(name) => swap(name),
                    ImportBindings::Named(names) => swap_list(names),
                }
                swap(&mut n.module_specifier);
            }
            Node::ExportDeclaration(n) => {
                swap_list(&mut n.names);
                swap(&mut n.module_specifier);
            }
            Node::ReturnStatement(n) => swap(&mut n.expression),
            Node::NotEmittedStatement(_) => {}
            Node::Identifier(_) | Node::StringLiteral(_) | Node::NumericLiteral(_) => {}
            Node::CallExpression(n) => {
                swap(&mut n.expression);
                swap_list(&mut n.arguments);
            }
            Node::PropertyAccessExpression(n) => {
                swap(&mut n.expression);
                swap(&mut n.name);
            }
            Node::BinaryExpression(n) => {
                swap(&mut n.left);
                swap(&mut n.right);
            }
            Node::ParenthesizedExpression(n) => swap(&mut n.expression),
            Node::ArrowFunction(n) => {
                swap_list(&mut n.parameters);
                swap(&mut n.body);
            }
        }
    }

    /// Statement list of a container node, if this is one.
    pub fn statements(&self) -> Option<&[NodeIndex]> {
        match self {
            Node::SourceFile(n) => Some(&n.statements),
            Node::Block(n) => Some(&n.statements),
            _ => None,
        }
    }
}
