//! Arena-based AST shared by the parser and the transform passes.

pub mod arena;
pub mod base;
pub mod node;

pub use arena::NodeArena;
pub use base::{INVALID_POS, NodeBase, NodeFlags, NodeIndex, SyntaxKind, TextRange};
pub use node::{
    ArrowFunctionNode, BinaryExpressionNode, BinaryOperator, BlockNode, CallExpressionNode,
    ClassDeclarationNode, DeclarationKind, ExportDeclarationNode, ExpressionStatementNode,
    IdentifierNode, ImportBindings, ImportDeclarationNode, LiteralNode, Node,
    NotEmittedStatementNode, ParenthesizedExpressionNode, PropertyAccessExpressionNode,
    PropertyDeclarationNode, ReturnStatementNode, SourceFileNode, VariableDeclarationListNode,
    VariableDeclarationNode, VariableStatementNode,
};
