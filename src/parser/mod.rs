//! Recursive-descent parser for the hosted source subset.
//!
//! The parser exists to host the comment pipeline: it produces arena nodes
//! with faithful byte positions (full start, token start, end) and
//! parser-assigned parents, and nothing more. It is deliberately
//! permissive about the language itself.

pub mod scanner;

use std::fmt;
use std::sync::Arc;

use crate::ast::{
    ArrowFunctionNode, BinaryExpressionNode, BinaryOperator, BlockNode, CallExpressionNode,
    ClassDeclarationNode, DeclarationKind, ExportDeclarationNode, ExpressionStatementNode,
    IdentifierNode, ImportBindings, ImportDeclarationNode, LiteralNode, Node, NodeArena,
    NodeBase, NodeFlags, NodeIndex, ReturnStatementNode, SourceFileNode,
    VariableDeclarationListNode, VariableDeclarationNode, VariableStatementNode,
    PropertyDeclarationNode,
};
use crate::source_file::SourceFile;
use scanner::{Token, TokenKind, scan_tokens};

/// Parse failure with source location context.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParseError {
    UnexpectedToken {
        expected: &'static str,
        found: String,
        file_name: String,
        line: u32,
        column: u32,
    },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::UnexpectedToken {
                expected,
                found,
                file_name,
                line,
                column,
            } => write!(
                f,
                "{}:{}:{}: expected {}, found '{}'",
                file_name,
                line + 1,
                column + 1,
                expected,
                found
            ),
        }
    }
}

impl std::error::Error for ParseError {}

pub struct ParserState {
    file: SourceFile,
    tokens: Vec<Token>,
    current: usize,
    arena: NodeArena,
}

impl ParserState {
    pub fn new(file_name: impl Into<String>, source_text: impl Into<Arc<str>>) -> ParserState {
        let file = SourceFile::new(file_name, source_text);
        let tokens = scan_tokens(&file.text);
        ParserState {
            file,
            tokens,
            current: 0,
            arena: NodeArena::with_capacity(64),
        }
    }

    pub fn file(&self) -> &SourceFile {
        &self.file
    }

    pub fn arena(&self) -> &NodeArena {
        &self.arena
    }

    pub fn into_parts(self) -> (SourceFile, NodeArena) {
        (self.file, self.arena)
    }

    // =========================================================================
    // Token helpers
    // =========================================================================

    fn tok(&self) -> Token {
        self.tokens[self.current.min(self.tokens.len() - 1)]
    }

    fn peek(&self, ahead: usize) -> Token {
        self.tokens[(self.current + ahead).min(self.tokens.len() - 1)]
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.tok().kind == kind
    }

    fn advance(&mut self) -> Token {
        let token = self.tok();
        if self.current < self.tokens.len() - 1 {
            self.current += 1;
        }
        token
    }

    fn eat(&mut self, kind: TokenKind) -> Option<Token> {
        if self.at(kind) { Some(self.advance()) } else { None }
    }

    fn expect(&mut self, kind: TokenKind, expected: &'static str) -> Result<Token, ParseError> {
        if self.at(kind) {
            Ok(self.advance())
        } else {
            let token = self.tok();
            let (line, column) = self.file.line_and_column(token.pos);
            Err(ParseError::UnexpectedToken {
                expected,
                found: self.token_text(token).to_string(),
                file_name: self.file.file_name.clone(),
                line,
                column,
            })
        }
    }

    fn token_text(&self, token: Token) -> &str {
        if token.kind == TokenKind::EndOfFile {
            "<eof>"
        } else {
            &self.file.text[token.pos as usize..token.end as usize]
        }
    }

    /// Full start for a node beginning at the current token: the end of the
    /// previous token, with leading trivia in between.
    fn full_start(&self) -> u32 {
        if self.current == 0 {
            0
        } else {
            self.tokens[self.current - 1].end
        }
    }

    /// End of the most recently consumed token.
    fn prev_end(&self) -> u32 {
        if self.current == 0 {
            0
        } else {
            self.tokens[self.current - 1].end
        }
    }

    /// Add a node and wire its children's parent fields to it.
    fn alloc(&mut self, node: Node) -> NodeIndex {
        let children = node.children();
        let idx = self.arena.add(node);
        for child in children {
            self.arena.set_parent(child, idx);
        }
        idx
    }

    // =========================================================================
    // Statements
    // =========================================================================

    pub fn parse_source_file(&mut self) -> Result<NodeIndex, ParseError> {
        let mut statements = Vec::new();
        while !self.at(TokenKind::EndOfFile) {
            statements.push(self.parse_statement()?);
        }
        let base = NodeBase::new(0, 0, self.file.len());
        Ok(self.alloc(Node::SourceFile(SourceFileNode { base, statements })))
    }

    fn parse_statement(&mut self) -> Result<NodeIndex, ParseError> {
        let full = self.full_start();
        let start = self.tok().pos;
        match self.tok().kind {
            TokenKind::ImportKeyword => self.parse_import(full, start),
            TokenKind::ExportKeyword => {
                self.advance();
                match self.tok().kind {
                    TokenKind::ClassKeyword => self.parse_class(full, start, true),
                    TokenKind::VarKeyword | TokenKind::LetKeyword | TokenKind::ConstKeyword => {
                        self.parse_variable_statement(full, start, true)
                    }
                    _ => self.parse_export_declaration(full, start),
                }
            }
            TokenKind::ClassKeyword => self.parse_class(full, start, false),
            TokenKind::VarKeyword | TokenKind::LetKeyword | TokenKind::ConstKeyword => {
                self.parse_variable_statement(full, start, false)
            }
            TokenKind::OpenBrace => self.parse_block(full, start),
            TokenKind::ReturnKeyword => self.parse_return(full, start),
            _ => self.parse_expression_statement(full, start),
        }
    }

    fn parse_import(&mut self, full: u32, start: u32) -> Result<NodeIndex, ParseError> {
        self.advance(); // import
        let (bindings, specifier) = if self.at(TokenKind::StringLiteral) {
            (ImportBindings::SideEffect, self.parse_string_literal()?)
        } else {
            let bindings = match self.tok().kind {
                TokenKind::Asterisk => {
                    self.advance();
                    self.expect(TokenKind::AsKeyword, "'as'")?;
                    ImportBindings::Namespace(self.parse_identifier()?)
                }
                TokenKind::OpenBrace => {
                    self.advance();
                    let mut names = Vec::new();
                    while !self.at(TokenKind::CloseBrace) {
                        names.push(self.parse_identifier()?);
                        if self.eat(TokenKind::Comma).is_none() {
                            break;
                        }
                    }
                    self.expect(TokenKind::CloseBrace, "'}'")?;
                    ImportBindings::Named(names)
                }
                _ => ImportBindings::Default(self.parse_identifier()?),
            };
            self.expect(TokenKind::FromKeyword, "'from'")?;
            (bindings, self.parse_string_literal()?)
        };
        self.eat(TokenKind::Semicolon);
        let base = NodeBase::new(full, start, self.prev_end());
        Ok(self.alloc(Node::ImportDeclaration(ImportDeclarationNode {
            base,
            bindings,
            module_specifier: specifier,
        })))
    }

    fn parse_export_declaration(&mut self, full: u32, start: u32) -> Result<NodeIndex, ParseError> {
        let (names, is_star) = if self.eat(TokenKind::Asterisk).is_some() {
            (Vec::new(), true)
        } else {
            self.expect(TokenKind::OpenBrace, "'{' or '*' after 'export'")?;
            let mut names = Vec::new();
            while !self.at(TokenKind::CloseBrace) {
                names.push(self.parse_identifier()?);
                if self.eat(TokenKind::Comma).is_none() {
                    break;
                }
            }
            self.expect(TokenKind::CloseBrace, "'}'")?;
            (names, false)
        };
        let module_specifier = if self.eat(TokenKind::FromKeyword).is_some() {
            self.parse_string_literal()?
        } else {
            NodeIndex::NONE
        };
        self.eat(TokenKind::Semicolon);
        let base = NodeBase::new(full, start, self.prev_end());
        Ok(self.alloc(Node::ExportDeclaration(ExportDeclarationNode {
            base,
            names,
            is_star,
            module_specifier,
        })))
    }

    fn parse_class(&mut self, full: u32, start: u32, export: bool) -> Result<NodeIndex, ParseError> {
        self.advance(); // class
        let name = self.parse_identifier()?;
        self.expect(TokenKind::OpenBrace, "'{'")?;
        let mut members = Vec::new();
        while !self.at(TokenKind::CloseBrace) && !self.at(TokenKind::EndOfFile) {
            members.push(self.parse_property_member()?);
        }
        self.expect(TokenKind::CloseBrace, "'}'")?;
        let mut base = NodeBase::new(full, start, self.prev_end());
        if export {
            base.flags |= NodeFlags::EXPORT;
        }
        Ok(self.alloc(Node::ClassDeclaration(ClassDeclarationNode {
            base,
            name,
            members,
        })))
    }

    fn parse_property_member(&mut self) -> Result<NodeIndex, ParseError> {
        let full = self.full_start();
        let start = self.tok().pos;
        let is_static = self.eat(TokenKind::StaticKeyword).is_some();
        let name = self.parse_identifier()?;
        let initializer = if self.eat(TokenKind::Equals).is_some() {
            self.parse_assignment_expression()?
        } else {
            NodeIndex::NONE
        };
        self.eat(TokenKind::Semicolon);
        let mut base = NodeBase::new(full, start, self.prev_end());
        if is_static {
            base.flags |= NodeFlags::STATIC;
        }
        Ok(self.alloc(Node::PropertyDeclaration(PropertyDeclarationNode {
            base,
            name,
            initializer,
        })))
    }

    fn parse_variable_statement(
        &mut self,
        full: u32,
        start: u32,
        export: bool,
    ) -> Result<NodeIndex, ParseError> {
        let kw = self.advance();
        let kind = match kw.kind {
            TokenKind::LetKeyword => DeclarationKind::Let,
            TokenKind::ConstKeyword => DeclarationKind::Const,
            _ => DeclarationKind::Var,
        };
        let list_full = self.full_start();
        let list_start = self.tok().pos;
        let mut declarations = Vec::new();
        loop {
            declarations.push(self.parse_variable_declaration()?);
            if self.eat(TokenKind::Comma).is_none() {
                break;
            }
        }
        let list_base = NodeBase::new(list_full, list_start, self.prev_end());
        let decl_list = self.alloc(Node::VariableDeclarationList(VariableDeclarationListNode {
            base: list_base,
            kind,
            declarations,
        }));
        self.eat(TokenKind::Semicolon);
        let mut base = NodeBase::new(full, start, self.prev_end());
        if export {
            base.flags |= NodeFlags::EXPORT;
        }
        Ok(self.alloc(Node::VariableStatement(VariableStatementNode {
            base,
            decl_list,
        })))
    }

    fn parse_variable_declaration(&mut self) -> Result<NodeIndex, ParseError> {
        let full = self.full_start();
        let start = self.tok().pos;
        let name = self.parse_identifier()?;
        let initializer = if self.eat(TokenKind::Equals).is_some() {
            self.parse_assignment_expression()?
        } else {
            NodeIndex::NONE
        };
        let base = NodeBase::new(full, start, self.prev_end());
        Ok(self.alloc(Node::VariableDeclaration(VariableDeclarationNode {
            base,
            name,
            initializer,
        })))
    }

    fn parse_block(&mut self, full: u32, start: u32) -> Result<NodeIndex, ParseError> {
        self.advance(); // {
        let mut statements = Vec::new();
        while !self.at(TokenKind::CloseBrace) && !self.at(TokenKind::EndOfFile) {
            statements.push(self.parse_statement()?);
        }
        self.expect(TokenKind::CloseBrace, "'}'")?;
        let base = NodeBase::new(full, start, self.prev_end());
        Ok(self.alloc(Node::Block(BlockNode { base, statements })))
    }

    fn parse_return(&mut self, full: u32, start: u32) -> Result<NodeIndex, ParseError> {
        self.advance(); // return
        let expression = if self.at(TokenKind::Semicolon)
            || self.at(TokenKind::CloseBrace)
            || self.at(TokenKind::EndOfFile)
        {
            NodeIndex::NONE
        } else {
            self.parse_expression()?
        };
        self.eat(TokenKind::Semicolon);
        let base = NodeBase::new(full, start, self.prev_end());
        Ok(self.alloc(Node::ReturnStatement(ReturnStatementNode { base, expression })))
    }

    fn parse_expression_statement(&mut self, full: u32, start: u32) -> Result<NodeIndex, ParseError> {
        let expression = self.parse_expression()?;
        self.eat(TokenKind::Semicolon);
        let base = NodeBase::new(full, start, self.prev_end());
        Ok(self.alloc(Node::ExpressionStatement(ExpressionStatementNode {
            base,
            expression,
        })))
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    fn parse_expression(&mut self) -> Result<NodeIndex, ParseError> {
        self.parse_assignment_expression()
    }

    fn parse_assignment_expression(&mut self) -> Result<NodeIndex, ParseError> {
        let full = self.full_start();
        let left = self.parse_binary_expression(1)?;
        if self.eat(TokenKind::Equals).is_some() {
            let right = self.parse_assignment_expression()?;
            let start = self.arena.base(left).map_or(full, |b| b.start);
            let base = NodeBase::new(full, start, self.prev_end());
            return Ok(self.alloc(Node::BinaryExpression(BinaryExpressionNode {
                base,
                left,
                operator: BinaryOperator::Assign,
                right,
            })));
        }
        Ok(left)
    }

    fn binary_operator(kind: TokenKind) -> Option<(BinaryOperator, u8)> {
        Some(match kind {
            TokenKind::LessThan => (BinaryOperator::LessThan, 1),
            TokenKind::Plus => (BinaryOperator::Plus, 2),
            TokenKind::Minus => (BinaryOperator::Minus, 2),
            TokenKind::Asterisk => (BinaryOperator::Asterisk, 3),
            TokenKind::Slash => (BinaryOperator::Slash, 3),
            _ => return None,
        })
    }

    fn parse_binary_expression(&mut self, min_precedence: u8) -> Result<NodeIndex, ParseError> {
        let full = self.full_start();
        let mut left = self.parse_postfix_expression()?;
        while let Some((operator, precedence)) = Self::binary_operator(self.tok().kind) {
            if precedence < min_precedence {
                break;
            }
            self.advance();
            let right = self.parse_binary_expression(precedence + 1)?;
            let start = self.arena.base(left).map_or(full, |b| b.start);
            let base = NodeBase::new(full, start, self.prev_end());
            left = self.alloc(Node::BinaryExpression(BinaryExpressionNode {
                base,
                left,
                operator,
                right,
            }));
        }
        Ok(left)
    }

    fn parse_postfix_expression(&mut self) -> Result<NodeIndex, ParseError> {
        let full = self.full_start();
        let mut expr = self.parse_primary_expression()?;
        loop {
            if self.eat(TokenKind::Dot).is_some() {
                let name = self.parse_identifier()?;
                let start = self.arena.base(expr).map_or(full, |b| b.start);
                let base = NodeBase::new(full, start, self.prev_end());
                expr = self.alloc(Node::PropertyAccessExpression(
                    crate::ast::PropertyAccessExpressionNode {
                        base,
                        expression: expr,
                        name,
                    },
                ));
            } else if self.at(TokenKind::OpenParen) {
                self.advance();
                let mut arguments = Vec::new();
                while !self.at(TokenKind::CloseParen) && !self.at(TokenKind::EndOfFile) {
                    arguments.push(self.parse_assignment_expression()?);
                    if self.eat(TokenKind::Comma).is_none() {
                        break;
                    }
                }
                self.expect(TokenKind::CloseParen, "')'")?;
                let start = self.arena.base(expr).map_or(full, |b| b.start);
                let base = NodeBase::new(full, start, self.prev_end());
                expr = self.alloc(Node::CallExpression(CallExpressionNode {
                    base,
                    expression: expr,
                    arguments,
                }));
            } else {
                break;
            }
        }
        Ok(expr)
    }

    /// `(a, b) =>` lookahead: only identifier parameters are supported, so
    /// a flat token scan suffices.
    fn is_arrow_ahead(&self) -> bool {
        debug_assert!(self.at(TokenKind::OpenParen));
        let mut j = 1;
        loop {
            match self.peek(j).kind {
                TokenKind::Identifier | TokenKind::Comma => j += 1,
                TokenKind::CloseParen => {
                    return self.peek(j + 1).kind == TokenKind::EqualsGreaterThan;
                }
                _ => return false,
            }
        }
    }

    fn parse_arrow_body(&mut self) -> Result<NodeIndex, ParseError> {
        if self.at(TokenKind::OpenBrace) {
            let full = self.full_start();
            let start = self.tok().pos;
            self.parse_block(full, start)
        } else {
            self.parse_assignment_expression()
        }
    }

    fn parse_primary_expression(&mut self) -> Result<NodeIndex, ParseError> {
        let full = self.full_start();
        let start = self.tok().pos;
        match self.tok().kind {
            TokenKind::NumericLiteral => {
                let token = self.advance();
                let text = self.token_text(token).to_string();
                let base = NodeBase::new(full, start, token.end);
                Ok(self.alloc(Node::NumericLiteral(LiteralNode { base, text })))
            }
            TokenKind::StringLiteral => self.parse_string_literal(),
            TokenKind::Identifier => {
                if self.peek(1).kind == TokenKind::EqualsGreaterThan {
                    let parameter = self.parse_identifier()?;
                    self.advance(); // =>
                    let body = self.parse_arrow_body()?;
                    let base = NodeBase::new(full, start, self.prev_end());
                    return Ok(self.alloc(Node::ArrowFunction(ArrowFunctionNode {
                        base,
                        parameters: vec![parameter],
                        body,
                    })));
                }
                self.parse_identifier()
            }
            TokenKind::OpenParen => {
                if self.is_arrow_ahead() {
                    self.advance(); // (
                    let mut parameters = Vec::new();
                    while !self.at(TokenKind::CloseParen) {
                        parameters.push(self.parse_identifier()?);
                        if self.eat(TokenKind::Comma).is_none() {
                            break;
                        }
                    }
                    self.expect(TokenKind::CloseParen, "')'")?;
                    self.expect(TokenKind::EqualsGreaterThan, "'=>'")?;
                    let body = self.parse_arrow_body()?;
                    let base = NodeBase::new(full, start, self.prev_end());
                    return Ok(self.alloc(Node::ArrowFunction(ArrowFunctionNode {
                        base,
                        parameters,
                        body,
                    })));
                }
                self.advance(); // (
                let expression = self.parse_expression()?;
                self.expect(TokenKind::CloseParen, "')'")?;
                let base = NodeBase::new(full, start, self.prev_end());
                Ok(self.alloc(Node::ParenthesizedExpression(
                    crate::ast::ParenthesizedExpressionNode { base, expression },
                )))
            }
            _ => {
                let token = self.tok();
                let (line, column) = self.file.line_and_column(token.pos);
                Err(ParseError::UnexpectedToken {
                    expected: "an expression",
                    found: self.token_text(token).to_string(),
                    file_name: self.file.file_name.clone(),
                    line,
                    column,
                })
            }
        }
    }

    fn parse_identifier(&mut self) -> Result<NodeIndex, ParseError> {
        let full = self.full_start();
        let token = self.expect(TokenKind::Identifier, "an identifier")?;
        let text = self.token_text(token).to_string();
        let base = NodeBase::new(full, token.pos, token.end);
        Ok(self.alloc(Node::Identifier(IdentifierNode { base, text })))
    }

    fn parse_string_literal(&mut self) -> Result<NodeIndex, ParseError> {
        let full = self.full_start();
        let token = self.expect(TokenKind::StringLiteral, "a string literal")?;
        let raw = self.token_text(token);
        // Strip the surrounding quotes; unterminated literals keep the rest.
        let text = if raw.len() >= 2 {
            raw[1..raw.len() - 1].to_string()
        } else {
            String::new()
        };
        let base = NodeBase::new(full, token.pos, token.end);
        Ok(self.alloc(Node::StringLiteral(LiteralNode { base, text })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::SyntaxKind;

    fn parse(source: &str) -> (ParserState, NodeIndex) {
        let mut parser = ParserState::new("test.ts", source);
        let root = parser.parse_source_file().expect("parse failed");
        (parser, root)
    }

    fn statement_kinds(parser: &ParserState, root: NodeIndex) -> Vec<SyntaxKind> {
        let Some(Node::SourceFile(file)) = parser.arena().get(root) else {
            panic!("root is not a source file");
        };
        file.statements
            .iter()
            .map(|&s| parser.arena().kind(s).unwrap())
            .collect()
    }

    #[test]
    fn parses_statement_mix() {
        let (parser, root) = parse(
            "import {a} from 'm';\nexport var x = 1;\nclass C { y = 2; }\nf(x);\n{ return; }\n",
        );
        assert_eq!(
            statement_kinds(&parser, root),
            vec![
                SyntaxKind::ImportDeclaration,
                SyntaxKind::VariableStatement,
                SyntaxKind::ClassDeclaration,
                SyntaxKind::ExpressionStatement,
                SyntaxKind::Block,
            ]
        );
    }

    #[test]
    fn full_start_includes_leading_trivia() {
        let (parser, root) = parse("let x;\n// doc\nlet y;\n");
        let Some(Node::SourceFile(file)) = parser.arena().get(root) else {
            unreachable!()
        };
        let second = parser.arena().base(file.statements[1]).unwrap();
        // Full start is right after the first statement; token start is 'let'.
        assert_eq!(second.pos, 6);
        assert_eq!(second.start, 14);
    }

    #[test]
    fn parents_are_assigned() {
        let (parser, root) = parse("var x = 1;\n");
        let Some(Node::SourceFile(file)) = parser.arena().get(root) else {
            unreachable!()
        };
        let stmt = file.statements[0];
        assert_eq!(parser.arena().parent(stmt), root);
        let Some(Node::VariableStatement(var_stmt)) = parser.arena().get(stmt) else {
            unreachable!()
        };
        assert_eq!(parser.arena().parent(var_stmt.decl_list), stmt);
    }

    #[test]
    fn exported_variable_statement_has_flag() {
        let (parser, root) = parse("export const x = 1;\n");
        let Some(Node::SourceFile(file)) = parser.arena().get(root) else {
            unreachable!()
        };
        let base = parser.arena().base(file.statements[0]).unwrap();
        assert!(base.flags.contains(NodeFlags::EXPORT));
    }

    #[test]
    fn arrow_with_expression_body() {
        let (parser, root) = parse("var f = (a, b) => a + b;\n");
        let Some(Node::SourceFile(file)) = parser.arena().get(root) else {
            unreachable!()
        };
        let Some(Node::VariableStatement(stmt)) = parser.arena().get(file.statements[0]) else {
            unreachable!()
        };
        let Some(Node::VariableDeclarationList(list)) = parser.arena().get(stmt.decl_list) else {
            unreachable!()
        };
        let Some(Node::VariableDeclaration(decl)) = parser.arena().get(list.declarations[0])
        else {
            unreachable!()
        };
        let Some(Node::ArrowFunction(arrow)) = parser.arena().get(decl.initializer) else {
            panic!("initializer is not an arrow function");
        };
        assert_eq!(arrow.parameters.len(), 2);
        assert_eq!(
            parser.arena().kind(arrow.body),
            Some(SyntaxKind::BinaryExpression)
        );
    }

    #[test]
    fn import_forms() {
        let (parser, root) = parse(
            "import 'se';\nimport d from 'a';\nimport * as ns from 'b';\nimport {x, y} from 'c';\nexport {x} from 'd';\nexport * from 'e';\n",
        );
        let kinds = statement_kinds(&parser, root);
        assert_eq!(kinds[..4], [SyntaxKind::ImportDeclaration; 4]);
        assert_eq!(kinds[4..], [SyntaxKind::ExportDeclaration; 2]);
    }

    #[test]
    fn error_carries_location() {
        let mut parser = ParserState::new("bad.ts", "var ;");
        let err = parser.parse_source_file().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("bad.ts:1:5"), "{message}");
        assert!(message.contains("identifier"), "{message}");
    }
}
