//! Token scanner for the hosted source subset.
//!
//! Comments and whitespace are trivia: the scanner skips them entirely and
//! the comment passes recover them later by re-scanning the raw text
//! between token boundaries. That is why every token records only its own
//! `[pos, end)`; a node's full start is derived from the previous token's
//! end.

use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum TokenKind {
    Identifier,
    StringLiteral,
    NumericLiteral,
    ImportKeyword,
    ExportKeyword,
    FromKeyword,
    ClassKeyword,
    StaticKeyword,
    VarKeyword,
    LetKeyword,
    ConstKeyword,
    ReturnKeyword,
    AsKeyword,
    OpenBrace,
    CloseBrace,
    OpenParen,
    CloseParen,
    Comma,
    Semicolon,
    Dot,
    Asterisk,
    Plus,
    Minus,
    Slash,
    LessThan,
    Equals,
    EqualsGreaterThan,
    EndOfFile,
    Unknown,
}

#[derive(Clone, Copy, Debug, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte offset of the first character of the token.
    pub pos: u32,
    /// One past the last character.
    pub end: u32,
}

fn keyword_kind(text: &str) -> Option<TokenKind> {
    Some(match text {
        "import" => TokenKind::ImportKeyword,
        "export" => TokenKind::ExportKeyword,
        "from" => TokenKind::FromKeyword,
        "class" => TokenKind::ClassKeyword,
        "static" => TokenKind::StaticKeyword,
        "var" => TokenKind::VarKeyword,
        "let" => TokenKind::LetKeyword,
        "const" => TokenKind::ConstKeyword,
        "return" => TokenKind::ReturnKeyword,
        "as" => TokenKind::AsKeyword,
        _ => return None,
    })
}

fn is_ident_start(ch: u8) -> bool {
    ch.is_ascii_alphabetic() || ch == b'_' || ch == b'$'
}

fn is_ident_part(ch: u8) -> bool {
    is_ident_start(ch) || ch.is_ascii_digit()
}

/// Tokenize the whole source up front. The subset is small enough that a
/// token vector is simpler than incremental scanning, and it gives the
/// parser cheap lookahead for arrow-function detection.
pub fn scan_tokens(source: &str) -> Vec<Token> {
    let bytes = source.as_bytes();
    let len = bytes.len();
    let mut tokens = Vec::new();
    let mut i = 0usize;

    while i < len {
        let ch = bytes[i];

        if ch == b' ' || ch == b'\t' || ch == b'\r' || ch == b'\n' {
            i += 1;
            continue;
        }

        // Comment trivia.
        if ch == b'/' && i + 1 < len && bytes[i + 1] == b'/' {
            while i < len && bytes[i] != b'\n' {
                i += 1;
            }
            continue;
        }
        if ch == b'/' && i + 1 < len && bytes[i + 1] == b'*' {
            i += 2;
            while i + 1 < len && !(bytes[i] == b'*' && bytes[i + 1] == b'/') {
                i += 1;
            }
            i = (i + 2).min(len);
            continue;
        }

        let start = i as u32;

        if is_ident_start(ch) {
            while i < len && is_ident_part(bytes[i]) {
                i += 1;
            }
            let text = &source[start as usize..i];
            let kind = keyword_kind(text).unwrap_or(TokenKind::Identifier);
            tokens.push(Token {
                kind,
                pos: start,
                end: i as u32,
            });
            continue;
        }

        if ch.is_ascii_digit() {
            while i < len && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
                i += 1;
            }
            tokens.push(Token {
                kind: TokenKind::NumericLiteral,
                pos: start,
                end: i as u32,
            });
            continue;
        }

        if ch == b'"' || ch == b'\'' {
            let quote = ch;
            i += 1;
            while i < len && bytes[i] != quote && bytes[i] != b'\n' {
                if bytes[i] == b'\\' {
                    i += 1;
                }
                i += 1;
            }
            i = (i + 1).min(len);
            tokens.push(Token {
                kind: TokenKind::StringLiteral,
                pos: start,
                end: i as u32,
            });
            continue;
        }

        let (kind, width) = match ch {
            b'{' => (TokenKind::OpenBrace, 1),
            b'}' => (TokenKind::CloseBrace, 1),
            b'(' => (TokenKind::OpenParen, 1),
            b')' => (TokenKind::CloseParen, 1),
            b',' => (TokenKind::Comma, 1),
            b';' => (TokenKind::Semicolon, 1),
            b'.' => (TokenKind::Dot, 1),
            b'*' => (TokenKind::Asterisk, 1),
            b'+' => (TokenKind::Plus, 1),
            b'-' => (TokenKind::Minus, 1),
            b'/' => (TokenKind::Slash, 1),
            b'<' => (TokenKind::LessThan, 1),
            b'=' if i + 1 < len && bytes[i + 1] == b'>' => (TokenKind::EqualsGreaterThan, 2),
            b'=' => (TokenKind::Equals, 1),
            _ => (TokenKind::Unknown, 1),
        };
        i += width;
        tokens.push(Token {
            kind,
            pos: start,
            end: i as u32,
        });
    }

    tokens.push(Token {
        kind: TokenKind::EndOfFile,
        pos: len as u32,
        end: len as u32,
    });
    tokens
}
