//! Token definitions for the Kiln language

use kiln_common::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Token types in the Kiln language
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TokenKind {
    // Literals
    IntegerLiteral(i64),
    RealLiteral(f64),
    StringLiteral(String),

    // Identifiers
    Identifier(String),

    // Keywords
    KeywordVar,
    KeywordConst,
    KeywordProc,
    KeywordStruct,
    KeywordReturn,
    KeywordIf,
    KeywordElse,
    KeywordWhile,
    KeywordDo,
    KeywordFor,
    KeywordTrue,
    KeywordFalse,
    KeywordNull,
    KeywordSizeOf,
    KeywordTypeOf,
    KeywordAs,

    // Operators
    Plus,              // +
    Minus,             // -
    Asterisk,          // *
    Slash,             // /
    Percent,           // %
    ShiftLeft,         // <<
    ShiftRight,        // >>
    Ampersand,         // &
    Pipe,              // |
    Caret,             // ^
    Tilde,             // ~
    Bang,              // !
    Less,              // <
    LessEqual,         // <=
    Greater,           // >
    GreaterEqual,      // >=
    EqualEqual,        // ==
    BangEqual,         // !=
    Equal,             // =
    PlusEqual,         // +=
    MinusEqual,        // -=
    AsteriskEqual,     // *=
    SlashEqual,        // /=
    PercentEqual,      // %=
    ShiftLeftEqual,    // <<=
    ShiftRightEqual,   // >>=
    AmpersandEqual,    // &=
    PipeEqual,         // |=
    CaretEqual,        // ^=
    Arrow,             // ->
    Dot,               // .
    DotDot,            // ..

    // Delimiters
    Comma,             // ,
    Colon,             // :
    Semicolon,         // ;
    LeftParen,         // (
    RightParen,        // )
    LeftBrace,         // {
    RightBrace,        // }
    LeftBracket,       // [
    RightBracket,      // ]

    EndOfFile,
}

impl TokenKind {
    /// Keyword lookup for identifiers produced by the scanner.
    pub fn keyword(name: &str) -> Option<TokenKind> {
        let kind = match name {
            "var" => TokenKind::KeywordVar,
            "const" => TokenKind::KeywordConst,
            "proc" => TokenKind::KeywordProc,
            "struct" => TokenKind::KeywordStruct,
            "return" => TokenKind::KeywordReturn,
            "if" => TokenKind::KeywordIf,
            "else" => TokenKind::KeywordElse,
            "while" => TokenKind::KeywordWhile,
            "do" => TokenKind::KeywordDo,
            "for" => TokenKind::KeywordFor,
            "true" => TokenKind::KeywordTrue,
            "false" => TokenKind::KeywordFalse,
            "null" => TokenKind::KeywordNull,
            "size_of" => TokenKind::KeywordSizeOf,
            "type_of" => TokenKind::KeywordTypeOf,
            "as" => TokenKind::KeywordAs,
            _ => return None,
        };
        Some(kind)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::IntegerLiteral(n) => write!(f, "{}", n),
            TokenKind::RealLiteral(n) => write!(f, "{}", n),
            TokenKind::StringLiteral(s) => write!(f, "\"{}\"", s),
            TokenKind::Identifier(name) => write!(f, "{}", name),
            _ => {
                let text = match self {
                    TokenKind::KeywordVar => "var",
                    TokenKind::KeywordConst => "const",
                    TokenKind::KeywordProc => "proc",
                    TokenKind::KeywordStruct => "struct",
                    TokenKind::KeywordReturn => "return",
                    TokenKind::KeywordIf => "if",
                    TokenKind::KeywordElse => "else",
                    TokenKind::KeywordWhile => "while",
                    TokenKind::KeywordDo => "do",
                    TokenKind::KeywordFor => "for",
                    TokenKind::KeywordTrue => "true",
                    TokenKind::KeywordFalse => "false",
                    TokenKind::KeywordNull => "null",
                    TokenKind::KeywordSizeOf => "size_of",
                    TokenKind::KeywordTypeOf => "type_of",
                    TokenKind::KeywordAs => "as",
                    TokenKind::Plus => "+",
                    TokenKind::Minus => "-",
                    TokenKind::Asterisk => "*",
                    TokenKind::Slash => "/",
                    TokenKind::Percent => "%",
                    TokenKind::ShiftLeft => "<<",
                    TokenKind::ShiftRight => ">>",
                    TokenKind::Ampersand => "&",
                    TokenKind::Pipe => "|",
                    TokenKind::Caret => "^",
                    TokenKind::Tilde => "~",
                    TokenKind::Bang => "!",
                    TokenKind::Less => "<",
                    TokenKind::LessEqual => "<=",
                    TokenKind::Greater => ">",
                    TokenKind::GreaterEqual => ">=",
                    TokenKind::EqualEqual => "==",
                    TokenKind::BangEqual => "!=",
                    TokenKind::Equal => "=",
                    TokenKind::PlusEqual => "+=",
                    TokenKind::MinusEqual => "-=",
                    TokenKind::AsteriskEqual => "*=",
                    TokenKind::SlashEqual => "/=",
                    TokenKind::PercentEqual => "%=",
                    TokenKind::ShiftLeftEqual => "<<=",
                    TokenKind::ShiftRightEqual => ">>=",
                    TokenKind::AmpersandEqual => "&=",
                    TokenKind::PipeEqual => "|=",
                    TokenKind::CaretEqual => "^=",
                    TokenKind::Arrow => "->",
                    TokenKind::Dot => ".",
                    TokenKind::DotDot => "..",
                    TokenKind::Comma => ",",
                    TokenKind::Colon => ":",
                    TokenKind::Semicolon => ";",
                    TokenKind::LeftParen => "(",
                    TokenKind::RightParen => ")",
                    TokenKind::LeftBrace => "{",
                    TokenKind::RightBrace => "}",
                    TokenKind::LeftBracket => "[",
                    TokenKind::RightBracket => "]",
                    TokenKind::EndOfFile => "<eof>",
                    _ => unreachable!(),
                };
                write!(f, "{}", text)
            }
        }
    }
}

/// A token with its source span
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::EndOfFile
    }
}
