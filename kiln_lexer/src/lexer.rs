//! The Kiln scanner
//!
//! Produces a token stream from source text. Malformed literals, illegal
//! characters and unterminated strings or block comments are reported into
//! the shared diagnostics collection; scanning continues past them so one
//! pass surfaces as many problems as possible.

use crate::token::{Token, TokenKind};
use kiln_common::{Diagnostics, Position, Span};

pub struct Lexer<'a> {
    source: &'a str,
    bytes: &'a [u8],
    cursor: Position,
    diagnostics: Diagnostics,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            cursor: Position::start(),
            diagnostics: Diagnostics::new(),
        }
    }

    /// Scan the whole input. The returned diagnostics may hold errors even
    /// when tokens were produced; callers decide whether to continue.
    pub fn tokenize(mut self) -> (Vec<Token>, Diagnostics) {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let done = token.is_eof();
            tokens.push(token);
            if done {
                break;
            }
        }
        (tokens, self.diagnostics)
    }

    fn position(&self) -> Position {
        self.cursor
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.cursor.offset as usize).copied()
    }

    fn peek_at(&self, ahead: usize) -> Option<u8> {
        self.bytes.get(self.cursor.offset as usize + ahead).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let ch = self.peek()?;
        self.cursor.advance(ch);
        Some(ch)
    }

    fn eat(&mut self, expected: u8) -> bool {
        if self.peek() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(b' ') | Some(b'\t') | Some(b'\r') | Some(b'\n') => {
                    self.bump();
                }
                Some(b'/') if self.peek_at(1) == Some(b'/') => {
                    while let Some(ch) = self.peek() {
                        if ch == b'\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                Some(b'/') if self.peek_at(1) == Some(b'*') => {
                    let start = self.position();
                    self.bump();
                    self.bump();
                    let mut closed = false;
                    while let Some(ch) = self.bump() {
                        if ch == b'*' && self.peek() == Some(b'/') {
                            self.bump();
                            closed = true;
                            break;
                        }
                    }
                    if !closed {
                        self.diagnostics
                            .error("unterminated block comment", start.to(self.position()));
                    }
                }
                _ => break,
            }
        }
    }

    fn next_token(&mut self) -> Token {
        self.skip_trivia();

        let start = self.position();
        let ch = match self.bump() {
            Some(ch) => ch,
            None => return Token::new(TokenKind::EndOfFile, Span::single(start)),
        };

        let kind = match ch {
            b'0'..=b'9' => return self.scan_number(start),
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => return self.scan_identifier(start),
            b'"' => return self.scan_string(start),

            b'+' => {
                if self.eat(b'=') {
                    TokenKind::PlusEqual
                } else {
                    TokenKind::Plus
                }
            }
            b'-' => {
                if self.eat(b'=') {
                    TokenKind::MinusEqual
                } else if self.eat(b'>') {
                    TokenKind::Arrow
                } else {
                    TokenKind::Minus
                }
            }
            b'*' => {
                if self.eat(b'=') {
                    TokenKind::AsteriskEqual
                } else {
                    TokenKind::Asterisk
                }
            }
            b'/' => {
                if self.eat(b'=') {
                    TokenKind::SlashEqual
                } else {
                    TokenKind::Slash
                }
            }
            b'%' => {
                if self.eat(b'=') {
                    TokenKind::PercentEqual
                } else {
                    TokenKind::Percent
                }
            }
            b'<' => {
                if self.eat(b'<') {
                    if self.eat(b'=') {
                        TokenKind::ShiftLeftEqual
                    } else {
                        TokenKind::ShiftLeft
                    }
                } else if self.eat(b'=') {
                    TokenKind::LessEqual
                } else {
                    TokenKind::Less
                }
            }
            b'>' => {
                if self.eat(b'>') {
                    if self.eat(b'=') {
                        TokenKind::ShiftRightEqual
                    } else {
                        TokenKind::ShiftRight
                    }
                } else if self.eat(b'=') {
                    TokenKind::GreaterEqual
                } else {
                    TokenKind::Greater
                }
            }
            b'&' => {
                if self.eat(b'=') {
                    TokenKind::AmpersandEqual
                } else {
                    TokenKind::Ampersand
                }
            }
            b'|' => {
                if self.eat(b'=') {
                    TokenKind::PipeEqual
                } else {
                    TokenKind::Pipe
                }
            }
            b'^' => {
                if self.eat(b'=') {
                    TokenKind::CaretEqual
                } else {
                    TokenKind::Caret
                }
            }
            b'~' => TokenKind::Tilde,
            b'!' => {
                if self.eat(b'=') {
                    TokenKind::BangEqual
                } else {
                    TokenKind::Bang
                }
            }
            b'=' => {
                if self.eat(b'=') {
                    TokenKind::EqualEqual
                } else {
                    TokenKind::Equal
                }
            }
            b'.' => {
                if self.eat(b'.') {
                    TokenKind::DotDot
                } else {
                    TokenKind::Dot
                }
            }
            b',' => TokenKind::Comma,
            b':' => TokenKind::Colon,
            b';' => TokenKind::Semicolon,
            b'(' => TokenKind::LeftParen,
            b')' => TokenKind::RightParen,
            b'{' => TokenKind::LeftBrace,
            b'}' => TokenKind::RightBrace,
            b'[' => TokenKind::LeftBracket,
            b']' => TokenKind::RightBracket,

            other => {
                self.diagnostics.error(
                    format!("illegal character '{}'", other as char),
                    start.to(self.position()),
                );
                // Skip and carry on with the next token.
                return self.next_token();
            }
        };

        Token::new(kind, start.to(self.position()))
    }

    fn scan_number(&mut self, start: Position) -> Token {
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.bump();
        }

        let mut is_real = false;
        if self.peek() == Some(b'.') && matches!(self.peek_at(1), Some(b'0'..=b'9')) {
            is_real = true;
            self.bump();
            while matches!(self.peek(), Some(b'0'..=b'9')) {
                self.bump();
            }
        }

        let span = start.to(self.position());
        let text = &self.source[start.offset as usize..self.cursor.offset as usize];

        let kind = if is_real {
            match text.parse::<f64>() {
                Ok(value) => TokenKind::RealLiteral(value),
                Err(_) => {
                    self.diagnostics.error(format!("malformed real literal '{}'", text), span);
                    TokenKind::RealLiteral(0.0)
                }
            }
        } else {
            match text.parse::<i64>() {
                Ok(value) => TokenKind::IntegerLiteral(value),
                Err(_) => {
                    self.diagnostics.error(format!("malformed integer literal '{}'", text), span);
                    TokenKind::IntegerLiteral(0)
                }
            }
        };

        Token::new(kind, span)
    }

    fn scan_identifier(&mut self, start: Position) -> Token {
        while matches!(self.peek(), Some(b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_')) {
            self.bump();
        }

        let span = start.to(self.position());
        let text = &self.source[start.offset as usize..self.cursor.offset as usize];

        let kind = TokenKind::keyword(text).unwrap_or_else(|| TokenKind::Identifier(text.to_string()));
        Token::new(kind, span)
    }

    /// String literals decode their escapes here; the interpreter's `print`
    /// emits the stored bytes verbatim.
    fn scan_string(&mut self, start: Position) -> Token {
        let mut value = String::new();
        loop {
            match self.bump() {
                Some(b'"') => break,
                Some(b'\\') => match self.bump() {
                    Some(b'n') => value.push('\n'),
                    Some(b't') => value.push('\t'),
                    Some(b'0') => value.push('\0'),
                    Some(b'\\') => value.push('\\'),
                    Some(b'"') => value.push('"'),
                    Some(other) => {
                        self.diagnostics.error(
                            format!("unknown escape sequence '\\{}'", other as char),
                            start.to(self.position()),
                        );
                    }
                    None => {
                        self.diagnostics
                            .error("unterminated string literal", start.to(self.position()));
                        break;
                    }
                },
                Some(b'\n') | None => {
                    self.diagnostics
                        .error("unterminated string literal", start.to(self.position()));
                    break;
                }
                Some(ch) => value.push(ch as char),
            }
        }

        Token::new(TokenKind::StringLiteral(value), start.to(self.position()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let (tokens, diagnostics) = Lexer::new(source).tokenize();
        assert!(!diagnostics.has_errors(), "unexpected errors: {:?}", diagnostics.messages);
        tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn scans_declaration() {
        assert_eq!(
            kinds("var x : int = 7;"),
            vec![
                TokenKind::KeywordVar,
                TokenKind::Identifier("x".into()),
                TokenKind::Colon,
                TokenKind::Identifier("int".into()),
                TokenKind::Equal,
                TokenKind::IntegerLiteral(7),
                TokenKind::Semicolon,
                TokenKind::EndOfFile,
            ]
        );
    }

    #[test]
    fn scans_compound_operators() {
        assert_eq!(
            kinds("a <<= b >>= c != d .."),
            vec![
                TokenKind::Identifier("a".into()),
                TokenKind::ShiftLeftEqual,
                TokenKind::Identifier("b".into()),
                TokenKind::ShiftRightEqual,
                TokenKind::Identifier("c".into()),
                TokenKind::BangEqual,
                TokenKind::Identifier("d".into()),
                TokenKind::DotDot,
                TokenKind::EndOfFile,
            ]
        );
    }

    #[test]
    fn decodes_string_escapes() {
        let (tokens, diagnostics) = Lexer::new(r#""%\n""#).tokenize();
        assert!(!diagnostics.has_errors());
        assert_eq!(tokens[0].kind, TokenKind::StringLiteral("%\n".into()));
    }

    #[test]
    fn real_literal_requires_digits_after_dot() {
        // `2.` is an integer followed by a member dot, not a real literal.
        assert_eq!(
            kinds("2.5 2"),
            vec![
                TokenKind::RealLiteral(2.5),
                TokenKind::IntegerLiteral(2),
                TokenKind::EndOfFile,
            ]
        );
    }

    #[test]
    fn reports_unterminated_block_comment() {
        let (_, diagnostics) = Lexer::new("/* no end").tokenize();
        assert!(diagnostics.has_errors());
    }

    #[test]
    fn reports_illegal_character_and_recovers() {
        let (tokens, diagnostics) = Lexer::new("a @ b").tokenize();
        assert_eq!(diagnostics.error_count(), 1);
        assert_eq!(tokens.len(), 3); // a, b, eof
    }

    #[test]
    fn tracks_line_and_column() {
        let (tokens, _) = Lexer::new("a\n  b").tokenize();
        assert_eq!(tokens[1].span.start.line, 2);
        assert_eq!(tokens[1].span.start.column, 3);
    }
}
