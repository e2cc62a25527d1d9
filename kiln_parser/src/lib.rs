//! Syntax analysis for the Kiln language
//!
//! The parser lowers the token stream into the syntax tree consumed by the
//! resolver. Parse errors are collected into diagnostics; the parser
//! recovers at statement boundaries and never panics on malformed input.

pub mod ast;
pub mod parser;

pub use ast::*;
pub use parser::Parser;

use kiln_common::Diagnostics;
use kiln_lexer::Lexer;

/// Convenience entry point: lex and parse a source string in one call.
pub fn parse_source(source: &str) -> (SyntaxTree, Diagnostics) {
    let (tokens, mut diagnostics) = Lexer::new(source).tokenize();
    let (tree, parse_diagnostics) = Parser::new(tokens).parse_tree();
    diagnostics.extend(parse_diagnostics);
    (tree, diagnostics)
}
