//! Source location tracking for the Kiln toolchain
//!
//! Locations are row/column/byte-offset triples. The lexer owns a
//! [`Position`] cursor and advances it byte by byte; every token, syntax
//! node, IR statement and diagnostic carries a [`Span`] built from two
//! cursor snapshots. Rows and columns are 1-based, offsets are byte
//! indices into the source.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A cursor into source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
    pub offset: u32,
}

impl Position {
    pub fn new(line: u32, column: u32, offset: u32) -> Self {
        Self { line, column, offset }
    }

    /// The cursor at the top of a source file.
    pub fn start() -> Self {
        Self::new(1, 1, 0)
    }

    /// Step the cursor over one byte of source, tracking line breaks.
    pub fn advance(&mut self, byte: u8) {
        self.offset += 1;
        if byte == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
    }

    /// The region from this snapshot up to `end`.
    pub fn to(self, end: Position) -> Span {
        Span { start: self, end }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A region of source text between two cursor snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    pub fn new(start: Position, end: Position) -> Self {
        start.to(end)
    }

    /// An empty region at one cursor snapshot.
    pub fn single(position: Position) -> Self {
        position.to(position)
    }

    /// The source row a statement or diagnostic is attributed to.
    pub fn row(&self) -> u32 {
        self.start.line
    }

    /// The smallest region covering both spans.
    pub fn combine(self, other: Span) -> Span {
        let start = if other.start.offset < self.start.offset { other.start } else { self.start };
        let end = if other.end.offset > self.end.offset { other.end } else { self.end };
        start.to(end)
    }
}

impl Default for Span {
    fn default() -> Self {
        Self::single(Position::start())
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else if self.start.line == self.end.line {
            write!(f, "{}:{}..{}", self.start.line, self.start.column, self.end.column)
        } else {
            write!(f, "{}..{}", self.start, self.end)
        }
    }
}

/// A value paired with where it came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spanned<T> {
    pub value: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(value: T, span: Span) -> Self {
        Self { value, span }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn advancing_tracks_lines_columns_and_offsets() {
        let mut cursor = Position::start();
        for byte in b"ab\nc" {
            cursor.advance(*byte);
        }
        assert_eq!(cursor.line, 2);
        assert_eq!(cursor.column, 2);
        assert_eq!(cursor.offset, 4);
    }

    #[test]
    fn combine_covers_both_regions_in_either_order() {
        let first = Position::new(1, 1, 0).to(Position::new(1, 4, 3));
        let second = Position::new(2, 1, 10).to(Position::new(2, 6, 15));
        let merged = first.combine(second);
        assert_eq!(merged.start.offset, 0);
        assert_eq!(merged.end.offset, 15);
        assert_eq!(second.combine(first), merged);
    }

    #[test]
    fn row_is_the_starting_line() {
        let span = Position::new(7, 3, 41).to(Position::new(9, 1, 60));
        assert_eq!(span.row(), 7);
    }
}
