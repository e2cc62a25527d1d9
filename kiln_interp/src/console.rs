//! The interpreter's user context
//!
//! All console traffic from the built-ins (`print`, `read_int`,
//! `read_float`) goes through this trait; the core never touches stdio
//! directly. The CLI installs [`SystemConsole`]; tests capture output with
//! [`BufferConsole`].

use std::io::{BufRead, Write};

pub trait Console {
    fn write(&mut self, text: &str);
    /// Next whitespace-separated token from the input stream, if any.
    fn read_token(&mut self) -> Option<String>;
}

/// String-backed console for tests and embedding
#[derive(Debug, Default)]
pub struct BufferConsole {
    pub output: String,
    input: String,
    cursor: usize,
}

impl BufferConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input(input: impl Into<String>) -> Self {
        Self { output: String::new(), input: input.into(), cursor: 0 }
    }
}

impl Console for BufferConsole {
    fn write(&mut self, text: &str) {
        self.output.push_str(text);
    }

    fn read_token(&mut self) -> Option<String> {
        let bytes = self.input.as_bytes();
        while self.cursor < bytes.len() && bytes[self.cursor].is_ascii_whitespace() {
            self.cursor += 1;
        }
        let start = self.cursor;
        while self.cursor < bytes.len() && !bytes[self.cursor].is_ascii_whitespace() {
            self.cursor += 1;
        }
        if start == self.cursor {
            None
        } else {
            Some(self.input[start..self.cursor].to_string())
        }
    }
}

/// Stdout/stdin-backed console used by the command line
#[derive(Debug, Default)]
pub struct SystemConsole {
    pending: String,
    cursor: usize,
}

impl SystemConsole {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_buffered_token(&mut self) -> Option<String> {
        let bytes = self.pending.as_bytes();
        let mut cursor = self.cursor;
        while cursor < bytes.len() && bytes[cursor].is_ascii_whitespace() {
            cursor += 1;
        }
        let start = cursor;
        while cursor < bytes.len() && !bytes[cursor].is_ascii_whitespace() {
            cursor += 1;
        }
        if start == cursor {
            None
        } else {
            let token = self.pending[start..cursor].to_string();
            self.cursor = cursor;
            Some(token)
        }
    }
}

impl Console for SystemConsole {
    fn write(&mut self, text: &str) {
        let stdout = std::io::stdout();
        let mut lock = stdout.lock();
        let _ = lock.write_all(text.as_bytes());
        let _ = lock.flush();
    }

    fn read_token(&mut self) -> Option<String> {
        loop {
            if let Some(token) = self.next_buffered_token() {
                return Some(token);
            }
            self.pending.clear();
            self.cursor = 0;
            let stdin = std::io::stdin();
            if stdin.lock().read_line(&mut self.pending).unwrap_or(0) == 0 {
                return None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn buffer_console_tokenizes_input() {
        let mut console = BufferConsole::with_input("  42 \n 3.5\tword");
        assert_eq!(console.read_token().as_deref(), Some("42"));
        assert_eq!(console.read_token().as_deref(), Some("3.5"));
        assert_eq!(console.read_token().as_deref(), Some("word"));
        assert_eq!(console.read_token(), None);
    }

    #[test]
    fn buffer_console_collects_output() {
        let mut console = BufferConsole::new();
        console.write("a");
        console.write("b\n");
        assert_eq!(console.output, "ab\n");
    }
}
