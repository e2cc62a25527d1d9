//! Error handling utilities for the Kiln toolchain

use thiserror::Error;

/// The main error type for the Kiln toolchain
#[derive(Error, Debug, Clone)]
pub enum KilnError {
    #[error("Lexical error: {message}")]
    LexError { message: String },

    #[error("Parse error: {message}")]
    ParseError { message: String },

    #[error("Resolve error: {message}")]
    ResolveError { message: String },

    #[error("Runtime error: {message}")]
    RuntimeError { message: String },

    #[error("I/O error: {message}")]
    IoError { message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },
}

/// Result type alias for Kiln toolchain operations
pub type KilnResult<T> = Result<T, KilnError>;

impl KilnError {
    pub fn lex_error(message: impl Into<String>) -> Self {
        Self::LexError { message: message.into() }
    }

    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::ParseError { message: message.into() }
    }

    pub fn resolve_error(message: impl Into<String>) -> Self {
        Self::ResolveError { message: message.into() }
    }

    pub fn runtime_error(message: impl Into<String>) -> Self {
        Self::RuntimeError { message: message.into() }
    }

    pub fn io_error(message: impl Into<String>) -> Self {
        Self::IoError { message: message.into() }
    }

    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError { message: message.into() }
    }
}
