//! Shared utilities and error types for the Kiln language toolchain
//!
//! This crate provides common functionality used across all compiler components:
//! - Error types and handling utilities
//! - Source location tracking
//! - Diagnostic collection

pub mod diagnostics;
pub mod error;
pub mod span;

pub use diagnostics::*;
pub use error::*;
pub use span::*;
