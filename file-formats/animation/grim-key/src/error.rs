use std::io;
use thiserror::Error;

/// Error types for KEY animation parsing and processing
#[derive(Error, Debug)]
pub enum KeyframeError {
    /// I/O Error during reading or writing
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Error during parsing
    #[error("Parse error: {0}")]
    Parse(String),

    /// Error during parsing of the text format, with the offending line
    #[error("Parse error at line {line}: {message}")]
    ParseAt { line: usize, message: String },

    /// Error during validation
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type using KeyframeError
pub type Result<T> = std::result::Result<T, KeyframeError>;
