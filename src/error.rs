//! Error types and handling infrastructure for rlsift.
//!
//! This module provides a centralized error handling system using `thiserror` for
//! custom error types. The binary layers `anyhow` on top for context.
//!
//! ## Categories
//!
//! - **I/O**: file open/read/map failures. Surfaced to the caller; the operation aborts.
//! - **Pattern**: bad keywords or regexes. Surfaced before any search work begins.
//! - **Cancellation**: a cooperative stop. Distinct from failure; see [`RlsiftError::is_cancelled`].
//! - **Lookup**: navigation and lookup misuse (`Empty`, `OutOfRange`, `NotFound`). Local and
//!   recoverable.
//!
//! Decoding problems are never errors: line text degrades to a lossy rendition instead.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for rlsift operations.
#[derive(Error, Debug)]
pub enum RlsiftError {
    /// File system related errors (read failures, permission denied, etc.)
    #[error("File operation failed: {message}")]
    FileError {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// File not found specifically (common case for user feedback)
    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Path exists but is not a regular file
    #[error("Path is not a regular file: {path}")]
    NotAFile { path: PathBuf },

    /// Memory mapping related errors
    #[error("Memory mapping failed: {message}")]
    MemoryMappingError { message: String },

    /// A keyword failed to compile into a matcher
    #[error("Invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    /// Neither include nor exclude keywords were supplied
    #[error("At least one include or exclude keyword is required")]
    EmptyCriteria,

    /// Operation stopped cooperatively before completion
    #[error("Operation cancelled")]
    Cancelled,

    /// Navigation requested on an empty result set
    #[error("No search results")]
    Empty,

    /// Result index outside the current result set
    #[error("Result index {index} out of range (len {len})")]
    OutOfRange { index: usize, len: usize },

    /// Byte offset beyond the end of the indexed file
    #[error("Offset {offset} not found (file size {file_size})")]
    NotFound { offset: u64, file_size: u64 },

    /// Line number beyond the end of the indexed file
    #[error("Line {line} out of range (total lines {total})")]
    LineOutOfRange { line: u64, total: u64 },

    /// Operation not valid in the component's current state
    #[error("Invalid state: {message}")]
    InvalidState { message: String },

    /// Configuration related errors
    #[error("Configuration error: {message}")]
    ConfigError { message: String },
}

/// Standard Result type for rlsift operations.
pub type Result<T> = std::result::Result<T, RlsiftError>;

impl RlsiftError {
    /// Create a FileError from an io::Error with additional context
    pub fn file_error(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::FileError {
            message: message.into(),
            source,
        }
    }

    /// Create a MemoryMappingError with a descriptive message
    pub fn memory_mapping(message: impl Into<String>) -> Self {
        Self::MemoryMappingError {
            message: message.into(),
        }
    }

    /// Create an InvalidPattern error for the offending keyword
    pub fn invalid_pattern(pattern: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            message: message.into(),
        }
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// True for a cooperative stop, which callers should frame neutrally rather than as failure
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<std::io::Error> for RlsiftError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::FileError {
                message: "File not found".to_string(),
                source: err,
            },
            std::io::ErrorKind::PermissionDenied => Self::FileError {
                message: "Permission denied".to_string(),
                source: err,
            },
            _ => Self::FileError {
                message: "IO operation failed".to_string(),
                source: err,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_error_display_messages() {
        let path = PathBuf::from("/test/file.log");

        let file_not_found = RlsiftError::FileNotFound { path: path.clone() };
        assert_eq!(file_not_found.to_string(), "File not found: /test/file.log");

        let not_a_file = RlsiftError::NotAFile { path };
        assert_eq!(
            not_a_file.to_string(),
            "Path is not a regular file: /test/file.log"
        );

        let pattern = RlsiftError::invalid_pattern("(", "unclosed group");
        assert_eq!(pattern.to_string(), "Invalid pattern '(': unclosed group");

        let range = RlsiftError::OutOfRange { index: 5, len: 2 };
        assert_eq!(range.to_string(), "Result index 5 out of range (len 2)");
    }

    #[test]
    fn test_cancelled_is_distinct() {
        assert!(RlsiftError::Cancelled.is_cancelled());
        assert!(!RlsiftError::Empty.is_cancelled());
        assert!(!RlsiftError::EmptyCriteria.is_cancelled());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let err: RlsiftError = io_err.into();

        match err {
            RlsiftError::FileError { message, .. } => {
                assert_eq!(message, "File not found");
            }
            _ => panic!("Expected FileError variant"),
        }

        let io_err = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "short read");
        match RlsiftError::from(io_err) {
            RlsiftError::FileError { message, .. } => {
                assert_eq!(message, "IO operation failed");
            }
            _ => panic!("Expected FileError variant"),
        }
    }
}
