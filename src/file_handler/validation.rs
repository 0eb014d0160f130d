//! File validation utilities for ensuring files are suitable for processing.
//!
//! This module checks that a path can be opened for reading before any indexing
//! work starts, so callers get a specific error instead of a generic I/O failure.

use crate::error::{Result, RlsiftError};
use std::fs::File;
use std::path::Path;

/// Validate that a file path is accessible and suitable for processing
///
/// # Validations Performed
/// - Path exists
/// - Path is a regular file (not a directory)
/// - File is readable by the current process
///
/// Empty files are accepted; they simply index to zero lines.
pub fn validate_file_path(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(RlsiftError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let metadata = std::fs::metadata(path)
        .map_err(|e| RlsiftError::file_error("Failed to read file metadata", e))?;

    if !metadata.is_file() {
        return Err(RlsiftError::NotAFile {
            path: path.to_path_buf(),
        });
    }

    // Try to open the file to verify read permissions
    File::open(path).map_err(|e| RlsiftError::file_error("Cannot open file for reading", e))?;

    Ok(())
}
