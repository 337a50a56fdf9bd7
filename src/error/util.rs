//! Utility functions for error handling
//!
//! Small wrappers around filesystem access that attach the path and the
//! purpose of the access to the error message.

use std::fs;
use std::io;
use std::path::Path;

use crate::error::{PipelineError, Result};

/// Read a whole file into memory with rich error information
///
/// # Arguments
/// * `path` - The path to the file to read
/// * `purpose` - Why the file is being read (for error context)
pub fn safe_read_bytes(path: &Path, purpose: &str) -> Result<Vec<u8>> {
    if !path.is_file() {
        return Err(PipelineError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("{} is not a file (needed for: {purpose})", path.display()),
        )));
    }

    fs::read(path).map_err(|e| {
        let context = match e.kind() {
            io::ErrorKind::PermissionDenied => "permission denied - check file permissions",
            io::ErrorKind::InvalidData => "file contains invalid data",
            _ => "failed to read file",
        };
        PipelineError::Io(io::Error::new(
            e.kind(),
            format!("{context}: {} (needed for: {purpose}): {e}", path.display()),
        ))
    })
}

/// Check that a directory exists and is readable
pub fn validate_directory(path: &Path, purpose: &str) -> Result<()> {
    if !path.is_dir() {
        return Err(PipelineError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("Directory not found: {} (needed for: {purpose})", path.display()),
        )));
    }

    fs::read_dir(path).map(|_| ()).map_err(|e| {
        PipelineError::Io(io::Error::new(
            e.kind(),
            format!("Failed to access directory {} for {purpose}: {e}", path.display()),
        ))
    })
}

/// Create a directory (and parents) for writing output artifacts
pub fn ensure_output_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|e| {
        PipelineError::Io(io::Error::new(
            e.kind(),
            format!("Failed to create output directory {}: {e}", path.display()),
        ))
    })
}
