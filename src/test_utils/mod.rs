//! Test utilities for r2-uploader
//!
//! This module provides common testing utilities, helpers, and fixtures
//! for use across all test modules.

#![cfg(test)]

use anyhow::Result;
use std::fs;
use std::path::Path;
use tempfile::{NamedTempFile, TempDir};

/// Creates a temporary directory that is automatically cleaned up
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a temporary file with the given content
pub fn create_temp_file(content: &[u8]) -> Result<NamedTempFile> {
    let mut file = NamedTempFile::new()?;
    use std::io::Write;
    file.write_all(content)?;
    file.flush()?;
    Ok(file)
}

/// Creates a test file structure in a temporary directory
pub fn create_test_file_structure() -> Result<TempDir> {
    let temp_dir = create_temp_dir()?;
    let base_path = temp_dir.path();

    // Create directory structure
    fs::create_dir_all(base_path.join("dir1/subdir1"))?;
    fs::create_dir_all(base_path.join("dir2"))?;

    // Create test files
    fs::write(base_path.join("file1.txt"), b"Test content 1")?;
    fs::write(base_path.join("file2.log"), b"Test log content")?;
    fs::write(base_path.join("dir1/file3.txt"), b"Test content 3")?;
    fs::write(base_path.join("dir1/subdir1/file4.txt"), b"Test content 4")?;
    fs::write(base_path.join("dir2/file5.log"), b"Another log file")?;

    Ok(temp_dir)
}

/// Writes `size` bytes of a repeating, position-dependent pattern to `path`
pub fn write_patterned_file(path: &Path, size: usize) -> Result<Vec<u8>> {
    let data: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
    fs::write(path, &data)?;
    Ok(data)
}

/// Test data generators for common types
pub mod generators {
    use std::path::PathBuf;

    use crate::models::{FileDescriptor, UploadJob};

    /// Generate a FileDescriptor without touching the filesystem
    pub fn test_descriptor(path: &str, size: u64) -> FileDescriptor {
        FileDescriptor {
            path: PathBuf::from(path),
            size,
        }
    }

    /// Generate an UploadJob for a file on disk
    pub fn test_job(path: &std::path::Path, key: &str, size: u64) -> UploadJob {
        UploadJob::new(
            &FileDescriptor {
                path: path.to_path_buf(),
                size,
            },
            key.to_string(),
            "test-bucket",
        )
    }
}
