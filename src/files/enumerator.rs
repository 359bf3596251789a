use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use walkdir::WalkDir;

use crate::constants::BYTES_PER_MB;
use crate::error::UploadError;
use crate::models::FileDescriptor;

/// A user-supplied path after symlink resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedPath {
    pub path: PathBuf,
    /// False when resolution failed and `path` is the literal input
    pub resolved: bool,
}

/// Resolve symlinks in `path`, falling back to the literal path.
///
/// A failed resolution is not an error: the caller gets the path it passed in
/// with `resolved == false`, and a warning is logged so the fallback is visible.
pub fn normalize_path(path: &Path) -> NormalizedPath {
    match path.canonicalize() {
        Ok(canonical) => NormalizedPath {
            path: canonical,
            resolved: true,
        },
        Err(e) => {
            warn!("Could not resolve {}, using it as given: {}", path.display(), e);
            NormalizedPath {
                path: path.to_path_buf(),
                resolved: false,
            }
        }
    }
}

/// Walk `path` into a flat list of files.
///
/// A single file yields one descriptor. A directory yields one descriptor per
/// non-directory entry, visited in file-name order. Every descriptor is
/// re-statted before returning; if any file vanished during the walk the whole
/// enumeration fails.
pub fn enumerate(path: &Path) -> Result<Vec<FileDescriptor>, UploadError> {
    let metadata = fs::metadata(path).map_err(|source| UploadError::PathAccess {
        path: path.to_path_buf(),
        source,
    })?;

    let candidates = if metadata.is_dir() {
        walk_directory(path)?
    } else {
        vec![path.to_path_buf()]
    };

    let mut files = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let metadata = fs::metadata(&candidate).map_err(|source| UploadError::PathAccess {
            path: candidate.clone(),
            source,
        })?;

        if metadata.is_dir() {
            warn!("Skipping symlinked directory {}", candidate.display());
            continue;
        }

        files.push(FileDescriptor {
            path: candidate,
            size: metadata.len(),
        });
    }

    debug!("Enumerated {} files under {}", files.len(), path.display());
    Ok(files)
}

fn walk_directory(root: &Path) -> Result<Vec<PathBuf>, UploadError> {
    let mut paths = Vec::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|source| UploadError::Traversal {
            path: source.path().unwrap_or(root).to_path_buf(),
            source,
        })?;

        if !entry.file_type().is_dir() {
            paths.push(entry.into_path());
        }
    }

    Ok(paths)
}

/// Basename of the input when it is a directory; keys are prefixed with it.
///
/// Uses the name the user typed first (so a symlinked directory keeps its
/// link name) and the resolved path when the input has no final component,
/// such as `.`.
pub fn base_directory(input: &Path, normalized: &NormalizedPath) -> Option<String> {
    if !normalized.path.is_dir() {
        return None;
    }

    input
        .file_name()
        .or_else(|| normalized.path.file_name())
        .map(|name| name.to_string_lossy().into_owned())
}

/// Count and total size of an enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumerationSummary {
    pub count: usize,
    pub total_bytes: u64,
}

pub fn summarize(files: &[FileDescriptor]) -> EnumerationSummary {
    EnumerationSummary {
        count: files.len(),
        total_bytes: files.iter().map(|f| f.size).sum(),
    }
}

/// Format a byte count as megabytes with two decimals
pub fn format_mb(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / BYTES_PER_MB)
}

/// One `- <path> (<size>)` line per file, in enumeration order
pub fn file_listing(files: &[FileDescriptor]) -> Vec<String> {
    files
        .iter()
        .map(|f| format!("- {} ({})", f.path.display(), format_mb(f.size)))
        .collect()
}
