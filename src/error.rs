//! Error types for enumeration, transfer and link issuance.

use std::io;
use std::path::PathBuf;

/// Errors produced by the upload pipeline.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("error accessing path {}: {source}", path.display())]
    PathAccess {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("error walking directory {}: {source}", path.display())]
    Traversal {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("unable to upload file {} as {key}: {source}", path.display())]
    Transfer {
        path: PathBuf,
        key: String,
        #[source]
        source: StoreError,
    },

    #[error("couldn't generate presigned URL for {key}: {reason}")]
    Signing { key: String, reason: String },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl UploadError {
    /// Source path of a failed transfer, if this is one.
    pub fn transfer_path(&self) -> Option<&PathBuf> {
        match self {
            UploadError::Transfer { path, .. } => Some(path),
            _ => None,
        }
    }
}

/// Errors raised by an [`ObjectStore`](crate::cloud::store::ObjectStore).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{operation} failed: {message}")]
    Request {
        operation: &'static str,
        message: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("no upload ID returned for {0}")]
    MissingUploadId(String),

    #[error("no ETag returned for part {0}")]
    MissingETag(i64),

    #[error("unknown multipart upload {0}")]
    UnknownUpload(String),

    #[error("worker task failed: {0}")]
    Worker(String),
}

impl StoreError {
    pub fn request(operation: &'static str, err: impl std::fmt::Display) -> Self {
        StoreError::Request {
            operation,
            message: err.to_string(),
        }
    }
}
