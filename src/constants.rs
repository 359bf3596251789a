//! Global constants for the r2-uploader application.
//!
//! This module centralizes all hardcoded values so the defaults used by
//! configuration, the transfer engine and the CLI stay in one place.

use std::time::Duration;

// Transfer constants
/// Default multipart part size (64MB)
pub const DEFAULT_PART_SIZE: u64 = 64 * 1024 * 1024;

/// Default number of in-flight part uploads per job
pub const DEFAULT_CONCURRENCY: usize = 3;

/// S3 minimum part size for multipart uploads (5MB)
pub const S3_MIN_PART_SIZE: u64 = 5 * 1024 * 1024;

/// S3 maximum part size for multipart uploads (5GB)
pub const S3_MAX_PART_SIZE: u64 = 5 * 1024 * 1024 * 1024;

/// S3 maximum parts per upload
pub const S3_MAX_PARTS: u64 = 10000;

/// Size of the slices a part body is handed to the transport in (64KB)
pub const PART_BODY_SLICE_SIZE: usize = 64 * 1024;

// Timeout and retry constants
/// Maximum attempts per request made by the R2 transport
pub const MAX_UPLOAD_ATTEMPTS: usize = 3;

/// Base retry delay in milliseconds
pub const RETRY_BASE_DELAY_MS: u64 = 250;

/// Maximum retry delay in seconds
pub const RETRY_MAX_DELAY_SECS: u64 = 30;

// Progress constants
/// Minimum percentage increase between two progress events
pub const PROGRESS_MIN_PERCENT_STEP: u8 = 1;

/// Maximum time between two progress events
pub const PROGRESS_MIN_INTERVAL: Duration = Duration::from_secs(3);

// Link constants
/// Validity window of presigned retrieval links (24 hours)
pub const DEFAULT_LINK_EXPIRY: Duration = Duration::from_secs(24 * 60 * 60);

/// Longest validity window SigV4 accepts for a presigned URL (7 days)
pub const MAX_LINK_EXPIRY: Duration = Duration::from_secs(7 * 24 * 60 * 60);

// Endpoint constants
/// Host suffix of Cloudflare R2 account endpoints
pub const R2_STORAGE_HOST: &str = "r2.cloudflarestorage.com";

/// Pseudo-region R2 expects in signatures
pub const R2_SIGNING_REGION: &str = "auto";

// Key constants
/// Characters replaced with `_` when deriving object keys
pub const KEY_UNSAFE_CHARS: &[char] = &['[', ']', '(', ')', ' '];

// Profile constants
/// Directory (under the user's home) holding persisted profiles
pub const PROFILE_DIR_NAME: &str = ".r2uploader";

/// File name of the persisted profile list
pub const PROFILE_FILE_NAME: &str = "profiles.json";

/// Bytes per MB used in human-readable sizes
pub const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

// Error messages
pub const ERROR_FAILED_TO_CREATE_CLIENT: &str = "Failed to create R2 client";
pub const ERROR_FAILED_TO_UPLOAD: &str = "Failed to upload file";
pub const ERROR_FAILED_TO_ENUMERATE: &str = "Failed to enumerate input path";
