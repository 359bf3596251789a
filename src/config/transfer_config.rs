use std::time::Duration;

use crate::constants::{
    DEFAULT_CONCURRENCY, DEFAULT_LINK_EXPIRY, DEFAULT_PART_SIZE, MAX_LINK_EXPIRY,
    MAX_UPLOAD_ATTEMPTS, S3_MAX_PART_SIZE, S3_MIN_PART_SIZE,
};
use crate::error::UploadError;

/// Tuning for the transfer engine and link issuer.
///
/// # Fields
///
/// * `part_size` - Bytes per multipart part (default 64MB, last part may be smaller)
/// * `concurrency` - In-flight part uploads per job (default 3)
/// * `max_attempts` - Attempts the transport makes per request before giving up (default 3)
/// * `link_expiry` - Validity window of presigned links (default 24 hours)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferConfig {
    pub part_size: u64,
    pub concurrency: usize,
    pub max_attempts: usize,
    pub link_expiry: Duration,
}

impl Default for TransferConfig {
    fn default() -> Self {
        TransferConfig {
            part_size: DEFAULT_PART_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
            max_attempts: MAX_UPLOAD_ATTEMPTS,
            link_expiry: DEFAULT_LINK_EXPIRY,
        }
    }
}

impl TransferConfig {
    /// Check every field against what the backend accepts.
    pub fn validate(&self) -> Result<(), UploadError> {
        if self.part_size < S3_MIN_PART_SIZE || self.part_size > S3_MAX_PART_SIZE {
            return Err(UploadError::Config(format!(
                "part size {} is outside {}..={} bytes",
                self.part_size, S3_MIN_PART_SIZE, S3_MAX_PART_SIZE
            )));
        }
        if self.concurrency == 0 {
            return Err(UploadError::Config("concurrency must be at least 1".to_string()));
        }
        if self.max_attempts == 0 {
            return Err(UploadError::Config("max attempts must be at least 1".to_string()));
        }
        validate_link_expiry(self.link_expiry)
    }

    /// Build from megabyte values as given on the command line.
    pub fn from_mb(part_size_mb: u64, concurrency: usize, max_attempts: usize) -> Result<Self, UploadError> {
        let part_size = part_size_mb
            .checked_mul(1024 * 1024)
            .ok_or_else(|| UploadError::Config(format!("part size of {} MB is too large", part_size_mb)))?;
        let config = TransferConfig {
            part_size,
            concurrency,
            max_attempts,
            ..Default::default()
        };
        config.validate()?;
        Ok(config)
    }
}

pub(crate) fn validate_link_expiry(expiry: Duration) -> Result<(), UploadError> {
    if expiry < Duration::from_secs(1) || expiry > MAX_LINK_EXPIRY {
        return Err(UploadError::Config(format!(
            "link expiry {:?} is outside 1s..={:?}",
            expiry, MAX_LINK_EXPIRY
        )));
    }
    Ok(())
}
