use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::UploadError;

/// A file discovered by the enumerator.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FileDescriptor {
    pub path: PathBuf,
    pub size: u64,
}

/// One file to be transferred to one key.
#[derive(Debug, Clone)]
pub struct UploadJob {
    pub id: Uuid,
    pub source_path: PathBuf,
    pub destination_key: String,
    pub size: u64,
    pub bucket: String,
}

impl UploadJob {
    pub fn new(descriptor: &FileDescriptor, destination_key: String, bucket: &str) -> Self {
        UploadJob {
            id: Uuid::new_v4(),
            source_path: descriptor.path.clone(),
            destination_key,
            size: descriptor.size,
            bucket: bucket.to_string(),
        }
    }
}

/// A contiguous byte range of a job's source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkTask {
    pub job_id: Uuid,
    pub index: u64,
    pub byte_offset: u64,
    pub byte_length: u64,
}

impl ChunkTask {
    /// 1-based part number used by the multipart protocol
    pub fn part_number(&self) -> i64 {
        self.index as i64 + 1
    }
}

/// Progress snapshot delivered to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEvent {
    pub job_id: Uuid,
    pub percent: u8,
    pub bytes_read: u64,
    pub total_bytes: u64,
}

/// Location of a stored object.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoredObjectRef {
    pub bucket: String,
    pub key: String,
}

/// A presigned retrieval link.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct IssuedLink {
    pub object: StoredObjectRef,
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

/// Result of issuing a link for one stored object.
#[derive(Debug)]
pub struct LinkOutcome {
    pub object: StoredObjectRef,
    pub result: Result<IssuedLink, UploadError>,
}

/// What a completed batch produced.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub stored: Vec<StoredObjectRef>,
    pub links: Vec<LinkOutcome>,
}

impl BatchReport {
    /// Links that were issued successfully, in upload order
    pub fn issued_links(&self) -> impl Iterator<Item = &IssuedLink> {
        self.links.iter().filter_map(|outcome| outcome.result.as_ref().ok())
    }

    /// Numbered key and URL for every link, or a warning for a failed one
    pub fn link_lines(&self) -> Vec<String> {
        self.links
            .iter()
            .enumerate()
            .map(|(i, outcome)| match &outcome.result {
                Ok(link) => format!("{}. {}\n   URL: {}", i + 1, outcome.object.key, link.url),
                Err(e) => format!("Warning: Couldn't generate URL for {}: {}", outcome.object.key, e),
            })
            .collect()
    }
}
