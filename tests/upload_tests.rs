//! End-to-end upload tests against in-process stores.
//!
//! No network is used: `MemoryStore` stands in for R2, and presigned links are
//! signed locally with throwaway credentials.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use tempfile::TempDir;
use tokio::sync::mpsc;

use r2_uploader::batch::BatchUploader;
use r2_uploader::cloud::engine::TransferEngine;
use r2_uploader::cloud::links::{LinkIssuer, LinkSigner};
use r2_uploader::cloud::memory::MemoryStore;
use r2_uploader::cloud::progress::{ChannelObserver, NullObserver};
use r2_uploader::cloud::store::{collect_body, ObjectStore, PartBody, UploadedPart};
use r2_uploader::config::{StorageConfig, TransferConfig};
use r2_uploader::constants::DEFAULT_LINK_EXPIRY;
use r2_uploader::error::{StoreError, UploadError};
use r2_uploader::files::enumerator::{base_directory, enumerate, normalize_path};
use r2_uploader::files::key_resolver::{KeyLayout, KeyResolver};
use r2_uploader::models::{FileDescriptor, IssuedLink, UploadJob};

const MIB: u64 = 1024 * 1024;

fn storage() -> StorageConfig {
    StorageConfig::new("abc123", "AKIDEXAMPLE", "SECRET", "media")
}

fn batch_uploader(store: Arc<dyn ObjectStore>, config: TransferConfig) -> BatchUploader {
    let engine = TransferEngine::new(store, config).unwrap();
    let signer = LinkIssuer::for_storage(&storage(), DEFAULT_LINK_EXPIRY).unwrap();
    BatchUploader::new(engine, Arc::new(signer))
}

/// Records part sizes and discards the data
#[derive(Default)]
struct SizeRecordingStore {
    parts: Mutex<Vec<(i64, usize)>>,
    completed: Mutex<Vec<Vec<i64>>>,
}

#[async_trait]
impl ObjectStore for SizeRecordingStore {
    async fn put_object(&self, _bucket: &str, _key: &str, body: PartBody) -> Result<(), StoreError> {
        let data = collect_body(body).await?;
        self.parts.lock().unwrap().push((1, data.len()));
        Ok(())
    }

    async fn create_multipart(&self, _bucket: &str, _key: &str) -> Result<String, StoreError> {
        Ok("upload-a".to_string())
    }

    async fn upload_part(
        &self,
        _bucket: &str,
        _key: &str,
        _upload_id: &str,
        part_number: i64,
        body: PartBody,
    ) -> Result<UploadedPart, StoreError> {
        let data = collect_body(body).await?;
        self.parts.lock().unwrap().push((part_number, data.len()));
        Ok(UploadedPart {
            part_number,
            e_tag: format!("etag-{}", part_number),
        })
    }

    async fn complete_multipart(
        &self,
        _bucket: &str,
        _key: &str,
        _upload_id: &str,
        parts: Vec<UploadedPart>,
    ) -> Result<(), StoreError> {
        let numbers = parts.iter().map(|p| p.part_number).collect();
        self.completed.lock().unwrap().push(numbers);
        Ok(())
    }

    async fn abort_multipart(&self, _bucket: &str, _key: &str, _upload_id: &str) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Refuses to sign one key
struct RefusingSigner {
    inner: LinkIssuer,
    refused_key: String,
}

impl LinkSigner for RefusingSigner {
    fn issue(&self, bucket: &str, key: &str) -> Result<IssuedLink, UploadError> {
        if key == self.refused_key {
            return Err(UploadError::Signing {
                key: key.to_string(),
                reason: "refused".to_string(),
            });
        }
        self.inner.issue(bucket, key)
    }
}

fn write_files(dir: &Path, names: &[&str]) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    names
        .iter()
        .map(|name| {
            let path = dir.join(name);
            fs::write(&path, format!("content of {}", name))?;
            Ok(path)
        })
        .collect()
}

#[tokio::test]
async fn test_200_mib_file_goes_up_in_four_parts() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("video.mp4");
    let file = fs::File::create(&path)?;
    file.set_len(200 * MIB)?;

    let store = Arc::new(SizeRecordingStore::default());
    let engine = TransferEngine::new(store.clone(), TransferConfig::default())?;
    let job = UploadJob::new(
        &FileDescriptor {
            path: path.clone(),
            size: 200 * MIB,
        },
        "video.mp4".to_string(),
        "media",
    );

    engine.upload(&job, Arc::new(NullObserver)).await?;

    let mut parts = store.parts.lock().unwrap().clone();
    parts.sort();
    let sizes: Vec<_> = parts.iter().map(|(_, len)| *len as u64 / MIB).collect();
    assert_eq!(sizes, vec![64, 64, 64, 8]);
    assert_eq!(parts.iter().map(|(_, len)| *len as u64).sum::<u64>(), 200 * MIB);
    assert_eq!(*store.completed.lock().unwrap(), vec![vec![1, 2, 3, 4]]);
    Ok(())
}

#[tokio::test]
async fn test_directory_upload_keys_and_links() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let photos = temp_dir.path().join("photos");
    write_files(&photos, &["a (1).jpg", "b.jpg"])?;

    let normalized = normalize_path(&photos);
    let files = enumerate(&normalized.path)?;
    let resolver = KeyResolver::new(base_directory(&photos, &normalized), KeyLayout::Flat);

    let store = Arc::new(MemoryStore::new());
    let batch = batch_uploader(store.clone(), TransferConfig::default());
    let jobs = batch.plan(&files, &resolver, "media");
    let report = batch.run(&jobs, Arc::new(NullObserver)).await?;

    assert_eq!(store.list_keys("media"), vec!["photos/a__1_.jpg", "photos/b.jpg"]);
    assert_eq!(
        store.object("media", "photos/b.jpg").unwrap().as_ref(),
        b"content of b.jpg"
    );

    let links: Vec<_> = report.issued_links().collect();
    assert_eq!(links.len(), 2);
    assert!(links[0].url.contains("/media/photos/a__1_.jpg?"));
    assert!(links.iter().all(|l| l.url.contains("X-Amz-Expires=86400")));
    Ok(())
}

#[tokio::test]
async fn test_batch_stops_at_failed_file() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let paths = write_files(temp_dir.path(), &["1.txt", "2.txt", "3.txt"])?;
    let files = enumerate(temp_dir.path())?;

    let store = Arc::new(MemoryStore::new());
    store.fail_key("2.txt");
    let batch = batch_uploader(store.clone(), TransferConfig::default());
    let jobs = batch.plan(&files, &KeyResolver::new(None, KeyLayout::Flat), "media");

    let err = batch.run(&jobs, Arc::new(NullObserver)).await.unwrap_err();

    assert_eq!(err.transfer_path(), Some(&paths[1]));
    assert_eq!(store.list_keys("media"), vec!["1.txt"]);
    assert!(!store.attempted_keys().contains(&"3.txt".to_string()));
    Ok(())
}

#[tokio::test]
async fn test_failed_part_leaves_no_object() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("big.bin");
    let data: Vec<u8> = (0..(12 * MIB) as usize).map(|i| (i % 251) as u8).collect();
    fs::write(&path, &data)?;

    let store = Arc::new(MemoryStore::new());
    store.fail_part("big.bin", 3);
    let config = TransferConfig {
        part_size: 5 * MIB,
        ..Default::default()
    };
    let batch = batch_uploader(store.clone(), config);
    let files = enumerate(&path)?;
    let jobs = batch.plan(&files, &KeyResolver::default(), "media");

    let err = batch.run(&jobs, Arc::new(NullObserver)).await.unwrap_err();
    assert!(matches!(err, UploadError::Transfer { .. }));
    assert!(store.list_keys("media").is_empty());
    assert_eq!(store.aborted_uploads(), 1);
    Ok(())
}

#[tokio::test]
async fn test_multipart_object_matches_source_and_progress_is_monotonic() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("big.bin");
    let data: Vec<u8> = (0..(16 * MIB + 17) as usize).map(|i| (i % 251) as u8).collect();
    fs::write(&path, &data)?;

    let store = Arc::new(MemoryStore::new());
    let config = TransferConfig {
        part_size: 5 * MIB,
        concurrency: 2,
        ..Default::default()
    };
    let batch = batch_uploader(store.clone(), config);
    let files = enumerate(&path)?;
    let jobs = batch.plan(&files, &KeyResolver::default(), "media");

    let (sender, mut receiver) = mpsc::channel(4096);
    batch.run(&jobs, Arc::new(ChannelObserver::new(sender))).await?;

    let object = store.object("media", "big.bin").unwrap();
    assert_eq!(object.len(), data.len());
    assert_eq!(object.as_ref(), data.as_slice());

    let mut percents = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        percents.push(event.percent);
    }
    assert!(!percents.is_empty());
    assert!(percents.windows(2).all(|w| w[0] <= w[1]));
    assert!(percents.iter().all(|p| *p <= 100));
    assert_eq!(percents.last(), Some(&100));
    Ok(())
}

#[tokio::test]
async fn test_link_failure_does_not_hide_other_links() -> Result<()> {
    let temp_dir = TempDir::new()?;
    write_files(temp_dir.path(), &["1.txt", "2.txt", "3.txt"])?;
    let files = enumerate(temp_dir.path())?;

    let store = Arc::new(MemoryStore::new());
    let engine = TransferEngine::new(store.clone(), TransferConfig::default())?;
    let signer = RefusingSigner {
        inner: LinkIssuer::for_storage(&storage(), DEFAULT_LINK_EXPIRY)?,
        refused_key: "2.txt".to_string(),
    };
    let batch = BatchUploader::new(engine, Arc::new(signer));
    let jobs = batch.plan(&files, &KeyResolver::default(), "media");

    let report = batch.run(&jobs, Arc::new(NullObserver)).await?;

    assert_eq!(report.stored.len(), 3);
    assert_eq!(report.links.len(), 3);
    assert!(report.links[1].result.is_err());
    let keys: Vec<_> = report.issued_links().map(|l| l.object.key.as_str()).collect();
    assert_eq!(keys, vec!["1.txt", "3.txt"]);
    Ok(())
}
