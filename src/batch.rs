//! Sequential, fail-fast upload of an enumerated file list.

use std::collections::HashMap;
use std::sync::Arc;

use log::{info, warn};

use crate::cloud::engine::TransferEngine;
use crate::cloud::links::{issue_links, LinkSigner};
use crate::cloud::progress::ProgressObserver;
use crate::error::UploadError;
use crate::files::key_resolver::KeyResolver;
use crate::models::{BatchReport, FileDescriptor, UploadJob};

/// Runs upload jobs one at a time and issues links for what was stored.
pub struct BatchUploader {
    engine: TransferEngine,
    signer: Arc<dyn LinkSigner>,
}

impl BatchUploader {
    pub fn new(engine: TransferEngine, signer: Arc<dyn LinkSigner>) -> Self {
        BatchUploader { engine, signer }
    }

    /// Turn enumerated files into jobs, keeping enumeration order.
    ///
    /// Two files resolving to the same key are both kept; the later upload
    /// overwrites the earlier one, so a warning is logged.
    pub fn plan(&self, files: &[FileDescriptor], resolver: &KeyResolver, bucket: &str) -> Vec<UploadJob> {
        let mut seen: HashMap<String, usize> = HashMap::new();

        files
            .iter()
            .enumerate()
            .map(|(index, file)| {
                let key = resolver.resolve(&file.path);
                if let Some(first) = seen.insert(key.clone(), index) {
                    warn!(
                        "{} and {} both map to key {}; the later upload replaces the earlier",
                        files[first].path.display(),
                        file.path.display(),
                        key
                    );
                }
                UploadJob::new(file, key, bucket)
            })
            .collect()
    }

    /// Upload every job in order, then issue links for the stored objects.
    ///
    /// The first failed job ends the batch with its error; later jobs are
    /// never attempted and no links are issued.
    pub async fn run(
        &self,
        jobs: &[UploadJob],
        observer: Arc<dyn ProgressObserver>,
    ) -> Result<BatchReport, UploadError> {
        let mut report = BatchReport::default();

        for (i, job) in jobs.iter().enumerate() {
            info!("[{}/{}] Uploading {}", i + 1, jobs.len(), job.source_path.display());
            let stored = self.engine.upload(job, Arc::clone(&observer)).await?;
            report.stored.push(stored);
        }

        report.links = issue_links(self.signer.as_ref(), &report.stored);
        info!(
            "Batch complete: {} uploaded, {} links issued",
            report.stored.len(),
            report.issued_links().count()
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::links::LinkIssuer;
    use crate::cloud::memory::MemoryStore;
    use crate::cloud::progress::NullObserver;
    use crate::config::{StorageConfig, TransferConfig};
    use crate::constants::DEFAULT_LINK_EXPIRY;
    use crate::files::key_resolver::KeyLayout;
    use crate::test_utils::create_test_file_structure;
    use crate::test_utils::generators::test_descriptor;

    fn uploader(store: Arc<MemoryStore>) -> BatchUploader {
        let engine = TransferEngine::new(store, TransferConfig::default()).unwrap();
        let signer = LinkIssuer::for_storage(
            &StorageConfig::new("acct", "KEY", "SECRET", "test-bucket"),
            DEFAULT_LINK_EXPIRY,
        )
        .unwrap();
        BatchUploader::new(engine, Arc::new(signer))
    }

    #[test]
    fn test_plan_keeps_order_and_sanitizes() {
        let batch = uploader(Arc::new(MemoryStore::new()));
        let files = vec![
            test_descriptor("/data/photos/a (1).jpg", 10),
            test_descriptor("/data/photos/b.jpg", 20),
        ];
        let resolver = KeyResolver::new(Some("photos".to_string()), KeyLayout::Flat);

        let jobs = batch.plan(&files, &resolver, "test-bucket");
        let keys: Vec<_> = jobs.iter().map(|j| j.destination_key.as_str()).collect();
        assert_eq!(keys, vec!["photos/a__1_.jpg", "photos/b.jpg"]);
        assert_eq!(jobs[1].size, 20);
        assert!(jobs.iter().all(|j| j.bucket == "test-bucket"));
    }

    #[test]
    fn test_plan_keeps_colliding_keys() {
        let batch = uploader(Arc::new(MemoryStore::new()));
        let files = vec![
            test_descriptor("/data/top/x/same.txt", 1),
            test_descriptor("/data/top/y/same.txt", 2),
        ];
        let resolver = KeyResolver::new(Some("top".to_string()), KeyLayout::Flat);

        let jobs = batch.plan(&files, &resolver, "test-bucket");
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].destination_key, jobs[1].destination_key);
        assert_ne!(jobs[0].id, jobs[1].id);
    }

    #[tokio::test]
    async fn test_run_uploads_all_and_issues_links() {
        let temp_dir = create_test_file_structure().unwrap();
        let files = crate::files::enumerator::enumerate(temp_dir.path()).unwrap();
        let store = Arc::new(MemoryStore::new());
        let batch = uploader(store.clone());
        let resolver = KeyResolver::new(Some("root".to_string()), KeyLayout::Tree).with_root(temp_dir.path());

        let jobs = batch.plan(&files, &resolver, "test-bucket");
        let report = batch.run(&jobs, Arc::new(NullObserver)).await.unwrap();

        assert_eq!(report.stored.len(), 5);
        assert_eq!(report.issued_links().count(), 5);
        assert!(store.list_keys("test-bucket").contains(&"root/dir1/subdir1/file4.txt".to_string()));
    }

    #[tokio::test]
    async fn test_run_stops_at_first_failure() {
        let temp_dir = create_test_file_structure().unwrap();
        let files = crate::files::enumerator::enumerate(temp_dir.path()).unwrap();
        let store = Arc::new(MemoryStore::new());
        let batch = uploader(store.clone());
        let resolver = KeyResolver::new(None, KeyLayout::Flat);

        let jobs = batch.plan(&files, &resolver, "test-bucket");
        store.fail_key(&jobs[1].destination_key);

        let err = batch.run(&jobs, Arc::new(NullObserver)).await.unwrap_err();
        assert_eq!(err.transfer_path(), Some(&jobs[1].source_path));
        assert_eq!(store.attempted_keys().len(), 2);
    }
}
