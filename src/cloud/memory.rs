use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use log::debug;
use uuid::Uuid;

use crate::cloud::store::{collect_body, ObjectStore, PartBody, UploadedPart};
use crate::error::StoreError;

struct PendingUpload {
    bucket: String,
    key: String,
    parts: BTreeMap<i64, Bytes>,
}

#[derive(Default)]
struct MemoryState {
    objects: HashMap<(String, String), Bytes>,
    uploads: HashMap<String, PendingUpload>,
    failing_keys: HashSet<String>,
    failing_parts: HashSet<(String, i64)>,
    attempted_keys: Vec<String>,
    multipart_started: usize,
    aborted_uploads: usize,
}

impl MemoryState {
    fn note_attempt(&mut self, key: &str) {
        if !self.attempted_keys.iter().any(|k| k == key) {
            self.attempted_keys.push(key.to_string());
        }
    }
}

/// Object store kept entirely in process memory.
///
/// Used for `--dry-run` and as the backend in tests. Failures can be injected
/// per key or per part, and the store records which keys were attempted so
/// callers can check what a batch touched.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make every upload to `key` fail
    pub fn fail_key(&self, key: &str) {
        self.state().failing_keys.insert(key.to_string());
    }

    /// Make one part of uploads to `key` fail
    pub fn fail_part(&self, key: &str, part_number: i64) {
        self.state().failing_parts.insert((key.to_string(), part_number));
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<Bytes> {
        self.state()
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    /// Keys of stored objects in `bucket`, sorted
    pub fn list_keys(&self, bucket: &str) -> Vec<String> {
        let mut keys: Vec<_> = self
            .state()
            .objects
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Keys any request was made for, in first-seen order
    pub fn attempted_keys(&self) -> Vec<String> {
        self.state().attempted_keys.clone()
    }

    pub fn multipart_started(&self) -> usize {
        self.state().multipart_started
    }

    pub fn pending_uploads(&self) -> usize {
        self.state().uploads.len()
    }

    pub fn aborted_uploads(&self) -> usize {
        self.state().aborted_uploads
    }

    fn check_failure(&self, key: &str, part_number: Option<i64>) -> Result<(), StoreError> {
        let state = self.state();
        let part_fails = part_number
            .map(|n| state.failing_parts.contains(&(key.to_string(), n)))
            .unwrap_or(false);
        if state.failing_keys.contains(key) || part_fails {
            return Err(StoreError::request("UploadPart", format!("injected failure for {}", key)));
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put_object(&self, bucket: &str, key: &str, body: PartBody) -> Result<(), StoreError> {
        self.state().note_attempt(key);
        self.check_failure(key, Some(1))?;

        let data = collect_body(body).await?;
        debug!("Stored {} bytes at {}/{}", data.len(), bucket, key);
        self.state()
            .objects
            .insert((bucket.to_string(), key.to_string()), data);
        Ok(())
    }

    async fn create_multipart(&self, bucket: &str, key: &str) -> Result<String, StoreError> {
        let upload_id = Uuid::new_v4().to_string();
        let mut state = self.state();
        state.note_attempt(key);
        state.multipart_started += 1;
        state.uploads.insert(
            upload_id.clone(),
            PendingUpload {
                bucket: bucket.to_string(),
                key: key.to_string(),
                parts: BTreeMap::new(),
            },
        );
        Ok(upload_id)
    }

    async fn upload_part(
        &self,
        _bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i64,
        body: PartBody,
    ) -> Result<UploadedPart, StoreError> {
        self.check_failure(key, Some(part_number))?;
        let data = collect_body(body).await?;

        let mut state = self.state();
        let upload = state
            .uploads
            .get_mut(upload_id)
            .ok_or_else(|| StoreError::UnknownUpload(upload_id.to_string()))?;
        upload.parts.insert(part_number, data);

        Ok(UploadedPart {
            part_number,
            e_tag: format!("\"{}-{}\"", upload_id, part_number),
        })
    }

    async fn complete_multipart(
        &self,
        _bucket: &str,
        _key: &str,
        upload_id: &str,
        parts: Vec<UploadedPart>,
    ) -> Result<(), StoreError> {
        let mut state = self.state();
        let upload = state
            .uploads
            .remove(upload_id)
            .ok_or_else(|| StoreError::UnknownUpload(upload_id.to_string()))?;

        if parts.windows(2).any(|w| w[0].part_number >= w[1].part_number) {
            return Err(StoreError::request(
                "CompleteMultipartUpload",
                "part list is not in ascending order",
            ));
        }

        let mut object = BytesMut::new();
        for part in &parts {
            let data = upload.parts.get(&part.part_number).ok_or_else(|| {
                StoreError::request(
                    "CompleteMultipartUpload",
                    format!("part {} was never uploaded", part.part_number),
                )
            })?;
            object.extend_from_slice(data);
        }

        state
            .objects
            .insert((upload.bucket, upload.key), object.freeze());
        Ok(())
    }

    async fn abort_multipart(&self, _bucket: &str, _key: &str, upload_id: &str) -> Result<(), StoreError> {
        let mut state = self.state();
        state
            .uploads
            .remove(upload_id)
            .ok_or_else(|| StoreError::UnknownUpload(upload_id.to_string()))?;
        state.aborted_uploads += 1;
        Ok(())
    }
}
