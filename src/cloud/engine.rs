use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use log::{debug, info, warn};
use tokio::fs::File as AsyncFile;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::cloud::progress::{ProgressObserver, ProgressTracker};
use crate::cloud::store::{ObjectStore, PartBody, UploadedPart};
use crate::config::TransferConfig;
use crate::constants::S3_MAX_PARTS;
use crate::error::{StoreError, UploadError};
use crate::models::{ChunkTask, StoredObjectRef, UploadJob};

/// Split `size` bytes into `part_size` chunks; the last one may be shorter.
///
/// A zero-byte file has no chunks.
pub fn plan_chunks(job_id: Uuid, size: u64, part_size: u64) -> Vec<ChunkTask> {
    if part_size == 0 {
        return Vec::new();
    }

    let count = (size + part_size - 1) / part_size;
    (0..count)
        .map(|index| {
            let byte_offset = index * part_size;
            ChunkTask {
                job_id,
                index,
                byte_offset,
                byte_length: std::cmp::min(part_size, size - byte_offset),
            }
        })
        .collect()
}

/// Everything a part worker needs besides its chunk
struct PartTarget {
    bucket: String,
    key: String,
    upload_id: String,
    source_path: PathBuf,
}

/// Uploads one file per call, chunked and with bounded part concurrency.
///
/// Files that fit in one part are sent with a single `put_object`. Larger
/// files use the multipart protocol: at most `concurrency` parts are in flight,
/// parts may finish in any order, and the object is assembled by part number
/// only after every part succeeded. The first failed part stops the job, the
/// multipart upload is aborted, and nothing is committed at the key.
pub struct TransferEngine {
    store: Arc<dyn ObjectStore>,
    config: TransferConfig,
}

impl TransferEngine {
    pub fn new(store: Arc<dyn ObjectStore>, config: TransferConfig) -> Result<Self, UploadError> {
        config.validate()?;
        Ok(TransferEngine { store, config })
    }

    pub fn config(&self) -> &TransferConfig {
        &self.config
    }

    /// Upload `job` and return where it was stored.
    pub async fn upload(
        &self,
        job: &UploadJob,
        observer: Arc<dyn ProgressObserver>,
    ) -> Result<StoredObjectRef, UploadError> {
        let chunks = plan_chunks(job.id, job.size, self.config.part_size);
        if chunks.len() as u64 > S3_MAX_PARTS {
            return Err(UploadError::Config(format!(
                "{} needs {} parts, more than the {} allowed; raise the part size",
                job.source_path.display(),
                chunks.len(),
                S3_MAX_PARTS
            )));
        }

        info!(
            "Starting upload of {} ({} bytes, {} parts) to s3://{}/{}",
            job.source_path.display(),
            job.size,
            chunks.len().max(1),
            job.bucket,
            job.destination_key
        );

        let tracker = Arc::new(ProgressTracker::new(job.id, job.size, observer));
        let start_time = Instant::now();

        let result = if chunks.len() <= 1 {
            self.upload_single(job, &tracker).await
        } else {
            self.upload_multipart(job, chunks, &tracker).await
        };

        match result {
            Ok(()) => {
                tracker.finish();
                let elapsed = start_time.elapsed();
                let throughput = if elapsed.as_secs() > 0 {
                    job.size / elapsed.as_secs()
                } else {
                    job.size
                };
                info!(
                    "Uploaded {} as {} in {:?} ({} KB/s)",
                    job.source_path.display(),
                    job.destination_key,
                    elapsed,
                    throughput / 1024
                );
                Ok(StoredObjectRef {
                    bucket: job.bucket.clone(),
                    key: job.destination_key.clone(),
                })
            }
            Err(source) => {
                warn!("Failed to upload {}: {}", job.source_path.display(), source);
                Err(UploadError::Transfer {
                    path: job.source_path.clone(),
                    key: job.destination_key.clone(),
                    source,
                })
            }
        }
    }

    async fn upload_single(&self, job: &UploadJob, tracker: &Arc<ProgressTracker>) -> Result<(), StoreError> {
        let data = read_range(&job.source_path, 0, job.size).await?;
        let body = PartBody::with_progress(data, Arc::clone(tracker));
        self.store.put_object(&job.bucket, &job.destination_key, body).await
    }

    async fn upload_multipart(
        &self,
        job: &UploadJob,
        chunks: Vec<ChunkTask>,
        tracker: &Arc<ProgressTracker>,
    ) -> Result<(), StoreError> {
        let upload_id = self.store.create_multipart(&job.bucket, &job.destination_key).await?;
        debug!("Started multipart upload with ID: {} for {}", upload_id, job.source_path.display());

        let target = Arc::new(PartTarget {
            bucket: job.bucket.clone(),
            key: job.destination_key.clone(),
            upload_id,
            source_path: job.source_path.clone(),
        });

        let assembled = match self.upload_parts(&target, chunks, tracker).await {
            Ok(mut parts) => {
                parts.sort_by_key(|part| part.part_number);
                self.store
                    .complete_multipart(&target.bucket, &target.key, &target.upload_id, parts)
                    .await
            }
            Err(e) => Err(e),
        };

        if let Err(e) = assembled {
            self.abort(&target).await;
            return Err(e);
        }

        debug!("Completed multipart upload for {}", job.source_path.display());
        Ok(())
    }

    /// Run part uploads with at most `concurrency` in flight.
    ///
    /// New parts are only started as earlier ones finish; on the first error
    /// every in-flight part is cancelled and no further part is started.
    async fn upload_parts(
        &self,
        target: &Arc<PartTarget>,
        chunks: Vec<ChunkTask>,
        tracker: &Arc<ProgressTracker>,
    ) -> Result<Vec<UploadedPart>, StoreError> {
        let total = chunks.len();
        let mut pending = chunks.into_iter();
        let mut workers = JoinSet::new();
        let mut completed = Vec::with_capacity(total);

        for chunk in pending.by_ref().take(self.config.concurrency) {
            workers.spawn(upload_chunk(
                Arc::clone(&self.store),
                Arc::clone(target),
                chunk,
                Arc::clone(tracker),
            ));
        }

        while let Some(joined) = workers.join_next().await {
            let outcome = joined
                .map_err(|e| StoreError::Worker(e.to_string()))
                .and_then(|result| result);

            match outcome {
                Ok(part) => {
                    debug!("Part {}/{} done for {}", part.part_number, total, target.key);
                    completed.push(part);
                    if let Some(chunk) = pending.next() {
                        workers.spawn(upload_chunk(
                            Arc::clone(&self.store),
                            Arc::clone(target),
                            chunk,
                            Arc::clone(tracker),
                        ));
                    }
                }
                Err(e) => {
                    workers.abort_all();
                    return Err(e);
                }
            }
        }

        Ok(completed)
    }

    async fn abort(&self, target: &PartTarget) {
        match self
            .store
            .abort_multipart(&target.bucket, &target.key, &target.upload_id)
            .await
        {
            Ok(()) => debug!("Aborted multipart upload {} for {}", target.upload_id, target.key),
            Err(e) => warn!(
                "Failed to abort multipart upload {} for {}: {}",
                target.upload_id, target.key, e
            ),
        }
    }
}

async fn upload_chunk(
    store: Arc<dyn ObjectStore>,
    target: Arc<PartTarget>,
    chunk: ChunkTask,
    tracker: Arc<ProgressTracker>,
) -> Result<UploadedPart, StoreError> {
    let data = read_range(&target.source_path, chunk.byte_offset, chunk.byte_length).await?;
    let body = PartBody::with_progress(data, tracker);
    store
        .upload_part(
            &target.bucket,
            &target.key,
            &target.upload_id,
            chunk.part_number(),
            body,
        )
        .await
}

/// Read exactly `length` bytes at `offset` through a fresh handle
async fn read_range(path: &Path, offset: u64, length: u64) -> Result<Bytes, StoreError> {
    let mut file = AsyncFile::open(path).await?;
    file.seek(std::io::SeekFrom::Start(offset)).await?;

    let mut buffer = vec![0u8; length as usize];
    file.read_exact(&mut buffer).await?;
    Ok(Bytes::from(buffer))
}
