use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;

#[cfg(test)]
use mockall::automock;

use crate::cloud::progress::ProgressTracker;
use crate::constants::PART_BODY_SLICE_SIZE;
use crate::error::StoreError;

/// A part acknowledged by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedPart {
    pub part_number: i64,
    pub e_tag: String,
}

/// Backend operations the transfer engine needs.
///
/// Implementations own any transient-failure handling; the engine treats
/// every error returned here as final for the part or object concerned.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store a whole object in one request
    async fn put_object(&self, bucket: &str, key: &str, body: PartBody) -> Result<(), StoreError>;

    /// Start a multipart upload and return its upload ID
    async fn create_multipart(&self, bucket: &str, key: &str) -> Result<String, StoreError>;

    /// Upload one part (1-based `part_number`)
    async fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i64,
        body: PartBody,
    ) -> Result<UploadedPart, StoreError>;

    /// Assemble the listed parts, in the given order, into one object
    async fn complete_multipart(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: Vec<UploadedPart>,
    ) -> Result<(), StoreError>;

    /// Discard a multipart upload and every part uploaded to it
    async fn abort_multipart(&self, bucket: &str, key: &str, upload_id: &str) -> Result<(), StoreError>;
}

/// Request body that reports bytes to a [`ProgressTracker`] as the transport pulls them.
///
/// The body is a stream of slices of at most [`PART_BODY_SLICE_SIZE`] bytes.
/// Bytes are counted when a slice is handed out, so progress follows what the
/// network layer has consumed rather than what was read from disk. Clones
/// restart from the first byte (for transport retries) but share a high-water
/// mark, so resent bytes are never counted twice.
pub struct PartBody {
    data: Bytes,
    position: usize,
    progress: Option<PartProgress>,
}

struct PartProgress {
    tracker: Arc<ProgressTracker>,
    counted: Arc<AtomicU64>,
}

impl PartBody {
    /// A body that reports nothing
    pub fn new(data: Bytes) -> Self {
        PartBody {
            data,
            position: 0,
            progress: None,
        }
    }

    pub fn with_progress(data: Bytes, tracker: Arc<ProgressTracker>) -> Self {
        PartBody {
            data,
            position: 0,
            progress: Some(PartProgress {
                tracker,
                counted: Arc::new(AtomicU64::new(0)),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl Clone for PartBody {
    fn clone(&self) -> Self {
        PartBody {
            data: self.data.clone(),
            position: 0,
            progress: self.progress.as_ref().map(|p| PartProgress {
                tracker: Arc::clone(&p.tracker),
                counted: Arc::clone(&p.counted),
            }),
        }
    }
}

impl Stream for PartBody {
    type Item = io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.position >= this.data.len() {
            return Poll::Ready(None);
        }

        let end = std::cmp::min(this.position + PART_BODY_SLICE_SIZE, this.data.len());
        let slice = this.data.slice(this.position..end);
        this.position = end;

        if let Some(progress) = &this.progress {
            let previous = progress.counted.fetch_max(end as u64, Ordering::SeqCst);
            if (end as u64) > previous {
                progress.tracker.record(end as u64 - previous);
            }
        }

        Poll::Ready(Some(Ok(slice)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.data.len().saturating_sub(self.position);
        let slices = (remaining + PART_BODY_SLICE_SIZE - 1) / PART_BODY_SLICE_SIZE;
        (slices, Some(slices))
    }
}

/// Drain a body into one buffer
pub async fn collect_body(body: PartBody) -> io::Result<Bytes> {
    use futures::TryStreamExt;

    let buffer = body
        .try_fold(bytes::BytesMut::new(), |mut acc, slice| async move {
            acc.extend_from_slice(&slice);
            Ok(acc)
        })
        .await?;
    Ok(buffer.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::progress::NullObserver;
    use futures::StreamExt;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_body_slices_and_reassembles() {
        let data: Vec<u8> = (0..(PART_BODY_SLICE_SIZE * 2 + 10)).map(|i| i as u8).collect();
        let body = PartBody::new(Bytes::from(data.clone()));
        assert_eq!(body.size_hint(), (3, Some(3)));

        let slices: Vec<_> = body.collect().await;
        assert_eq!(slices.len(), 3);

        let collected = collect_body(PartBody::new(Bytes::from(data.clone()))).await.unwrap();
        assert_eq!(collected.as_ref(), data.as_slice());
    }

    #[tokio::test]
    async fn test_body_reports_progress_once_across_clones() {
        let tracker = Arc::new(ProgressTracker::new(Uuid::new_v4(), 1000, Arc::new(NullObserver)));
        let body = PartBody::with_progress(Bytes::from(vec![7u8; 1000]), Arc::clone(&tracker));
        let retry = body.clone();

        collect_body(body).await.unwrap();
        assert_eq!(tracker.bytes_read(), 1000);

        // A resend of the same part must not move progress again
        collect_body(retry).await.unwrap();
        assert_eq!(tracker.bytes_read(), 1000);
    }

    #[tokio::test]
    async fn test_empty_body_yields_nothing() {
        let body = PartBody::new(Bytes::new());
        assert!(body.is_empty());
        assert_eq!(collect_body(body).await.unwrap().len(), 0);
    }
}
