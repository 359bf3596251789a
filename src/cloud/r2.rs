use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, warn};
use rusoto_core::{ByteStream, HttpClient};
use rusoto_credential::StaticProvider;
use rusoto_s3::{
    AbortMultipartUploadRequest, CompleteMultipartUploadRequest, CompletedMultipartUpload,
    CompletedPart, CreateMultipartUploadRequest, PutObjectRequest, S3Client, UploadPartRequest, S3,
};
use tokio::time::sleep;

use crate::cloud::store::{ObjectStore, PartBody, UploadedPart};
use crate::config::StorageConfig;
use crate::constants::{ERROR_FAILED_TO_CREATE_CLIENT, RETRY_BASE_DELAY_MS, RETRY_MAX_DELAY_SECS};
use crate::error::StoreError;

/// Create an S3 client bound to the R2 account endpoint with static credentials
pub fn create_r2_client(config: &StorageConfig) -> Result<S3Client> {
    config.validate()?;

    let http_client = HttpClient::new().context(ERROR_FAILED_TO_CREATE_CLIENT)?;
    let provider = StaticProvider::new_minimal(config.access_key.clone(), config.secret_key.clone());

    debug!("Creating R2 client for endpoint {}", config.endpoint());
    Ok(S3Client::new_with(http_client, provider, config.region()))
}

/// Delay before retry number `attempt` (1-based), doubling from 500ms up to the cap
pub fn retry_delay(attempt: usize) -> Duration {
    let exponent = attempt.min(16) as u32;
    let delay = Duration::from_millis(RETRY_BASE_DELAY_MS.saturating_mul(2u64.pow(exponent)));
    delay.min(Duration::from_secs(RETRY_MAX_DELAY_SECS))
}

/// [`ObjectStore`] backed by a rusoto S3 client pointed at R2.
///
/// Part and single-object uploads are retried with exponential backoff up to
/// `max_attempts` times; control requests (create, complete, abort) are not.
pub struct R2Store {
    client: S3Client,
    max_attempts: usize,
}

impl R2Store {
    pub fn new(config: &StorageConfig, max_attempts: usize) -> Result<Self> {
        Ok(R2Store {
            client: create_r2_client(config)?,
            max_attempts: max_attempts.max(1),
        })
    }

    async fn with_retries<T, E, F, Fut>(&self, operation: &'static str, mut request: F) -> Result<T, StoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: Display,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match request().await {
                Ok(output) => return Ok(output),
                Err(e) => {
                    if attempt >= self.max_attempts {
                        return Err(StoreError::request(
                            operation,
                            format!("{} (after {} attempts)", e, attempt),
                        ));
                    }

                    let delay = retry_delay(attempt);
                    warn!("{} attempt {} failed, retrying in {:?}: {}", operation, attempt, delay, e);
                    sleep(delay).await;
                }
            }
        }
    }
}

fn byte_stream(body: PartBody) -> ByteStream {
    let size = body.len();
    ByteStream::new_with_size(body, size)
}

#[async_trait]
impl ObjectStore for R2Store {
    async fn put_object(&self, bucket: &str, key: &str, body: PartBody) -> Result<(), StoreError> {
        let client = &self.client;
        self.with_retries("PutObject", || {
            let request = PutObjectRequest {
                bucket: bucket.to_string(),
                key: key.to_string(),
                content_length: Some(body.len() as i64),
                body: Some(byte_stream(body.clone())),
                ..Default::default()
            };
            async move { client.put_object(request).await }
        })
        .await?;
        Ok(())
    }

    async fn create_multipart(&self, bucket: &str, key: &str) -> Result<String, StoreError> {
        let output = self
            .client
            .create_multipart_upload(CreateMultipartUploadRequest {
                bucket: bucket.to_string(),
                key: key.to_string(),
                ..Default::default()
            })
            .await
            .map_err(|e| StoreError::request("CreateMultipartUpload", e))?;

        output
            .upload_id
            .ok_or_else(|| StoreError::MissingUploadId(key.to_string()))
    }

    async fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i64,
        body: PartBody,
    ) -> Result<UploadedPart, StoreError> {
        let client = &self.client;
        let output = self
            .with_retries("UploadPart", || {
                let request = UploadPartRequest {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                    upload_id: upload_id.to_string(),
                    part_number,
                    content_length: Some(body.len() as i64),
                    body: Some(byte_stream(body.clone())),
                    ..Default::default()
                };
                async move { client.upload_part(request).await }
            })
            .await?;

        let e_tag = output.e_tag.ok_or(StoreError::MissingETag(part_number))?;
        Ok(UploadedPart { part_number, e_tag })
    }

    async fn complete_multipart(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: Vec<UploadedPart>,
    ) -> Result<(), StoreError> {
        let parts = parts
            .into_iter()
            .map(|part| CompletedPart {
                e_tag: Some(part.e_tag),
                part_number: Some(part.part_number),
            })
            .collect();

        self.client
            .complete_multipart_upload(CompleteMultipartUploadRequest {
                bucket: bucket.to_string(),
                key: key.to_string(),
                upload_id: upload_id.to_string(),
                multipart_upload: Some(CompletedMultipartUpload { parts: Some(parts) }),
                ..Default::default()
            })
            .await
            .map_err(|e| StoreError::request("CompleteMultipartUpload", e))?;
        Ok(())
    }

    async fn abort_multipart(&self, bucket: &str, key: &str, upload_id: &str) -> Result<(), StoreError> {
        self.client
            .abort_multipart_upload(AbortMultipartUploadRequest {
                bucket: bucket.to_string(),
                key: key.to_string(),
                upload_id: upload_id.to_string(),
                ..Default::default()
            })
            .await
            .map_err(|e| StoreError::request("AbortMultipartUpload", e))?;
        Ok(())
    }
}
