use std::time::Duration;

use chrono::Utc;
use log::{debug, warn};
use rusoto_core::Region;
use rusoto_credential::AwsCredentials;
use rusoto_s3::util::{PreSignedRequest, PreSignedRequestOption};
use rusoto_s3::GetObjectRequest;

use crate::config::{validate_link_expiry, StorageConfig};
use crate::error::UploadError;
use crate::models::{IssuedLink, LinkOutcome, StoredObjectRef};

/// Produces retrieval links for stored objects.
pub trait LinkSigner: Send + Sync {
    fn issue(&self, bucket: &str, key: &str) -> Result<IssuedLink, UploadError>;
}

/// Signs SigV4 presigned GET URLs locally; no request is sent.
pub struct LinkIssuer {
    region: Region,
    credentials: AwsCredentials,
    expiry: Duration,
}

impl LinkIssuer {
    pub fn new(region: Region, credentials: AwsCredentials, expiry: Duration) -> Result<Self, UploadError> {
        validate_link_expiry(expiry)?;
        Ok(LinkIssuer {
            region,
            credentials,
            expiry,
        })
    }

    /// Issuer for an R2 account whose links stay valid for `expiry`
    pub fn for_storage(config: &StorageConfig, expiry: Duration) -> Result<Self, UploadError> {
        config.validate()?;
        Self::new(config.region(), config.credentials(), expiry)
    }

    pub fn expiry(&self) -> Duration {
        self.expiry
    }
}

impl LinkSigner for LinkIssuer {
    fn issue(&self, bucket: &str, key: &str) -> Result<IssuedLink, UploadError> {
        let signing_error = |reason: &str| UploadError::Signing {
            key: key.to_string(),
            reason: reason.to_string(),
        };

        if bucket.is_empty() {
            return Err(signing_error("bucket name is empty"));
        }
        if key.is_empty() {
            return Err(signing_error("object key is empty"));
        }

        let window = chrono::Duration::from_std(self.expiry)
            .map_err(|e| signing_error(&e.to_string()))?;
        let expires_at = Utc::now() + window;

        let request = GetObjectRequest {
            bucket: bucket.to_string(),
            key: key.to_string(),
            ..Default::default()
        };
        let url = request.get_presigned_url(
            &self.region,
            &self.credentials,
            &PreSignedRequestOption {
                expires_in: self.expiry,
            },
        );

        debug!("Presigned s3://{}/{} until {}", bucket, key, expires_at);
        Ok(IssuedLink {
            object: StoredObjectRef {
                bucket: bucket.to_string(),
                key: key.to_string(),
            },
            url,
            expires_at,
        })
    }
}

/// Issue a link for every object; a failure is reported for its key only.
pub fn issue_links(signer: &dyn LinkSigner, objects: &[StoredObjectRef]) -> Vec<LinkOutcome> {
    objects
        .iter()
        .map(|object| {
            let result = signer.issue(&object.bucket, &object.key);
            if let Err(e) = &result {
                warn!("Couldn't generate URL for {}: {}", object.key, e);
            }
            LinkOutcome {
                object: object.clone(),
                result,
            }
        })
        .collect()
}
