use rusoto_core::Region;
use rusoto_credential::AwsCredentials;
use serde::{Deserialize, Serialize};

use crate::constants::{R2_SIGNING_REGION, R2_STORAGE_HOST};
use crate::error::UploadError;

fn default_storage_host() -> String {
    R2_STORAGE_HOST.to_string()
}

/// Credentials and addressing for one R2 account and bucket.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    #[serde(alias = "AccountID")]
    pub account_id: String,
    #[serde(alias = "AccessKey")]
    pub access_key: String,
    #[serde(alias = "SecretKey")]
    pub secret_key: String,
    #[serde(alias = "BucketName")]
    pub bucket: String,
    /// Cloudflare API token, kept with the profile but not used for transfers
    #[serde(default, alias = "APIToken")]
    pub api_token: Option<String>,
    #[serde(default = "default_storage_host")]
    pub storage_host: String,
}

impl StorageConfig {
    pub fn new(account_id: &str, access_key: &str, secret_key: &str, bucket: &str) -> Self {
        StorageConfig {
            account_id: account_id.to_string(),
            access_key: access_key.to_string(),
            secret_key: secret_key.to_string(),
            bucket: bucket.to_string(),
            api_token: None,
            storage_host: default_storage_host(),
        }
    }

    /// Account endpoint, `https://<account>.<host>`
    pub fn endpoint(&self) -> String {
        format!("https://{}.{}", self.account_id, self.storage_host)
    }

    /// Fixed custom region so the client never rewrites the endpoint.
    pub fn region(&self) -> Region {
        Region::Custom {
            name: R2_SIGNING_REGION.to_string(),
            endpoint: self.endpoint(),
        }
    }

    pub fn credentials(&self) -> AwsCredentials {
        AwsCredentials::new(self.access_key.clone(), self.secret_key.clone(), None, None)
    }

    pub fn validate(&self) -> Result<(), UploadError> {
        let fields = [
            ("account ID", &self.account_id),
            ("access key", &self.access_key),
            ("secret key", &self.secret_key),
            ("bucket", &self.bucket),
            ("storage host", &self.storage_host),
        ];
        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(UploadError::Config(format!("{} must not be empty", name)));
            }
        }
        Ok(())
    }
}
