use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};

use crate::config::StorageConfig;
use crate::constants::{DEFAULT_CONCURRENCY, DEFAULT_PART_SIZE, MAX_UPLOAD_ATTEMPTS};

/// Command-line arguments for r2-uploader.
#[derive(Parser, Debug)]
#[clap(name = "r2-uploader", about = "Upload files to Cloudflare R2 and share presigned links")]
pub struct Args {
    /// Verbose logging
    #[clap(short, long, global = true)]
    pub verbose: bool,

    #[clap(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Upload a file or directory and print download links
    Upload(UploadOpts),

    /// Manage saved credential profiles
    Profile {
        #[clap(subcommand)]
        action: ProfileCommands,
    },
}

/// R2 account credentials given on the command line.
#[derive(ClapArgs, Debug, Default, Clone)]
pub struct StorageArgs {
    /// Cloudflare account ID
    #[clap(long)]
    pub account_id: Option<String>,

    /// R2 access key ID
    #[clap(long)]
    pub access_key: Option<String>,

    /// R2 secret access key
    #[clap(long)]
    pub secret_key: Option<String>,

    /// Bucket to upload into
    #[clap(long)]
    pub bucket: Option<String>,
}

impl StorageArgs {
    /// Build a storage config, failing on the first missing flag
    pub fn to_config(&self) -> Result<StorageConfig> {
        let require = |value: &Option<String>, flag: &str| {
            value
                .as_deref()
                .map(clean_input)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| anyhow!("--{} is required when no profile is given", flag))
        };

        Ok(StorageConfig::new(
            &require(&self.account_id, "account-id")?,
            &require(&self.access_key, "access-key")?,
            &require(&self.secret_key, "secret-key")?,
            &require(&self.bucket, "bucket")?,
        ))
    }
}

/// Options for the upload subcommand.
#[derive(ClapArgs, Debug)]
pub struct UploadOpts {
    /// File or directory to upload
    pub path: String,

    /// Saved profile to take credentials from
    #[clap(short, long, conflicts_with_all = ["account_id", "access_key", "secret_key", "bucket"])]
    pub profile: Option<String>,

    #[clap(flatten)]
    pub storage: StorageArgs,

    /// Upload without asking for confirmation
    #[clap(short, long)]
    pub yes: bool,

    /// Run the whole batch against an in-memory store instead of R2
    #[clap(long)]
    pub dry_run: bool,

    /// Keep subdirectories in keys instead of flattening them
    #[clap(long)]
    pub preserve_tree: bool,

    /// Multipart part size (in MB)
    #[clap(long, default_value_t = DEFAULT_PART_SIZE / (1024 * 1024))]
    pub part_size_mb: u64,

    /// Parts uploaded in parallel per file
    #[clap(long, default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    /// Attempts per part before a file fails
    #[clap(long, default_value_t = MAX_UPLOAD_ATTEMPTS)]
    pub max_attempts: usize,
}

impl UploadOpts {
    /// Input path with surrounding whitespace and quotes removed
    pub fn input_path(&self) -> PathBuf {
        PathBuf::from(clean_input(&self.path))
    }
}

/// Profile management subcommands.
#[derive(Subcommand, Debug)]
pub enum ProfileCommands {
    /// Save a new profile
    Add(ProfileAddOpts),

    /// List saved profiles
    List,

    /// Delete a saved profile
    Remove {
        /// Profile name
        name: String,
    },
}

/// Options for `profile add`.
#[derive(ClapArgs, Debug)]
pub struct ProfileAddOpts {
    /// Profile name
    pub name: String,

    #[clap(flatten)]
    pub storage: StorageArgs,

    /// Cloudflare API token, stored alongside the keys
    #[clap(long)]
    pub api_token: Option<String>,
}

/// Trim whitespace and one pair of surrounding quotes.
///
/// Paths dragged into a terminal often arrive quoted or with a trailing space.
pub fn clean_input(input: &str) -> String {
    let trimmed = input.trim();
    for quote in ['"', '\''] {
        if let Some(inner) = trimmed
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner.trim().to_string();
        }
    }
    trimmed.to_string()
}
