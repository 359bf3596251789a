//! # r2-uploader
//!
//! Upload files and directories to Cloudflare R2 and hand out time-limited
//! download links.
//!
//! ## Overview
//!
//! A path is enumerated into files, each file gets a destination key, and the
//! files are uploaded one after another. Large files go up as a multi-part
//! upload with a few parts in flight at once; progress is reported to an
//! observer as bytes leave the process. Once every file is stored, a presigned
//! GET URL valid for 24 hours is issued for each of them.
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use r2_uploader::batch::BatchUploader;
//! use r2_uploader::cloud::engine::TransferEngine;
//! use r2_uploader::cloud::links::LinkIssuer;
//! use r2_uploader::cloud::progress::LogObserver;
//! use r2_uploader::cloud::r2::R2Store;
//! use r2_uploader::config::{StorageConfig, TransferConfig};
//! use r2_uploader::files::enumerator::{base_directory, enumerate, normalize_path};
//! use r2_uploader::files::key_resolver::{KeyLayout, KeyResolver};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let storage = StorageConfig::new("account", "access-key", "secret-key", "media");
//! let config = TransferConfig::default();
//!
//! let input = Path::new("./photos");
//! let normalized = normalize_path(input);
//! let files = enumerate(&normalized.path)?;
//! let resolver = KeyResolver::new(base_directory(input, &normalized), KeyLayout::Flat);
//!
//! let signer = LinkIssuer::for_storage(&storage, config.link_expiry)?;
//! let engine = TransferEngine::new(Arc::new(R2Store::new(&storage, config.max_attempts)?), config)?;
//! let batch = BatchUploader::new(engine, Arc::new(signer));
//! let jobs = batch.plan(&files, &resolver, &storage.bucket);
//! let report = batch.run(&jobs, Arc::new(LogObserver)).await?;
//!
//! for link in report.issued_links() {
//!     println!("{}", link.url);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`cli`]: Command-line interface definitions and argument parsing
//! - [`models`]: Core data models
//! - [`files`]: Path enumeration and key derivation
//! - [`cloud`]: Transfer engine, backends, progress and links
//! - [`batch`]: Fail-fast batch driver
//! - [`config`]: Transfer tuning, storage credentials and saved profiles
//! - [`error`]: Error types
//! - [`constants`]: Application-wide constants

/// Command-line interface definitions and argument parsing
pub mod cli;

/// Core data models and structures used throughout the application
pub mod models;

/// Path enumeration and destination keys
pub mod files;

/// Object storage transfer, progress and presigned links
pub mod cloud;

/// Sequential batch uploads
pub mod batch;

/// Configuration management and saved profiles
pub mod config;

/// Application constants and configuration values
pub mod constants;

/// Error types
pub mod error;

/// Test utilities and helpers
#[cfg(test)]
pub mod test_utils;
