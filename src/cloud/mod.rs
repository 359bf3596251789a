//! Object storage transfer and link issuance.
//!
//! Files are moved to an S3-compatible bucket (Cloudflare R2 by default) by a
//! [`TransferEngine`](engine::TransferEngine) that talks to the backend only
//! through the [`ObjectStore`](store::ObjectStore) trait.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐
//! │ BatchUploader   │────▶│ TransferEngine  │──── ProgressTracker ──▶ observer
//! └────────┬────────┘     └────────┬────────┘
//!          │                       │
//!   ┌──────▼──────┐      ┌─────────┴──────────┐
//!   │ LinkIssuer  │      │                    │
//!   └─────────────┘ ┌────▼──────┐      ┌──────▼──────┐
//!                   │  R2Store  │      │ MemoryStore │
//!                   └────┬──────┘      └─────────────┘
//!                        │
//!                   ┌────▼──────┐
//!                   │ R2 bucket │
//!                   └───────────┘
//! ```
//!
//! ## Usage Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use r2_uploader::cloud::engine::TransferEngine;
//! use r2_uploader::cloud::progress::LogObserver;
//! use r2_uploader::cloud::r2::R2Store;
//! use r2_uploader::config::{StorageConfig, TransferConfig};
//! use r2_uploader::models::{FileDescriptor, UploadJob};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let storage = StorageConfig::new("account", "access-key", "secret-key", "bucket");
//! let config = TransferConfig::default();
//! let store = R2Store::new(&storage, config.max_attempts)?;
//! let engine = TransferEngine::new(Arc::new(store), config)?;
//!
//! let file = FileDescriptor { path: "/tmp/video.mp4".into(), size: 200 * 1024 * 1024 };
//! let job = UploadJob::new(&file, "video.mp4".to_string(), "bucket");
//! engine.upload(&job, Arc::new(LogObserver)).await?;
//! # Ok(())
//! # }
//! ```

/// Chunked transfer of one file per job
pub mod engine;

/// Presigned retrieval links
pub mod links;

/// In-process store for dry runs and tests
pub mod memory;

/// Throttled progress reporting
pub mod progress;

/// Cloudflare R2 backend
pub mod r2;

/// Backend trait and part bodies
pub mod store;
