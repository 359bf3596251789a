//! Local file discovery and destination key derivation.
//!
//! ## Components
//!
//! - **Enumerator**: walks a file or directory into [`FileDescriptor`](crate::models::FileDescriptor)s
//! - **Key resolver**: turns each file path into a URL-safe object key
//!
//! ## Example
//!
//! ```no_run
//! use r2_uploader::files::enumerator::{base_directory, enumerate, normalize_path};
//! use r2_uploader::files::key_resolver::{KeyLayout, KeyResolver};
//! use std::path::Path;
//!
//! # fn example() -> anyhow::Result<()> {
//! let input = Path::new("/tmp/photos");
//! let normalized = normalize_path(input);
//! let files = enumerate(&normalized.path)?;
//!
//! let resolver = KeyResolver::new(base_directory(input, &normalized), KeyLayout::Flat);
//! for file in &files {
//!     println!("{} -> {}", file.path.display(), resolver.resolve(&file.path));
//! }
//! # Ok(())
//! # }
//! ```

/// File and directory enumeration
pub mod enumerator;

/// Object key derivation
pub mod key_resolver;
