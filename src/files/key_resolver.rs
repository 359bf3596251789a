//! Destination key derivation.
//!
//! Keys are built from the file's base name with characters that are awkward
//! in object URLs replaced by `_`. Directory uploads prefix the key with the
//! uploaded directory's own name.

use std::path::{Component, Path, PathBuf};

use crate::constants::KEY_UNSAFE_CHARS;

/// How files below a directory upload map to keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyLayout {
    /// `base/name`, dropping intermediate directories. Same-named files in
    /// different subdirectories resolve to the same key.
    #[default]
    Flat,
    /// `base/sub/dir/name`, keeping the path relative to the upload root
    Tree,
}

/// Sanitizes one key segment, replacing `[`, `]`, `(`, `)` and space with `_`.
///
/// # Example
///
/// ```
/// use r2_uploader::files::key_resolver::sanitize_key_segment;
///
/// assert_eq!(sanitize_key_segment("a (1).jpg"), "a__1_.jpg");
/// ```
pub fn sanitize_key_segment(segment: &str) -> String {
    segment
        .chars()
        .map(|c| if KEY_UNSAFE_CHARS.contains(&c) { '_' } else { c })
        .collect()
}

/// Derives destination keys for one upload batch.
#[derive(Debug, Clone, Default)]
pub struct KeyResolver {
    base_dir: Option<String>,
    root: Option<PathBuf>,
    layout: KeyLayout,
}

impl KeyResolver {
    pub fn new(base_dir: Option<String>, layout: KeyLayout) -> Self {
        KeyResolver {
            base_dir,
            root: None,
            layout,
        }
    }

    /// Set the directory relative paths are taken from under [`KeyLayout::Tree`].
    pub fn with_root(mut self, root: &Path) -> Self {
        self.root = Some(root.to_path_buf());
        self
    }

    pub fn layout(&self) -> KeyLayout {
        self.layout
    }

    /// Key for the file at `path`.
    pub fn resolve(&self, path: &Path) -> String {
        let name = path
            .file_name()
            .map(|n| sanitize_key_segment(&n.to_string_lossy()))
            .unwrap_or_default();

        let base = match &self.base_dir {
            Some(base) => base,
            None => return name,
        };

        let mut segments = vec![base.clone()];
        if self.layout == KeyLayout::Tree {
            segments.extend(self.intermediate_dirs(path));
        }
        segments.push(name);

        // Base names never contain separators, but a base directory given as
        // `a\b` by a Windows caller still has to become `a/b`.
        segments.join("/").replace('\\', "/")
    }

    fn intermediate_dirs(&self, path: &Path) -> Vec<String> {
        let relative = match (&self.root, path.parent()) {
            (Some(root), Some(parent)) => parent.strip_prefix(root).ok(),
            _ => None,
        };

        relative
            .map(|rel| {
                rel.components()
                    .filter_map(|c| match c {
                        Component::Normal(part) => Some(sanitize_key_segment(&part.to_string_lossy())),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}
