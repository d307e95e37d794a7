//! Binary asset lookup: `lookup(path) -> bytes | not-found`.
//!
//! The image resolver never touches the file system directly; it asks an
//! [`AssetSource`]. [`FsAssetSource`] serves a directory on disk and
//! [`MemoryAssetSource`] serves an in-memory map (tests, embedding hosts
//! that already hold their attachments).

use crate::error::ImageError;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Lookup capability for image bytes referenced from Markdown.
pub trait AssetSource: Send + Sync {
    /// Fetch the bytes stored at `path`.
    ///
    /// Returns [`ImageError::NotFound`] when nothing exists there and
    /// [`ImageError::NotAFile`] when the entry is not a plain file.
    fn lookup<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<Vec<u8>, ImageError>>;
}

/// Serves assets from a root directory.
///
/// Relative references resolve against the root; absolute references are
/// used as-is. URL references (`http://…`) are never fetched and report
/// not-found.
#[derive(Debug, Clone)]
pub struct FsAssetSource {
    root: PathBuf,
}

impl FsAssetSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a reference to a path below (or, if absolute, outside) the root.
    pub fn resolve_path(&self, reference: &str) -> Option<PathBuf> {
        if reference.contains("://") {
            return None;
        }
        let candidate = Path::new(reference);
        if candidate.is_absolute() {
            return Some(candidate.to_path_buf());
        }
        let mut path = self.root.clone();
        for component in candidate.components() {
            match component {
                Component::Normal(part) => path.push(part),
                Component::ParentDir => path.push(".."),
                Component::CurDir => {}
                Component::RootDir | Component::Prefix(_) => return None,
            }
        }
        Some(path)
    }

    async fn read(&self, reference: &str) -> Result<Vec<u8>, ImageError> {
        let Some(path) = self.resolve_path(reference) else {
            return Err(ImageError::NotFound {
                path: reference.to_string(),
            });
        };

        let meta = match tokio::fs::metadata(&path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ImageError::NotFound {
                    path: reference.to_string(),
                })
            }
            Err(e) => {
                return Err(ImageError::ReadFailed {
                    path: reference.to_string(),
                    detail: e.to_string(),
                })
            }
        };
        if !meta.is_file() {
            return Err(ImageError::NotAFile {
                path: reference.to_string(),
            });
        }

        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| ImageError::ReadFailed {
                path: reference.to_string(),
                detail: e.to_string(),
            })?;
        debug!("Read asset {} ({} bytes)", path.display(), bytes.len());
        Ok(bytes)
    }
}

impl AssetSource for FsAssetSource {
    fn lookup<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<Vec<u8>, ImageError>> {
        self.read(path).boxed()
    }
}

/// Serves assets from memory, keyed by the exact reference string.
#[derive(Debug, Clone, Default)]
pub struct MemoryAssetSource {
    assets: HashMap<String, Vec<u8>>,
}

impl MemoryAssetSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) -> &mut Self {
        self.assets.insert(path.into(), bytes.into());
        self
    }

    pub fn with(mut self, path: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(path, bytes);
        self
    }
}

impl AssetSource for MemoryAssetSource {
    fn lookup<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<Vec<u8>, ImageError>> {
        let found = self.assets.get(path).cloned().ok_or_else(|| ImageError::NotFound {
            path: path.to_string(),
        });
        futures::future::ready(found).boxed()
    }
}
