//! Filesystem-backed blob store for collected media.
//!
//! Destination paths are the deterministic relative paths computed by the
//! crawl engine (`{owner}/{YYYY-MM}/{shortcode}.{ext}`); the returned
//! locator is the absolute path of the stored file.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;

use gramscan_core::ports::MediaStore;
use gramscan_core::StoreError;

#[derive(Debug, Clone)]
pub struct FsMediaStore {
    root: PathBuf,
}

impl FsMediaStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolves `destination` under the store root, rejecting absolute
    /// paths and parent-directory segments.
    fn resolve(&self, destination: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(destination);
        let traversal = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if destination.is_empty() || traversal {
            return Err(StoreError::Backend {
                context: "resolving media destination".to_string(),
                reason: format!("invalid destination path: {destination:?}"),
            });
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl MediaStore for FsMediaStore {
    async fn upload(&self, bytes: Vec<u8>, destination: &str) -> Result<String, StoreError> {
        let path = self.resolve(destination)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        Ok(path.display().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upload_writes_bytes_and_returns_locator() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FsMediaStore::new(dir.path());

        let locator = store
            .upload(b"jpeg bytes".to_vec(), "acme/2025-06/Cxyz.jpg")
            .await
            .expect("upload");

        assert!(locator.ends_with("acme/2025-06/Cxyz.jpg"));
        let written = std::fs::read(dir.path().join("acme/2025-06/Cxyz.jpg")).expect("read back");
        assert_eq!(written, b"jpeg bytes");
    }

    #[tokio::test]
    async fn upload_rejects_parent_traversal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FsMediaStore::new(dir.path());

        let result = store.upload(vec![1, 2, 3], "../outside.jpg").await;
        assert!(matches!(result, Err(StoreError::Backend { .. })));
    }

    #[tokio::test]
    async fn upload_rejects_absolute_destination() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FsMediaStore::new(dir.path());

        let result = store.upload(vec![1, 2, 3], "/etc/owned.jpg").await;
        assert!(matches!(result, Err(StoreError::Backend { .. })));
    }
}
