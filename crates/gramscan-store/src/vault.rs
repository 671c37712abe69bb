//! Filesystem-backed secret store.
//!
//! Each credential's `secret_ref` names one payload file under the vault
//! root. Deployment mounts the directory read-only; this adapter never
//! writes.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;

use gramscan_core::ports::SecretStore;
use gramscan_core::StoreError;

#[derive(Debug, Clone)]
pub struct FsSecretVault {
    root: PathBuf,
}

impl FsSecretVault {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl SecretStore for FsSecretVault {
    async fn fetch_payload(&self, reference: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let relative = Path::new(reference);
        let traversal = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if reference.is_empty() || traversal {
            return Err(StoreError::Backend {
                context: "resolving secret reference".to_string(),
                reason: format!("invalid secret reference: {reference:?}"),
            });
        }

        match tokio::fs::read(self.root.join(relative)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Io(e)),
        }
    }
}
