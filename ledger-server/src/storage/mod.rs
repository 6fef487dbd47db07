//! Blob store adapter
//!
//! Durable storage for attachment bytes. The core only needs one
//! operation: hand over the bytes, get back an opaque retrievable
//! locator. In production this would sit in front of S3-style object
//! storage; [`LocalBlobStore`] keeps blobs on the local filesystem.

use async_trait::async_trait;
use shared::{AppError, AppResult};
use std::path::PathBuf;
use uuid::Uuid;

/// Durable attachment byte storage
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Persist `bytes`, returning an opaque locator that can retrieve
    /// them later. Failure surfaces as `StorageFailed`.
    async fn store(&self, bytes: &[u8], filename: &str) -> AppResult<String>;
}

/// Filesystem-backed blob store
///
/// Objects land under `<root>/receipts/<uuid>.<ext>`; the original
/// extension is preserved, the original name is not trusted.
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn store(&self, bytes: &[u8], filename: &str) -> AppResult<String> {
        let ext = std::path::Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("bin");
        let object_name = format!("{}.{}", Uuid::new_v4(), ext);
        let dir = self.root.join("receipts");
        let path = dir.join(&object_name);

        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| AppError::storage(format!("Failed to create blob dir: {e}")))?;
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| AppError::storage(format!("Failed to write blob: {e}")))?;

        tracing::debug!(filename = %filename, object = %object_name, size = bytes.len(), "Blob stored");
        Ok(format!("receipts/{object_name}"))
    }
}
