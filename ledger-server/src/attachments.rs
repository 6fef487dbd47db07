//! Attachment ingestor
//!
//! Takes the uploaded files of a create request, applies the upload
//! policy, hashes the accepted content and delegates the bytes to the
//! blob store.
//!
//! Files outside policy (too large, disallowed media type) are dropped
//! with a warning, not treated as a fatal error — the created
//! transaction may end up with fewer attachments than files submitted.
//! Blob store failures on an accepted file are fatal: those bytes are
//! required, not best-effort.

use crate::digest;
use crate::storage::BlobStore;
use shared::models::{AttachmentDraft, UploadedFile};
use shared::AppResult;
use std::sync::Arc;

/// Maximum accepted file size (5 MiB)
pub const MAX_ATTACHMENT_SIZE: usize = 5 * 1024 * 1024;

/// Media types accepted as supporting documents (receipts, invoices)
pub const ALLOWED_MEDIA_TYPES: &[&str] = &[
    "application/pdf",
    "image/jpeg",
    "image/png",
    "image/webp",
];

/// Attachment ingestor
pub struct AttachmentIngestor {
    store: Arc<dyn BlobStore>,
    max_size: usize,
}

impl AttachmentIngestor {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self {
            store,
            max_size: MAX_ATTACHMENT_SIZE,
        }
    }

    /// Override the size cap (policy knob, mostly for tests)
    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    /// Ingest uploaded files: filter by policy, hash content, store blobs.
    ///
    /// Returns one draft per accepted file. Order is not significant —
    /// the integrity payload sorts digests before hashing.
    pub async fn ingest(&self, files: Vec<UploadedFile>) -> AppResult<Vec<AttachmentDraft>> {
        let mut drafts = Vec::with_capacity(files.len());

        for file in files {
            if !self.accepts(&file) {
                continue;
            }

            let content_digest = digest::digest_bytes(&file.content);
            let locator = self.store.store(&file.content, &file.filename).await?;

            drafts.push(AttachmentDraft {
                filename: file.filename,
                locator,
                content_digest,
            });
        }

        Ok(drafts)
    }

    /// Policy check. Rejections log and return false, never error.
    fn accepts(&self, file: &UploadedFile) -> bool {
        if file.content.len() > self.max_size {
            tracing::warn!(
                filename = %file.filename,
                size = file.content.len(),
                max = self.max_size,
                "Attachment dropped: exceeds size cap"
            );
            return false;
        }

        let media_type = match &file.media_type {
            Some(declared) => declared.clone(),
            // 未声明时按文件名推断
            None => mime_guess::from_path(&file.filename)
                .first_raw()
                .unwrap_or("application/octet-stream")
                .to_string(),
        };

        if !ALLOWED_MEDIA_TYPES.contains(&media_type.as_str()) {
            tracing::warn!(
                filename = %file.filename,
                media_type = %media_type,
                "Attachment dropped: media type not allowed"
            );
            return false;
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::LocalBlobStore;

    fn ingestor(tmp: &tempfile::TempDir) -> AttachmentIngestor {
        AttachmentIngestor::new(Arc::new(LocalBlobStore::new(tmp.path())))
    }

    #[tokio::test]
    async fn accepted_files_produce_drafts_with_digests() {
        let tmp = tempfile::tempdir().unwrap();
        let drafts = ingestor(&tmp)
            .ingest(vec![
                UploadedFile::new("a.pdf", b"X".to_vec()),
                UploadedFile::new("b.png", b"Y".to_vec()),
            ])
            .await
            .unwrap();

        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].content_digest, digest::digest_bytes(b"X"));
        assert_eq!(drafts[1].content_digest, digest::digest_bytes(b"Y"));
        assert_ne!(drafts[0].locator, drafts[1].locator);
    }

    #[tokio::test]
    async fn disallowed_media_type_is_dropped_not_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let drafts = ingestor(&tmp)
            .ingest(vec![
                UploadedFile::new("a.pdf", b"ok".to_vec()),
                UploadedFile::new("script.exe", b"nope".to_vec()),
                UploadedFile::new("b.jpg", b"ok".to_vec()),
            ])
            .await
            .unwrap();
        assert_eq!(drafts.len(), 2);
    }

    #[tokio::test]
    async fn oversized_file_is_dropped() {
        let tmp = tempfile::tempdir().unwrap();
        let ingestor = ingestor(&tmp).with_max_size(8);
        let drafts = ingestor
            .ingest(vec![
                UploadedFile::new("big.pdf", vec![0u8; 9]),
                UploadedFile::new("small.pdf", vec![0u8; 8]),
            ])
            .await
            .unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].filename, "small.pdf");
    }

    #[tokio::test]
    async fn declared_media_type_wins_over_filename() {
        let tmp = tempfile::tempdir().unwrap();
        let drafts = ingestor(&tmp)
            .ingest(vec![
                UploadedFile::new("receipt.pdf", b"x".to_vec())
                    .with_media_type("application/x-msdownload"),
            ])
            .await
            .unwrap();
        assert!(drafts.is_empty());
    }

    #[tokio::test]
    async fn empty_input_yields_empty_output() {
        let tmp = tempfile::tempdir().unwrap();
        let drafts = ingestor(&tmp).ingest(vec![]).await.unwrap();
        assert!(drafts.is_empty());
    }
}
