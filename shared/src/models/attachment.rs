//! Attachment Model

use serde::{Deserialize, Serialize};

/// Attachment entity
///
/// Immutable once created — a transaction's attachment set is fixed at
/// creation time; edits create new attachments rather than mutating
/// existing ones.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Attachment {
    pub id: i64,
    pub transaction_id: i64,
    /// Original filename as uploaded
    pub filename: String,
    /// Opaque retrievable locator produced by the blob store
    pub locator: String,
    /// Lowercase hex SHA-256 over the raw file bytes (never canonicalized)
    pub content_digest: String,
    pub created_at: i64,
}

/// Attachment draft produced by the ingestor, before the row exists
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentDraft {
    pub filename: String,
    pub locator: String,
    pub content_digest: String,
}

/// An uploaded file as handed over by the (out-of-scope) request layer
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    /// Declared media type; re-checked against the filename by the ingestor
    pub media_type: Option<String>,
    pub content: Vec<u8>,
}

impl UploadedFile {
    pub fn new(filename: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            media_type: None,
            content,
        }
    }

    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }
}
