//! Domain models for the transaction integrity ledger

pub mod anchor;
pub mod attachment;
pub mod transaction;

// Re-exports
pub use anchor::{AnchorRecord, AnchorStatus, Verdict, VerifyStatus};
pub use attachment::{Attachment, AttachmentDraft, UploadedFile};
pub use transaction::{
    Transaction, TransactionCreate, TransactionDetail, TransactionStatus, TransactionType,
    TransactionUpdate,
};
