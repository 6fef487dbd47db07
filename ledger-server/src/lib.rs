//! Transaction integrity ledger
//!
//! Records financial transactions with supporting attachments and
//! cryptographically seals each record so later tampering is detectable:
//!
//! - [`canonical`] — deterministic serialization of structured values
//! - [`digest`] — SHA-256 over canonical payloads and raw byte streams
//! - [`attachments`] — upload policy, content hashing, blob storage
//! - [`transactions`] — the integrity record builder (create/update/delete)
//! - [`anchoring`] — durable queue + worker submitting digests to the ledger
//! - [`verify`] — recompute-and-compare verification protocol
//!
//! HTTP routing, authentication and membership checks live outside this
//! crate; the service layer takes pre-authenticated actor IDs.

pub mod anchoring;
pub mod attachments;
pub mod canonical;
pub mod core;
pub mod db;
pub mod digest;
pub mod ledger;
pub mod storage;
pub mod transactions;
pub mod utils;
pub mod verify;

// Re-export 公共类型
pub use anchoring::{AnchorQueue, AnchorWorker};
pub use attachments::AttachmentIngestor;
pub use core::Config;
pub use db::DbService;
pub use ledger::{LedgerAdapter, MockLedger};
pub use storage::{BlobStore, LocalBlobStore};
pub use transactions::TransactionService;
pub use verify::Verifier;

// Re-export unified error types from shared
pub use shared::{AppError, AppResult, ErrorCode};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};
