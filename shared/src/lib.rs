//! Shared types for the transaction integrity ledger
//!
//! Common types used across crates: error codes and the application
//! error type, domain models (transactions, attachments, anchor
//! records), and small time/ID utilities.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use error::{AppError, AppResult, ErrorCode};
pub use serde::{Deserialize, Serialize};
