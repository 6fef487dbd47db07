//! Repository Module
//!
//! CRUD operations over the ledger tables. The multi-row writes of the
//! record builder (transaction + attachments + anchor) run inside one
//! SQLite transaction — partial writes here are a correctness
//! violation, not just a bug.

pub mod anchor;
pub mod transaction;

use thiserror::Error;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        RepoError::Database(err.to_string())
    }
}

impl From<RepoError> for shared::AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(what) => shared::AppError::not_found(what),
            RepoError::Database(msg) | RepoError::Corrupt(msg) => shared::AppError::database(msg),
        }
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;
