//! Unified error codes for the ledger server
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 2xxx: Permission errors
//! - 4xxx: Transaction errors
//! - 5xxx: Attachment / storage errors
//! - 6xxx: Anchoring / ledger errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility (Rust, TypeScript, etc.)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,
    /// Invalid format
    InvalidFormat = 6,
    /// Required field missing
    RequiredField = 7,
    /// Value out of range
    ValueOutOfRange = 8,

    // ==================== 2xxx: Permission ====================
    /// Permission denied
    PermissionDenied = 2001,
    /// Caller is not a member of the owning organization
    NotOrgMember = 2002,

    // ==================== 4xxx: Transaction ====================
    /// Transaction not found
    TransactionNotFound = 4001,
    /// Transaction is approved and its critical fields are immutable
    TransactionApproved = 4002,
    /// Unknown transaction type
    InvalidTransactionType = 4003,
    /// Transaction date could not be parsed
    InvalidTransactionDate = 4004,

    // ==================== 5xxx: Attachment / Storage ====================
    /// Blob store write failed
    StorageFailed = 5001,
    /// Stream read failed while hashing
    IoFailed = 5002,
    /// Attachment not found
    AttachmentNotFound = 5003,

    // ==================== 6xxx: Anchoring / Ledger ====================
    /// Ledger adapter submit/fetch failed
    LedgerFailed = 6001,
    /// Anchor record not found
    AnchorNotFound = 6002,
    /// Anchoring job could not be enqueued
    EnqueueFailed = 6003,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Value has no canonical serialized form
    UnsupportedType = 9003,
}

impl ErrorCode {
    /// Get the numeric code
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Whether this code represents success
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Get the default message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            ErrorCode::Success => "Success",
            ErrorCode::Unknown => "Unknown error",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::InvalidFormat => "Invalid format",
            ErrorCode::RequiredField => "Required field missing",
            ErrorCode::ValueOutOfRange => "Value out of range",

            ErrorCode::PermissionDenied => "Permission denied",
            ErrorCode::NotOrgMember => "Not a member of this organization",

            ErrorCode::TransactionNotFound => "Transaction not found",
            ErrorCode::TransactionApproved => "Approved transactions are immutable",
            ErrorCode::InvalidTransactionType => "Unknown transaction type",
            ErrorCode::InvalidTransactionDate => "Invalid transaction date",

            ErrorCode::StorageFailed => "Blob store operation failed",
            ErrorCode::IoFailed => "Stream read failed",
            ErrorCode::AttachmentNotFound => "Attachment not found",

            ErrorCode::LedgerFailed => "Ledger adapter operation failed",
            ErrorCode::AnchorNotFound => "Anchor record not found",
            ErrorCode::EnqueueFailed => "Failed to enqueue anchoring job",

            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::UnsupportedType => "Value has no canonical form",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code as u16
    }
}

/// Error returned when converting an unknown u16 into an [`ErrorCode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            4 => Ok(ErrorCode::AlreadyExists),
            5 => Ok(ErrorCode::InvalidRequest),
            6 => Ok(ErrorCode::InvalidFormat),
            7 => Ok(ErrorCode::RequiredField),
            8 => Ok(ErrorCode::ValueOutOfRange),

            // Permission
            2001 => Ok(ErrorCode::PermissionDenied),
            2002 => Ok(ErrorCode::NotOrgMember),

            // Transaction
            4001 => Ok(ErrorCode::TransactionNotFound),
            4002 => Ok(ErrorCode::TransactionApproved),
            4003 => Ok(ErrorCode::InvalidTransactionType),
            4004 => Ok(ErrorCode::InvalidTransactionDate),

            // Attachment / Storage
            5001 => Ok(ErrorCode::StorageFailed),
            5002 => Ok(ErrorCode::IoFailed),
            5003 => Ok(ErrorCode::AttachmentNotFound),

            // Anchoring / Ledger
            6001 => Ok(ErrorCode::LedgerFailed),
            6002 => Ok(ErrorCode::AnchorNotFound),
            6003 => Ok(ErrorCode::EnqueueFailed),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),
            9003 => Ok(ErrorCode::UnsupportedType),

            other => Err(InvalidErrorCode(other)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{:04}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_values() {
        assert_eq!(ErrorCode::Success.code(), 0);
        assert_eq!(ErrorCode::ValidationFailed.code(), 2);
        assert_eq!(ErrorCode::PermissionDenied.code(), 2001);
        assert_eq!(ErrorCode::TransactionApproved.code(), 4002);
        assert_eq!(ErrorCode::LedgerFailed.code(), 6001);
        assert_eq!(ErrorCode::DatabaseError.code(), 9002);
    }

    #[test]
    fn test_try_from_roundtrip() {
        let codes = [
            ErrorCode::Success,
            ErrorCode::NotFound,
            ErrorCode::TransactionApproved,
            ErrorCode::StorageFailed,
            ErrorCode::EnqueueFailed,
            ErrorCode::UnsupportedType,
        ];
        for code in codes {
            assert_eq!(ErrorCode::try_from(code.code()), Ok(code));
        }
    }

    #[test]
    fn test_try_from_invalid() {
        assert_eq!(ErrorCode::try_from(7777), Err(InvalidErrorCode(7777)));
    }

    #[test]
    fn test_serialize_as_u16() {
        let json = serde_json::to_string(&ErrorCode::TransactionApproved).unwrap();
        assert_eq!(json, "4002");
        let back: ErrorCode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ErrorCode::TransactionApproved);
    }

    #[test]
    fn test_display() {
        assert_eq!(ErrorCode::Success.to_string(), "E0000");
        assert_eq!(ErrorCode::PermissionDenied.to_string(), "E2001");
    }
}
