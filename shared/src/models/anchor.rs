//! Anchor Record & Verdict Models
//!
//! An [`AnchorRecord`] tracks one attempt to anchor a transaction's
//! sealing digest on the external ledger. Status only ever moves
//! PENDING → CONFIRMED or PENDING → FAILED; a re-anchor (after a
//! critical-field update) replaces the record with a fresh attempt
//! instead of transitioning backwards.

use serde::{Deserialize, Serialize};

/// Anchoring state of a transaction's sealing digest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
pub enum AnchorStatus {
    Pending,
    Confirmed,
    Failed,
}

impl AnchorStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            AnchorStatus::Pending => "PENDING",
            AnchorStatus::Confirmed => "CONFIRMED",
            AnchorStatus::Failed => "FAILED",
        }
    }
}

impl std::str::FromStr for AnchorStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(AnchorStatus::Pending),
            "CONFIRMED" => Ok(AnchorStatus::Confirmed),
            "FAILED" => Ok(AnchorStatus::Failed),
            other => Err(format!("unknown anchor status: {other}")),
        }
    }
}

/// Anchor record (one-to-one with its transaction)
///
/// Mutated exclusively by the anchoring worker; `ledger_tx_id`,
/// `block_ref` and `confirmed_at` stay null until confirmation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct AnchorRecord {
    pub id: i64,
    pub transaction_id: i64,
    /// The sealing digest this attempt anchors
    pub sealing_digest: String,
    pub ledger_tx_id: Option<String>,
    pub block_ref: Option<String>,
    pub status: AnchorStatus,
    pub confirmed_at: Option<i64>,
    pub created_at: i64,
}

/// Verifier outcome status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerifyStatus {
    /// Anchor not yet confirmed — nothing on the ledger to check against
    PendingAnchor,
    /// Anchoring failed — nothing on the ledger to check against
    FailedAnchor,
    /// Recomputed digest differs from the stored sealing digest
    Tampered,
    /// Stored digest differs from the value recorded on the ledger
    ChainMismatch,
    /// Recomputed, stored and ledger digests all agree
    Verified,
}

/// Verifier result
///
/// `integral` is only meaningful when `verifiable` is true. An
/// integrity mismatch is a normal, expected outcome — never an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub transaction_id: i64,
    /// Whether an anchored value existed to verify against
    pub verifiable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub integral: Option<bool>,
    pub status: VerifyStatus,
    /// The digest currently stored on the transaction
    pub sealing_digest: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ledger_tx_id: Option<String>,
}
