//! External ledger adapter
//!
//! The contract this system expects from the append-only chain:
//! submit a digest, get a receipt; use the receipt to look the digest
//! up again later. The chain itself (consensus, finality) is out of
//! scope and treated as best-effort.

use async_trait::async_trait;
use shared::{AppError, AppResult};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

/// Receipt returned by a successful digest submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerReceipt {
    pub ledger_tx_id: String,
    pub block_ref: String,
}

/// Adapter over the external append-only ledger
#[async_trait]
pub trait LedgerAdapter: Send + Sync {
    /// Submit a sealing digest; may be slow, may fail.
    ///
    /// Submitting the same digest twice must be idempotent — the second
    /// call returns the receipt of the first.
    async fn submit(&self, digest_hex: &str) -> AppResult<LedgerReceipt>;

    /// Fetch the digest recorded under a receipt's transaction id.
    /// `None` means the ledger has no value for that id.
    async fn fetch(&self, ledger_tx_id: &str) -> AppResult<Option<String>>;
}

#[derive(Default)]
struct MockLedgerState {
    /// digest -> receipt (idempotent submits)
    receipts: HashMap<String, LedgerReceipt>,
    /// ledger_tx_id -> digest
    entries: HashMap<String, String>,
}

/// In-memory ledger used in development and tests
///
/// Mirrors the contract of a real chain adapter closely enough for the
/// verification protocol: submits are idempotent per digest, fetches
/// return exactly what was recorded.
#[derive(Default)]
pub struct MockLedger {
    state: Mutex<MockLedgerState>,
    fail_submissions: std::sync::atomic::AtomicBool,
}

impl MockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent submit fail (simulates chain outage).
    pub fn set_fail_submissions(&self, fail: bool) {
        self.fail_submissions
            .store(fail, std::sync::atomic::Ordering::SeqCst);
    }

    /// Overwrite the digest recorded under a ledger transaction id.
    ///
    /// Only useful for exercising the CHAIN_MISMATCH verdict.
    pub fn overwrite_entry(&self, ledger_tx_id: &str, digest_hex: &str) {
        let mut state = self.state.lock().expect("mock ledger lock poisoned");
        state
            .entries
            .insert(ledger_tx_id.to_string(), digest_hex.to_string());
    }
}

#[async_trait]
impl LedgerAdapter for MockLedger {
    async fn submit(&self, digest_hex: &str) -> AppResult<LedgerReceipt> {
        if self.fail_submissions.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(AppError::ledger("Ledger endpoint unavailable"));
        }

        let mut state = self.state.lock().expect("mock ledger lock poisoned");
        if let Some(receipt) = state.receipts.get(digest_hex) {
            return Ok(receipt.clone());
        }

        let receipt = LedgerReceipt {
            ledger_tx_id: format!("0x{}", Uuid::new_v4().simple()),
            block_ref: format!("0x{}", Uuid::new_v4().simple()),
        };
        state
            .entries
            .insert(receipt.ledger_tx_id.clone(), digest_hex.to_string());
        state
            .receipts
            .insert(digest_hex.to_string(), receipt.clone());
        Ok(receipt)
    }

    async fn fetch(&self, ledger_tx_id: &str) -> AppResult<Option<String>> {
        let state = self.state.lock().expect("mock ledger lock poisoned");
        Ok(state.entries.get(ledger_tx_id).cloned())
    }
}
