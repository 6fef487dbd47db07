//! Tamper-detection verifier
//!
//! Recomputes a transaction's sealing digest from the rows as they
//! exist right now and compares it against the stored digest and the
//! value confirmed on the external ledger. Strictly read-only: a
//! verdict never mutates the database, so verifying twice in a row
//! always yields the same answer.
//!
//! Verdict ladder:
//! 1. no confirmed anchor → unverifiable (`PENDING_ANCHOR` / `FAILED_ANCHOR`)
//! 2. recomputed digest ≠ stored digest → `TAMPERED`
//! 3. ledger entry missing or ≠ stored digest → `CHAIN_MISMATCH`
//! 4. all three agree → `VERIFIED`

use std::sync::Arc;

use sqlx::SqlitePool;
use tracing::{debug, warn};

use shared::models::{AnchorStatus, Verdict, VerifyStatus};
use shared::{AppError, AppResult, ErrorCode};

use crate::db::repository::{anchor as anchor_repo, transaction as tx_repo};
use crate::ledger::LedgerAdapter;
use crate::transactions::sealing_digest;

pub struct Verifier {
    pool: SqlitePool,
    ledger: Arc<dyn LedgerAdapter>,
}

impl Verifier {
    pub fn new(pool: SqlitePool, ledger: Arc<dyn LedgerAdapter>) -> Self {
        Self { pool, ledger }
    }

    pub async fn verify(&self, transaction_id: i64) -> AppResult<Verdict> {
        let Some(transaction) = tx_repo::find_by_id(&self.pool, transaction_id).await? else {
            return Err(AppError::with_message(
                ErrorCode::TransactionNotFound,
                "Transaction not found",
            ));
        };
        let anchor = anchor_repo::find_by_transaction(&self.pool, transaction_id).await?;

        // 没有已确认的锚点就无从比对
        let Some(anchor) = anchor else {
            return Ok(unverifiable(
                transaction_id,
                transaction.sealing_digest,
                VerifyStatus::PendingAnchor,
            ));
        };
        let Some(ledger_tx_id) = anchor.ledger_tx_id.clone() else {
            let status = match anchor.status {
                AnchorStatus::Failed => VerifyStatus::FailedAnchor,
                _ => VerifyStatus::PendingAnchor,
            };
            return Ok(unverifiable(transaction_id, transaction.sealing_digest, status));
        };

        let attachments = tx_repo::find_attachments(&self.pool, transaction_id).await?;
        let digests = attachments
            .iter()
            .map(|a| a.content_digest.clone())
            .collect();
        let recomputed = sealing_digest(
            transaction.creator_id,
            transaction.org_id,
            &transaction.amount,
            transaction.tx_type,
            transaction.transaction_date,
            digests,
        )?;

        if recomputed != transaction.sealing_digest {
            warn!(
                transaction_id,
                stored = %transaction.sealing_digest,
                recomputed = %recomputed,
                "Sealing digest mismatch"
            );
            return Ok(Verdict {
                transaction_id,
                verifiable: true,
                integral: Some(false),
                status: VerifyStatus::Tampered,
                sealing_digest: transaction.sealing_digest,
                ledger_tx_id: Some(ledger_tx_id),
            });
        }

        // A missing ledger entry for a confirmed anchor is itself a mismatch
        let anchored = self.ledger.fetch(&ledger_tx_id).await?;
        let integral = anchored.as_deref() == Some(recomputed.as_str());
        if integral {
            debug!(transaction_id, "Integrity verified");
        } else {
            warn!(transaction_id, ledger_tx_id = %ledger_tx_id, "Ledger entry missing or divergent");
        }

        Ok(Verdict {
            transaction_id,
            verifiable: true,
            integral: Some(integral),
            status: if integral {
                VerifyStatus::Verified
            } else {
                VerifyStatus::ChainMismatch
            },
            sealing_digest: transaction.sealing_digest,
            ledger_tx_id: Some(ledger_tx_id),
        })
    }
}

fn unverifiable(transaction_id: i64, sealing_digest: String, status: VerifyStatus) -> Verdict {
    Verdict {
        transaction_id,
        verifiable: false,
        integral: None,
        status,
        sealing_digest,
        ledger_tx_id: None,
    }
}
