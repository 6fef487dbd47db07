//! Anchor Record Repository
//!
//! Status updates are compare-and-set on (transaction_id, digest,
//! status) so a stale worker attempt can never overwrite a CONFIRMED
//! record and a job for a superseded digest can never confirm the
//! current attempt.

use super::RepoResult;
use shared::models::{AnchorRecord, AnchorStatus};
use sqlx::SqlitePool;

pub async fn find_by_transaction(
    pool: &SqlitePool,
    transaction_id: i64,
) -> RepoResult<Option<AnchorRecord>> {
    let anchor = sqlx::query_as::<_, AnchorRecord>(
        "SELECT id, transaction_id, sealing_digest, ledger_tx_id, block_ref, status, \
         confirmed_at, created_at FROM anchor_record WHERE transaction_id = ?",
    )
    .bind(transaction_id)
    .fetch_optional(pool)
    .await?;
    Ok(anchor)
}

/// CAS: PENDING → CONFIRMED for the given digest.
///
/// Returns false when nothing matched (record gone, digest superseded,
/// or already in a terminal state) — the caller drops the job.
pub async fn mark_confirmed(
    pool: &SqlitePool,
    transaction_id: i64,
    sealing_digest: &str,
    ledger_tx_id: &str,
    block_ref: &str,
    confirmed_at: i64,
) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE anchor_record SET status = ?, ledger_tx_id = ?, block_ref = ?, confirmed_at = ? \
         WHERE transaction_id = ? AND sealing_digest = ? AND status = ?",
    )
    .bind(AnchorStatus::Confirmed)
    .bind(ledger_tx_id)
    .bind(block_ref)
    .bind(confirmed_at)
    .bind(transaction_id)
    .bind(sealing_digest)
    .bind(AnchorStatus::Pending)
    .execute(pool)
    .await?;
    Ok(rows.rows_affected() > 0)
}

/// CAS: PENDING → FAILED for the given digest.
///
/// A CONFIRMED record is never demoted by a late failure.
pub async fn mark_failed(
    pool: &SqlitePool,
    transaction_id: i64,
    sealing_digest: &str,
) -> RepoResult<bool> {
    let rows = sqlx::query(
        "UPDATE anchor_record SET status = ? \
         WHERE transaction_id = ? AND sealing_digest = ? AND status = ?",
    )
    .bind(AnchorStatus::Failed)
    .bind(transaction_id)
    .bind(sealing_digest)
    .bind(AnchorStatus::Pending)
    .execute(pool)
    .await?;
    Ok(rows.rows_affected() > 0)
}

/// Replace a FAILED attempt with a fresh PENDING one for the same digest.
///
/// A record never transitions backward out of a terminal state; a
/// redelivered job starts a new attempt row instead.
pub async fn replace_failed_attempt(
    pool: &SqlitePool,
    transaction_id: i64,
    sealing_digest: &str,
    new_id: i64,
    now: i64,
) -> RepoResult<bool> {
    let mut tx = pool.begin().await?;

    let rows = sqlx::query(
        "DELETE FROM anchor_record WHERE transaction_id = ? AND sealing_digest = ? AND status = ?",
    )
    .bind(transaction_id)
    .bind(sealing_digest)
    .bind(AnchorStatus::Failed)
    .execute(&mut *tx)
    .await?;

    if rows.rows_affected() == 0 {
        // Current attempt is not a matching FAILED row; nothing to do
        return Ok(false);
    }

    sqlx::query(
        "INSERT INTO anchor_record (id, transaction_id, sealing_digest, ledger_tx_id, block_ref, \
         status, confirmed_at, created_at) VALUES (?, ?, ?, NULL, NULL, ?, NULL, ?)",
    )
    .bind(new_id)
    .bind(transaction_id)
    .bind(sealing_digest)
    .bind(AnchorStatus::Pending)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(true)
}

/// PENDING anchors created before `cutoff_ms` — candidates for the
/// reconciliation sweep when their queue entry was lost.
pub async fn find_stale_pending(
    pool: &SqlitePool,
    cutoff_ms: i64,
) -> RepoResult<Vec<(i64, String)>> {
    let rows: Vec<(i64, String)> = sqlx::query_as(
        "SELECT transaction_id, sealing_digest FROM anchor_record \
         WHERE status = ? AND created_at < ?",
    )
    .bind(AnchorStatus::Pending)
    .bind(cutoff_ms)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
