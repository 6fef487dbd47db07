//! Transaction Repository
//!
//! Owns the atomic multi-row units of the record builder: a create
//! inserts the transaction, its attachments and its anchor record in
//! one SQLite transaction; a delete removes all three the same way.

use super::{RepoError, RepoResult};
use rust_decimal::Decimal;
use shared::models::{
    AnchorRecord, Attachment, Transaction, TransactionDetail, TransactionStatus, TransactionType,
};
use sqlx::SqlitePool;
use std::str::FromStr;

/// Raw row; amount is TEXT in SQLite to keep the sealed value exact
#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    id: i64,
    org_id: i64,
    creator_id: i64,
    project_id: Option<i64>,
    category_id: Option<i64>,
    amount: String,
    tx_type: TransactionType,
    description: String,
    transaction_date: i64,
    status: TransactionStatus,
    sealing_digest: String,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = RepoError;

    fn try_from(r: TransactionRow) -> Result<Self, Self::Error> {
        let amount = Decimal::from_str(&r.amount)
            .map_err(|e| RepoError::Corrupt(format!("transaction {} amount: {e}", r.id)))?;
        Ok(Transaction {
            id: r.id,
            org_id: r.org_id,
            creator_id: r.creator_id,
            project_id: r.project_id,
            category_id: r.category_id,
            amount,
            tx_type: r.tx_type,
            description: r.description,
            transaction_date: r.transaction_date,
            status: r.status,
            sealing_digest: r.sealing_digest,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

const SELECT_COLUMNS: &str = "id, org_id, creator_id, project_id, category_id, amount, tx_type, \
     description, transaction_date, status, sealing_digest, created_at, updated_at";

/// Insert transaction + attachments + anchor record as one atomic unit.
///
/// All three succeed or none persist.
pub async fn create_with_anchor(
    pool: &SqlitePool,
    transaction: &Transaction,
    attachments: &[Attachment],
    anchor: &AnchorRecord,
) -> RepoResult<()> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        "INSERT INTO ledger_transaction (id, org_id, creator_id, project_id, category_id, amount, \
         tx_type, description, transaction_date, status, sealing_digest, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(transaction.id)
    .bind(transaction.org_id)
    .bind(transaction.creator_id)
    .bind(transaction.project_id)
    .bind(transaction.category_id)
    .bind(transaction.amount.to_string())
    .bind(transaction.tx_type)
    .bind(&transaction.description)
    .bind(transaction.transaction_date)
    .bind(transaction.status)
    .bind(&transaction.sealing_digest)
    .bind(transaction.created_at)
    .bind(transaction.updated_at)
    .execute(&mut *tx)
    .await?;

    for attachment in attachments {
        sqlx::query(
            "INSERT INTO attachment (id, transaction_id, filename, locator, content_digest, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(attachment.id)
        .bind(attachment.transaction_id)
        .bind(&attachment.filename)
        .bind(&attachment.locator)
        .bind(&attachment.content_digest)
        .bind(attachment.created_at)
        .execute(&mut *tx)
        .await?;
    }

    insert_anchor(&mut tx, anchor).await?;

    tx.commit().await?;
    Ok(())
}

async fn insert_anchor(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    anchor: &AnchorRecord,
) -> RepoResult<()> {
    sqlx::query(
        "INSERT INTO anchor_record (id, transaction_id, sealing_digest, ledger_tx_id, block_ref, \
         status, confirmed_at, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(anchor.id)
    .bind(anchor.transaction_id)
    .bind(&anchor.sealing_digest)
    .bind(&anchor.ledger_tx_id)
    .bind(&anchor.block_ref)
    .bind(anchor.status)
    .bind(anchor.confirmed_at)
    .bind(anchor.created_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Transaction>> {
    let row = sqlx::query_as::<_, TransactionRow>(&format!(
        "SELECT {SELECT_COLUMNS} FROM ledger_transaction WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    row.map(Transaction::try_from).transpose()
}

/// Transaction with its attachments and anchor record
pub async fn find_detail(pool: &SqlitePool, id: i64) -> RepoResult<Option<TransactionDetail>> {
    let Some(transaction) = find_by_id(pool, id).await? else {
        return Ok(None);
    };

    let attachments = find_attachments(pool, id).await?;
    let anchor = super::anchor::find_by_transaction(pool, id).await?;

    Ok(Some(TransactionDetail {
        transaction,
        attachments,
        anchor,
    }))
}

pub async fn find_attachments(pool: &SqlitePool, transaction_id: i64) -> RepoResult<Vec<Attachment>> {
    let attachments = sqlx::query_as::<_, Attachment>(
        "SELECT id, transaction_id, filename, locator, content_digest, created_at \
         FROM attachment WHERE transaction_id = ? ORDER BY id",
    )
    .bind(transaction_id)
    .fetch_all(pool)
    .await?;
    Ok(attachments)
}

/// Org dashboard scan, newest transactions first
pub async fn list_by_org(pool: &SqlitePool, org_id: i64) -> RepoResult<Vec<Transaction>> {
    let rows = sqlx::query_as::<_, TransactionRow>(&format!(
        "SELECT {SELECT_COLUMNS} FROM ledger_transaction WHERE org_id = ? \
         ORDER BY transaction_date DESC"
    ))
    .bind(org_id)
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(Transaction::try_from).collect()
}

/// Persist a merged update; when `new_anchor` is set (critical-field
/// patch), the old anchor attempt is replaced in the same transaction.
pub async fn update_with_reanchor(
    pool: &SqlitePool,
    transaction: &Transaction,
    new_anchor: Option<&AnchorRecord>,
) -> RepoResult<()> {
    let mut tx = pool.begin().await?;

    let rows = sqlx::query(
        "UPDATE ledger_transaction SET project_id = ?, category_id = ?, amount = ?, tx_type = ?, \
         description = ?, transaction_date = ?, sealing_digest = ?, updated_at = ? WHERE id = ?",
    )
    .bind(transaction.project_id)
    .bind(transaction.category_id)
    .bind(transaction.amount.to_string())
    .bind(transaction.tx_type)
    .bind(&transaction.description)
    .bind(transaction.transaction_date)
    .bind(&transaction.sealing_digest)
    .bind(transaction.updated_at)
    .bind(transaction.id)
    .execute(&mut *tx)
    .await?;
    if rows.rows_affected() == 0 {
        return Err(RepoError::NotFound(format!(
            "Transaction {} not found",
            transaction.id
        )));
    }

    if let Some(anchor) = new_anchor {
        sqlx::query("DELETE FROM anchor_record WHERE transaction_id = ?")
            .bind(transaction.id)
            .execute(&mut *tx)
            .await?;
        insert_anchor(&mut tx, anchor).await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Lifecycle status change (driven by the out-of-scope approval workflow)
pub async fn set_status(
    pool: &SqlitePool,
    id: i64,
    status: TransactionStatus,
) -> RepoResult<bool> {
    let rows = sqlx::query("UPDATE ledger_transaction SET status = ?, updated_at = ? WHERE id = ?")
        .bind(status)
        .bind(shared::util::now_millis())
        .bind(id)
        .execute(pool)
        .await?;
    Ok(rows.rows_affected() > 0)
}

/// Remove attachments, anchor record and the transaction row as one
/// atomic unit. Returns false if the transaction did not exist.
pub async fn delete_cascade(pool: &SqlitePool, id: i64) -> RepoResult<bool> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM attachment WHERE transaction_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM anchor_record WHERE transaction_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    let rows = sqlx::query("DELETE FROM ledger_transaction WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(rows.rows_affected() > 0)
}
