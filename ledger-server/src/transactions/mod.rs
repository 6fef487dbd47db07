//! Transaction service
//!
//! Create / read / update / delete for financial transactions, plus the
//! sealing flow that binds each record to its integrity digest. Callers
//! are expected to have authenticated and authorized the actor already;
//! the service only enforces record-level rules (approved records are
//! immutable, critical-field edits re-seal and re-anchor).

mod payload;

pub use payload::{format_utc_millis, integrity_payload, sealing_digest};

use sqlx::SqlitePool;
use tracing::{error, info, warn};

use shared::models::{
    AnchorRecord, AnchorStatus, Attachment, Transaction, TransactionDetail, TransactionStatus,
    TransactionUpdate,
};
use shared::models::{TransactionCreate, UploadedFile};
use shared::util::{now_millis, snowflake_id};
use shared::{AppError, AppResult, ErrorCode};

use crate::anchoring::AnchorQueue;
use crate::attachments::AttachmentIngestor;
use crate::db::repository::{anchor as anchor_repo, transaction as tx_repo};
use crate::utils::validation;

pub struct TransactionService {
    pool: SqlitePool,
    ingestor: AttachmentIngestor,
    queue: AnchorQueue,
}

impl TransactionService {
    pub fn new(pool: SqlitePool, ingestor: AttachmentIngestor, queue: AnchorQueue) -> Self {
        Self {
            pool,
            ingestor,
            queue,
        }
    }

    /// Create a transaction, seal it, and schedule anchoring.
    ///
    /// Transaction row, attachment rows and the PENDING anchor record
    /// commit in a single database transaction. Enqueueing the anchor
    /// job happens after commit and is allowed to fail — the worker's
    /// stale-anchor sweep will pick the record up later.
    pub async fn create_transaction(
        &self,
        actor_id: i64,
        input: TransactionCreate,
        files: Vec<UploadedFile>,
    ) -> AppResult<TransactionDetail> {
        validation::validate_amount(&input.amount)?;
        validation::validate_description(&input.description)?;
        let date_ms = validation::parse_transaction_date(&input.date)?;

        let drafts = self.ingestor.ingest(files).await?;

        let now = now_millis();
        let tx_id = snowflake_id();

        let attachments: Vec<Attachment> = drafts
            .into_iter()
            .map(|d| Attachment {
                id: snowflake_id(),
                transaction_id: tx_id,
                filename: d.filename,
                locator: d.locator,
                content_digest: d.content_digest,
                created_at: now,
            })
            .collect();

        let digests = attachments
            .iter()
            .map(|a| a.content_digest.clone())
            .collect();
        let sealing = sealing_digest(
            actor_id,
            input.org_id,
            &input.amount,
            input.tx_type,
            date_ms,
            digests,
        )?;

        let transaction = Transaction {
            id: tx_id,
            org_id: input.org_id,
            creator_id: actor_id,
            project_id: input.project_id,
            category_id: input.category_id,
            amount: input.amount,
            tx_type: input.tx_type,
            description: input.description,
            transaction_date: date_ms,
            status: TransactionStatus::Pending,
            sealing_digest: sealing.clone(),
            created_at: now,
            updated_at: now,
        };
        let anchor = AnchorRecord {
            id: snowflake_id(),
            transaction_id: tx_id,
            sealing_digest: sealing.clone(),
            ledger_tx_id: None,
            block_ref: None,
            status: AnchorStatus::Pending,
            confirmed_at: None,
            created_at: now,
        };

        tx_repo::create_with_anchor(&self.pool, &transaction, &attachments, &anchor).await?;

        // 入队失败不回滚：扫描任务会补投
        if let Err(e) = self.queue.enqueue(tx_id, &sealing) {
            error!(transaction_id = tx_id, error = %e, "Failed to enqueue anchor job");
        }

        info!(
            transaction_id = tx_id,
            org_id = input.org_id,
            attachments = attachments.len(),
            "Transaction sealed"
        );

        Ok(TransactionDetail {
            transaction,
            attachments,
            anchor: Some(anchor),
        })
    }

    pub async fn get_transaction(&self, id: i64) -> AppResult<TransactionDetail> {
        tx_repo::find_detail(&self.pool, id)
            .await?
            .ok_or_else(|| AppError::with_message(ErrorCode::TransactionNotFound, "Transaction not found"))
    }

    /// All transactions for an organization, newest transaction date first
    pub async fn list_transactions(&self, org_id: i64) -> AppResult<Vec<Transaction>> {
        Ok(tx_repo::list_by_org(&self.pool, org_id).await?)
    }

    /// Apply a partial update.
    ///
    /// Approved transactions reject every edit. Edits touching amount,
    /// type or date invalidate the seal: the digest is recomputed over
    /// the new values (attachment digests are unchanged), the old anchor
    /// record is replaced with a fresh PENDING one and a new anchor job
    /// is enqueued.
    pub async fn update_transaction(
        &self,
        actor_id: i64,
        id: i64,
        patch: TransactionUpdate,
    ) -> AppResult<TransactionDetail> {
        let detail = self.get_transaction(id).await?;

        if detail.transaction.status == TransactionStatus::Approved {
            return Err(AppError::with_message(
                ErrorCode::TransactionApproved,
                "Approved transactions cannot be modified",
            ));
        }

        let critical = patch.touches_critical_fields();
        let mut merged = detail.transaction.clone();

        if let Some(amount) = patch.amount {
            validation::validate_amount(&amount)?;
            merged.amount = amount;
        }
        if let Some(tx_type) = patch.tx_type {
            merged.tx_type = tx_type;
        }
        if let Some(ref date) = patch.date {
            merged.transaction_date = validation::parse_transaction_date(date)?;
        }
        if let Some(description) = patch.description {
            validation::validate_description(&description)?;
            merged.description = description;
        }
        if let Some(project_id) = patch.project_id {
            merged.project_id = Some(project_id);
        }
        if let Some(category_id) = patch.category_id {
            merged.category_id = Some(category_id);
        }
        merged.updated_at = now_millis();

        if critical {
            let digests = detail
                .attachments
                .iter()
                .map(|a| a.content_digest.clone())
                .collect();
            // 重新封存：actor 固定取创建者，保证校验时可复算
            merged.sealing_digest = sealing_digest(
                merged.creator_id,
                merged.org_id,
                &merged.amount,
                merged.tx_type,
                merged.transaction_date,
                digests,
            )?;

            let anchor = AnchorRecord {
                id: snowflake_id(),
                transaction_id: id,
                sealing_digest: merged.sealing_digest.clone(),
                ledger_tx_id: None,
                block_ref: None,
                status: AnchorStatus::Pending,
                confirmed_at: None,
                created_at: merged.updated_at,
            };
            tx_repo::update_with_reanchor(&self.pool, &merged, Some(&anchor)).await?;

            if let Err(e) = self.queue.enqueue(id, &merged.sealing_digest) {
                error!(transaction_id = id, error = %e, "Failed to enqueue re-anchor job");
            }
            info!(
                transaction_id = id,
                actor_id, "Transaction re-sealed after critical-field update"
            );
        } else {
            tx_repo::update_with_reanchor(&self.pool, &merged, None).await?;
        }

        self.get_transaction(id).await
    }

    /// Approve or reject a pending transaction
    pub async fn set_transaction_status(
        &self,
        actor_id: i64,
        id: i64,
        status: TransactionStatus,
    ) -> AppResult<TransactionDetail> {
        let detail = self.get_transaction(id).await?;
        if detail.transaction.status == TransactionStatus::Approved {
            return Err(AppError::with_message(
                ErrorCode::TransactionApproved,
                "Approved transactions cannot be modified",
            ));
        }
        tx_repo::set_status(&self.pool, id, status).await?;
        info!(transaction_id = id, actor_id, status = %status.as_str(), "Transaction status changed");
        self.get_transaction(id).await
    }

    /// Delete a transaction with its attachments and anchor record
    pub async fn delete_transaction(&self, actor_id: i64, id: i64) -> AppResult<()> {
        let detail = self.get_transaction(id).await?;
        if detail.transaction.status == TransactionStatus::Approved {
            return Err(AppError::with_message(
                ErrorCode::TransactionApproved,
                "Approved transactions cannot be deleted",
            ));
        }

        tx_repo::delete_cascade(&self.pool, id).await?;
        // 队列里可能还挂着它的锚定任务
        if let Err(e) = self.queue.complete(id) {
            warn!(transaction_id = id, error = %e, "Failed to drop queued anchor job");
        }
        info!(transaction_id = id, actor_id, "Transaction deleted");
        Ok(())
    }

    /// Current anchor state for a transaction, if any anchoring was attempted
    pub async fn anchor_record(&self, id: i64) -> AppResult<Option<AnchorRecord>> {
        Ok(anchor_repo::find_by_transaction(&self.pool, id).await?)
    }
}
