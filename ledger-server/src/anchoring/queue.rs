//! redb-based durable anchoring queue
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `pending_anchors` | `transaction_id` | `AnchorJob` | Jobs awaiting submission |
//! | `dead_letter` | `transaction_id` | `DeadLetterJob` | Permanently failed jobs |
//!
//! Keying by transaction id makes enqueue idempotent: re-enqueueing the
//! same transaction (reconciliation sweep, re-anchor after update)
//! replaces the entry instead of duplicating it.
//!
//! # Durability
//!
//! redb commits with `Durability::Immediate` by default — a job that
//! was enqueued survives process restart and power loss.

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Notify;

/// Jobs awaiting ledger submission: key = transaction_id, value = JSON AnchorJob
const PENDING_ANCHORS_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("pending_anchors");

/// Permanently failed jobs: key = transaction_id, value = JSON DeadLetterJob
const DEAD_LETTER_TABLE: TableDefinition<i64, &[u8]> = TableDefinition::new("dead_letter");

/// Queue error types
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type QueueResult<T> = Result<T, QueueError>;

impl From<QueueError> for shared::AppError {
    fn from(err: QueueError) -> Self {
        shared::AppError::with_message(shared::ErrorCode::EnqueueFailed, err.to_string())
    }
}

/// An anchoring job: submit this digest for this transaction
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AnchorJob {
    pub transaction_id: i64,
    pub sealing_digest: String,
    pub created_at: i64,
    pub retry_count: u32,
    pub last_error: Option<String>,
}

/// A job that exhausted its retries (kept for manual recovery)
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DeadLetterJob {
    pub transaction_id: i64,
    pub sealing_digest: String,
    pub created_at: i64,
    pub failed_at: i64,
    pub retry_count: u32,
    pub last_error: String,
}

/// Durable anchoring queue backed by redb
#[derive(Clone)]
pub struct AnchorQueue {
    db: Arc<Database>,
    notify: Arc<Notify>,
}

impl AnchorQueue {
    /// Open or create the queue database at the given path
    pub fn open(path: impl AsRef<Path>) -> QueueResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open an in-memory queue (for tests)
    pub fn open_in_memory() -> QueueResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> QueueResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(PENDING_ANCHORS_TABLE)?;
            let _ = write_txn.open_table(DEAD_LETTER_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self {
            db: Arc::new(db),
            notify: Arc::new(Notify::new()),
        })
    }

    /// Enqueue an anchoring job; replaces any existing job for the same
    /// transaction (fresh retry budget).
    pub fn enqueue(&self, transaction_id: i64, sealing_digest: &str) -> QueueResult<()> {
        let job = AnchorJob {
            transaction_id,
            sealing_digest: sealing_digest.to_string(),
            created_at: shared::util::now_millis(),
            retry_count: 0,
            last_error: None,
        };
        let value = serde_json::to_vec(&job)?;

        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(PENDING_ANCHORS_TABLE)?;
            table.insert(transaction_id, value.as_slice())?;
        }
        txn.commit()?;

        self.notify.notify_one();
        Ok(())
    }

    /// Wake when a new job was enqueued (worker side).
    pub async fn wait_for_work(&self) {
        self.notify.notified().await;
    }

    /// All pending jobs, oldest key first
    pub fn pending_jobs(&self) -> QueueResult<Vec<AnchorJob>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PENDING_ANCHORS_TABLE)?;

        let mut jobs = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            let job: AnchorJob = serde_json::from_slice(value.value())?;
            jobs.push(job);
        }
        Ok(jobs)
    }

    /// Whether a pending job exists for this transaction
    pub fn contains(&self, transaction_id: i64) -> QueueResult<bool> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PENDING_ANCHORS_TABLE)?;
        Ok(table.get(transaction_id)?.is_some())
    }

    /// Ack: remove the job after successful processing
    pub fn complete(&self, transaction_id: i64) -> QueueResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(PENDING_ANCHORS_TABLE)?;
            table.remove(transaction_id)?;
        }
        txn.commit()?;
        Ok(())
    }

    /// Ack, but only while the stored job still carries this digest.
    ///
    /// A concurrent re-seal replaces the entry with a job for the new
    /// digest; that job must survive an ack for the superseded one.
    pub fn complete_if_digest(
        &self,
        transaction_id: i64,
        sealing_digest: &str,
    ) -> QueueResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(PENDING_ANCHORS_TABLE)?;

            let matches = if let Some(value) = table.get(transaction_id)? {
                let job: AnchorJob = serde_json::from_slice(value.value())?;
                job.sealing_digest == sealing_digest
            } else {
                false
            };

            if matches {
                table.remove(transaction_id)?;
            }
        }
        txn.commit()?;
        Ok(())
    }

    /// Nack: record the failure, increment the retry count
    pub fn fail(&self, transaction_id: i64, error: &str) -> QueueResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(PENDING_ANCHORS_TABLE)?;

            // Read and clone first to avoid borrow conflict
            let job_opt = if let Some(value) = table.get(transaction_id)? {
                let job: AnchorJob = serde_json::from_slice(value.value())?;
                Some(job)
            } else {
                None
            };

            if let Some(mut job) = job_opt {
                job.retry_count += 1;
                job.last_error = Some(error.to_string());
                let new_value = serde_json::to_vec(&job)?;
                table.insert(transaction_id, new_value.as_slice())?;
            }
        }
        txn.commit()?;
        Ok(())
    }

    /// Move a job from pending to the dead letter queue
    pub fn move_to_dead_letter(&self, transaction_id: i64, error: &str) -> QueueResult<()> {
        let txn = self.db.begin_write()?;
        {
            let mut pending_table = txn.open_table(PENDING_ANCHORS_TABLE)?;
            let mut dead_letter_table = txn.open_table(DEAD_LETTER_TABLE)?;

            let job_opt = if let Some(value) = pending_table.get(transaction_id)? {
                let job: AnchorJob = serde_json::from_slice(value.value())?;
                Some(job)
            } else {
                None
            };

            if let Some(job) = job_opt {
                let dead = DeadLetterJob {
                    transaction_id: job.transaction_id,
                    sealing_digest: job.sealing_digest,
                    created_at: job.created_at,
                    failed_at: shared::util::now_millis(),
                    retry_count: job.retry_count,
                    last_error: error.to_string(),
                };
                let value = serde_json::to_vec(&dead)?;
                dead_letter_table.insert(transaction_id, value.as_slice())?;
                pending_table.remove(transaction_id)?;
            }
        }
        txn.commit()?;
        Ok(())
    }

    /// All dead letter entries
    pub fn dead_letters(&self) -> QueueResult<Vec<DeadLetterJob>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(DEAD_LETTER_TABLE)?;

        let mut entries = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            let entry: DeadLetterJob = serde_json::from_slice(value.value())?;
            entries.push(entry);
        }
        Ok(entries)
    }

    /// Move dead letter entries back to pending with a fresh retry
    /// budget. Returns how many were recovered.
    pub fn recover_dead_letters(&self) -> QueueResult<usize> {
        let txn = self.db.begin_write()?;
        let mut recovered = 0;
        {
            let mut pending_table = txn.open_table(PENDING_ANCHORS_TABLE)?;
            let mut dead_letter_table = txn.open_table(DEAD_LETTER_TABLE)?;

            let mut entries: Vec<DeadLetterJob> = Vec::new();
            for result in dead_letter_table.iter()? {
                let (_key, value) = result?;
                entries.push(serde_json::from_slice(value.value())?);
            }

            for entry in entries {
                let job = AnchorJob {
                    transaction_id: entry.transaction_id,
                    sealing_digest: entry.sealing_digest,
                    created_at: shared::util::now_millis(),
                    retry_count: 0,
                    last_error: Some(entry.last_error),
                };
                let value = serde_json::to_vec(&job)?;
                pending_table.insert(entry.transaction_id, value.as_slice())?;
                dead_letter_table.remove(entry.transaction_id)?;
                recovered += 1;
            }
        }
        txn.commit()?;

        if recovered > 0 {
            self.notify.notify_one();
        }
        Ok(recovered)
    }
}
