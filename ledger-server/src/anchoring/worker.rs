//! Anchoring worker
//!
//! Consumes anchoring jobs from the durable queue, submits sealing
//! digests to the ledger adapter and settles the matching anchor
//! record. The worker performs no retry loop of its own — failures go
//! back to the queue, whose backoff policy governs redelivery.
//!
//! The periodic scan doubles as the reconciliation sweep: a PENDING
//! anchor whose queue entry was lost (enqueue failed after commit) gets
//! re-enqueued once it is older than the stale threshold.

use super::queue::{AnchorJob, AnchorQueue};
use crate::db::repository::anchor;
use crate::ledger::LedgerAdapter;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;

/// Worker configuration
const MAX_RETRY_COUNT: u32 = 3;
const RETRY_BASE_DELAY_SECS: u64 = 5;
const RETRY_MAX_DELAY_SECS: u64 = 60; // 1 minute max
const QUEUE_SCAN_INTERVAL_SECS: u64 = 30;

/// PENDING anchors older than this with no queue entry are re-enqueued
const STALE_ANCHOR_THRESHOLD_MS: i64 = 5 * 60 * 1000;

/// Worker processing the anchoring queue
pub struct AnchorWorker {
    queue: AnchorQueue,
    pool: SqlitePool,
    ledger: Arc<dyn LedgerAdapter>,
}

impl AnchorWorker {
    pub fn new(queue: AnchorQueue, pool: SqlitePool, ledger: Arc<dyn LedgerAdapter>) -> Self {
        Self { queue, pool, ledger }
    }

    /// Run the worker until the task is aborted.
    ///
    /// Jobs arrive through the queue's wakeup plus a periodic scan that
    /// drives retries and the reconciliation sweep.
    pub async fn run(self) {
        tracing::info!("Anchor worker started");

        // Recover dead letter entries (previously failed jobs) back to pending
        match self.queue.recover_dead_letters() {
            Ok(0) => {}
            Ok(n) => tracing::info!(count = n, "Recovered dead letter jobs to pending queue"),
            Err(e) => tracing::error!(error = %e, "Failed to recover dead letter jobs"),
        }

        // Process whatever survived the last run
        self.process_pending_queue().await;

        let mut scan_interval = tokio::time::interval(Duration::from_secs(QUEUE_SCAN_INTERVAL_SECS));
        scan_interval.tick().await; // first tick fires immediately

        loop {
            tokio::select! {
                _ = self.queue.wait_for_work() => {
                    self.process_pending_queue().await;
                }
                _ = scan_interval.tick() => {
                    self.sweep_stale_anchors().await;
                    self.process_pending_queue().await;
                }
            }
        }
    }

    /// Process all pending jobs that are due
    pub async fn process_pending_queue(&self) {
        let pending = match self.queue.pending_jobs() {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(error = %e, "Failed to read pending anchor jobs");
                return;
            }
        };

        if pending.is_empty() {
            return;
        }

        tracing::debug!(count = pending.len(), "Processing pending anchor jobs");

        for job in pending {
            if self.should_retry(&job) {
                self.process_job(&job).await;
            }
        }
    }

    /// Check if a job is due based on its backoff, dead-lettering jobs
    /// that exhausted their retries
    fn should_retry(&self, job: &AnchorJob) -> bool {
        if job.retry_count >= MAX_RETRY_COUNT {
            tracing::error!(
                transaction_id = job.transaction_id,
                retry_count = job.retry_count,
                last_error = ?job.last_error,
                "Max retry count exceeded, moving anchor job to dead letter queue"
            );
            let error = job.last_error.as_deref().unwrap_or("Unknown error");
            if let Err(e) = self.queue.move_to_dead_letter(job.transaction_id, error) {
                tracing::error!(error = %e, "Failed to move job to dead letter queue");
            }
            return false;
        }

        // First delivery is immediate; redeliveries back off exponentially
        if job.retry_count == 0 {
            return true;
        }
        let delay_secs =
            (RETRY_BASE_DELAY_SECS * 2u64.pow(job.retry_count - 1)).min(RETRY_MAX_DELAY_SECS);
        let retry_after_ms = job.created_at + delay_secs as i64 * 1000;
        shared::util::now_millis() >= retry_after_ms
    }

    /// Submit one job to the ledger and settle its anchor record
    pub async fn process_job(&self, job: &AnchorJob) {
        // A redelivered job whose attempt already settled as FAILED
        // starts a fresh attempt row; records never leave a terminal
        // state backwards.
        if job.retry_count > 0 {
            match anchor::replace_failed_attempt(
                &self.pool,
                job.transaction_id,
                &job.sealing_digest,
                shared::util::snowflake_id(),
                shared::util::now_millis(),
            )
            .await
            {
                Ok(true) => {
                    tracing::debug!(
                        transaction_id = job.transaction_id,
                        "Started fresh anchor attempt for redelivered job"
                    );
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::error!(
                        transaction_id = job.transaction_id,
                        error = %e,
                        "Failed to refresh anchor attempt"
                    );
                    return;
                }
            }
        }

        match self.ledger.submit(&job.sealing_digest).await {
            Ok(receipt) => {
                let updated = anchor::mark_confirmed(
                    &self.pool,
                    job.transaction_id,
                    &job.sealing_digest,
                    &receipt.ledger_tx_id,
                    &receipt.block_ref,
                    shared::util::now_millis(),
                )
                .await;

                match updated {
                    Ok(true) => {
                        tracing::info!(
                            transaction_id = job.transaction_id,
                            ledger_tx_id = %receipt.ledger_tx_id,
                            "Anchor confirmed on ledger"
                        );
                        // Digest-aware ack: a concurrent re-seal may have
                        // queued a newer job under the same key
                        if let Err(e) = self
                            .queue
                            .complete_if_digest(job.transaction_id, &job.sealing_digest)
                        {
                            tracing::error!(error = %e, "Failed to ack anchor job");
                        }
                    }
                    Ok(false) => {
                        // Record gone, digest superseded by an update, or a
                        // concurrent worker won the CAS — drop the job
                        tracing::debug!(
                            transaction_id = job.transaction_id,
                            "Anchor job is stale, dropping"
                        );
                        // Drop only this digest's entry; a re-anchor job
                        // queued meanwhile stays
                        if let Err(e) = self
                            .queue
                            .complete_if_digest(job.transaction_id, &job.sealing_digest)
                        {
                            tracing::error!(error = %e, "Failed to drop stale anchor job");
                        }
                    }
                    Err(e) => {
                        tracing::error!(
                            transaction_id = job.transaction_id,
                            error = %e,
                            "Failed to persist anchor confirmation"
                        );
                        if let Err(e2) = self.queue.fail(job.transaction_id, &e.to_string()) {
                            tracing::error!(error = %e2, "Failed to nack anchor job");
                        }
                    }
                }
            }
            Err(e) => {
                tracing::warn!(
                    transaction_id = job.transaction_id,
                    error = %e,
                    "Ledger submission failed"
                );
                match anchor::mark_failed(&self.pool, job.transaction_id, &job.sealing_digest).await
                {
                    Ok(_) => {}
                    Err(e2) => {
                        tracing::error!(
                            transaction_id = job.transaction_id,
                            error = %e2,
                            "Failed to mark anchor record FAILED"
                        );
                    }
                }
                // 失败交还队列，由队列的退避策略决定重投
                if let Err(e2) = self.queue.fail(job.transaction_id, &e.to_string()) {
                    tracing::error!(error = %e2, "Failed to nack anchor job");
                }
            }
        }
    }

    /// Reconciliation sweep: re-enqueue PENDING anchors whose job was lost
    pub async fn sweep_stale_anchors(&self) {
        let cutoff = shared::util::now_millis() - STALE_ANCHOR_THRESHOLD_MS;
        let stale = match anchor::find_stale_pending(&self.pool, cutoff).await {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "Failed to scan for stale pending anchors");
                return;
            }
        };

        for (transaction_id, sealing_digest) in stale {
            match self.queue.contains(transaction_id) {
                Ok(true) => {} // job still queued, backoff will get to it
                Ok(false) => {
                    tracing::warn!(
                        transaction_id,
                        "Stale PENDING anchor without a queue entry, re-enqueueing"
                    );
                    if let Err(e) = self.queue.enqueue(transaction_id, &sealing_digest) {
                        tracing::error!(error = %e, "Failed to re-enqueue stale anchor");
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to check queue for stale anchor");
                }
            }
        }
    }
}
