//! End-to-end integrity flow: create → anchor → verify, plus the
//! tamper/mismatch paths the verifier exists for.

use std::str::FromStr;
use std::sync::Arc;

use rust_decimal::Decimal;
use tempfile::TempDir;

use ledger_server::anchoring::{AnchorQueue, AnchorWorker};
use ledger_server::attachments::AttachmentIngestor;
use ledger_server::db::DbService;
use ledger_server::ledger::{LedgerAdapter, MockLedger};
use ledger_server::storage::{BlobStore, LocalBlobStore};
use ledger_server::transactions::TransactionService;
use ledger_server::verify::Verifier;
use ledger_server::ErrorCode;

use shared::models::{
    AnchorStatus, TransactionCreate, TransactionStatus, TransactionType, UploadedFile, VerifyStatus,
};

struct Harness {
    db: DbService,
    queue: AnchorQueue,
    ledger: Arc<MockLedger>,
    service: TransactionService,
    worker: AnchorWorker,
    verifier: Verifier,
    _blob_dir: TempDir,
}

async fn harness() -> Harness {
    let db = DbService::in_memory().await.unwrap();
    let queue = AnchorQueue::open_in_memory().unwrap();
    let ledger = Arc::new(MockLedger::new());
    let blob_dir = TempDir::new().unwrap();

    let store: Arc<dyn BlobStore> = Arc::new(LocalBlobStore::new(blob_dir.path()));
    let service = TransactionService::new(
        db.pool.clone(),
        AttachmentIngestor::new(store),
        queue.clone(),
    );
    let worker = AnchorWorker::new(
        queue.clone(),
        db.pool.clone(),
        ledger.clone() as Arc<dyn LedgerAdapter>,
    );
    let verifier = Verifier::new(db.pool.clone(), ledger.clone() as Arc<dyn LedgerAdapter>);

    Harness {
        db,
        queue,
        ledger,
        service,
        worker,
        verifier,
        _blob_dir: blob_dir,
    }
}

fn sample_create() -> TransactionCreate {
    TransactionCreate {
        org_id: 42,
        project_id: None,
        category_id: None,
        amount: Decimal::from_str("156.80").unwrap(),
        tx_type: TransactionType::Expense,
        description: "Team lunch".into(),
        date: "2024-01-15T00:00:00Z".into(),
    }
}

fn pdf_file(name: &str, content: &[u8]) -> UploadedFile {
    UploadedFile::new(name, content.to_vec()).with_media_type("application/pdf")
}

#[tokio::test]
async fn create_anchor_verify_happy_path() {
    let h = harness().await;

    let detail = h
        .service
        .create_transaction(7, sample_create(), vec![pdf_file("receipt.pdf", b"%PDF fake")])
        .await
        .unwrap();
    assert_eq!(detail.attachments.len(), 1);
    assert_eq!(detail.transaction.status, TransactionStatus::Pending);
    let anchor = detail.anchor.as_ref().unwrap();
    assert_eq!(anchor.status, AnchorStatus::Pending);
    assert!(anchor.ledger_tx_id.is_none());

    // Before the worker runs there is nothing on the ledger to check
    let verdict = h.verifier.verify(detail.transaction.id).await.unwrap();
    assert!(!verdict.verifiable);
    assert_eq!(verdict.status, VerifyStatus::PendingAnchor);
    assert!(verdict.integral.is_none());

    h.worker.process_pending_queue().await;

    let detail = h.service.get_transaction(detail.transaction.id).await.unwrap();
    let anchor = detail.anchor.as_ref().unwrap();
    assert_eq!(anchor.status, AnchorStatus::Confirmed);
    assert!(anchor.ledger_tx_id.is_some());
    assert!(anchor.confirmed_at.is_some());

    let verdict = h.verifier.verify(detail.transaction.id).await.unwrap();
    assert!(verdict.verifiable);
    assert_eq!(verdict.integral, Some(true));
    assert_eq!(verdict.status, VerifyStatus::Verified);

    // Verification is read-only, so repeating it changes nothing
    let again = h.verifier.verify(detail.transaction.id).await.unwrap();
    assert_eq!(again, verdict);
}

#[tokio::test]
async fn direct_row_edit_is_detected_as_tampering() {
    let h = harness().await;

    let detail = h
        .service
        .create_transaction(7, sample_create(), vec![])
        .await
        .unwrap();
    h.worker.process_pending_queue().await;

    // Bypass the service layer, as an attacker with DB access would
    sqlx::query("UPDATE ledger_transaction SET amount = '9999.99' WHERE id = ?")
        .bind(detail.transaction.id)
        .execute(&h.db.pool)
        .await
        .unwrap();

    let verdict = h.verifier.verify(detail.transaction.id).await.unwrap();
    assert!(verdict.verifiable);
    assert_eq!(verdict.integral, Some(false));
    assert_eq!(verdict.status, VerifyStatus::Tampered);
}

#[tokio::test]
async fn divergent_ledger_entry_is_a_chain_mismatch() {
    let h = harness().await;

    let detail = h
        .service
        .create_transaction(7, sample_create(), vec![])
        .await
        .unwrap();
    h.worker.process_pending_queue().await;

    let anchor = h
        .service
        .anchor_record(detail.transaction.id)
        .await
        .unwrap()
        .unwrap();
    h.ledger
        .overwrite_entry(anchor.ledger_tx_id.as_deref().unwrap(), "deadbeef");

    let verdict = h.verifier.verify(detail.transaction.id).await.unwrap();
    assert!(verdict.verifiable);
    assert_eq!(verdict.integral, Some(false));
    assert_eq!(verdict.status, VerifyStatus::ChainMismatch);
}

#[tokio::test]
async fn failed_submission_marks_the_anchor_failed() {
    let h = harness().await;
    h.ledger.set_fail_submissions(true);

    let detail = h
        .service
        .create_transaction(7, sample_create(), vec![])
        .await
        .unwrap();
    h.worker.process_pending_queue().await;

    let anchor = h
        .service
        .anchor_record(detail.transaction.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(anchor.status, AnchorStatus::Failed);
    assert!(anchor.ledger_tx_id.is_none());

    let verdict = h.verifier.verify(detail.transaction.id).await.unwrap();
    assert!(!verdict.verifiable);
    assert_eq!(verdict.status, VerifyStatus::FailedAnchor);
}

#[tokio::test]
async fn approved_transactions_are_immutable() {
    let h = harness().await;

    let detail = h
        .service
        .create_transaction(7, sample_create(), vec![])
        .await
        .unwrap();
    let id = detail.transaction.id;
    let original_digest = detail.transaction.sealing_digest.clone();

    h.service
        .set_transaction_status(1, id, TransactionStatus::Approved)
        .await
        .unwrap();

    let patch = shared::models::TransactionUpdate {
        amount: Some(Decimal::from_str("1.00").unwrap()),
        ..Default::default()
    };
    let err = h.service.update_transaction(1, id, patch).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::TransactionApproved);

    let err = h.service.delete_transaction(1, id).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::TransactionApproved);

    let detail = h.service.get_transaction(id).await.unwrap();
    assert_eq!(detail.transaction.sealing_digest, original_digest);
}

#[tokio::test]
async fn critical_update_reseals_and_reanchors() {
    let h = harness().await;

    let detail = h
        .service
        .create_transaction(7, sample_create(), vec![pdf_file("receipt.pdf", b"bytes")])
        .await
        .unwrap();
    let id = detail.transaction.id;
    h.worker.process_pending_queue().await;
    let old_digest = detail.transaction.sealing_digest.clone();

    let patch = shared::models::TransactionUpdate {
        amount: Some(Decimal::from_str("200.00").unwrap()),
        ..Default::default()
    };
    let updated = h.service.update_transaction(7, id, patch).await.unwrap();

    assert_ne!(updated.transaction.sealing_digest, old_digest);
    let anchor = updated.anchor.as_ref().unwrap();
    assert_eq!(anchor.status, AnchorStatus::Pending);
    assert_eq!(anchor.sealing_digest, updated.transaction.sealing_digest);
    assert!(anchor.ledger_tx_id.is_none());

    // The new seal goes through the same anchoring cycle
    h.worker.process_pending_queue().await;
    let verdict = h.verifier.verify(id).await.unwrap();
    assert_eq!(verdict.status, VerifyStatus::Verified);
}

#[tokio::test]
async fn late_worker_ack_spares_a_concurrent_reanchor_job() {
    let h = harness().await;

    let detail = h
        .service
        .create_transaction(7, sample_create(), vec![])
        .await
        .unwrap();
    let id = detail.transaction.id;

    // The worker picked up the job but has not settled it yet
    let old_job = h
        .queue
        .pending_jobs()
        .unwrap()
        .into_iter()
        .find(|j| j.transaction_id == id)
        .unwrap();

    // A critical-field update lands meanwhile: new seal, new queued job
    let patch = shared::models::TransactionUpdate {
        amount: Some(Decimal::from_str("300.00").unwrap()),
        ..Default::default()
    };
    let updated = h.service.update_transaction(7, id, patch).await.unwrap();
    assert_ne!(updated.transaction.sealing_digest, old_job.sealing_digest);

    // Settling the superseded job must not ack the newer one away
    h.worker.process_job(&old_job).await;

    let survivor = h
        .queue
        .pending_jobs()
        .unwrap()
        .into_iter()
        .find(|j| j.transaction_id == id)
        .expect("re-anchor job must stay queued");
    assert_eq!(survivor.sealing_digest, updated.transaction.sealing_digest);

    // The surviving job drives the new seal to confirmation as usual
    h.worker.process_pending_queue().await;
    let verdict = h.verifier.verify(id).await.unwrap();
    assert_eq!(verdict.status, VerifyStatus::Verified);
}

#[tokio::test]
async fn late_failure_never_overwrites_a_confirmed_anchor() {
    use ledger_server::db::repository::anchor as anchor_repo;

    let h = harness().await;

    let detail = h
        .service
        .create_transaction(7, sample_create(), vec![])
        .await
        .unwrap();
    let id = detail.transaction.id;
    h.worker.process_pending_queue().await;

    let confirmed = h.service.anchor_record(id).await.unwrap().unwrap();
    assert_eq!(confirmed.status, AnchorStatus::Confirmed);

    // A failure result straggling in after confirmation must lose the CAS
    let overwritten = anchor_repo::mark_failed(&h.db.pool, id, &confirmed.sealing_digest)
        .await
        .unwrap();
    assert!(!overwritten);

    let after = h.service.anchor_record(id).await.unwrap().unwrap();
    assert_eq!(after.status, AnchorStatus::Confirmed);
    assert_eq!(after.ledger_tx_id, confirmed.ledger_tx_id);
    assert_eq!(after.confirmed_at, confirmed.confirmed_at);
}

#[tokio::test]
async fn non_critical_update_keeps_the_seal() {
    let h = harness().await;

    let detail = h
        .service
        .create_transaction(7, sample_create(), vec![])
        .await
        .unwrap();
    h.worker.process_pending_queue().await;

    let patch = shared::models::TransactionUpdate {
        description: Some("Team lunch (January)".into()),
        ..Default::default()
    };
    let updated = h
        .service
        .update_transaction(7, detail.transaction.id, patch)
        .await
        .unwrap();

    assert_eq!(
        updated.transaction.sealing_digest,
        detail.transaction.sealing_digest
    );
    assert_eq!(updated.anchor.as_ref().unwrap().status, AnchorStatus::Confirmed);
    assert_eq!(updated.transaction.description, "Team lunch (January)");

    let verdict = h.verifier.verify(detail.transaction.id).await.unwrap();
    assert_eq!(verdict.status, VerifyStatus::Verified);
}

#[tokio::test]
async fn out_of_policy_uploads_are_dropped() {
    let h = harness().await;

    let files = vec![
        pdf_file("invoice.pdf", b"one"),
        UploadedFile::new("photo.png", b"two".to_vec()).with_media_type("image/png"),
        UploadedFile::new("malware.exe", b"three".to_vec()),
    ];
    let detail = h
        .service
        .create_transaction(7, sample_create(), files)
        .await
        .unwrap();

    assert_eq!(detail.attachments.len(), 2);
    let names: Vec<&str> = detail.attachments.iter().map(|a| a.filename.as_str()).collect();
    assert!(!names.contains(&"malware.exe"));

    // Dropped files never influence the digest; the record still verifies
    h.worker.process_pending_queue().await;
    let verdict = h.verifier.verify(detail.transaction.id).await.unwrap();
    assert_eq!(verdict.status, VerifyStatus::Verified);
}

#[tokio::test]
async fn delete_removes_all_rows() {
    let h = harness().await;

    let detail = h
        .service
        .create_transaction(7, sample_create(), vec![pdf_file("r.pdf", b"x")])
        .await
        .unwrap();
    let id = detail.transaction.id;

    h.service.delete_transaction(7, id).await.unwrap();

    let err = h.service.get_transaction(id).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::TransactionNotFound);
    assert!(h.service.anchor_record(id).await.unwrap().is_none());

    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM attachment WHERE transaction_id = ?")
        .bind(id)
        .fetch_one(&h.db.pool)
        .await
        .unwrap();
    assert_eq!(count.0, 0);
}

#[tokio::test]
async fn unknown_transaction_is_an_error_everywhere() {
    let h = harness().await;

    let err = h.service.get_transaction(404).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::TransactionNotFound);

    let err = h
        .service
        .update_transaction(7, 404, Default::default())
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::TransactionNotFound);

    let err = h.verifier.verify(404).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::TransactionNotFound);
}

#[tokio::test]
async fn invalid_input_is_rejected_before_any_write() {
    let h = harness().await;

    let mut input = sample_create();
    input.amount = Decimal::ZERO;
    let err = h
        .service
        .create_transaction(7, input, vec![])
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ValidationFailed);

    let mut input = sample_create();
    input.date = "someday".into();
    let err = h
        .service
        .create_transaction(7, input, vec![])
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidTransactionDate);

    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM ledger_transaction")
        .fetch_one(&h.db.pool)
        .await
        .unwrap();
    assert_eq!(count.0, 0);
}

#[tokio::test]
async fn failed_multi_row_write_leaves_no_rows() {
    use ledger_server::db::repository::transaction as tx_repo;
    use shared::models::{AnchorRecord, Attachment, Transaction};
    use shared::util::{now_millis, snowflake_id};

    let h = harness().await;
    let now = now_millis();
    let tx_id = snowflake_id();

    let transaction = Transaction {
        id: tx_id,
        org_id: 1,
        creator_id: 7,
        project_id: None,
        category_id: None,
        amount: Decimal::from_str("10.00").unwrap(),
        tx_type: TransactionType::Income,
        description: "atomicity probe".into(),
        transaction_date: now,
        status: TransactionStatus::Pending,
        sealing_digest: "0".repeat(64),
        created_at: now,
        updated_at: now,
    };
    // Points at a transaction that does not exist, so the attachment
    // insert violates the foreign key after the transaction row landed
    let bad_attachment = Attachment {
        id: snowflake_id(),
        transaction_id: tx_id + 1,
        filename: "r.pdf".into(),
        locator: "receipts/r.pdf".into(),
        content_digest: "0".repeat(64),
        created_at: now,
    };
    let anchor = AnchorRecord {
        id: snowflake_id(),
        transaction_id: tx_id,
        sealing_digest: "0".repeat(64),
        ledger_tx_id: None,
        block_ref: None,
        status: AnchorStatus::Pending,
        confirmed_at: None,
        created_at: now,
    };

    let result =
        tx_repo::create_with_anchor(&h.db.pool, &transaction, &[bad_attachment], &anchor).await;
    assert!(result.is_err());

    // Nothing committed, not even the transaction row inserted first
    assert!(tx_repo::find_by_id(&h.db.pool, tx_id).await.unwrap().is_none());
    assert!(h.service.anchor_record(tx_id).await.unwrap().is_none());
}

#[tokio::test]
async fn org_listing_is_scoped_and_date_ordered() {
    let h = harness().await;

    for (org, date) in [(1, "2024-01-10"), (1, "2024-03-10"), (2, "2024-02-10")] {
        let mut input = sample_create();
        input.org_id = org;
        input.date = date.into();
        h.service.create_transaction(7, input, vec![]).await.unwrap();
    }

    let listed = h.service.list_transactions(1).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert!(listed[0].transaction_date > listed[1].transaction_date);
    assert!(listed.iter().all(|t| t.org_id == 1));
}
