//! Integrity payload
//!
//! The canonical structural view a transaction is sealed over:
//! `{actorId, orgId, amount, type, date, attachments}` with attachment
//! content digests sorted lexicographically. This is the exact input
//! to the digest engine and must be reconstructible byte-for-byte from
//! persisted rows at any later time — every formatting choice here
//! (normalized decimal string, RFC 3339 with fixed millisecond
//! precision) exists to keep that reconstruction exact.

use rust_decimal::Decimal;
use serde_json::{json, Value};
use shared::models::TransactionType;
use shared::{AppError, AppResult};

/// Millisecond timestamp → RFC 3339 UTC with fixed precision
pub fn format_utc_millis(ms: i64) -> AppResult<String> {
    chrono::DateTime::from_timestamp_millis(ms)
        .map(|dt| dt.to_rfc3339_opts(chrono::SecondsFormat::Millis, true))
        .ok_or_else(|| AppError::internal(format!("Timestamp out of range: {ms}")))
}

/// Build the integrity payload for a transaction.
///
/// `attachment_digests` may arrive in any order; they are sorted here
/// so attachment ingest order never influences the sealing digest.
pub fn integrity_payload(
    actor_id: i64,
    org_id: i64,
    amount: &Decimal,
    tx_type: TransactionType,
    transaction_date_ms: i64,
    mut attachment_digests: Vec<String>,
) -> AppResult<Value> {
    attachment_digests.sort_unstable();
    Ok(json!({
        "actorId": actor_id,
        "orgId": org_id,
        // normalize(): "100.00" and "100" seal identically
        "amount": amount.normalize().to_string(),
        "type": tx_type.as_str(),
        "date": format_utc_millis(transaction_date_ms)?,
        "attachments": attachment_digests,
    }))
}

/// Compute the sealing digest for a transaction's current state
pub fn sealing_digest(
    actor_id: i64,
    org_id: i64,
    amount: &Decimal,
    tx_type: TransactionType,
    transaction_date_ms: i64,
    attachment_digests: Vec<String>,
) -> AppResult<String> {
    let payload = integrity_payload(
        actor_id,
        org_id,
        amount,
        tx_type,
        transaction_date_ms,
        attachment_digests,
    )?;
    Ok(crate::digest::digest_payload(&payload)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn amount(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn digest_ignores_attachment_order() {
        let a = sealing_digest(
            1,
            2,
            &amount("100.00"),
            TransactionType::Expense,
            1_705_276_800_000,
            vec!["bbb".into(), "aaa".into()],
        )
        .unwrap();
        let b = sealing_digest(
            1,
            2,
            &amount("100.00"),
            TransactionType::Expense,
            1_705_276_800_000,
            vec!["aaa".into(), "bbb".into()],
        )
        .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn trailing_zeros_do_not_change_the_digest() {
        let a = sealing_digest(1, 2, &amount("100.00"), TransactionType::Income, 0, vec![]).unwrap();
        let b = sealing_digest(1, 2, &amount("100"), TransactionType::Income, 0, vec![]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn every_field_is_load_bearing() {
        let base = sealing_digest(1, 2, &amount("100"), TransactionType::Expense, 1000, vec![])
            .unwrap();
        let variants = [
            sealing_digest(9, 2, &amount("100"), TransactionType::Expense, 1000, vec![]),
            sealing_digest(1, 9, &amount("100"), TransactionType::Expense, 1000, vec![]),
            sealing_digest(1, 2, &amount("100.01"), TransactionType::Expense, 1000, vec![]),
            sealing_digest(1, 2, &amount("100"), TransactionType::Income, 1000, vec![]),
            sealing_digest(1, 2, &amount("100"), TransactionType::Expense, 1001, vec![]),
            sealing_digest(1, 2, &amount("100"), TransactionType::Expense, 1000, vec!["d".into()]),
        ];
        for v in variants {
            assert_ne!(v.unwrap(), base);
        }
    }

    #[test]
    fn date_formatting_is_fixed_precision() {
        // Whole-second timestamps still render milliseconds
        assert_eq!(format_utc_millis(1_705_276_800_000).unwrap(), "2024-01-15T00:00:00.000Z");
        assert_eq!(format_utc_millis(1_705_276_800_123).unwrap(), "2024-01-15T00:00:00.123Z");
    }
}
