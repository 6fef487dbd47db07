//! Input validation helpers
//!
//! Centralized limits and parsing for transaction input. SQLite TEXT
//! has no built-in length enforcement, so limits live here.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use shared::{AppError, ErrorCode};

/// Notes / descriptions
pub const MAX_DESCRIPTION_LEN: usize = 500;

/// Amounts beyond this are presumed to be input errors
pub const MAX_AMOUNT_ABS: i64 = 1_000_000_000_000;

/// Amount must be non-zero; sign is carried by the transaction type.
pub fn validate_amount(amount: &Decimal) -> Result<(), AppError> {
    if amount.is_zero() {
        return Err(AppError::validation("amount must not be zero"));
    }
    if amount.abs() > Decimal::from(MAX_AMOUNT_ABS) {
        return Err(AppError::with_message(
            ErrorCode::ValueOutOfRange,
            format!("amount exceeds the supported range (max {MAX_AMOUNT_ABS})"),
        ));
    }
    Ok(())
}

pub fn validate_description(value: &str) -> Result<(), AppError> {
    if value.len() > MAX_DESCRIPTION_LEN {
        return Err(AppError::validation(format!(
            "description is too long ({} chars, max {MAX_DESCRIPTION_LEN})",
            value.len()
        )));
    }
    Ok(())
}

/// Parse a transaction date into UTC milliseconds.
///
/// Accepts a full RFC 3339 timestamp or a bare `YYYY-MM-DD` date (taken
/// as midnight UTC).
pub fn parse_transaction_date(value: &str) -> Result<i64, AppError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc).timestamp_millis());
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        && let Some(dt) = date.and_hms_opt(0, 0, 0)
    {
        // 仅日期按 UTC 零点处理
        return Ok(dt.and_utc().timestamp_millis());
    }
    Err(AppError::with_message(
        ErrorCode::InvalidTransactionDate,
        format!("invalid transaction date: {value}"),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn zero_amount_is_rejected() {
        assert!(validate_amount(&Decimal::ZERO).is_err());
        assert!(validate_amount(&Decimal::from_str("0.00").unwrap()).is_err());
        assert!(validate_amount(&Decimal::from_str("-15.50").unwrap()).is_ok());
    }

    #[test]
    fn oversized_amount_is_rejected() {
        let err = validate_amount(&Decimal::from(MAX_AMOUNT_ABS + 1)).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValueOutOfRange);
    }

    #[test]
    fn description_limit() {
        assert!(validate_description("").is_ok());
        assert!(validate_description("ok").is_ok());
        assert!(validate_description(&"x".repeat(501)).is_err());
    }

    #[test]
    fn date_parsing() {
        assert_eq!(
            parse_transaction_date("2024-01-15T00:00:00Z").unwrap(),
            1_705_276_800_000
        );
        assert_eq!(parse_transaction_date("2024-01-15").unwrap(), 1_705_276_800_000);
        // Offset timestamps normalize to UTC
        assert_eq!(
            parse_transaction_date("2024-01-15T01:00:00+01:00").unwrap(),
            1_705_276_800_000
        );
        let err = parse_transaction_date("not-a-date").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidTransactionDate);
    }
}
