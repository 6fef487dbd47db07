//! Transaction Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Transaction type (资金流向)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    Income,
    Expense,
}

impl TransactionType {
    /// Stable wire/storage representation, also used in the integrity payload
    pub const fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Income => "INCOME",
            TransactionType::Expense => "EXPENSE",
        }
    }
}

impl std::str::FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INCOME" => Ok(TransactionType::Income),
            "EXPENSE" => Ok(TransactionType::Expense),
            other => Err(format!("unknown transaction type: {other}")),
        }
    }
}

/// Transaction lifecycle status
///
/// Once a transaction reaches `Approved`, its critical fields
/// (amount, type, date, attachments) are immutable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionStatus {
    Pending,
    Approved,
    Rejected,
}

impl TransactionStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "PENDING",
            TransactionStatus::Approved => "APPROVED",
            TransactionStatus::Rejected => "REJECTED",
        }
    }
}

impl std::str::FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(TransactionStatus::Pending),
            "APPROVED" => Ok(TransactionStatus::Approved),
            "REJECTED" => Ok(TransactionStatus::Rejected),
            other => Err(format!("unknown transaction status: {other}")),
        }
    }
}

/// Transaction entity
///
/// `sealing_digest` commits the critical fields plus the attachment
/// content digests at creation/update time (see the integrity payload).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub org_id: i64,
    pub creator_id: i64,
    pub project_id: Option<i64>,
    pub category_id: Option<i64>,
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub tx_type: TransactionType,
    pub description: String,
    /// Transaction date, UTC milliseconds
    pub transaction_date: i64,
    pub status: TransactionStatus,
    /// Lowercase hex SHA-256 over the canonical integrity payload
    pub sealing_digest: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Create transaction payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionCreate {
    pub org_id: i64,
    pub project_id: Option<i64>,
    pub category_id: Option<i64>,
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub tx_type: TransactionType,
    pub description: String,
    /// RFC 3339 date-time, e.g. "2024-01-15T00:00:00Z"
    pub date: String,
}

/// Update transaction payload
///
/// Amount, type and date are critical fields: patching any of them
/// forces a sealing digest recomputation and a re-anchor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionUpdate {
    pub project_id: Option<i64>,
    pub category_id: Option<i64>,
    pub amount: Option<Decimal>,
    #[serde(rename = "type")]
    pub tx_type: Option<TransactionType>,
    pub description: Option<String>,
    pub date: Option<String>,
}

impl TransactionUpdate {
    /// Whether this patch touches a field committed by the sealing digest
    pub fn touches_critical_fields(&self) -> bool {
        self.amount.is_some() || self.tx_type.is_some() || self.date.is_some()
    }
}

/// Transaction with its attachments and anchor record (detail view)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionDetail {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub attachments: Vec<super::Attachment>,
    pub anchor: Option<super::AnchorRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_roundtrip() {
        assert_eq!("INCOME".parse::<TransactionType>().unwrap(), TransactionType::Income);
        assert_eq!(TransactionType::Expense.as_str(), "EXPENSE");
        assert!("REFUND".parse::<TransactionType>().is_err());
    }

    #[test]
    fn update_critical_detection() {
        let patch = TransactionUpdate {
            description: Some("new note".into()),
            ..Default::default()
        };
        assert!(!patch.touches_critical_fields());

        let patch = TransactionUpdate {
            amount: Some(Decimal::new(100, 0)),
            ..Default::default()
        };
        assert!(patch.touches_critical_fields());
    }

    #[test]
    fn serde_uses_uppercase_tags() {
        let json = serde_json::to_string(&TransactionType::Expense).unwrap();
        assert_eq!(json, "\"EXPENSE\"");
        let json = serde_json::to_string(&TransactionStatus::Pending).unwrap();
        assert_eq!(json, "\"PENDING\"");
    }
}
