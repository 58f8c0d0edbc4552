use crate::error::{ReconciliationError, Result};
use crate::schema::Transaction;
use chrono::{DateTime, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A transaction exactly as the persistence layer hands it over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTransaction {
    /// `YYYY-MM-DD` or an RFC 3339 timestamp
    pub date: String,
    #[serde(default)]
    pub category: Option<String>,
    pub amount: Decimal,
}

impl RawTransaction {
    pub fn new(date: impl Into<String>, category: impl Into<String>, amount: Decimal) -> Self {
        Self {
            date: date.into(),
            category: Some(category.into()),
            amount,
        }
    }
}

/// Everything the persistence collaborator knows about one user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserSnapshot {
    #[serde(default)]
    pub income: Option<Decimal>,
    #[serde(default)]
    pub transactions: Vec<RawTransaction>,
}

pub fn parse_transaction_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(date);
    }
    DateTime::parse_from_rfc3339(trimmed)
        .ok()
        .map(|dt| dt.naive_utc().date())
}

/// Validates raw records, failing on the first malformed one.
pub fn ingest_transactions(rows: &[RawTransaction]) -> Result<Vec<Transaction>> {
    rows.iter()
        .enumerate()
        .map(|(index, row)| {
            let date = parse_transaction_date(&row.date).ok_or_else(|| {
                ReconciliationError::InvalidRecord {
                    index,
                    reason: format!("unparsable date '{}'", row.date),
                }
            })?;

            if row.amount < Decimal::ZERO {
                return Err(ReconciliationError::InvalidRecord {
                    index,
                    reason: format!("negative amount {}", row.amount),
                });
            }

            Ok(Transaction {
                date,
                category: row.category.clone().unwrap_or_default(),
                amount: row.amount,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReasonCode;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parses_plain_and_timestamp_dates() {
        assert_eq!(
            parse_transaction_date("2024-11-05"),
            NaiveDate::from_ymd_opt(2024, 11, 5)
        );
        assert_eq!(
            parse_transaction_date("2024-11-05T00:00:00.000Z"),
            NaiveDate::from_ymd_opt(2024, 11, 5)
        );
        // Offset timestamps resolve to the UTC calendar date
        assert_eq!(
            parse_transaction_date("2024-12-01T01:30:00+05:00"),
            NaiveDate::from_ymd_opt(2024, 11, 30)
        );
        assert_eq!(parse_transaction_date("05/11/2024"), None);
    }

    #[test]
    fn test_ingest_valid_rows() {
        let rows = vec![
            RawTransaction::new("2024-11-05", "Rent", dec!(1500)),
            RawTransaction {
                date: "2024-11-20".to_string(),
                category: None,
                amount: dec!(42.50),
            },
        ];

        let transactions = ingest_transactions(&rows).unwrap();
        assert_eq!(transactions.len(), 2);
        assert_eq!(transactions[0].category, "Rent");
        assert_eq!(transactions[1].category, "");
        assert_eq!(transactions[1].amount, dec!(42.50));
    }

    #[test]
    fn test_rejects_bad_date_with_index() {
        let rows = vec![
            RawTransaction::new("2024-11-05", "Rent", dec!(1500)),
            RawTransaction::new("not a date", "Food", dec!(10)),
        ];

        let err = ingest_transactions(&rows).unwrap_err();
        assert_eq!(err.code(), ReasonCode::InvalidRecord);
        match err {
            ReconciliationError::InvalidRecord { index, .. } => assert_eq!(index, 1),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_rejects_negative_amount() {
        let rows = vec![RawTransaction::new("2024-11-05", "Refund", dec!(-20))];
        let err = ingest_transactions(&rows).unwrap_err();
        assert_eq!(err.code(), ReasonCode::InvalidRecord);
        assert!(err.to_string().contains("negative amount"));
    }

    #[test]
    fn test_snapshot_deserializes_persistence_json() {
        let json = r#"{
            "income": 5000,
            "transactions": [
                {"date": "2024-11-05T00:00:00.000Z", "category": "Rent", "amount": 1500},
                {"date": "2024-11-09", "amount": 12.5}
            ]
        }"#;

        let snapshot: UserSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.income, Some(dec!(5000)));
        assert_eq!(snapshot.transactions.len(), 2);
        assert_eq!(snapshot.transactions[1].category, None);
    }
}
