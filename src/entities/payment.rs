// 💳 Payment - a signed money movement against an account

use crate::error::Error;
use crate::money::Money;
use chrono::NaiveDate;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::ToSql;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Review state of a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Validated,
    Rejected,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Validated => "validated",
            PaymentStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "validated" => Ok(PaymentStatus::Validated),
            "rejected" => Ok(PaymentStatus::Rejected),
            other => Err(Error::InvalidInput(format!(
                "unknown payment status '{other}'"
            ))),
        }
    }
}

impl ToSql for PaymentStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for PaymentStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

/// A recorded payment. Negative amounts encode manual reversals.
///
/// Rejection keeps the row (status `rejected`) so the history stays visible;
/// only `delete_payment` removes it. `seen` tracks whether an admin has
/// reviewed the payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub account_id: i64,
    #[serde(rename = "amount_cents")]
    pub amount: Money,
    pub paid_on: NaiveDate,
    /// Receipt image bytes. Stored opaque, never interpreted, and kept off
    /// the JSON wire.
    #[serde(skip)]
    pub receipt: Option<Vec<u8>>,
    pub status: PaymentStatus,
    pub seen: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_strings() {
        assert_eq!(PaymentStatus::Validated.as_str(), "validated");
        assert_eq!(
            "rejected".parse::<PaymentStatus>().unwrap(),
            PaymentStatus::Rejected
        );
        assert!("pending".parse::<PaymentStatus>().is_err());
    }

    #[test]
    fn test_receipt_stays_off_the_wire() {
        let payment = Payment {
            id: 1,
            account_id: 7,
            amount: Money::from_units(100),
            paid_on: "2026-01-16".parse().unwrap(),
            receipt: Some(vec![0xFF, 0xD8, 0xFF]),
            status: PaymentStatus::Validated,
            seen: false,
        };

        let json = serde_json::to_value(&payment).unwrap();
        assert!(json.get("receipt").is_none());
        assert_eq!(json["amount_cents"], 10_000);
        assert_eq!(json["paid_on"], "2026-01-16");
    }
}
