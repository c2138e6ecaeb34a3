// 📒 Ledger - per-account money summary

use crate::error::Error;
use crate::money::Money;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::ToSql;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Settlement state of a ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerStatus {
    Pending,
    Partial,
    Settled,
}

impl LedgerStatus {
    /// Status transition applied after every ledger mutation.
    ///
    /// Overpaid ledgers settle with a negative balance (a credit); a ledger
    /// whose total is zero counts as settled.
    pub fn from_amounts(paid: Money, balance: Money) -> LedgerStatus {
        if balance <= Money::ZERO {
            LedgerStatus::Settled
        } else if paid > Money::ZERO {
            LedgerStatus::Partial
        } else {
            LedgerStatus::Pending
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerStatus::Pending => "pending",
            LedgerStatus::Partial => "partial",
            LedgerStatus::Settled => "settled",
        }
    }
}

impl fmt::Display for LedgerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for LedgerStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s {
            "pending" => Ok(LedgerStatus::Pending),
            "partial" => Ok(LedgerStatus::Partial),
            "settled" => Ok(LedgerStatus::Settled),
            other => Err(Error::InvalidInput(format!(
                "unknown ledger status '{other}'"
            ))),
        }
    }
}

impl ToSql for LedgerStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for LedgerStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

/// Money summary for one account: what the family owes (`total`), what it
/// has paid (`paid`) and the difference (`balance = total - paid`).
///
/// Exactly one ledger exists per account; it is created with the account at
/// zeros and status `pending`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ledger {
    pub account_id: i64,
    #[serde(rename = "total_cents")]
    pub total: Money,
    #[serde(rename = "paid_cents")]
    pub paid: Money,
    #[serde(rename = "balance_cents")]
    pub balance: Money,
    pub status: LedgerStatus,
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn units(n: i64) -> Money {
        Money::from_units(n)
    }

    #[test]
    fn test_status_pending_before_any_payment() {
        assert_eq!(
            LedgerStatus::from_amounts(Money::ZERO, units(400)),
            LedgerStatus::Pending
        );
    }

    #[test]
    fn test_status_partial_once_something_is_paid() {
        assert_eq!(
            LedgerStatus::from_amounts(units(200), units(200)),
            LedgerStatus::Partial
        );
    }

    #[test]
    fn test_status_settled_at_zero_balance() {
        assert_eq!(
            LedgerStatus::from_amounts(units(400), Money::ZERO),
            LedgerStatus::Settled
        );
    }

    #[test]
    fn test_status_overpayment_settles_with_credit() {
        // total 400, paid 500: balance -100 still counts as settled
        assert_eq!(
            LedgerStatus::from_amounts(units(500), units(-100)),
            LedgerStatus::Settled
        );
    }

    #[test]
    fn test_status_zero_total_counts_as_settled() {
        assert_eq!(
            LedgerStatus::from_amounts(Money::ZERO, Money::ZERO),
            LedgerStatus::Settled
        );
    }

    #[test]
    fn test_status_negative_paid_stays_pending() {
        // a lone reversal leaves paid below zero; nothing was really paid
        assert_eq!(
            LedgerStatus::from_amounts(units(-50), units(450)),
            LedgerStatus::Pending
        );
    }

    #[test]
    fn test_ledger_serializes_cents_fields() {
        let ledger = Ledger {
            account_id: 3,
            total: units(400),
            paid: units(100),
            balance: units(300),
            status: LedgerStatus::Partial,
        };

        let json = serde_json::to_value(&ledger).unwrap();
        assert_eq!(json["total_cents"], 40_000);
        assert_eq!(json["paid_cents"], 10_000);
        assert_eq!(json["balance_cents"], 30_000);
        assert_eq!(json["status"], "partial");
    }
}
