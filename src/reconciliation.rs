// ⚖️ Reconciliation - the ledger operations
// Every mutation here runs inside one SQLite transaction: the reads it
// depends on and the writes it makes commit together or not at all, and each
// one ends by recomputing the owning ledger's status.
//
// The invariant being protected:
//   total = Σ participants.price
//   paid  = Σ payments.amount (status != rejected)
//   balance = total - paid
// `rebuild_ledger` recomputes that from source data and never writes; the
// `verify` command compares it against the stored row.

use crate::entities::{Ledger, LedgerStatus, Participant, Payment, PaymentStatus};
use crate::error::{Error, Result};
use crate::money::Money;
use crate::pricing::{classify_age, price, Category};
use crate::store::{map_ledger, map_participant, map_payment, Store};
use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension, Transaction};
use tracing::warn;

impl Store {
    // ========================================================================
    // PARTICIPANT OPERATIONS
    // ========================================================================

    /// Register a family member and charge the account's ledger.
    ///
    /// The category is taken as given; reclassification only happens on age
    /// edits. `leader_name` is snapshotted from the account at insert time.
    pub fn add_participant(
        &self,
        account_id: i64,
        name: &str,
        category: Category,
        age: i64,
        days: i64,
    ) -> Result<Participant> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidInput(
                "participant name must not be blank".to_string(),
            ));
        }
        if age < 0 {
            return Err(Error::InvalidInput(format!(
                "age must not be negative (got {age})"
            )));
        }
        if days < 0 {
            return Err(Error::InvalidInput(format!(
                "day count must not be negative (got {days})"
            )));
        }

        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;

        let leader_name = account_name_in_tx(&tx, account_id)?;
        let participant_price = price(category, days);

        tx.execute(
            "INSERT INTO participants (account_id, leader_name, name, category, age, days, price_cents)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![account_id, leader_name, name, category, age, days, participant_price],
        )?;
        let id = tx.last_insert_rowid();

        let ledger = ledger_in_tx(&tx, account_id)?;
        apply_ledger(&tx, account_id, ledger.total + participant_price, ledger.paid)?;

        tx.commit()?;

        Ok(Participant {
            id,
            account_id,
            leader_name,
            name: name.to_string(),
            category,
            age,
            days,
            price: participant_price,
        })
    }

    /// Unregister a member and refund its price from the ledger.
    pub fn remove_participant(&self, participant_id: i64) -> Result<()> {
        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;

        let participant = participant_in_tx(&tx, participant_id)?;

        let ledger = ledger_in_tx(&tx, participant.account_id)?;
        apply_ledger(
            &tx,
            participant.account_id,
            ledger.total - participant.price,
            ledger.paid,
        )?;

        tx.execute(
            "DELETE FROM participants WHERE id = ?1",
            params![participant_id],
        )?;

        tx.commit()?;
        Ok(())
    }

    /// Rename and/or change the age of a participant.
    ///
    /// A new age reclassifies through the age bands and reprices the stay;
    /// the price difference is applied to the family ledger. Renaming the
    /// nominal leader (the participant whose name equals the account name)
    /// renames the account and rewrites `leader_name` across the family.
    pub fn edit_participant(
        &self,
        participant_id: i64,
        new_name: Option<&str>,
        new_age: Option<i64>,
    ) -> Result<Participant> {
        if let Some(age) = new_age {
            if age < 0 {
                return Err(Error::InvalidInput(format!(
                    "age must not be negative (got {age})"
                )));
            }
        }
        if let Some(name) = new_name {
            if name.trim().is_empty() {
                return Err(Error::InvalidInput(
                    "participant name must not be blank".to_string(),
                ));
            }
        }

        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;

        let mut participant = participant_in_tx(&tx, participant_id)?;

        if let Some(age) = new_age {
            let category = classify_age(age);
            let new_price = price(category, participant.days);
            let diff = new_price - participant.price;

            tx.execute(
                "UPDATE participants SET age = ?1, category = ?2, price_cents = ?3 WHERE id = ?4",
                params![age, category, new_price, participant_id],
            )?;

            let ledger = ledger_in_tx(&tx, participant.account_id)?;
            apply_ledger(&tx, participant.account_id, ledger.total + diff, ledger.paid)?;

            participant.age = age;
            participant.category = category;
            participant.price = new_price;
        }

        if let Some(name) = new_name {
            let name = name.trim();
            if name != participant.name {
                tx.execute(
                    "UPDATE participants SET name = ?1 WHERE id = ?2",
                    params![name, participant_id],
                )?;

                let account_name = account_name_in_tx(&tx, participant.account_id)?;
                if participant.name == account_name {
                    // nominal leader: rename account + every member's snapshot
                    tx.execute(
                        "UPDATE accounts SET name = ?1 WHERE id = ?2",
                        params![name, participant.account_id],
                    )?;
                    tx.execute(
                        "UPDATE participants SET leader_name = ?1 WHERE account_id = ?2",
                        params![name, participant.account_id],
                    )?;
                    participant.leader_name = name.to_string();
                }

                participant.name = name.to_string();
            }
        }

        tx.commit()?;
        Ok(participant)
    }

    // ========================================================================
    // PAYMENT OPERATIONS
    // ========================================================================

    /// Record a signed payment against an account.
    ///
    /// New payments are `validated` and unseen. Negative amounts are legal
    /// and act as manual reversals; `paid` is NOT floored here.
    pub fn record_payment(
        &self,
        account_id: i64,
        amount: Money,
        paid_on: NaiveDate,
        receipt: Option<Vec<u8>>,
    ) -> Result<Payment> {
        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;

        // existence check, also pins the account for the ledger update
        account_name_in_tx(&tx, account_id)?;

        tx.execute(
            "INSERT INTO payments (account_id, amount_cents, paid_on, receipt, status, seen)
             VALUES (?1, ?2, ?3, ?4, ?5, 0)",
            params![
                account_id,
                amount,
                paid_on.to_string(),
                receipt,
                PaymentStatus::Validated
            ],
        )?;
        let id = tx.last_insert_rowid();

        let ledger = ledger_in_tx(&tx, account_id)?;
        apply_ledger(&tx, account_id, ledger.total, ledger.paid + amount)?;

        tx.commit()?;

        Ok(Payment {
            id,
            account_id,
            amount,
            paid_on,
            receipt,
            status: PaymentStatus::Validated,
            seen: false,
        })
    }

    /// Reject a payment after review, reversing its ledger contribution.
    ///
    /// Idempotent: rejecting an already-rejected payment changes nothing.
    /// The row is kept (status `rejected`, marked seen) so the history stays
    /// visible to the family.
    pub fn reject_payment(&self, payment_id: i64) -> Result<()> {
        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;

        let payment = payment_in_tx(&tx, payment_id)?;
        if payment.status == PaymentStatus::Rejected {
            return Ok(());
        }

        tx.execute(
            "UPDATE payments SET status = ?1, seen = 1 WHERE id = ?2",
            params![PaymentStatus::Rejected, payment_id],
        )?;

        let ledger = ledger_in_tx(&tx, payment.account_id)?;
        let paid = floored_reversal(ledger.paid, &payment);
        apply_ledger(&tx, payment.account_id, ledger.total, paid)?;

        tx.commit()?;
        Ok(())
    }

    /// Permanently remove a payment.
    ///
    /// A validated payment is reversed out of the ledger first; a rejected
    /// one was already reversed, so only the row goes.
    pub fn delete_payment(&self, payment_id: i64) -> Result<()> {
        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;

        let payment = payment_in_tx(&tx, payment_id)?;

        if payment.status != PaymentStatus::Rejected {
            let ledger = ledger_in_tx(&tx, payment.account_id)?;
            let paid = floored_reversal(ledger.paid, &payment);
            apply_ledger(&tx, payment.account_id, ledger.total, paid)?;
        }

        tx.execute("DELETE FROM payments WHERE id = ?1", params![payment_id])?;

        tx.commit()?;
        Ok(())
    }

    // ========================================================================
    // REBUILD / VERIFY
    // ========================================================================

    /// Recompute an account's ledger from participants and payments alone.
    ///
    /// Read-only. The stored ledger and this rebuilt one agree after any
    /// clamp-free history; a paid floor (see `floored_reversal`) is exactly
    /// the kind of drift this surfaces.
    pub fn rebuild_ledger(&self, account_id: i64) -> Result<Ledger> {
        let conn = self.lock_conn()?;

        let exists: Option<i64> = conn
            .query_row(
                "SELECT id FROM accounts WHERE id = ?1",
                params![account_id],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_none() {
            return Err(Error::NotFound(format!("account {account_id}")));
        }

        let total: Money = conn.query_row(
            "SELECT COALESCE(SUM(price_cents), 0) FROM participants WHERE account_id = ?1",
            params![account_id],
            |row| row.get(0),
        )?;
        let paid: Money = conn.query_row(
            "SELECT COALESCE(SUM(amount_cents), 0) FROM payments
             WHERE account_id = ?1 AND status != ?2",
            params![account_id, PaymentStatus::Rejected],
            |row| row.get(0),
        )?;

        let balance = total - paid;
        Ok(Ledger {
            account_id,
            total,
            paid,
            balance,
            status: LedgerStatus::from_amounts(paid, balance),
        })
    }
}

// ============================================================================
// TRANSACTION HELPERS
// ============================================================================

fn account_name_in_tx(tx: &Transaction<'_>, account_id: i64) -> Result<String> {
    tx.query_row(
        "SELECT name FROM accounts WHERE id = ?1",
        params![account_id],
        |row| row.get(0),
    )
    .optional()?
    .ok_or_else(|| Error::NotFound(format!("account {account_id}")))
}

fn participant_in_tx(tx: &Transaction<'_>, id: i64) -> Result<Participant> {
    tx.query_row(
        "SELECT id, account_id, leader_name, name, category, age, days, price_cents
         FROM participants WHERE id = ?1",
        params![id],
        map_participant,
    )
    .optional()?
    .ok_or_else(|| Error::NotFound(format!("participant {id}")))
}

fn payment_in_tx(tx: &Transaction<'_>, id: i64) -> Result<Payment> {
    tx.query_row(
        "SELECT id, account_id, amount_cents, paid_on, receipt, status, seen
         FROM payments WHERE id = ?1",
        params![id],
        map_payment,
    )
    .optional()?
    .ok_or_else(|| Error::NotFound(format!("payment {id}")))
}

fn ledger_in_tx(tx: &Transaction<'_>, account_id: i64) -> Result<Ledger> {
    tx.query_row(
        "SELECT account_id, total_cents, paid_cents, balance_cents, status
         FROM ledgers WHERE account_id = ?1",
        params![account_id],
        map_ledger,
    )
    .optional()?
    .ok_or_else(|| Error::NotFound(format!("ledger for account {account_id}")))
}

/// Write back a ledger after a mutation. `balance` is always `total - paid`
/// and the status transition runs on the new amounts.
fn apply_ledger(
    tx: &Transaction<'_>,
    account_id: i64,
    total: Money,
    paid: Money,
) -> Result<Ledger> {
    let balance = total - paid;
    let status = LedgerStatus::from_amounts(paid, balance);

    let updated = tx.execute(
        "UPDATE ledgers SET total_cents = ?1, paid_cents = ?2, balance_cents = ?3, status = ?4
         WHERE account_id = ?5",
        params![total, paid, balance, status, account_id],
    )?;
    if updated == 0 {
        return Err(Error::NotFound(format!("ledger for account {account_id}")));
    }

    Ok(Ledger {
        account_id,
        total,
        paid,
        balance,
        status,
    })
}

/// Reverse a payment's contribution to `paid`, clamping at zero.
///
/// A clamp means the stored ledger no longer matches the payment history;
/// the warning plus `rebuild_ledger` make that drift visible instead of
/// silently corrupting the stored row into negative territory.
fn floored_reversal(current_paid: Money, payment: &Payment) -> Money {
    let reversed = current_paid - payment.amount;
    if reversed < Money::ZERO {
        warn!(
            payment_id = payment.id,
            account_id = payment.account_id,
            paid = %current_paid,
            amount = %payment.amount,
            "payment reversal clamped paid at zero"
        );
        return Money::ZERO;
    }
    reversed
}

// ============================================================================
// TESTS
// ============================================================================
