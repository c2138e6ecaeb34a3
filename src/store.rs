// 🗄️ Store - SQLite persistence
// Owns the connection behind a mutex; every reader and writer goes through
// this handle, and mutations run as SQLite transactions.

use crate::entities::{Account, Ledger, LedgerStatus, Participant, Payment, Role};
use crate::error::{Error, Result};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Shared SQLite handle.
///
/// The mutex serializes all access; each mutating operation additionally
/// wraps its reads and writes in one SQLite transaction so partial updates
/// never become visible.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Open (creating if needed) the database at `path` and apply the schema.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Store> {
        let conn = Connection::open(path)?;
        // WAL for crash recovery
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Store::from_connection(conn)
    }

    /// In-memory database, schema applied. Used by the test suites.
    pub fn open_in_memory() -> Result<Store> {
        Store::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Store> {
        setup_schema(&conn)?;
        Ok(Store {
            conn: Mutex::new(conn),
        })
    }

    /// Lock the connection. A poisoned lock reports as an internal error
    /// instead of propagating the panic.
    pub(crate) fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::Internal("store mutex poisoned".to_string()))
    }

    // ========================================================================
    // ACCOUNTS
    // ========================================================================

    /// Insert an account together with its zeroed ledger row.
    pub fn create_account(
        &self,
        name: &str,
        email: Option<&str>,
        role: Role,
    ) -> Result<Account> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidInput(
                "account name must not be blank".to_string(),
            ));
        }

        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;

        let is_leader = role == Role::FamilyLeader;
        if let Err(e) = tx.execute(
            "INSERT INTO accounts (name, email, role, is_leader) VALUES (?1, ?2, ?3, ?4)",
            params![name, email, role, is_leader],
        ) {
            if is_unique_violation(&e) {
                return Err(Error::InvalidInput(format!(
                    "email already registered: {}",
                    email.unwrap_or_default()
                )));
            }
            return Err(e.into());
        }
        let id = tx.last_insert_rowid();

        tx.execute(
            "INSERT INTO ledgers (account_id, total_cents, paid_cents, balance_cents, status)
             VALUES (?1, 0, 0, 0, ?2)",
            params![id, LedgerStatus::Pending],
        )?;

        tx.commit()?;

        Ok(Account {
            id,
            name: name.to_string(),
            email: email.map(str::to_string),
            role,
            is_leader,
        })
    }

    pub fn account(&self, id: i64) -> Result<Account> {
        let conn = self.lock_conn()?;
        conn.query_row(
            "SELECT id, name, email, role, is_leader FROM accounts WHERE id = ?1",
            params![id],
            map_account,
        )
        .optional()?
        .ok_or_else(|| Error::NotFound(format!("account {id}")))
    }

    pub fn accounts(&self) -> Result<Vec<Account>> {
        let conn = self.lock_conn()?;
        let mut stmt =
            conn.prepare("SELECT id, name, email, role, is_leader FROM accounts ORDER BY id")?;
        let rows = stmt.query_map([], map_account)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Family-leader accounts only, for the admin views.
    pub fn family_accounts(&self) -> Result<Vec<Account>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, email, role, is_leader FROM accounts
             WHERE role = ?1 ORDER BY name",
        )?;
        let rows = stmt.query_map(params![Role::FamilyLeader], map_account)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    // ========================================================================
    // PARTICIPANTS
    // ========================================================================

    pub fn participant(&self, id: i64) -> Result<Participant> {
        let conn = self.lock_conn()?;
        conn.query_row(
            "SELECT id, account_id, leader_name, name, category, age, days, price_cents
             FROM participants WHERE id = ?1",
            params![id],
            map_participant,
        )
        .optional()?
        .ok_or_else(|| Error::NotFound(format!("participant {id}")))
    }

    pub fn participants(&self, account_id: i64) -> Result<Vec<Participant>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, account_id, leader_name, name, category, age, days, price_cents
             FROM participants WHERE account_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![account_id], map_participant)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    // ========================================================================
    // PAYMENTS
    // ========================================================================

    pub fn payment(&self, id: i64) -> Result<Payment> {
        let conn = self.lock_conn()?;
        conn.query_row(
            "SELECT id, account_id, amount_cents, paid_on, receipt, status, seen
             FROM payments WHERE id = ?1",
            params![id],
            map_payment,
        )
        .optional()?
        .ok_or_else(|| Error::NotFound(format!("payment {id}")))
    }

    /// An account's payments, newest first.
    pub fn payments(&self, account_id: i64) -> Result<Vec<Payment>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, account_id, amount_cents, paid_on, receipt, status, seen
             FROM payments WHERE account_id = ?1 ORDER BY paid_on DESC, id DESC",
        )?;
        let rows = stmt.query_map(params![account_id], map_payment)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Validated payments no admin has reviewed yet, newest first.
    pub fn unseen_payments(&self) -> Result<Vec<Payment>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, account_id, amount_cents, paid_on, receipt, status, seen
             FROM payments WHERE seen = 0 AND status = 'validated'
             ORDER BY paid_on DESC, id DESC",
        )?;
        let rows = stmt.query_map([], map_payment)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Mark every unseen validated payment as reviewed. Returns the count.
    pub fn mark_payments_seen(&self) -> Result<usize> {
        let conn = self.lock_conn()?;
        let marked = conn.execute(
            "UPDATE payments SET seen = 1 WHERE seen = 0 AND status = 'validated'",
            [],
        )?;
        Ok(marked)
    }

    // ========================================================================
    // LEDGERS
    // ========================================================================

    pub fn ledger(&self, account_id: i64) -> Result<Ledger> {
        let conn = self.lock_conn()?;
        conn.query_row(
            "SELECT account_id, total_cents, paid_cents, balance_cents, status
             FROM ledgers WHERE account_id = ?1",
            params![account_id],
            map_ledger,
        )
        .optional()?
        .ok_or_else(|| Error::NotFound(format!("ledger for account {account_id}")))
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

// ============================================================================
// SCHEMA
// ============================================================================

fn setup_schema(conn: &Connection) -> Result<()> {
    // ==========================================================================
    // Accounts Table (one row per registered family, plus admins)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS accounts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            email TEXT UNIQUE,
            role TEXT NOT NULL DEFAULT 'family-leader',
            is_leader INTEGER NOT NULL DEFAULT 1
        )",
        [],
    )?;

    // ==========================================================================
    // Participants Table (price frozen at last classification)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS participants (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            account_id INTEGER NOT NULL,
            leader_name TEXT NOT NULL,
            name TEXT NOT NULL,
            category TEXT NOT NULL,
            age INTEGER NOT NULL,
            days INTEGER NOT NULL,
            price_cents INTEGER NOT NULL,
            FOREIGN KEY (account_id) REFERENCES accounts (id)
        )",
        [],
    )?;

    // ==========================================================================
    // Payments Table (signed amounts; rejected rows are kept)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS payments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            account_id INTEGER NOT NULL,
            amount_cents INTEGER NOT NULL,
            paid_on TEXT NOT NULL,
            receipt BLOB,
            status TEXT NOT NULL DEFAULT 'validated',
            seen INTEGER NOT NULL DEFAULT 0,
            FOREIGN KEY (account_id) REFERENCES accounts (id)
        )",
        [],
    )?;

    // ==========================================================================
    // Ledgers Table (exactly one per account)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS ledgers (
            account_id INTEGER PRIMARY KEY,
            total_cents INTEGER NOT NULL DEFAULT 0,
            paid_cents INTEGER NOT NULL DEFAULT 0,
            balance_cents INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL DEFAULT 'pending',
            FOREIGN KEY (account_id) REFERENCES accounts (id)
        )",
        [],
    )?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_participants_account ON participants(account_id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_payments_account ON payments(account_id)",
        [],
    )?;

    Ok(())
}

// ============================================================================
// ROW MAPPING
// ============================================================================

pub(crate) fn map_account(row: &Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        role: row.get(3)?,
        is_leader: row.get(4)?,
    })
}

pub(crate) fn map_participant(row: &Row<'_>) -> rusqlite::Result<Participant> {
    Ok(Participant {
        id: row.get(0)?,
        account_id: row.get(1)?,
        leader_name: row.get(2)?,
        name: row.get(3)?,
        category: row.get(4)?,
        age: row.get(5)?,
        days: row.get(6)?,
        price: row.get(7)?,
    })
}

pub(crate) fn map_payment(row: &Row<'_>) -> rusqlite::Result<Payment> {
    let date_text: String = row.get(3)?;
    let paid_on: NaiveDate = date_text.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(Payment {
        id: row.get(0)?,
        account_id: row.get(1)?,
        amount: row.get(2)?,
        paid_on,
        receipt: row.get(4)?,
        status: row.get(5)?,
        seen: row.get(6)?,
    })
}

pub(crate) fn map_ledger(row: &Row<'_>) -> rusqlite::Result<Ledger> {
    Ok(Ledger {
        account_id: row.get(0)?,
        total: row.get(1)?,
        paid: row.get(2)?,
        balance: row.get(3)?,
        status: row.get(4)?,
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;

    #[test]
    fn test_schema_setup_is_idempotent() {
        let store = Store::open_in_memory().unwrap();
        let conn = store.lock_conn().unwrap();
        setup_schema(&conn).unwrap();

        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'
                 AND name IN ('accounts', 'participants', 'payments', 'ledgers')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 4, "all four tables should exist");
    }

    #[test]
    fn test_create_account_creates_zeroed_ledger() {
        let store = Store::open_in_memory().unwrap();
        let account = store
            .create_account("Vera Calado", Some("vera@example.com"), Role::FamilyLeader)
            .unwrap();

        assert!(account.is_leader);
        assert_eq!(account.role, Role::FamilyLeader);

        let ledger = store.ledger(account.id).unwrap();
        assert_eq!(ledger.total, Money::ZERO);
        assert_eq!(ledger.paid, Money::ZERO);
        assert_eq!(ledger.balance, Money::ZERO);
        assert_eq!(ledger.status, LedgerStatus::Pending);
    }

    #[test]
    fn test_admin_account_is_not_leader() {
        let store = Store::open_in_memory().unwrap();
        let admin = store.create_account("Admin", None, Role::Admin).unwrap();

        assert!(!admin.is_leader);
        // admins still get a ledger row so per-account invariants hold
        assert!(store.ledger(admin.id).is_ok());
    }

    #[test]
    fn test_blank_account_name_is_invalid() {
        let store = Store::open_in_memory().unwrap();
        let err = store
            .create_account("   ", None, Role::FamilyLeader)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_duplicate_email_is_invalid_input() {
        let store = Store::open_in_memory().unwrap();
        store
            .create_account("Ana", Some("ana@example.com"), Role::FamilyLeader)
            .unwrap();

        let err = store
            .create_account("Other Ana", Some("ana@example.com"), Role::FamilyLeader)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));

        // the failed insert must not leave an account or a ledger behind
        assert_eq!(store.accounts().unwrap().len(), 1);
    }

    #[test]
    fn test_missing_rows_are_not_found() {
        let store = Store::open_in_memory().unwrap();
        assert!(matches!(store.account(99), Err(Error::NotFound(_))));
        assert!(matches!(store.participant(99), Err(Error::NotFound(_))));
        assert!(matches!(store.payment(99), Err(Error::NotFound(_))));
        assert!(matches!(store.ledger(99), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_family_accounts_excludes_admins() {
        let store = Store::open_in_memory().unwrap();
        store.create_account("Admin", None, Role::Admin).unwrap();
        store
            .create_account("Bruna", None, Role::FamilyLeader)
            .unwrap();

        let families = store.family_accounts().unwrap();
        assert_eq!(families.len(), 1);
        assert_eq!(families[0].name, "Bruna");
    }
}
