// 📊 Reports - admin aggregates over the ledgers

use crate::entities::{Account, Ledger, Participant, Payment};
use crate::error::Result;
use crate::money::Money;
use crate::pricing::Category;
use crate::store::Store;
use rusqlite::params;
use serde::{Deserialize, Serialize};

/// Paying slots available at the venue.
pub const EVENT_CAPACITY: i64 = 55;

/// Fundraising goal for the event.
pub const FUNDRAISING_GOAL: Money = Money::from_units(16_000);

/// Months on the suggested installment plan (monthly payments until the
/// event).
pub const INSTALLMENT_MONTHS: i64 = 9;

/// Dashboard headline numbers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminStats {
    #[serde(rename = "total_collected_cents")]
    pub total_collected: Money,
    #[serde(rename = "total_pending_cents")]
    pub total_pending: Money,
    /// Participants occupying a paying slot (everyone but exempt children).
    pub occupied_slots: i64,
    pub total_slots: i64,
    #[serde(rename = "goal_cents")]
    pub goal: Money,
}

/// One family's full picture for the admin dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FamilyOverview {
    pub account: Account,
    pub ledger: Ledger,
    pub members: Vec<Participant>,
    pub payments: Vec<Payment>,
    #[serde(rename = "monthly_installment_cents")]
    pub monthly_installment: Money,
}

pub fn admin_stats(store: &Store) -> Result<AdminStats> {
    let conn = store.lock_conn()?;

    let (total_collected, total_pending): (Money, Money) = conn.query_row(
        "SELECT COALESCE(SUM(paid_cents), 0), COALESCE(SUM(balance_cents), 0) FROM ledgers",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    let occupied_slots: i64 = conn.query_row(
        "SELECT COUNT(*) FROM participants WHERE category != ?1",
        params![Category::Exempt],
        |row| row.get(0),
    )?;

    Ok(AdminStats {
        total_collected,
        total_pending,
        occupied_slots,
        total_slots: EVENT_CAPACITY,
        goal: FUNDRAISING_GOAL,
    })
}

/// Every family-leader account with ledger, members, payment history and the
/// suggested installment.
pub fn families_overview(store: &Store) -> Result<Vec<FamilyOverview>> {
    let accounts = store.family_accounts()?;

    let mut overviews = Vec::with_capacity(accounts.len());
    for account in accounts {
        let ledger = store.ledger(account.id)?;
        let members = store.participants(account.id)?;
        let payments = store.payments(account.id)?;
        let monthly_installment = monthly_installment(ledger.balance, INSTALLMENT_MONTHS);
        overviews.push(FamilyOverview {
            account,
            ledger,
            members,
            payments,
            monthly_installment,
        });
    }
    Ok(overviews)
}

/// The export/admin join: every participant paired with its family's ledger.
pub fn participants_with_ledgers(store: &Store) -> Result<Vec<(Participant, Ledger)>> {
    let mut rows = Vec::new();
    for account in store.family_accounts()? {
        let ledger = store.ledger(account.id)?;
        for participant in store.participants(account.id)? {
            rows.push((participant, ledger.clone()));
        }
    }
    Ok(rows)
}

/// Equal monthly payments that settle `balance` in `months` months, rounded
/// up to the next centavo so the plan always covers the balance. Zero for
/// settled or credit balances.
pub fn monthly_installment(balance: Money, months: i64) -> Money {
    if balance <= Money::ZERO || months <= 0 {
        return Money::ZERO;
    }
    Money::from_cents((balance.cents() + months - 1) / months)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Role;

    fn build_demo_store() -> Store {
        let store = Store::open_in_memory().unwrap();
        store.create_account("Admin", None, Role::Admin).unwrap();

        let prado = store
            .create_account("Ana Prado", None, Role::FamilyLeader)
            .unwrap()
            .id;
        store
            .add_participant(prado, "Ana Prado", Category::Adult, 38, 4)
            .unwrap();
        store
            .add_participant(prado, "Luiza Prado", Category::Exempt, 8, 4)
            .unwrap();
        store
            .record_payment(prado, Money::from_units(150), "2026-02-10".parse().unwrap(), None)
            .unwrap();

        let keller = store
            .create_account("Bruno Keller", None, Role::FamilyLeader)
            .unwrap()
            .id;
        store
            .add_participant(keller, "Bruno Keller", Category::Teen, 15, 2)
            .unwrap();

        store
    }

    #[test]
    fn test_admin_stats_sums_ledgers() {
        let store = build_demo_store();
        let stats = admin_stats(&store).unwrap();

        // collected: 150 from Prado; pending: (400 - 150) + 150
        assert_eq!(stats.total_collected, Money::from_units(150));
        assert_eq!(stats.total_pending, Money::from_units(400));
        assert_eq!(stats.total_slots, EVENT_CAPACITY);
        assert_eq!(stats.goal, FUNDRAISING_GOAL);
    }

    #[test]
    fn test_occupancy_excludes_exempt_children() {
        let store = build_demo_store();
        let stats = admin_stats(&store).unwrap();
        // Ana (adult) + Bruno (teen); Luiza is exempt
        assert_eq!(stats.occupied_slots, 2);
    }

    #[test]
    fn test_families_overview_skips_admin_and_fills_installment() {
        let store = build_demo_store();
        let overviews = families_overview(&store).unwrap();

        assert_eq!(overviews.len(), 2, "admin account must not appear");

        let prado = overviews
            .iter()
            .find(|o| o.account.name == "Ana Prado")
            .unwrap();
        assert_eq!(prado.members.len(), 2);
        assert_eq!(prado.payments.len(), 1);
        assert_eq!(prado.ledger.balance, Money::from_units(250));
        // 25000 / 9 rounds up to 2778 centavos
        assert_eq!(prado.monthly_installment, Money::from_cents(2778));
    }

    #[test]
    fn test_participants_with_ledgers_joins_family_money() {
        let store = build_demo_store();
        let rows = participants_with_ledgers(&store).unwrap();
        assert_eq!(rows.len(), 3);

        let (luiza, ledger) = rows
            .iter()
            .find(|(p, _)| p.name == "Luiza Prado")
            .unwrap();
        assert_eq!(luiza.price, Money::ZERO);
        assert_eq!(ledger.total, Money::from_units(400));
    }

    #[test]
    fn test_monthly_installment_rounds_up() {
        assert_eq!(
            monthly_installment(Money::from_units(900), 9),
            Money::from_units(100)
        );
        // 100000 / 9 = 11111.1 centavos; plan rounds to 11112
        assert_eq!(
            monthly_installment(Money::from_units(1000), 9),
            Money::from_cents(11_112)
        );
    }

    #[test]
    fn test_monthly_installment_zero_for_settled_or_credit() {
        assert_eq!(monthly_installment(Money::ZERO, 9), Money::ZERO);
        assert_eq!(monthly_installment(Money::from_units(-100), 9), Money::ZERO);
        assert_eq!(monthly_installment(Money::from_units(100), 0), Money::ZERO);
    }
}
