// 🌱 Seed - demo data for a fresh database
// Everything goes through the public operations, so seeded prices and
// ledgers come out of the same code paths production uses.

use crate::entities::Role;
use crate::error::{Error, Result};
use crate::money::Money;
use crate::pricing::classify_age;
use crate::store::Store;
use chrono::NaiveDate;
use tracing::info;

struct DemoMember {
    name: &'static str,
    age: i64,
    days: i64,
}

struct DemoFamily {
    leader: &'static str,
    email: &'static str,
    members: &'static [DemoMember],
    /// Installments already paid: (whole units, ISO date).
    payments: &'static [(i64, &'static str)],
}

const DEMO_FAMILIES: &[DemoFamily] = &[
    DemoFamily {
        leader: "Ana Prado",
        email: "ana.prado@example.com",
        members: &[
            DemoMember { name: "Ana Prado", age: 38, days: 4 },
            DemoMember { name: "Caio Prado", age: 40, days: 4 },
            DemoMember { name: "Pedro Prado", age: 13, days: 4 },
            DemoMember { name: "Luiza Prado", age: 8, days: 4 },
        ],
        payments: &[(200, "2026-02-10"), (150, "2026-03-10")],
    },
    DemoFamily {
        leader: "Bruno Keller",
        email: "bruno.keller@example.com",
        members: &[
            DemoMember { name: "Bruno Keller", age: 45, days: 3 },
            DemoMember { name: "Marta Keller", age: 44, days: 3 },
            DemoMember { name: "Ivo Keller", age: 17, days: 3 },
        ],
        payments: &[(370, "2026-01-20")],
    },
    DemoFamily {
        leader: "Clara Duarte",
        email: "clara.duarte@example.com",
        members: &[
            DemoMember { name: "Clara Duarte", age: 29, days: 2 },
            DemoMember { name: "Tomas Duarte", age: 31, days: 2 },
        ],
        payments: &[],
    },
    DemoFamily {
        leader: "Davi Rocha",
        email: "davi.rocha@example.com",
        members: &[
            DemoMember { name: "Davi Rocha", age: 52, days: 4 },
            DemoMember { name: "Rute Rocha", age: 50, days: 4 },
            DemoMember { name: "Ester Rocha", age: 19, days: 4 },
            DemoMember { name: "Noemi Rocha", age: 9, days: 4 },
        ],
        payments: &[(400, "2026-01-16"), (400, "2026-02-16")],
    },
    DemoFamily {
        leader: "Elisa Fontes",
        email: "elisa.fontes@example.com",
        members: &[
            DemoMember { name: "Elisa Fontes", age: 33, days: 1 },
            DemoMember { name: "Joel Fontes", age: 35, days: 1 },
            DemoMember { name: "Sara Fontes", age: 6, days: 1 },
        ],
        payments: &[(300, "2026-01-05")],
    },
    DemoFamily {
        leader: "Fabio Lima",
        email: "fabio.lima@example.com",
        members: &[DemoMember { name: "Fabio Lima", age: 21, days: 2 }],
        payments: &[(100, "2026-03-02")],
    },
];

/// Counts reported by `seed_demo`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub accounts: usize,
    pub participants: usize,
    pub payments: usize,
}

impl SeedSummary {
    pub fn is_empty(&self) -> bool {
        self.accounts == 0
    }
}

/// Populate an empty database with demo families. A database that already
/// has accounts is left untouched.
pub fn seed_demo(store: &Store) -> Result<SeedSummary> {
    if !store.accounts()?.is_empty() {
        info!("seed skipped: accounts already present");
        return Ok(SeedSummary {
            accounts: 0,
            participants: 0,
            payments: 0,
        });
    }

    store.create_account("Admin", Some("admin@example.com"), Role::Admin)?;
    let mut summary = SeedSummary {
        accounts: 1,
        participants: 0,
        payments: 0,
    };

    for family in DEMO_FAMILIES {
        let account = store.create_account(family.leader, Some(family.email), Role::FamilyLeader)?;
        summary.accounts += 1;

        for member in family.members {
            // the age bands pick the category, same as an age edit would
            store.add_participant(
                account.id,
                member.name,
                classify_age(member.age),
                member.age,
                member.days,
            )?;
            summary.participants += 1;
        }

        for (units, day) in family.payments {
            let paid_on: NaiveDate = day
                .parse()
                .map_err(|e| Error::Internal(format!("invalid demo date '{day}': {e}")))?;
            store.record_payment(account.id, Money::from_units(*units), paid_on, None)?;
            summary.payments += 1;
        }
    }

    info!(
        accounts = summary.accounts,
        participants = summary.participants,
        payments = summary.payments,
        "seeded demo data"
    );
    Ok(summary)
}

// ============================================================================
// TESTS
// ============================================================================
