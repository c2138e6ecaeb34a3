// Camp Ledger CLI - seed, verify, export and stats for the registration
// database. The HTTP API lives in the camp-server binary.

use anyhow::Result;
use camp_ledger::export::export_participants_csv;
use camp_ledger::reports;
use camp_ledger::seed::seed_demo;
use camp_ledger::{Store, VERSION};
use std::env;
use std::fs::File;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("seed") => run_seed(),
        Some("stats") => run_stats(),
        Some("verify") => run_verify(),
        Some("export") => {
            let path = args.get(2).map(String::as_str).unwrap_or("participants.csv");
            run_export(path)
        }
        _ => {
            print_usage();
            Ok(())
        }
    }
}

fn db_path() -> String {
    env::var("CAMP_LEDGER_DB").unwrap_or_else(|_| "camp-ledger.db".to_string())
}

fn run_seed() -> Result<()> {
    let path = db_path();
    let store = Store::open(&path)?;

    let summary = seed_demo(&store)?;
    if summary.is_empty() {
        println!("Database already has accounts; nothing to seed.");
    } else {
        println!(
            "✓ Seeded {} accounts, {} participants, {} payments into {}",
            summary.accounts, summary.participants, summary.payments, path
        );
    }
    Ok(())
}

fn run_stats() -> Result<()> {
    let store = Store::open(db_path())?;
    let stats = reports::admin_stats(&store)?;

    println!("Camp Ledger v{VERSION}");
    println!();
    println!("  Collected:  R$ {}", stats.total_collected);
    println!("  Pending:    R$ {}", stats.total_pending);
    println!("  Goal:       R$ {}", stats.goal);
    println!("  Slots used: {}/{}", stats.occupied_slots, stats.total_slots);
    Ok(())
}

fn run_verify() -> Result<()> {
    let store = Store::open(db_path())?;
    let accounts = store.accounts()?;

    let mut drifted = 0;
    for account in &accounts {
        let stored = store.ledger(account.id)?;
        let rebuilt = store.rebuild_ledger(account.id)?;

        if stored.total != rebuilt.total
            || stored.paid != rebuilt.paid
            || stored.balance != rebuilt.balance
        {
            drifted += 1;
            println!("✗ account {} ({})", account.id, account.name);
            println!(
                "    stored:  total {} paid {} balance {}",
                stored.total, stored.paid, stored.balance
            );
            println!(
                "    rebuilt: total {} paid {} balance {}",
                rebuilt.total, rebuilt.paid, rebuilt.balance
            );
        }
    }

    if drifted == 0 {
        println!(
            "✓ {} ledgers consistent with participant and payment history",
            accounts.len()
        );
        Ok(())
    } else {
        Err(anyhow::anyhow!(
            "{drifted} of {} ledgers drifted from source data",
            accounts.len()
        ))
    }
}

fn run_export(path: &str) -> Result<()> {
    let store = Store::open(db_path())?;
    let file = File::create(path)?;
    export_participants_csv(&store, file)?;
    println!("✓ Exported participant roster to {path}");
    Ok(())
}

fn print_usage() {
    println!("Camp Ledger v{VERSION}");
    println!();
    println!("Usage: camp-ledger <command>");
    println!();
    println!("Commands:");
    println!("  seed             Populate an empty database with demo families");
    println!("  stats            Print collected/pending totals and slot usage");
    println!("  verify           Compare stored ledgers against rebuilt ones");
    println!("  export [path]    Write the participant roster CSV (default participants.csv)");
    println!();
    println!("Environment:");
    println!("  CAMP_LEDGER_DB   SQLite path (default camp-ledger.db)");
}
