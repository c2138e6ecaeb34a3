// 📤 Export - roster CSV for the event team

use crate::error::Result;
use crate::reports::participants_with_ledgers;
use crate::store::Store;
use std::io::Write;

/// Write the participant roster as CSV: one row per participant joined with
/// its family's ledger. Money columns use plain decimal text.
pub fn export_participants_csv<W: Write>(store: &Store, writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    wtr.write_record([
        "account_id",
        "leader",
        "name",
        "category",
        "age",
        "days",
        "price",
        "family_total",
        "family_paid",
        "family_balance",
        "family_status",
    ])?;

    for (participant, ledger) in participants_with_ledgers(store)? {
        wtr.write_record([
            participant.account_id.to_string(),
            participant.leader_name,
            participant.name,
            participant.category.as_str().to_string(),
            participant.age.to_string(),
            participant.days.to_string(),
            participant.price.to_string(),
            ledger.total.to_string(),
            ledger.paid.to_string(),
            ledger.balance.to_string(),
            ledger.status.as_str().to_string(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
