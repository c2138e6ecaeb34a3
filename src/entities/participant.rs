// 🧒 Participant - one attending family member

use crate::money::Money;
use crate::pricing::Category;
use serde::{Deserialize, Serialize};

/// One person attending the event, priced individually.
///
/// `leader_name` is a denormalized copy of the owning account's name and is
/// rewritten when the nominal leader is renamed. `price` is the price frozen
/// at the last (re)classification; summing it over a family gives the
/// ledger's `total`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub id: i64,
    pub account_id: i64,
    pub leader_name: String,
    pub name: String,
    pub category: Category,
    pub age: i64,
    pub days: i64,
    #[serde(rename = "price_cents")]
    pub price: Money,
}
