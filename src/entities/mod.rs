// Entity Models
// One file per entity. Accounts own participants, payments and exactly one
// ledger; everything money-shaped is integer centavos.

pub mod account;
pub mod ledger;
pub mod participant;
pub mod payment;

pub use account::{Account, Role};
pub use ledger::{Ledger, LedgerStatus};
pub use participant::Participant;
pub use payment::{Payment, PaymentStatus};
