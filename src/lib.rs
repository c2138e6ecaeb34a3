// Camp Ledger - Core Library
// Family registration, pricing and payment reconciliation for a multi-day
// event. Exposes all modules for use in the CLI, the API server, and tests.

pub mod entities;
pub mod error;
pub mod export;
pub mod money;
pub mod pricing;
pub mod reconciliation;
pub mod reports;
pub mod seed;
pub mod store;

// REST API only compiles with the server feature
#[cfg(feature = "server")]
pub mod api;

// Re-export commonly used types
pub use entities::{Account, Ledger, LedgerStatus, Participant, Payment, PaymentStatus, Role};
pub use error::{Error, Result};
pub use money::Money;
pub use pricing::{classify_age, price, Category};
pub use seed::{seed_demo, SeedSummary};
pub use store::Store;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
