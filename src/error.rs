// Crate-wide error type shared by the store, the ledger operations,
// the exporters and the API layer.

use thiserror::Error;

/// Errors surfaced by the camp-ledger library.
#[derive(Error, Debug)]
pub enum Error {
    /// Referenced account, participant or payment does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Caller-supplied data failed validation
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// SQLite failure
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// CSV serialization failure
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// I/O failure
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Invariant breach that callers cannot act on
    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
