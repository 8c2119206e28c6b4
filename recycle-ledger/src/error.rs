//! Error types for the ledger

use crate::types::Amount;
use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger errors
#[derive(Error, Debug)]
pub enum Error {
    /// Caller is not the owner for an owner-gated operation
    #[error("Unauthorized: caller {0} is not the owner")]
    Unauthorized(String),

    /// Treasury cannot cover a deposit's computed reward
    #[error("Not enough contract balance: reward {required} exceeds treasury {available}")]
    InsufficientFunds {
        /// Reward the deposit would credit
        required: Amount,
        /// Spendable treasury funds
        available: Amount,
    },

    /// Non-positive or malformed quantity/amount
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    /// Withdrawal attempted with a zero balance
    #[error("No balance to withdraw for {0}")]
    NoBalance(String),

    /// Badge lookup with an out-of-range identifier
    #[error("Badge does not exist: {0}")]
    BadgeNotFound(u64),

    /// Outbound transfer could not be completed after the balance was zeroed
    #[error("Transfer failed: {0}")]
    TransferFailed(String),

    /// Invariant violation (arithmetic overflow, monotonicity, etc.)
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Storage error (RocksDB)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Concurrency error (actor mailbox closed, etc.)
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}
