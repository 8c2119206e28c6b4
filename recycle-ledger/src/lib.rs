//! RecycleChain Reward Ledger
//!
//! Reward-accounting ledger that credits users for recycling contributions,
//! tracks achievement badges, and pays out accrued rewards on withdrawal.
//!
//! # Architecture
//!
//! - **Single Writer**: all mutations flow through one actor task
//! - **Exact Arithmetic**: unsigned wei amounts, checked operations
//! - **Durable State**: accounts, badges, rates, and treasury in RocksDB
//!
//! # Invariants
//!
//! - Deposit counters never decrease
//! - A deposit's reward is covered by the treasury or fully rejected
//! - Withdrawal zeroes the balance before funds move; transfer failure never
//!   resurrects a zeroed balance
//! - Badge ids are sequential from 0 and never reused

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod actor;
pub mod auth;
pub mod config;
pub mod error;
pub mod ledger;
pub mod metrics;
pub mod storage;
pub mod types;

// Re-exports
pub use auth::OwnerGuard;
pub use config::Config;
pub use error::{Error, Result};
pub use ledger::Ledger;
pub use storage::{Storage, StorageStats};
pub use types::{Amount, Badge, Material, RewardRates, UserAccount, UserAddress};
