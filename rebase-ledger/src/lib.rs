//! Rebase Ledger
//!
//! Elastic-supply token ledger whose total supply is adjusted by a monetary
//! policy while every holder's share stays proportional.
//!
//! # Architecture
//!
//! - **Granules**: Balances live in a fixed internal unit; display balances are
//!   derived through a single scale factor
//! - **Capabilities**: Owner configures, monetary policy rebases, nobody else
//! - **Atomic calls**: Every mutation validates fully before writing anything
//! - **Journal**: Each state change appends a [`LedgerEvent`]
//!
//! # Invariants
//!
//! - Granule conservation: Σ(account granules) == total granules, forever
//! - Supply bounds: `MIN_SUPPLY <= total_supply <= MAX_SUPPLY`
//! - Proportionality: a rebase never changes anyone's share of supply

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod capabilities;
pub mod config;
pub mod error;
pub mod fixed_point;
pub mod ledger;
pub mod metrics;
pub mod reward;
pub mod types;

// Re-exports
pub use capabilities::Capabilities;
pub use config::{Config, RewardConfig};
pub use error::{Error, Result};
pub use fixed_point::{FixedPoint, MathError};
pub use ledger::{RebaseLedger, SharedLedger};
pub use metrics::Metrics;
pub use primitive_types::U256;
pub use types::{
    Address, Amount, EventKind, LedgerEvent, SupplyDelta, TransferReceipt, DECIMALS, MAX_SUPPLY,
    MIN_SUPPLY,
};
