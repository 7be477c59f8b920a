//! Monetary Policy Engine
//!
//! Time-gated controller that reads a market exchange rate and a price index,
//! derives a damped supply adjustment and forwards it to a rebase ledger.
//!
//! # Architecture
//!
//! - **Window gate**: at most one rebase per eligible window ([`window`])
//! - **Oracles**: read-only feeds with a validity flag ([`oracle`])
//! - **Policy**: fixed-point delta computation and commit ([`policy`])
//! - **Scheduler**: polling loop acting as the orchestrator ([`scheduler`])
//!
//! # Example
//!
//! ```no_run
//! use monetary_policy::{Config, MonetaryPolicy, StaticOracle, SystemClock};
//! use rebase_ledger::{Capabilities, RebaseLedger};
//! use std::sync::Arc;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let addresses = &config.addresses;
//!
//!     let caps = Capabilities::new(addresses.owner).with_monetary_policy(addresses.policy);
//!     let mut ledger = RebaseLedger::new(config.ledger.clone(), caps)?;
//!     ledger.initialize(addresses.owner)?;
//!
//!     let mut policy = MonetaryPolicy::from_config(&config, ledger, Arc::new(SystemClock))?;
//!     let oracle = Arc::new(StaticOracle::new(config.base_cpi()?));
//!     policy.set_cpi_oracle(&addresses.owner, oracle)?;
//!
//!     if policy.in_rebase_window() {
//!         let outcome = policy.rebase(&addresses.orchestrator)?;
//!         println!("epoch {} supply {}", outcome.record.epoch, outcome.total_supply);
//!     }
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod clock;
pub mod config;
pub mod error;
pub mod metrics;
pub mod oracle;
pub mod policy;
pub mod scheduler;
pub mod window;

// Re-exports
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use error::{Error, Result};
pub use metrics::Metrics;
pub use oracle::{CpiOracle, MarketOracle, OracleReading, StaticOracle};
pub use policy::{
    compute_supply_delta, MonetaryPolicy, PolicyRecord, RebaseOutcome, SupplyLedger, MAX_RATE,
};
pub use scheduler::{RebaseScheduler, SharedPolicy};
pub use window::{next_window, window_for, RebaseTiming, RebaseWindow};
