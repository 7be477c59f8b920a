//! Metrics collection for observability
//!
//! This module provides Prometheus metrics for monitoring the ledger.
//!
//! # Metrics
//!
//! - `rebase_ledger_transfers_total` - Successful transfers
//! - `rebase_ledger_fees_collected` - Display units routed to the reward address
//! - `rebase_ledger_rebases_total` - Applied rebases
//! - `rebase_ledger_total_supply` - Supply after the latest rebase (lossy `f64`)
//! - `rebase_ledger_rejections_total` - Rejected calls

use prometheus::{Counter, Gauge, IntCounter, Registry};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Successful transfers
    pub transfers_total: IntCounter,

    /// Fees collected (display units, lossy)
    pub fees_collected: Counter,

    /// Applied rebases
    pub rebases_total: IntCounter,

    /// Current supply (display units, lossy)
    pub total_supply: Gauge,

    /// Rejected calls
    pub rejections_total: IntCounter,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector with its own registry
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let transfers_total =
            IntCounter::new("rebase_ledger_transfers_total", "Successful transfers")?;
        registry.register(Box::new(transfers_total.clone()))?;

        let fees_collected = Counter::new(
            "rebase_ledger_fees_collected",
            "Display units routed to the reward address",
        )?;
        registry.register(Box::new(fees_collected.clone()))?;

        let rebases_total = IntCounter::new("rebase_ledger_rebases_total", "Applied rebases")?;
        registry.register(Box::new(rebases_total.clone()))?;

        let total_supply = Gauge::new(
            "rebase_ledger_total_supply",
            "Supply after the latest rebase",
        )?;
        registry.register(Box::new(total_supply.clone()))?;

        let rejections_total =
            IntCounter::new("rebase_ledger_rejections_total", "Rejected ledger calls")?;
        registry.register(Box::new(rejections_total.clone()))?;

        Ok(Self {
            transfers_total,
            fees_collected,
            rebases_total,
            total_supply,
            rejections_total,
            registry,
        })
    }

    /// Record a transfer and its fee
    pub fn record_transfer(&self, fee: u128) {
        self.transfers_total.inc();
        if fee > 0 {
            self.fees_collected.inc_by(fee as f64);
        }
    }

    /// Record a rebase
    pub fn record_rebase(&self, total_supply: u128) {
        self.rebases_total.inc();
        self.total_supply.set(total_supply as f64);
    }

    /// Record a rejected call
    pub fn record_rejection(&self) {
        self.rejections_total.inc();
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}
