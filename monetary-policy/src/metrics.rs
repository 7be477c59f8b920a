//! Prometheus metrics for the policy engine
//!
//! - `monetary_policy_rebases_total` - Successful policy runs
//! - `monetary_policy_rejections_total{reason}` - Rejected runs by reason
//! - `monetary_policy_epoch` - Current epoch
//! - `monetary_policy_last_supply_delta` - Last requested adjustment (lossy `f64`)

use prometheus::{Gauge, IntCounter, IntCounterVec, IntGauge, Opts, Registry};
use rebase_ledger::SupplyDelta;
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Successful policy runs
    pub rebases_total: IntCounter,

    /// Rejected runs, labelled by reason
    pub rejections_total: IntCounterVec,

    /// Current epoch
    pub epoch: IntGauge,

    /// Last requested supply adjustment
    pub last_supply_delta: Gauge,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector with its own registry
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let rebases_total =
            IntCounter::new("monetary_policy_rebases_total", "Successful policy runs")?;
        registry.register(Box::new(rebases_total.clone()))?;

        let rejections_total = IntCounterVec::new(
            Opts::new("monetary_policy_rejections_total", "Rejected policy runs"),
            &["reason"],
        )?;
        registry.register(Box::new(rejections_total.clone()))?;

        let epoch = IntGauge::new("monetary_policy_epoch", "Current policy epoch")?;
        registry.register(Box::new(epoch.clone()))?;

        let last_supply_delta = Gauge::new(
            "monetary_policy_last_supply_delta",
            "Last requested supply adjustment",
        )?;
        registry.register(Box::new(last_supply_delta.clone()))?;

        Ok(Self {
            rebases_total,
            rejections_total,
            epoch,
            last_supply_delta,
            registry,
        })
    }

    /// Record a committed run
    pub fn record_rebase(&self, epoch: u64, delta: SupplyDelta) {
        self.rebases_total.inc();
        self.epoch.set(i64::try_from(epoch).unwrap_or(i64::MAX));

        let magnitude = delta.magnitude() as f64;
        self.last_supply_delta
            .set(if delta.is_negative() { -magnitude } else { magnitude });
    }

    /// Record a rejected run
    pub fn record_rejection(&self, reason: &str) {
        self.rejections_total.with_label_values(&[reason]).inc();
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}
