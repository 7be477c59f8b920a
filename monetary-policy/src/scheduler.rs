//! Orchestrator loop
//!
//! Polls the policy on a fixed interval and triggers a rebase whenever the
//! time gate is open. Rejections are logged and the loop keeps going.

use crate::{
    config::SchedulerConfig,
    policy::{MonetaryPolicy, RebaseOutcome, SupplyLedger},
    Result,
};
use parking_lot::Mutex;
use rebase_ledger::Address;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Policy shared between the scheduler and other callers
pub type SharedPolicy<L> = Arc<Mutex<MonetaryPolicy<L>>>;

/// Periodic rebase trigger
#[derive(Debug)]
pub struct RebaseScheduler<L> {
    policy: SharedPolicy<L>,
    orchestrator: Address,
    poll_interval: Duration,
}

impl<L: SupplyLedger> RebaseScheduler<L> {
    /// Create a scheduler acting as `orchestrator`
    pub fn new(policy: SharedPolicy<L>, orchestrator: Address, config: &SchedulerConfig) -> Self {
        Self {
            policy,
            orchestrator,
            poll_interval: Duration::from_secs(config.poll_interval_secs.max(1)),
        }
    }

    /// Override the poll interval
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Shared policy handle
    pub fn policy(&self) -> &SharedPolicy<L> {
        &self.policy
    }

    /// Check the window once, rebasing if it is open
    ///
    /// Returns `None` when the window is closed.
    pub fn tick(&self) -> Option<Result<RebaseOutcome>> {
        let mut policy = self.policy.lock();
        if !policy.in_rebase_window() {
            debug!(next = ?policy.next_rebase_window(), "Rebase window closed");
            return None;
        }
        Some(policy.rebase(&self.orchestrator))
    }

    /// Poll until `shutdown` resolves, returning how many rebases committed
    pub async fn run_until<F>(&self, shutdown: F) -> u64
    where
        F: Future<Output = ()>,
    {
        info!(poll_interval = ?self.poll_interval, orchestrator = %self.orchestrator, "Starting rebase scheduler");

        let mut interval = tokio::time::interval(self.poll_interval);
        let mut committed = 0u64;
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = interval.tick() => {
                    match self.tick() {
                        Some(Ok(outcome)) => {
                            committed += 1;
                            info!(
                                epoch = outcome.record.epoch,
                                delta = %outcome.record.requested_supply_adjustment,
                                total_supply = outcome.total_supply,
                                "Scheduled rebase applied"
                            );
                        }
                        Some(Err(e)) => warn!("Scheduled rebase failed: {}", e),
                        None => {}
                    }
                }
            }
        }

        info!(committed, "Rebase scheduler stopped");
        committed
    }
}
