//! Rebase orchestrator binary
//!
//! Wires a ledger, a policy and static oracles, then triggers a rebase in every
//! eligible window until Ctrl-C.
//!
//! Configuration comes from the TOML file named by the first argument, or from
//! environment variables when none is given.

use anyhow::Context;
use monetary_policy::{
    Config, Metrics, MonetaryPolicy, RebaseScheduler, StaticOracle, SystemClock,
};
use parking_lot::Mutex;
use prometheus::{Encoder, TextEncoder};
use rebase_ledger::{Capabilities, FixedPoint, RebaseLedger};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Load configuration
    let config = match std::env::args().nth(1) {
        Some(path) => Config::from_file(&path).with_context(|| format!("loading {}", path))?,
        None => Config::from_env().context("loading configuration from environment")?,
    };
    tracing::info!(service = %config.service_name, "Starting rebase orchestrator");

    let addresses = config.addresses.clone();

    // Ledger
    let ledger_metrics = rebase_ledger::Metrics::new()?;
    let caps = Capabilities::new(addresses.owner).with_monetary_policy(addresses.policy);
    let mut ledger = RebaseLedger::new(config.ledger.clone(), caps)?.with_metrics(ledger_metrics.clone());
    ledger.initialize(addresses.owner)?;
    ledger.set_reward_address(&addresses.owner, addresses.reward)?;
    let ledger = ledger.into_shared();

    // Policy
    let policy_metrics = Metrics::new()?;
    let mut policy = MonetaryPolicy::from_config(&config, ledger.clone(), Arc::new(SystemClock))?
        .with_metrics(policy_metrics.clone());

    let market = Arc::new(StaticOracle::new(FixedPoint::from_decimal(config.oracle.static_rate)?));
    let cpi = Arc::new(StaticOracle::new(FixedPoint::from_decimal(config.oracle.static_cpi)?));
    policy.set_market_oracle(&addresses.owner, market)?;
    policy.set_cpi_oracle(&addresses.owner, cpi)?;

    let next = policy.next_rebase_window();
    tracing::info!(open = next.open, close = next.close, "Next rebase window");

    // Scheduler
    let scheduler = RebaseScheduler::new(
        Arc::new(Mutex::new(policy)),
        addresses.orchestrator,
        &config.scheduler,
    );

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
        }
    };
    let committed = scheduler.run_until(shutdown).await;

    for record in scheduler.policy().lock().history() {
        tracing::info!(record = %serde_json::to_string(record)?, "Policy history");
    }

    let mut families = ledger_metrics.registry().gather();
    families.extend(policy_metrics.registry().gather());
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&families, &mut buffer)?;
    tracing::debug!(metrics = %String::from_utf8_lossy(&buffer), "Final metrics");

    tracing::info!(
        committed,
        total_supply = ledger.lock().total_supply(),
        "Shutting down rebase orchestrator"
    );
    Ok(())
}
