//! Monetary policy engine
//!
//! Once per eligible window the orchestrator asks the policy to rebase. The
//! policy compares the market exchange rate with a CPI-derived target and asks
//! the ledger for a damped supply adjustment:
//!
//! ```text
//! target = cpi / base_cpi
//! rate   = min(rate, MAX_RATE)
//! delta  = supply * (rate - target) / target / rebase_lag     (0 within threshold)
//! ```
//!
//! Epoch, timestamp and history are committed only after the ledger accepted
//! the adjustment, so a failed run leaves the policy exactly as it was.

use crate::{
    clock::Clock,
    config::Config,
    metrics::Metrics,
    oracle::{CpiOracle, MarketOracle},
    window::{self, RebaseTiming, RebaseWindow},
    Error, Result,
};
use rebase_ledger::{
    fixed_point::mul_div, Address, Amount, Capabilities, FixedPoint, RebaseLedger, SharedLedger,
    SupplyDelta, MAX_SUPPLY, MIN_SUPPLY, U256,
};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Exchange rates above this are treated as equal to it (10^6)
pub const MAX_RATE: FixedPoint = FixedPoint::from_raw(U256([0x1bce_cced_a100_0000, 0xd3c2, 0, 0]));

/// Default deviation threshold: 5%
pub const DEFAULT_DEVIATION_THRESHOLD: FixedPoint =
    FixedPoint::from_raw(U256([50_000_000_000_000_000, 0, 0, 0]));

/// Default damping factor
pub const DEFAULT_REBASE_LAG: u64 = 30;

/// The part of the ledger the policy drives
pub trait SupplyLedger {
    /// Current total supply
    fn total_supply(&self) -> Amount;

    /// Apply `delta` as the monetary policy `caller`, returning the new supply
    fn rebase(&mut self, caller: &Address, epoch: u64, delta: SupplyDelta) -> rebase_ledger::Result<Amount>;
}

impl SupplyLedger for RebaseLedger {
    fn total_supply(&self) -> Amount {
        RebaseLedger::total_supply(self)
    }

    fn rebase(&mut self, caller: &Address, epoch: u64, delta: SupplyDelta) -> rebase_ledger::Result<Amount> {
        RebaseLedger::rebase(self, caller, epoch, delta)
    }
}

impl SupplyLedger for SharedLedger {
    fn total_supply(&self) -> Amount {
        self.lock().total_supply()
    }

    fn rebase(&mut self, caller: &Address, epoch: u64, delta: SupplyDelta) -> rebase_ledger::Result<Amount> {
        self.lock().rebase(caller, epoch, delta)
    }
}

/// One committed policy run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PolicyRecord {
    /// Epoch the run committed
    pub epoch: u64,
    /// Raw oracle rate (before the `MAX_RATE` cap)
    #[serde(serialize_with = "display")]
    pub exchange_rate: FixedPoint,
    /// Oracle CPI
    #[serde(serialize_with = "display")]
    pub cpi: FixedPoint,
    /// `cpi / base_cpi`
    #[serde(serialize_with = "display")]
    pub target_rate: FixedPoint,
    /// Adjustment forwarded to the ledger, after clamping
    pub requested_supply_adjustment: SupplyDelta,
    /// Opening of the consumed window
    pub timestamp_sec: u64,
}

fn display<S: serde::Serializer>(value: &FixedPoint, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

/// Result of a successful `rebase`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RebaseOutcome {
    /// What was committed
    pub record: PolicyRecord,
    /// Ledger supply after the adjustment
    pub total_supply: Amount,
}

/// Supply adjustment for one run
///
/// Returns zero when `|rate - target| < target * threshold`. Otherwise the
/// adjustment is `supply * |rate - target| / target / lag`, truncated, signed
/// like `rate - target`, and clamped so the resulting supply stays within
/// `[MIN_SUPPLY, MAX_SUPPLY]`.
pub fn compute_supply_delta(
    supply: Amount,
    rate: FixedPoint,
    target: FixedPoint,
    deviation_threshold: FixedPoint,
    rebase_lag: u64,
) -> Result<SupplyDelta> {
    if rebase_lag == 0 {
        return Err(Error::InvalidConfiguration(
            "rebase lag must be at least 1".to_string(),
        ));
    }

    let rate = rate.min(MAX_RATE);
    let deviation = rate.abs_diff(target);
    let tolerance = target.mul(deviation_threshold)?;
    if deviation < tolerance {
        return Ok(SupplyDelta::ZERO);
    }

    let raw = mul_div(U256::from(supply), deviation.raw(), target.raw())?;
    let damped = raw / U256::from(rebase_lag);

    if rate >= target {
        let headroom = U256::from(MAX_SUPPLY - supply);
        Ok(SupplyDelta::expand(damped.min(headroom).low_u128()))
    } else {
        let headroom = U256::from(supply.saturating_sub(MIN_SUPPLY));
        Ok(SupplyDelta::contract(damped.min(headroom).low_u128()))
    }
}

/// Time-gated supply controller
pub struct MonetaryPolicy<L> {
    address: Address,
    capabilities: Capabilities,
    ledger: L,
    clock: Arc<dyn Clock>,

    market_oracle: Option<Arc<dyn MarketOracle>>,
    cpi_oracle: Option<Arc<dyn CpiOracle>>,

    epoch: u64,
    last_rebase_timestamp_sec: u64,
    timing: RebaseTiming,
    deviation_threshold: FixedPoint,
    rebase_lag: u64,
    base_cpi: FixedPoint,

    history: Vec<PolicyRecord>,
    metrics: Option<Metrics>,
}

impl<L: SupplyLedger> MonetaryPolicy<L> {
    /// Create a policy with default parameters
    ///
    /// `address` is the identity presented to the ledger; it must hold the
    /// ledger's monetary policy capability for rebases to succeed.
    pub fn new(
        address: Address,
        capabilities: Capabilities,
        ledger: L,
        clock: Arc<dyn Clock>,
        base_cpi: FixedPoint,
    ) -> Result<Self> {
        if base_cpi.is_zero() {
            return Err(Error::InvalidConfiguration(
                "base CPI must be positive".to_string(),
            ));
        }

        Ok(Self {
            address,
            capabilities,
            ledger,
            clock,
            market_oracle: None,
            cpi_oracle: None,
            epoch: 0,
            last_rebase_timestamp_sec: 0,
            timing: RebaseTiming::default(),
            deviation_threshold: DEFAULT_DEVIATION_THRESHOLD,
            rebase_lag: DEFAULT_REBASE_LAG,
            base_cpi,
            history: Vec::new(),
            metrics: None,
        })
    }

    /// Create a policy from configuration
    pub fn from_config(config: &Config, ledger: L, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;

        let addresses = &config.addresses;
        let capabilities = Capabilities::new(addresses.owner)
            .with_monetary_policy(addresses.policy)
            .with_orchestrator(addresses.orchestrator);

        let mut policy = Self::new(addresses.policy, capabilities, ledger, clock, config.base_cpi()?)?;
        policy.deviation_threshold = config.deviation_threshold()?;
        policy.rebase_lag = config.rebase_lag;
        policy.timing = config.timing;
        Ok(policy)
    }

    /// Attach a metrics collector
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    // ---------------------------------------------------------------------
    // Rebase
    // ---------------------------------------------------------------------

    /// Run the policy once
    ///
    /// Checks, in order: the time window, the orchestrator capability, both
    /// oracles. Then forwards the clamped adjustment to the ledger.
    pub fn rebase(&mut self, caller: &Address) -> Result<RebaseOutcome> {
        match self.try_rebase(caller) {
            Ok(outcome) => {
                if let Some(metrics) = &self.metrics {
                    metrics.record_rebase(outcome.record.epoch, outcome.record.requested_supply_adjustment);
                }
                Ok(outcome)
            }
            Err(e) => {
                if let Some(metrics) = &self.metrics {
                    metrics.record_rejection(e.reason());
                }
                tracing::warn!(error = %e, epoch = self.epoch, "Policy rebase rejected");
                Err(e)
            }
        }
    }

    fn try_rebase(&mut self, caller: &Address) -> Result<RebaseOutcome> {
        let now = self.clock.now_secs();
        let window = window::window_for(now, self.last_rebase_timestamp_sec, &self.timing);
        if !window.contains(now) {
            let next = window::next_window(now, self.last_rebase_timestamp_sec, &self.timing);
            return Err(Error::RebaseWindowClosed {
                now,
                next_open: next.open,
            });
        }

        authorize(self.capabilities.require_orchestrator(caller))?;

        let rate = self
            .market_oracle
            .as_ref()
            .ok_or_else(|| Error::InvalidOracleData("market oracle not set".to_string()))?
            .get_rate();
        if !rate.valid {
            return Err(Error::InvalidOracleData("market rate invalid".to_string()));
        }

        let cpi = self
            .cpi_oracle
            .as_ref()
            .ok_or_else(|| Error::InvalidOracleData("CPI oracle not set".to_string()))?
            .get_cpi();
        if !cpi.valid {
            return Err(Error::InvalidOracleData("CPI invalid".to_string()));
        }

        let target_rate = cpi.value.div(self.base_cpi)?;
        let supply = self.ledger.total_supply();
        let delta = compute_supply_delta(
            supply,
            rate.value,
            target_rate,
            self.deviation_threshold,
            self.rebase_lag,
        )?;

        let epoch = self.epoch + 1;
        let total_supply = self.ledger.rebase(&self.address, epoch, delta)?;

        let record = PolicyRecord {
            epoch,
            exchange_rate: rate.value,
            cpi: cpi.value,
            target_rate,
            requested_supply_adjustment: delta,
            timestamp_sec: window.open,
        };
        self.epoch = epoch;
        self.last_rebase_timestamp_sec = window.open;
        self.history.push(record);

        tracing::info!(
            epoch,
            rate = %rate.value,
            cpi = %cpi.value,
            target = %target_rate,
            %delta,
            total_supply,
            "Policy rebase committed"
        );

        Ok(RebaseOutcome {
            record,
            total_supply,
        })
    }

    // ---------------------------------------------------------------------
    // Owner configuration
    // ---------------------------------------------------------------------

    /// Replace the market oracle
    pub fn set_market_oracle(&mut self, caller: &Address, oracle: Arc<dyn MarketOracle>) -> Result<()> {
        authorize(self.capabilities.require_owner(caller))?;
        tracing::info!(?oracle, "Market oracle updated");
        self.market_oracle = Some(oracle);
        Ok(())
    }

    /// Replace the CPI oracle
    pub fn set_cpi_oracle(&mut self, caller: &Address, oracle: Arc<dyn CpiOracle>) -> Result<()> {
        authorize(self.capabilities.require_owner(caller))?;
        tracing::info!(?oracle, "CPI oracle updated");
        self.cpi_oracle = Some(oracle);
        Ok(())
    }

    /// Grant the run capability
    pub fn set_orchestrator(&mut self, caller: &Address, orchestrator: Address) -> Result<()> {
        authorize(self.capabilities.require_owner(caller))?;
        self.capabilities.orchestrator = Some(orchestrator);
        tracing::info!(%orchestrator, "Orchestrator updated");
        Ok(())
    }

    /// Change the no-op band
    pub fn set_deviation_threshold(&mut self, caller: &Address, threshold: FixedPoint) -> Result<()> {
        authorize(self.capabilities.require_owner(caller))?;
        self.deviation_threshold = threshold;
        tracing::info!(%threshold, "Deviation threshold updated");
        Ok(())
    }

    /// Change the damping factor
    pub fn set_rebase_lag(&mut self, caller: &Address, rebase_lag: u64) -> Result<()> {
        authorize(self.capabilities.require_owner(caller))?;
        if rebase_lag == 0 {
            return Err(Error::InvalidConfiguration(
                "rebase lag must be at least 1".to_string(),
            ));
        }
        self.rebase_lag = rebase_lag;
        tracing::info!(rebase_lag, "Rebase lag updated");
        Ok(())
    }

    /// Change window timing
    pub fn set_rebase_timing_parameters(
        &mut self,
        caller: &Address,
        min_rebase_time_interval_sec: u64,
        rebase_window_offset_sec: u64,
        rebase_window_length_sec: u64,
    ) -> Result<()> {
        authorize(self.capabilities.require_owner(caller))?;
        self.timing = RebaseTiming::new(
            min_rebase_time_interval_sec,
            rebase_window_offset_sec,
            rebase_window_length_sec,
        )?;
        tracing::info!(timing = ?self.timing, "Rebase timing updated");
        Ok(())
    }

    /// Hand the owner capability to `new_owner`
    pub fn transfer_ownership(&mut self, caller: &Address, new_owner: Address) -> Result<()> {
        authorize(self.capabilities.require_owner(caller))?;
        if new_owner.is_zero() {
            return Err(Error::InvalidConfiguration(
                "new owner must not be zero".to_string(),
            ));
        }
        let previous = self.capabilities.owner;
        self.capabilities.owner = new_owner;
        tracing::info!(%previous, %new_owner, "Policy ownership transferred");
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------------

    /// Whether a rebase right now would pass the time gate
    pub fn in_rebase_window(&self) -> bool {
        let now = self.clock.now_secs();
        window::window_for(now, self.last_rebase_timestamp_sec, &self.timing).contains(now)
    }

    /// The window the next rebase can land in (possibly the open one)
    pub fn next_rebase_window(&self) -> RebaseWindow {
        window::next_window(self.clock.now_secs(), self.last_rebase_timestamp_sec, &self.timing)
    }

    /// Committed runs so far
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Opening of the last consumed window (0 before the first run)
    pub fn last_rebase_timestamp_sec(&self) -> u64 {
        self.last_rebase_timestamp_sec
    }

    /// Window timing
    pub fn timing(&self) -> &RebaseTiming {
        &self.timing
    }

    /// Minimum seconds between runs
    pub fn min_rebase_time_interval_sec(&self) -> u64 {
        self.timing.min_rebase_time_interval_sec
    }

    /// Window offset within the period
    pub fn rebase_window_offset_sec(&self) -> u64 {
        self.timing.rebase_window_offset_sec
    }

    /// Window length
    pub fn rebase_window_length_sec(&self) -> u64 {
        self.timing.rebase_window_length_sec
    }

    /// No-op band
    pub fn deviation_threshold(&self) -> FixedPoint {
        self.deviation_threshold
    }

    /// Damping factor
    pub fn rebase_lag(&self) -> u64 {
        self.rebase_lag
    }

    /// CPI at which the target rate is 1.0
    pub fn base_cpi(&self) -> FixedPoint {
        self.base_cpi
    }

    /// Identity presented to the ledger
    pub fn address(&self) -> Address {
        self.address
    }

    /// Owner
    pub fn owner(&self) -> Address {
        self.capabilities.owner
    }

    /// Run capability holder
    pub fn orchestrator(&self) -> Option<Address> {
        self.capabilities.orchestrator
    }

    /// Configured market oracle
    pub fn market_oracle(&self) -> Option<&Arc<dyn MarketOracle>> {
        self.market_oracle.as_ref()
    }

    /// Configured CPI oracle
    pub fn cpi_oracle(&self) -> Option<&Arc<dyn CpiOracle>> {
        self.cpi_oracle.as_ref()
    }

    /// Committed runs, oldest first
    pub fn history(&self) -> &[PolicyRecord] {
        &self.history
    }

    /// Driven ledger
    pub fn ledger(&self) -> &L {
        &self.ledger
    }
}

impl<L> fmt::Debug for MonetaryPolicy<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MonetaryPolicy")
            .field("address", &self.address)
            .field("capabilities", &self.capabilities)
            .field("epoch", &self.epoch)
            .field("last_rebase_timestamp_sec", &self.last_rebase_timestamp_sec)
            .field("timing", &self.timing)
            .field("rebase_lag", &self.rebase_lag)
            .finish()
    }
}

/// Map a capability failure to the policy's error space
fn authorize(check: rebase_ledger::Result<()>) -> Result<()> {
    check.map_err(|e| match e {
        rebase_ledger::Error::NotAuthorized(msg) => Error::NotAuthorized(msg),
        other => Error::Ledger(other),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::oracle::StaticOracle;

    const T0: u64 = 1_704_067_200;

    fn fp(raw: u128) -> FixedPoint {
        FixedPoint::from_raw(U256::from(raw))
    }

    const BASE_CPI: u128 = 100_000_000_000_000_000_000;
    const INITIAL_CPI: u128 = 251_712_000_000_000_000_000;
    // INITIAL_CPI * 10^18 / BASE_CPI
    const INITIAL_RATE: u128 = 2_517_120_000_000_000_000;

    #[derive(Debug, Default)]
    struct MockLedger {
        supply: Amount,
        calls: Vec<(Address, u64, SupplyDelta)>,
        reject: bool,
    }

    impl SupplyLedger for MockLedger {
        fn total_supply(&self) -> Amount {
            self.supply
        }

        fn rebase(&mut self, caller: &Address, epoch: u64, delta: SupplyDelta) -> rebase_ledger::Result<Amount> {
            if self.reject {
                return Err(rebase_ledger::Error::OperationPaused("rebase is paused".to_string()));
            }
            self.calls.push((*caller, epoch, delta));
            self.supply = delta.apply_to(self.supply);
            Ok(self.supply)
        }
    }

    struct Harness {
        policy: MonetaryPolicy<MockLedger>,
        clock: Arc<ManualClock>,
        market: Arc<StaticOracle>,
        cpi: Arc<StaticOracle>,
        owner: Address,
        orchestrator: Address,
    }

    impl Harness {
        /// Open 60-second windows back to back, like a rebase-every-minute setup
        fn new() -> Self {
            let owner = Address::from_low_u64(1);
            let orchestrator = Address::from_low_u64(3);
            let clock = Arc::new(ManualClock::new(T0));
            let market = Arc::new(StaticOracle::new(fp(INITIAL_RATE)));
            let cpi = Arc::new(StaticOracle::new(fp(INITIAL_CPI)));

            let mut policy = MonetaryPolicy::new(
                Address::from_low_u64(2),
                Capabilities::new(owner),
                MockLedger {
                    supply: 1000,
                    ..Default::default()
                },
                clock.clone(),
                fp(BASE_CPI),
            )
            .unwrap();
            policy.set_market_oracle(&owner, market.clone()).unwrap();
            policy.set_cpi_oracle(&owner, cpi.clone()).unwrap();
            policy.set_orchestrator(&owner, orchestrator).unwrap();
            policy.set_rebase_timing_parameters(&owner, 60, 0, 60).unwrap();

            Self {
                policy,
                clock,
                market,
                cpi,
                owner,
                orchestrator,
            }
        }

        fn mock(&mut self, rate: u128, cpi: u128, supply: Amount) {
            self.market.store(fp(rate), true);
            self.cpi.store(fp(cpi), true);
            self.policy.ledger.supply = supply;
        }

        fn run(&mut self) -> Result<RebaseOutcome> {
            self.clock.advance(60);
            let orchestrator = self.orchestrator;
            self.policy.rebase(&orchestrator)
        }

        fn delta(&mut self) -> SupplyDelta {
            self.run().unwrap().record.requested_supply_adjustment
        }
    }

    #[test]
    fn test_defaults() {
        let h = Harness::new();
        let policy = MonetaryPolicy::new(
            Address::from_low_u64(2),
            Capabilities::new(h.owner),
            MockLedger::default(),
            h.clock.clone(),
            fp(BASE_CPI),
        )
        .unwrap();

        assert_eq!(policy.deviation_threshold(), fp(50_000_000_000_000_000));
        assert_eq!(policy.rebase_lag(), 30);
        assert_eq!(policy.min_rebase_time_interval_sec(), 86_400);
        assert_eq!(policy.rebase_window_offset_sec(), 72_000);
        assert_eq!(policy.rebase_window_length_sec(), 900);
        assert_eq!(policy.epoch(), 0);
        assert_eq!(policy.last_rebase_timestamp_sec(), 0);
        assert_eq!(policy.owner(), h.owner);
        assert!(policy.orchestrator().is_none());
        assert!(policy.market_oracle().is_none());
    }

    #[test]
    fn test_max_rate_constant() {
        assert_eq!(MAX_RATE, FixedPoint::from_integer(1_000_000).unwrap());
    }

    #[test]
    fn test_zero_base_cpi_rejected() {
        let result = MonetaryPolicy::new(
            Address::from_low_u64(2),
            Capabilities::new(Address::from_low_u64(1)),
            MockLedger::default(),
            Arc::new(ManualClock::new(T0)),
            FixedPoint::ZERO,
        );
        assert!(matches!(result, Err(Error::InvalidConfiguration(_))));
    }

    #[test]
    fn test_owner_only_setters() {
        let mut h = Harness::new();
        let user = Address::from_low_u64(9);
        let denied = |r: Result<()>| matches!(r, Err(Error::NotAuthorized(_)));

        assert!(denied(h.policy.set_market_oracle(&user, h.market.clone())));
        assert!(denied(h.policy.set_cpi_oracle(&user, h.cpi.clone())));
        assert!(denied(h.policy.set_orchestrator(&user, user)));
        assert!(denied(h.policy.set_deviation_threshold(&user, FixedPoint::ZERO)));
        assert!(denied(h.policy.set_rebase_lag(&user, 5)));
        assert!(denied(h.policy.set_rebase_timing_parameters(&user, 600, 60, 300)));
        assert!(denied(h.policy.transfer_ownership(&user, user)));

        let owner = h.owner;
        h.policy.set_rebase_lag(&owner, 5).unwrap();
        assert_eq!(h.policy.rebase_lag(), 5);
        assert!(matches!(
            h.policy.set_rebase_lag(&owner, 0),
            Err(Error::InvalidConfiguration(_))
        ));

        h.policy.set_rebase_timing_parameters(&owner, 600, 60, 300).unwrap();
        assert_eq!(h.policy.min_rebase_time_interval_sec(), 600);
        assert_eq!(h.policy.rebase_window_offset_sec(), 60);
        assert_eq!(h.policy.rebase_window_length_sec(), 300);
        assert!(h.policy.set_rebase_timing_parameters(&owner, 0, 0, 0).is_err());
        assert!(h.policy.set_rebase_timing_parameters(&owner, 300, 3600, 300).is_err());

        h.policy.transfer_ownership(&owner, user).unwrap();
        assert_eq!(h.policy.owner(), user);
        assert!(denied(h.policy.set_rebase_lag(&owner, 7)));
    }

    #[test]
    fn test_only_orchestrator_may_rebase() {
        let mut h = Harness::new();
        h.clock.advance(60);
        let (owner, orchestrator) = (h.owner, h.orchestrator);
        assert!(matches!(
            h.policy.rebase(&owner),
            Err(Error::NotAuthorized(_))
        ));
        assert!(h.policy.rebase(&orchestrator).is_ok());
    }

    #[test]
    fn test_within_threshold_is_zero() {
        let mut h = Harness::new();
        let five_more = INITIAL_RATE * 105 / 100;
        let five_less = INITIAL_RATE * 95 / 100;

        for rate in [INITIAL_RATE - 1, INITIAL_RATE + 1, five_more - 2, five_less + 2] {
            h.mock(rate, INITIAL_CPI, 1000);
            assert_eq!(h.delta(), SupplyDelta::ZERO, "rate {}", rate);
        }
    }

    #[test]
    fn test_deviation_at_threshold_rebases() {
        let target = FixedPoint::ONE;
        let threshold = fp(50_000_000_000_000_000);
        let at_above = fp(1_050_000_000_000_000_000);
        let at_below = fp(950_000_000_000_000_000);

        assert_eq!(
            compute_supply_delta(1_000_000, at_above, target, threshold, 1).unwrap(),
            SupplyDelta::expand(50_000)
        );
        assert_eq!(
            compute_supply_delta(1_000_000, at_below, target, threshold, 1).unwrap(),
            SupplyDelta::contract(50_000)
        );
        assert_eq!(
            compute_supply_delta(1_000_000, fp(1_049_999_999_999_999_999), target, threshold, 1)
                .unwrap(),
            SupplyDelta::ZERO
        );
        assert_eq!(
            compute_supply_delta(1_000_000, fp(950_000_000_000_000_001), target, threshold, 1)
                .unwrap(),
            SupplyDelta::ZERO
        );
    }

    #[test]
    fn test_rate_above_max_rate_capped() {
        let mut h = Harness::new();
        let max = MAX_RATE.raw().low_u128();

        h.mock(max, INITIAL_CPI, 1000);
        let at_max = h.delta();
        assert!(at_max.is_positive());

        h.mock(max + 100_000_000_000_000_000, INITIAL_CPI, 1000);
        assert_eq!(h.delta(), at_max);

        h.mock(max * 2, INITIAL_CPI, 1000);
        assert_eq!(h.delta(), at_max);
    }

    #[test]
    fn test_growth_clamped_to_max_supply() {
        let mut h = Harness::new();
        h.mock(INITIAL_RATE * 2, INITIAL_CPI, MAX_SUPPLY - 1);
        assert_eq!(h.delta(), SupplyDelta::expand(1));

        h.mock(INITIAL_RATE * 2, INITIAL_CPI, MAX_SUPPLY);
        assert_eq!(h.delta(), SupplyDelta::ZERO);
    }

    #[test]
    fn test_invalid_oracle_data() {
        let mut h = Harness::new();
        h.market.store_validity(false);
        assert!(matches!(h.run(), Err(Error::InvalidOracleData(_))));
        h.market.store_validity(true);

        h.cpi.store_validity(false);
        assert!(matches!(h.run(), Err(Error::InvalidOracleData(_))));
        assert_eq!(h.policy.epoch(), 0);
        assert!(h.policy.ledger().calls.is_empty());

        h.cpi.store_validity(true);
        assert!(h.run().is_ok());
    }

    #[test]
    fn test_missing_oracle() {
        let clock = Arc::new(ManualClock::new(T0));
        let owner = Address::from_low_u64(1);
        let orchestrator = Address::from_low_u64(3);
        let mut policy = MonetaryPolicy::new(
            Address::from_low_u64(2),
            Capabilities::new(owner).with_orchestrator(orchestrator),
            MockLedger::default(),
            clock,
            fp(BASE_CPI),
        )
        .unwrap();
        policy.set_rebase_timing_parameters(&owner, 60, 0, 60).unwrap();

        assert!(matches!(
            policy.rebase(&orchestrator),
            Err(Error::InvalidOracleData(_))
        ));
    }

    #[test]
    fn test_positive_rate_commits_state() {
        let mut h = Harness::new();
        h.mock(INITIAL_RATE * 16 / 10, INITIAL_CPI, 1000);

        let outcome = h.run().unwrap();
        let record = outcome.record;

        assert_eq!(h.policy.epoch(), 1);
        assert_eq!(record.epoch, 1);
        assert_eq!(record.exchange_rate, fp(INITIAL_RATE * 16 / 10));
        assert_eq!(record.cpi, fp(INITIAL_CPI));
        assert_eq!(record.target_rate, fp(INITIAL_RATE));
        assert_eq!(record.requested_supply_adjustment, SupplyDelta::expand(20));
        assert_eq!(outcome.total_supply, 1020);
        assert_eq!(h.policy.history(), &[record]);

        // Ledger saw the policy's own identity and the next epoch
        assert_eq!(
            h.policy.ledger().calls,
            vec![(Address::from_low_u64(2), 1, SupplyDelta::expand(20))]
        );

        let previous = h.policy.last_rebase_timestamp_sec();
        h.mock(INITIAL_RATE * 16 / 10, INITIAL_CPI, 1000);
        h.run().unwrap();
        assert_eq!(h.policy.last_rebase_timestamp_sec() - previous, 60);
        assert_eq!(h.policy.epoch(), 2);
    }

    #[test]
    fn test_negative_rate() {
        let mut h = Harness::new();
        h.mock(INITIAL_RATE * 7 / 10, INITIAL_CPI, 1000);
        assert_eq!(h.delta(), SupplyDelta::contract(10));
    }

    #[test]
    fn test_cpi_increase() {
        let mut h = Harness::new();
        h.mock(INITIAL_RATE, INITIAL_CPI * 125 / 100, 1000);
        assert_eq!(h.delta(), SupplyDelta::contract(6));
    }

    #[test]
    fn test_cpi_decrease() {
        let mut h = Harness::new();
        h.mock(INITIAL_RATE, INITIAL_CPI * 77 / 100, 1000);
        assert_eq!(h.delta(), SupplyDelta::expand(9));
    }

    #[test]
    fn test_rate_at_target_with_zero_threshold() {
        let mut h = Harness::new();
        let owner = h.owner;
        h.policy.set_deviation_threshold(&owner, FixedPoint::ZERO).unwrap();
        h.mock(INITIAL_RATE, INITIAL_CPI, 1000);
        assert_eq!(h.delta(), SupplyDelta::ZERO);
    }

    #[test]
    fn test_ledger_failure_leaves_state() {
        let mut h = Harness::new();
        h.mock(INITIAL_RATE * 16 / 10, INITIAL_CPI, 1000);
        h.policy.ledger.reject = true;

        assert!(matches!(h.run(), Err(Error::Ledger(_))));
        assert_eq!(h.policy.epoch(), 0);
        assert_eq!(h.policy.last_rebase_timestamp_sec(), 0);
        assert!(h.policy.history().is_empty());

        // The window was not consumed
        h.policy.ledger.reject = false;
        let orchestrator = h.orchestrator;
        assert!(h.policy.rebase(&orchestrator).is_ok());
    }

    #[test]
    fn test_window_consumed_once() {
        let mut h = Harness::new();
        let owner = h.owner;
        h.policy.set_rebase_timing_parameters(&owner, 86_400, 72_000, 900).unwrap();
        h.clock.set(T0 + 72_000 + 5);

        assert!(h.policy.in_rebase_window());
        let orchestrator = h.orchestrator;
        h.policy.rebase(&orchestrator).unwrap();
        assert_eq!(h.policy.last_rebase_timestamp_sec(), T0 + 72_000);

        h.clock.advance(10);
        assert!(!h.policy.in_rebase_window());
        assert_eq!(
            h.policy.rebase(&orchestrator),
            Err(Error::RebaseWindowClosed {
                now: T0 + 72_015,
                next_open: T0 + 72_000 + 86_400,
            })
        );
        assert_eq!(h.policy.next_rebase_window().open, T0 + 72_000 + 86_400);
    }

    #[test]
    fn test_time_gate_checked_before_auth() {
        let mut h = Harness::new();
        let owner = h.owner;
        h.policy.set_rebase_timing_parameters(&owner, 86_400, 72_000, 900).unwrap();
        h.clock.set(T0 + 100);
        assert!(matches!(
            h.policy.rebase(&owner),
            Err(Error::RebaseWindowClosed { .. })
        ));
    }

    #[test]
    fn test_compute_supply_delta_clamps_contraction() {
        let delta = compute_supply_delta(1000, FixedPoint::ZERO, FixedPoint::ONE, FixedPoint::ZERO, 1).unwrap();
        assert_eq!(delta, SupplyDelta::contract(999));
    }

    #[test]
    fn test_compute_supply_delta_scenario() {
        // +10% deviation at the default supply, lag 30
        let supply: Amount = 3_025_000_000_000_000;
        let rate = fp(1_100_000_000_000_000_000);
        let delta = compute_supply_delta(supply, rate, FixedPoint::ONE, DEFAULT_DEVIATION_THRESHOLD, 30).unwrap();
        assert_eq!(delta, SupplyDelta::expand(supply / 10 / 30));
    }

    #[test]
    fn test_metrics_recorded() {
        let mut h = Harness::new();
        let metrics = Metrics::new().unwrap();
        h.policy.metrics = Some(metrics.clone());

        h.mock(INITIAL_RATE * 16 / 10, INITIAL_CPI, 1000);
        h.run().unwrap();
        let owner = h.owner;
        h.clock.advance(60);
        let _ = h.policy.rebase(&owner);

        assert_eq!(metrics.rebases_total.get(), 1);
        assert_eq!(metrics.epoch.get(), 1);
        assert_eq!(metrics.last_supply_delta.get(), 20.0);
        assert_eq!(
            metrics
                .rejections_total
                .with_label_values(&["not_authorized"])
                .get(),
            1
        );
    }
}
