//! Rebase ledger
//!
//! Balances are held in granules, a fixed internal unit whose total never
//! changes after initialization. A rebase only rewrites `total_supply` and the
//! scale factor `granules_per_unit = total_granules / total_supply`, so every
//! holder scales proportionally without touching a single account.
//!
//! Because `total_supply <= 2^128 - 1` and `total_granules` is close to
//! `2^256`, `granules_per_unit >= 2^128`. Rounding a balance down to display
//! units therefore loses less than one unit, and a rebase by `+1` moves
//! `total_supply` by exactly `1` at any magnitude.
//!
//! # Example
//!
//! ```
//! use rebase_ledger::{Address, Capabilities, Config, RebaseLedger, SupplyDelta};
//!
//! let owner = Address::from_low_u64(1);
//! let policy = Address::from_low_u64(2);
//! let caps = Capabilities::new(owner).with_monetary_policy(policy);
//!
//! let mut ledger = RebaseLedger::new(Config::default(), caps)?;
//! ledger.initialize(owner)?;
//!
//! let before = ledger.total_supply();
//! let after = ledger.rebase(&policy, 1, SupplyDelta::expand(1))?;
//! assert_eq!(after - before, 1);
//! # Ok::<(), rebase_ledger::Error>(())
//! ```

use crate::{
    capabilities::Capabilities,
    fixed_point::MathError,
    metrics::Metrics,
    reward::{self, SeededEntropy, BLOCK_HASH_LEN},
    types::{Address, Amount, EventKind, LedgerEvent, SupplyDelta, TransferReceipt, DECIMALS},
    Config, Error, Result,
};
use parking_lot::Mutex;
use primitive_types::U256;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// Ledger shared between the policy engine and transfer callers
///
/// The mutex serializes whole calls, so each one still runs to completion
/// before the next begins.
pub type SharedLedger = Arc<Mutex<RebaseLedger>>;

/// Elastic-supply ledger
pub struct RebaseLedger {
    config: Config,
    capabilities: Capabilities,
    initialized: bool,

    total_supply: Amount,
    total_granules: U256,
    granules_per_unit: U256,
    granules: HashMap<Address, U256>,
    allowances: HashMap<(Address, Address), Amount>,

    fee_rate_divisor: Amount,
    reward_address: Option<Address>,
    rebase_paused: bool,
    token_paused: bool,

    lottery_enabled: bool,
    entropy: SeededEntropy,
    current_block_winner: [u8; BLOCK_HASH_LEN],

    events: Vec<LedgerEvent>,
    metrics: Option<Metrics>,
}

impl RebaseLedger {
    /// Create an uninitialized ledger
    pub fn new(config: Config, capabilities: Capabilities) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            fee_rate_divisor: Amount::from(config.fee_rate_divisor),
            lottery_enabled: config.reward.lottery_enabled,
            entropy: SeededEntropy::new(config.reward.entropy_seed),
            config,
            capabilities,
            initialized: false,
            total_supply: 0,
            total_granules: U256::zero(),
            granules_per_unit: U256::zero(),
            granules: HashMap::new(),
            allowances: HashMap::new(),
            reward_address: None,
            rebase_paused: false,
            token_paused: false,
            current_block_winner: [0u8; BLOCK_HASH_LEN],
            events: Vec::new(),
            metrics: None,
        })
    }

    /// Attach a metrics collector
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Wrap in a [`SharedLedger`]
    pub fn into_shared(self) -> SharedLedger {
        Arc::new(Mutex::new(self))
    }

    /// Mint the initial supply to `initial_holder`
    pub fn initialize(&mut self, initial_holder: Address) -> Result<()> {
        if self.initialized {
            return Err(Error::AlreadyInitialized);
        }
        if initial_holder.is_zero() {
            return Err(Error::InvalidRecipient(
                "initial holder must not be the zero address".to_string(),
            ));
        }

        let supply = self.config.initial_supply()?;
        let supply_wide = U256::from(supply);
        let total_granules = U256::MAX - (U256::MAX % supply_wide);

        self.total_supply = supply;
        self.total_granules = total_granules;
        self.granules_per_unit = total_granules / supply_wide;
        self.granules.insert(initial_holder, total_granules);
        self.initialized = true;

        self.emit(EventKind::Transfer {
            from: Address::ZERO,
            to: initial_holder,
            value: supply,
        });
        tracing::info!(
            holder = %initial_holder,
            supply,
            "Ledger initialized"
        );

        Ok(())
    }

    // ---------------------------------------------------------------------
    // Rebase
    // ---------------------------------------------------------------------

    /// Adjust total supply by `delta`, scaling every balance
    ///
    /// Contractions floor at `MIN_SUPPLY` and expansions cap at `MAX_SUPPLY`.
    /// Returns the supply after the rebase.
    pub fn rebase(&mut self, caller: &Address, epoch: u64, delta: SupplyDelta) -> Result<Amount> {
        let result = self.apply_rebase(caller, epoch, delta);
        self.observe(result)
    }

    fn apply_rebase(&mut self, caller: &Address, epoch: u64, delta: SupplyDelta) -> Result<Amount> {
        self.capabilities.require_monetary_policy(caller)?;
        if self.rebase_paused {
            return Err(Error::OperationPaused("rebase is paused".to_string()));
        }
        self.require_initialized()?;

        let previous = self.total_supply;
        let new_supply = delta.apply_to(previous);
        let granules_per_unit = self
            .total_granules
            .checked_div(U256::from(new_supply))
            .ok_or(MathError::DivisionByZero)?;

        self.total_supply = new_supply;
        self.granules_per_unit = granules_per_unit;

        self.emit(EventKind::Rebase {
            epoch,
            total_supply: new_supply,
        });
        if let Some(metrics) = &self.metrics {
            metrics.record_rebase(new_supply);
        }
        tracing::info!(epoch, %delta, previous, new_supply, "Rebase applied");

        Ok(new_supply)
    }

    // ---------------------------------------------------------------------
    // Transfers
    // ---------------------------------------------------------------------

    /// Move `amount` from `from` to `to`, routing the fee to the reward address
    pub fn transfer(&mut self, from: &Address, to: &Address, amount: Amount) -> Result<TransferReceipt> {
        let result = self.apply_transfer(from, to, amount);
        self.observe(result)
    }

    /// Move `amount` from `from` to `to` on behalf of `spender`
    ///
    /// The allowance is reduced by the full `amount`, fee included.
    pub fn transfer_from(
        &mut self,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<TransferReceipt> {
        let result = self.apply_transfer_from(spender, from, to, amount);
        self.observe(result)
    }

    fn apply_transfer_from(
        &mut self,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<TransferReceipt> {
        self.require_token_active()?;

        let available = self.allowance(from, spender);
        if available < amount {
            return Err(Error::InsufficientAllowance {
                spender: spender.to_string(),
                available,
                required: amount,
            });
        }

        let receipt = self.apply_transfer(from, to, amount)?;
        self.allowances.insert((*from, *spender), available - amount);

        Ok(receipt)
    }

    fn apply_transfer(&mut self, from: &Address, to: &Address, amount: Amount) -> Result<TransferReceipt> {
        self.require_token_active()?;
        self.require_initialized()?;

        if to.is_zero() || *to == self.config.ledger_address {
            return Err(Error::InvalidRecipient(format!(
                "cannot transfer to {}",
                to
            )));
        }

        let fee = amount / self.fee_rate_divisor;
        let net_amount = amount - fee;
        let reward_address = match (fee, self.reward_address) {
            (0, _) => None,
            (_, Some(address)) => Some(address),
            (_, None) => return Err(Error::RewardAddressUnset { fee }),
        };

        if amount > self.total_supply {
            return Err(self.insufficient_balance(from, amount));
        }
        let debit = self.to_granules(amount)?;
        let fee_granules = self.to_granules(fee)?;
        let net_granules = debit - fee_granules;

        // Stage every account touched so aliasing (from == to, to == reward)
        // resolves before anything is written back
        let mut staged: BTreeMap<Address, U256> = BTreeMap::new();
        for account in [Some(*from), Some(*to), reward_address].into_iter().flatten() {
            staged.entry(account).or_insert_with(|| self.granules_of(&account));
        }

        let sender = staged.get_mut(from).ok_or_else(|| {
            Error::InvariantViolation("sender missing from staging".to_string())
        })?;
        *sender = sender
            .checked_sub(debit)
            .ok_or_else(|| self.insufficient_balance(from, amount))?;

        credit(&mut staged, to, net_granules)?;
        if let Some(reward) = &reward_address {
            credit(&mut staged, reward, fee_granules)?;
        }

        for (account, balance) in staged {
            if balance.is_zero() {
                self.granules.remove(&account);
            } else {
                self.granules.insert(account, balance);
            }
        }

        self.emit(EventKind::Transfer {
            from: *from,
            to: *to,
            value: net_amount,
        });
        if let Some(reward) = reward_address {
            self.emit(EventKind::Transfer {
                from: *from,
                to: reward,
                value: fee,
            });
        }

        let reward_winner = if self.lottery_enabled {
            let winner = self.is_reward_winner(to);
            self.emit(EventKind::RewardWinner {
                account: *to,
                winner,
            });
            Some(winner)
        } else {
            None
        };

        if let Some(metrics) = &self.metrics {
            metrics.record_transfer(fee);
        }
        tracing::debug!(%from, %to, amount, fee, "Transfer applied");

        Ok(TransferReceipt {
            amount,
            fee,
            net_amount,
            reward_winner,
        })
    }

    // ---------------------------------------------------------------------
    // Allowances
    // ---------------------------------------------------------------------

    /// Set the allowance of `spender` over `owner`'s balance
    pub fn approve(&mut self, owner: &Address, spender: &Address, value: Amount) -> Result<()> {
        let result = self.require_token_active().map(|_| self.set_allowance(owner, spender, value));
        self.observe(result)
    }

    /// Raise an allowance, failing on overflow
    pub fn increase_allowance(&mut self, owner: &Address, spender: &Address, added: Amount) -> Result<()> {
        let result = self.require_token_active().and_then(|_| {
            self.allowance(owner, spender)
                .checked_add(added)
                .ok_or(Error::Math(MathError::Overflow))
        });
        let value = self.observe(result)?;
        self.set_allowance(owner, spender, value);
        Ok(())
    }

    /// Lower an allowance, flooring at zero
    pub fn decrease_allowance(&mut self, owner: &Address, spender: &Address, subtracted: Amount) -> Result<()> {
        let result = self.require_token_active();
        self.observe(result)?;
        let value = self.allowance(owner, spender).saturating_sub(subtracted);
        self.set_allowance(owner, spender, value);
        Ok(())
    }

    fn set_allowance(&mut self, owner: &Address, spender: &Address, value: Amount) {
        if value == 0 {
            self.allowances.remove(&(*owner, *spender));
        } else {
            self.allowances.insert((*owner, *spender), value);
        }
        self.emit(EventKind::Approval {
            owner: *owner,
            spender: *spender,
            value,
        });
    }

    // ---------------------------------------------------------------------
    // Owner configuration
    // ---------------------------------------------------------------------

    /// Grant the rebase capability
    pub fn set_monetary_policy(&mut self, caller: &Address, monetary_policy: Address) -> Result<()> {
        self.capabilities.require_owner(caller)?;
        self.capabilities.monetary_policy = Some(monetary_policy);
        self.emit(EventKind::MonetaryPolicyUpdated { monetary_policy });
        tracing::info!(%monetary_policy, "Monetary policy updated");
        Ok(())
    }

    /// Set the fee sink
    pub fn set_reward_address(&mut self, caller: &Address, reward_address: Address) -> Result<()> {
        self.capabilities.require_owner(caller)?;
        if reward_address.is_zero() {
            return Err(Error::InvalidConfiguration(
                "reward address must not be zero".to_string(),
            ));
        }
        self.reward_address = Some(reward_address);
        self.emit(EventKind::RewardAddressUpdated { reward_address });
        tracing::info!(%reward_address, "Reward address updated");
        Ok(())
    }

    /// Change the transfer fee divisor
    pub fn set_fee_rate_divisor(&mut self, caller: &Address, fee_rate_divisor: Amount) -> Result<()> {
        self.capabilities.require_owner(caller)?;
        if fee_rate_divisor == 0 {
            return Err(Error::InvalidConfiguration(
                "fee rate divisor must be positive".to_string(),
            ));
        }
        self.fee_rate_divisor = fee_rate_divisor;
        self.emit(EventKind::FeeRateUpdated { fee_rate_divisor });
        tracing::info!(fee_rate_divisor, "Fee rate updated");
        Ok(())
    }

    /// Pause or resume rebasing
    pub fn set_rebase_paused(&mut self, caller: &Address, paused: bool) -> Result<()> {
        self.capabilities.require_owner(caller)?;
        self.rebase_paused = paused;
        self.emit(EventKind::RebasePaused { paused });
        tracing::info!(paused, "Rebase pause switch set");
        Ok(())
    }

    /// Pause or resume transfers and approvals
    pub fn set_token_paused(&mut self, caller: &Address, paused: bool) -> Result<()> {
        self.capabilities.require_owner(caller)?;
        self.token_paused = paused;
        self.emit(EventKind::TokenPaused { paused });
        tracing::info!(paused, "Token pause switch set");
        Ok(())
    }

    /// Turn recipient lottery evaluation on or off
    pub fn set_reward_lottery_enabled(&mut self, caller: &Address, enabled: bool) -> Result<()> {
        self.capabilities.require_owner(caller)?;
        self.lottery_enabled = enabled;
        self.emit(EventKind::RewardLotteryUpdated { enabled });
        tracing::info!(enabled, "Reward lottery switch set");
        Ok(())
    }

    /// Hand the owner capability to `new_owner`
    pub fn transfer_ownership(&mut self, caller: &Address, new_owner: Address) -> Result<()> {
        self.capabilities.require_owner(caller)?;
        if new_owner.is_zero() {
            return Err(Error::InvalidConfiguration(
                "new owner must not be zero".to_string(),
            ));
        }
        let previous_owner = self.capabilities.owner;
        self.capabilities.owner = new_owner;
        self.emit(EventKind::OwnershipTransferred {
            previous_owner,
            new_owner,
        });
        tracing::info!(%previous_owner, %new_owner, "Ownership transferred");
        Ok(())
    }

    /// Draw the next pseudo block hash for the reward lottery
    pub fn set_block_hash_winners(&mut self, caller: &Address) -> Result<[u8; BLOCK_HASH_LEN]> {
        self.capabilities.require_owner(caller)?;
        let block_hash = self.entropy.next_block_hash();
        self.current_block_winner = block_hash;
        self.emit(EventKind::BlockWinnerUpdated {
            block_hash: hex::encode(block_hash),
        });
        tracing::debug!(draw = self.entropy.draws(), "Block winner hash drawn");
        Ok(block_hash)
    }

    /// Whether `account` matches the current pseudo block hash
    ///
    /// Not secure randomness; see [`crate::reward`].
    pub fn is_reward_winner(&self, account: &Address) -> bool {
        reward::is_winner(
            &self.current_block_winner,
            account,
            self.config.reward.winner_match_bytes,
        )
    }

    // ---------------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------------

    /// Display balance of `account`
    pub fn balance_of(&self, account: &Address) -> Amount {
        if self.granules_per_unit.is_zero() {
            return 0;
        }
        // Bounded by total_supply, so the low 128 bits hold the whole value
        (self.granules_of(account) / self.granules_per_unit).low_u128()
    }

    /// Granules held by `account`
    pub fn granules_of(&self, account: &Address) -> U256 {
        self.granules.get(account).copied().unwrap_or_default()
    }

    /// Current total supply
    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    /// Constant internal unit count
    pub fn total_granules(&self) -> U256 {
        self.total_granules
    }

    /// Current scale factor
    pub fn granules_per_unit(&self) -> U256 {
        self.granules_per_unit
    }

    /// Remaining allowance of `spender` over `owner`
    pub fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.allowances.get(&(*owner, *spender)).copied().unwrap_or(0)
    }

    /// Role holders
    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Owner
    pub fn owner(&self) -> Address {
        self.capabilities.owner
    }

    /// Rebase capability holder
    pub fn monetary_policy(&self) -> Option<Address> {
        self.capabilities.monetary_policy
    }

    /// Fee sink
    pub fn reward_address(&self) -> Option<Address> {
        self.reward_address
    }

    /// Fee divisor
    pub fn fee_rate_divisor(&self) -> Amount {
        self.fee_rate_divisor
    }

    /// Whether rebasing is paused
    pub fn is_rebase_paused(&self) -> bool {
        self.rebase_paused
    }

    /// Whether transfers and approvals are paused
    pub fn is_token_paused(&self) -> bool {
        self.token_paused
    }

    /// Whether transfers evaluate the lottery
    pub fn is_reward_lottery_enabled(&self) -> bool {
        self.lottery_enabled
    }

    /// Current pseudo block hash (all zero before the first draw)
    pub fn current_block_winner(&self) -> [u8; BLOCK_HASH_LEN] {
        self.current_block_winner
    }

    /// Whether `initialize` has run
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// The ledger's own address
    pub fn ledger_address(&self) -> Address {
        self.config.ledger_address
    }

    /// Token name
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Token symbol
    pub fn symbol(&self) -> &str {
        &self.config.symbol
    }

    /// Display decimals
    pub fn decimals(&self) -> u8 {
        DECIMALS
    }

    /// Journal of every recorded event
    pub fn events(&self) -> &[LedgerEvent] {
        &self.events
    }

    /// Take the journal, leaving it empty
    pub fn drain_events(&mut self) -> Vec<LedgerEvent> {
        std::mem::take(&mut self.events)
    }

    /// Check granule conservation
    ///
    /// The granules of all accounts must add up to `total_granules` exactly.
    pub fn check_granule_conservation(&self) -> Result<()> {
        let sum = self
            .granules
            .values()
            .try_fold(U256::zero(), |acc, g| acc.checked_add(*g))
            .ok_or_else(|| Error::InvariantViolation("granule sum overflows".to_string()))?;

        if sum != self.total_granules {
            return Err(Error::InvariantViolation(format!(
                "granule sum {} != total {}",
                sum, self.total_granules
            )));
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------------

    fn to_granules(&self, amount: Amount) -> Result<U256> {
        U256::from(amount)
            .checked_mul(self.granules_per_unit)
            .ok_or(Error::Math(MathError::Overflow))
    }

    fn insufficient_balance(&self, account: &Address, required: Amount) -> Error {
        Error::InsufficientBalance {
            account: account.to_string(),
            available: self.balance_of(account),
            required,
        }
    }

    fn require_initialized(&self) -> Result<()> {
        if !self.initialized {
            return Err(Error::NotInitialized);
        }
        Ok(())
    }

    fn require_token_active(&self) -> Result<()> {
        if self.token_paused {
            return Err(Error::OperationPaused("token is paused".to_string()));
        }
        Ok(())
    }

    fn emit(&mut self, kind: EventKind) {
        self.events.push(LedgerEvent::new(kind));
    }

    fn observe<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            if let Some(metrics) = &self.metrics {
                metrics.record_rejection();
            }
            tracing::debug!(error = %e, "Ledger call rejected");
        }
        result
    }
}

fn credit(staged: &mut BTreeMap<Address, U256>, account: &Address, granules: U256) -> Result<()> {
    let balance = staged.entry(*account).or_default();
    *balance = balance
        .checked_add(granules)
        .ok_or_else(|| Error::InvariantViolation(format!("granule overflow crediting {}", account)))?;
    Ok(())
}

impl fmt::Debug for RebaseLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RebaseLedger")
            .field("symbol", &self.config.symbol)
            .field("initialized", &self.initialized)
            .field("total_supply", &self.total_supply)
            .field("accounts", &self.granules.len())
            .field("capabilities", &self.capabilities)
            .field("rebase_paused", &self.rebase_paused)
            .field("token_paused", &self.token_paused)
            .finish()
    }
}
