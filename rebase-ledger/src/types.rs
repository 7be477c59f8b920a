//! Core types for the ledger
//!
//! All types are designed for:
//! - Exact integer arithmetic (`u128` display units, `U256` granules)
//! - Memory safety (no unsafe code)
//! - Serde round-tripping for configuration and journals

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Display-unit amount (smallest unit, 9 decimals)
pub type Amount = u128;

/// Hard ceiling on total supply
pub const MAX_SUPPLY: Amount = u128::MAX;

/// Floor on total supply after a contraction
pub const MIN_SUPPLY: Amount = 1;

/// Decimals of the display unit
pub const DECIMALS: u8 = 9;

/// 20-byte account address
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address([u8; 20]);

impl Address {
    /// The zero address, never a valid recipient
    pub const ZERO: Address = Address([0u8; 20]);

    /// Create from raw bytes
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Address whose trailing eight bytes hold `n` big-endian
    pub fn from_low_u64(n: u64) -> Self {
        let mut bytes = [0u8; 20];
        bytes[12..].copy_from_slice(&n.to_be_bytes());
        Self(bytes)
    }

    /// Raw bytes
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Whether this is the zero address
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl FromStr for Address {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let decoded = hex::decode(digits).map_err(|e| format!("invalid address '{}': {}", s, e))?;
        let bytes: [u8; 20] = decoded
            .try_into()
            .map_err(|v: Vec<u8>| format!("invalid address '{}': {} bytes, expected 20", s, v.len()))?;
        Ok(Self(bytes))
    }
}

impl TryFrom<String> for Address {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.to_string()
    }
}

/// Signed supply adjustment
///
/// Kept as sign plus `u128` magnitude because a contraction may remove almost
/// the whole supply, which `i128` cannot represent at `MAX_SUPPLY` scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "SignedMagnitude")]
pub struct SupplyDelta {
    negative: bool,
    magnitude: Amount,
}

/// Wire form of [`SupplyDelta`]; a zero magnitude is never negative
#[derive(Deserialize)]
struct SignedMagnitude {
    negative: bool,
    magnitude: Amount,
}

impl From<SignedMagnitude> for SupplyDelta {
    fn from(wire: SignedMagnitude) -> Self {
        if wire.negative {
            Self::contract(wire.magnitude)
        } else {
            Self::expand(wire.magnitude)
        }
    }
}

impl SupplyDelta {
    /// No change
    pub const ZERO: SupplyDelta = SupplyDelta {
        negative: false,
        magnitude: 0,
    };

    /// Expansion by `amount`
    pub const fn expand(amount: Amount) -> Self {
        Self {
            negative: false,
            magnitude: amount,
        }
    }

    /// Contraction by `amount`
    pub const fn contract(amount: Amount) -> Self {
        Self {
            negative: amount != 0,
            magnitude: amount,
        }
    }

    /// From a signed value
    pub fn from_i128(value: i128) -> Self {
        if value < 0 {
            Self::contract(value.unsigned_abs())
        } else {
            Self::expand(value as u128)
        }
    }

    /// Absolute size
    pub fn magnitude(&self) -> Amount {
        self.magnitude
    }

    /// Whether supply shrinks
    pub fn is_negative(&self) -> bool {
        self.negative
    }

    /// Whether supply grows
    pub fn is_positive(&self) -> bool {
        !self.negative && self.magnitude > 0
    }

    /// Whether the delta is zero
    pub fn is_zero(&self) -> bool {
        self.magnitude == 0
    }

    /// Signed value, if it fits in `i128`
    pub fn to_i128(&self) -> Option<i128> {
        let magnitude = i128::try_from(self.magnitude).ok()?;
        Some(if self.negative { -magnitude } else { magnitude })
    }

    /// Supply after applying this delta, clamped to `[MIN_SUPPLY, MAX_SUPPLY]`
    pub fn apply_to(&self, supply: Amount) -> Amount {
        if self.negative {
            supply.saturating_sub(self.magnitude).max(MIN_SUPPLY)
        } else {
            supply.saturating_add(self.magnitude).min(MAX_SUPPLY)
        }
    }
}

impl fmt::Display for SupplyDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negative {
            write!(f, "-{}", self.magnitude)
        } else {
            write!(f, "+{}", self.magnitude)
        }
    }
}

/// Journal entry recorded by every state-changing ledger call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEvent {
    /// Unique event ID (UUIDv7 for time-ordering)
    pub event_id: Uuid,

    /// Record timestamp
    pub recorded_at: DateTime<Utc>,

    /// What happened
    pub kind: EventKind,
}

impl LedgerEvent {
    /// Stamp a new event
    pub fn new(kind: EventKind) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            recorded_at: Utc::now(),
            kind,
        }
    }
}

/// Event payloads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    /// Value moved between accounts (mints come from the zero address)
    Transfer {
        /// Debited account
        from: Address,
        /// Credited account
        to: Address,
        /// Display amount credited
        value: Amount,
    },

    /// Allowance set
    Approval {
        /// Owner
        owner: Address,
        /// Spender
        spender: Address,
        /// New allowance
        value: Amount,
    },

    /// Supply rebased
    Rebase {
        /// Policy epoch
        epoch: u64,
        /// Supply after the rebase
        total_supply: Amount,
    },

    /// Monetary policy capability changed
    MonetaryPolicyUpdated {
        /// New holder
        monetary_policy: Address,
    },

    /// Fee sink changed
    RewardAddressUpdated {
        /// New reward address
        reward_address: Address,
    },

    /// Fee divisor changed
    FeeRateUpdated {
        /// New divisor
        fee_rate_divisor: Amount,
    },

    /// Rebase pause switch flipped
    RebasePaused {
        /// New state
        paused: bool,
    },

    /// Token pause switch flipped
    TokenPaused {
        /// New state
        paused: bool,
    },

    /// Reward lottery switch flipped
    RewardLotteryUpdated {
        /// New state
        enabled: bool,
    },

    /// Ownership moved
    OwnershipTransferred {
        /// Previous owner
        previous_owner: Address,
        /// New owner
        new_owner: Address,
    },

    /// New pseudo block hash drawn for the reward lottery
    BlockWinnerUpdated {
        /// Hex-encoded hash
        block_hash: String,
    },

    /// Reward lottery evaluated for a transfer recipient
    RewardWinner {
        /// Evaluated account
        account: Address,
        /// Outcome
        winner: bool,
    },
}

/// Result of a successful transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferReceipt {
    /// Amount debited from the sender
    pub amount: Amount,

    /// Portion routed to the reward address
    pub fee: Amount,

    /// Portion credited to the recipient
    pub net_amount: Amount,

    /// Lottery outcome for the recipient, when the lottery is enabled
    pub reward_winner: Option<bool>,
}
