//! Error types for the ledger

use crate::fixed_point::MathError;
use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger errors
///
/// Every rejected precondition maps to its own variant. A call that returns an
/// error has left the ledger untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Caller lacks the capability required for the operation
    #[error("Not authorized: {0}")]
    NotAuthorized(String),

    /// Operation blocked by a pause switch
    #[error("Operation paused: {0}")]
    OperationPaused(String),

    /// Transfer recipient is the zero address or the ledger itself
    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),

    /// Sender balance too small for the debit
    #[error("Insufficient balance: {account} has {available}, needs {required}")]
    InsufficientBalance {
        /// Debited account
        account: String,
        /// Current display balance
        available: u128,
        /// Requested amount
        required: u128,
    },

    /// Spender allowance too small
    #[error("Insufficient allowance: {spender} may spend {available}, needs {required}")]
    InsufficientAllowance {
        /// Spender
        spender: String,
        /// Remaining allowance
        available: u128,
        /// Requested amount
        required: u128,
    },

    /// A fee is due but no reward address has been configured
    #[error("Reward address unset: fee of {fee} has no destination")]
    RewardAddressUnset {
        /// Fee that could not be routed
        fee: u128,
    },

    /// Rejected configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Fixed-point or granule arithmetic failure
    #[error("Math error: {0}")]
    Math(#[from] MathError),

    /// `initialize` called twice
    #[error("Ledger already initialized")]
    AlreadyInitialized,

    /// Operation requires an initialized ledger
    #[error("Ledger not initialized")]
    NotInitialized,

    /// Invariant violation (granule conservation, etc.)
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Configuration file error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}
