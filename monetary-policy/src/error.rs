//! Error types for the policy engine

use rebase_ledger::MathError;
use thiserror::Error;

/// Result type for policy operations
pub type Result<T> = std::result::Result<T, Error>;

/// Policy errors
///
/// A failed `rebase` leaves epoch, timestamp and history untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Ledger rejected the forwarded call
    #[error("Ledger error: {0}")]
    Ledger(#[from] rebase_ledger::Error),

    /// Caller lacks the capability required for the operation
    #[error("Not authorized: {0}")]
    NotAuthorized(String),

    /// Called outside the eligible rebase window
    #[error("Rebase window closed: next window opens at {next_open}")]
    RebaseWindowClosed {
        /// Current time (seconds)
        now: u64,
        /// Opening of the next eligible window (seconds)
        next_open: u64,
    },

    /// An oracle reported invalid data or is not configured
    #[error("Invalid oracle data: {0}")]
    InvalidOracleData(String),

    /// Rejected configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Fixed-point arithmetic failure
    #[error("Math error: {0}")]
    Math(#[from] MathError),

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

impl Error {
    /// Short label used for the rejection metric
    pub fn reason(&self) -> &'static str {
        match self {
            Error::Ledger(_) => "ledger",
            Error::NotAuthorized(_) => "not_authorized",
            Error::RebaseWindowClosed { .. } => "window_closed",
            Error::InvalidOracleData(_) => "invalid_oracle_data",
            Error::InvalidConfiguration(_) => "invalid_configuration",
            Error::Math(_) => "math",
            Error::Config(_) | Error::Io(_) => "config",
        }
    }
}
