//! Market and CPI oracle adapters
//!
//! The policy only consumes the read side: a fixed-point value plus a validity
//! flag. Real feeds live outside this crate.

use parking_lot::RwLock;
use rebase_ledger::FixedPoint;
use std::fmt::Debug;

/// One oracle observation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OracleReading {
    /// Value with 18 decimals
    pub value: FixedPoint,
    /// Whether the feed considers the value usable
    pub valid: bool,
}

impl OracleReading {
    /// Valid reading of `value`
    pub fn valid(value: FixedPoint) -> Self {
        Self { value, valid: true }
    }

    /// Invalid reading
    pub fn invalid() -> Self {
        Self {
            value: FixedPoint::ZERO,
            valid: false,
        }
    }
}

/// Exchange rate feed
pub trait MarketOracle: Send + Sync + Debug {
    /// Latest exchange rate
    fn get_rate(&self) -> OracleReading;
}

/// Price index feed
pub trait CpiOracle: Send + Sync + Debug {
    /// Latest CPI
    fn get_cpi(&self) -> OracleReading;
}

/// In-memory oracle whose reading can be replaced at any time
///
/// Serves as both market and CPI feed, which is what the orchestrator binary
/// and the tests need.
#[derive(Debug)]
pub struct StaticOracle {
    reading: RwLock<OracleReading>,
}

impl StaticOracle {
    /// Start with a valid reading of `value`
    pub fn new(value: FixedPoint) -> Self {
        Self {
            reading: RwLock::new(OracleReading::valid(value)),
        }
    }

    /// Replace value and validity
    pub fn store(&self, value: FixedPoint, valid: bool) {
        *self.reading.write() = OracleReading { value, valid };
    }

    /// Replace the value, keeping validity
    pub fn store_value(&self, value: FixedPoint) {
        self.reading.write().value = value;
    }

    /// Flip validity, keeping the value
    pub fn store_validity(&self, valid: bool) {
        self.reading.write().valid = valid;
    }

    /// Current reading
    pub fn reading(&self) -> OracleReading {
        *self.reading.read()
    }
}

impl MarketOracle for StaticOracle {
    fn get_rate(&self) -> OracleReading {
        self.reading()
    }
}

impl CpiOracle for StaticOracle {
    fn get_cpi(&self) -> OracleReading {
        self.reading()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_oracle_updates() {
        let oracle = StaticOracle::new(FixedPoint::ONE);
        assert_eq!(oracle.get_rate(), OracleReading::valid(FixedPoint::ONE));

        oracle.store_validity(false);
        assert!(!oracle.get_cpi().valid);
        assert_eq!(oracle.get_cpi().value, FixedPoint::ONE);

        let two = FixedPoint::from_integer(2).unwrap();
        oracle.store(two, true);
        assert_eq!(oracle.get_rate(), OracleReading::valid(two));
    }
}
