//! Configuration for the policy engine and orchestrator

use crate::{window::RebaseTiming, Error, Result};
use rebase_ledger::{Address, FixedPoint};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Service name used in logs
    pub service_name: String,

    /// CPI at which the target rate is exactly 1.0
    pub base_cpi: Decimal,

    /// Relative deviation below which no rebase happens (0.05 = 5%)
    pub deviation_threshold: Decimal,

    /// Fraction `1/rebase_lag` of the computed adjustment is applied
    pub rebase_lag: u64,

    /// Window timing
    pub timing: RebaseTiming,

    /// Orchestrator loop
    pub scheduler: SchedulerConfig,

    /// Static oracle readings for the orchestrator binary
    pub oracle: OracleConfig,

    /// Role addresses
    pub addresses: AddressConfig,

    /// Ledger wired by the orchestrator binary
    pub ledger: rebase_ledger::Config,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "rebase-orchestrator".to_string(),
            base_cpi: Decimal::new(100, 0),
            deviation_threshold: Decimal::new(5, 2),
            rebase_lag: 30,
            timing: RebaseTiming::default(),
            scheduler: SchedulerConfig::default(),
            oracle: OracleConfig::default(),
            addresses: AddressConfig::default(),
            ledger: rebase_ledger::Config::default(),
        }
    }
}

/// Orchestrator loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Seconds between window checks
    pub poll_interval_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 30,
        }
    }
}

/// Static oracle readings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// Market exchange rate
    pub static_rate: Decimal,

    /// Consumer price index
    pub static_cpi: Decimal,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            static_rate: Decimal::ONE,
            static_cpi: Decimal::new(100, 0),
        }
    }
}

/// Role addresses
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AddressConfig {
    /// Owner of ledger and policy
    pub owner: Address,

    /// Only caller allowed to trigger a policy rebase
    pub orchestrator: Address,

    /// Identity the policy presents to the ledger
    pub policy: Address,

    /// Fee sink
    pub reward: Address,
}

impl Default for AddressConfig {
    fn default() -> Self {
        Self {
            owner: Address::from_low_u64(0x0a),
            orchestrator: Address::from_low_u64(0x0b),
            policy: Address::from_low_u64(0x0c),
            reward: Address::from_low_u64(0x0d),
        }
    }
}

impl Config {
    /// `base_cpi` as fixed point
    pub fn base_cpi(&self) -> Result<FixedPoint> {
        Ok(FixedPoint::from_decimal(self.base_cpi)?)
    }

    /// `deviation_threshold` as fixed point
    pub fn deviation_threshold(&self) -> Result<FixedPoint> {
        Ok(FixedPoint::from_decimal(self.deviation_threshold)?)
    }

    /// Reject values the policy cannot operate with
    pub fn validate(&self) -> Result<()> {
        if self.base_cpi()?.is_zero() {
            return Err(Error::InvalidConfiguration(
                "base CPI must be positive".to_string(),
            ));
        }
        self.deviation_threshold()?;
        if self.rebase_lag == 0 {
            return Err(Error::InvalidConfiguration(
                "rebase lag must be at least 1".to_string(),
            ));
        }
        if self.scheduler.poll_interval_secs == 0 {
            return Err(Error::InvalidConfiguration(
                "poll interval must be positive".to_string(),
            ));
        }
        self.timing.validate()?;
        self.ledger.validate()?;
        Ok(())
    }

    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Config::default();

        if let Ok(lag) = std::env::var("POLICY_REBASE_LAG") {
            config.rebase_lag = lag
                .parse()
                .map_err(|e| Error::Config(format!("Invalid POLICY_REBASE_LAG: {}", e)))?;
        }

        if let Ok(secs) = std::env::var("POLICY_POLL_INTERVAL_SECS") {
            config.scheduler.poll_interval_secs = secs.parse().map_err(|e| {
                Error::Config(format!("Invalid POLICY_POLL_INTERVAL_SECS: {}", e))
            })?;
        }

        if let Ok(threshold) = std::env::var("POLICY_DEVIATION_THRESHOLD") {
            config.deviation_threshold = threshold.parse().map_err(|e| {
                Error::Config(format!("Invalid POLICY_DEVIATION_THRESHOLD: {}", e))
            })?;
        }

        config.ledger = rebase_ledger::Config::from_env()?;

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.rebase_lag, 30);
        assert_eq!(
            config.deviation_threshold().unwrap().raw(),
            rebase_ledger::U256::from(50_000_000_000_000_000u64)
        );
        assert_eq!(
            config.base_cpi().unwrap(),
            FixedPoint::from_integer(100).unwrap()
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_values() {
        let config = Config {
            rebase_lag: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidConfiguration(_))
        ));

        let config = Config {
            base_cpi: Decimal::ZERO,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            deviation_threshold: Decimal::new(-1, 2),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::Math(_))));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            base_cpi = "251.712"
            deviation_threshold = "0.1"
            rebase_lag = 10

            [timing]
            min_rebase_time_interval_sec = 3600
            rebase_window_offset_sec = 600
            rebase_window_length_sec = 300

            [scheduler]
            poll_interval_secs = 5

            [ledger]
            fee_rate_divisor = 200
            "#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.rebase_lag, 10);
        assert_eq!(config.timing.min_rebase_time_interval_sec, 3600);
        assert_eq!(config.scheduler.poll_interval_secs, 5);
        assert_eq!(config.ledger.fee_rate_divisor, 200);
        assert_eq!(config.ledger.symbol, "REBASE");
        assert_eq!(
            config.base_cpi().unwrap().raw(),
            rebase_ledger::U256::from(251_712_000_000_000_000_000u128)
        );
    }

    #[test]
    fn test_from_file_rejects_bad_timing() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [timing]
            min_rebase_time_interval_sec = 300
            rebase_window_offset_sec = 3600
            rebase_window_length_sec = 300
            "#
        )
        .unwrap();

        assert!(matches!(
            Config::from_file(file.path()),
            Err(Error::InvalidConfiguration(_))
        ));
    }
}
