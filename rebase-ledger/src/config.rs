//! Configuration for the ledger

use crate::types::{Address, Amount, DECIMALS};
use serde::{Deserialize, Serialize};

/// Ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Token name
    pub name: String,

    /// Token symbol
    pub symbol: String,

    /// Initial supply in whole tokens (scaled by `10^DECIMALS` at initialization)
    pub initial_supply_tokens: u64,

    /// Transfer fee is `amount / fee_rate_divisor`
    pub fee_rate_divisor: u64,

    /// The ledger's own address; transfers to it are rejected
    pub ledger_address: Address,

    /// Reward lottery configuration
    pub reward: RewardConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            name: "REBASE".to_string(),
            symbol: "REBASE".to_string(),
            initial_supply_tokens: 3_025_000,
            fee_rate_divisor: 100, // 1% transfer fee
            ledger_address: Address::from_low_u64(0x5eba5e),
            reward: RewardConfig::default(),
        }
    }
}

/// Reward lottery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    /// Evaluate the lottery for every transfer recipient
    pub lottery_enabled: bool,

    /// Trailing bytes compared between address and block hash
    pub winner_match_bytes: usize,

    /// Seed of the pseudo block hash stream
    pub entropy_seed: u64,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            lottery_enabled: false,
            winner_match_bytes: 1,
            entropy_seed: 0,
        }
    }
}

impl Config {
    /// Initial supply in display units
    pub fn initial_supply(&self) -> crate::Result<Amount> {
        Amount::from(self.initial_supply_tokens)
            .checked_mul(10u128.pow(DECIMALS as u32))
            .ok_or_else(|| {
                crate::Error::InvalidConfiguration(format!(
                    "initial supply of {} tokens overflows",
                    self.initial_supply_tokens
                ))
            })
    }

    /// Reject values the ledger cannot operate with
    pub fn validate(&self) -> crate::Result<()> {
        if self.initial_supply_tokens == 0 {
            return Err(crate::Error::InvalidConfiguration(
                "initial supply must be positive".to_string(),
            ));
        }
        if self.fee_rate_divisor == 0 {
            return Err(crate::Error::InvalidConfiguration(
                "fee rate divisor must be positive".to_string(),
            ));
        }
        if self.ledger_address.is_zero() {
            return Err(crate::Error::InvalidConfiguration(
                "ledger address must not be zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(divisor) = std::env::var("REBASE_LEDGER_FEE_DIVISOR") {
            config.fee_rate_divisor = divisor.parse().map_err(|e| {
                crate::Error::Config(format!("Invalid REBASE_LEDGER_FEE_DIVISOR: {}", e))
            })?;
        }

        if let Ok(seed) = std::env::var("REBASE_LEDGER_ENTROPY_SEED") {
            config.reward.entropy_seed = seed.parse().map_err(|e| {
                crate::Error::Config(format!("Invalid REBASE_LEDGER_ENTROPY_SEED: {}", e))
            })?;
        }

        if let Ok(address) = std::env::var("REBASE_LEDGER_ADDRESS") {
            config.ledger_address = address.parse().map_err(crate::Error::Config)?;
        }

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
        assert_eq!(config.symbol, "REBASE");
        assert_eq!(config.initial_supply().unwrap(), 3_025_000_000_000_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_divisor_rejected() {
        let config = Config {
            fee_rate_divisor: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(crate::Error::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            name = "Elastic"
            symbol = "ELA"
            fee_rate_divisor = 50
            ledger_address = "0x00000000000000000000000000000000000000ff"

            [reward]
            lottery_enabled = true
            entropy_seed = 99
            "#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.symbol, "ELA");
        assert_eq!(config.fee_rate_divisor, 50);
        assert_eq!(config.ledger_address, Address::from_low_u64(0xff));
        assert!(config.reward.lottery_enabled);
        assert_eq!(config.reward.winner_match_bytes, 1);
        assert_eq!(config.initial_supply_tokens, 3_025_000);
    }
}
