//! Distribution policy parameters and token metadata.

use crate::error::{Error, Result};
use alloy::primitives::U256;
use serde::{Deserialize, Serialize};

/// Decimals used by the reference token.
pub const DEFAULT_DECIMALS: u8 = 18;

/// Whole tokens issued per successful claim in the reference deployment.
pub const DEFAULT_CLAIM_TOKENS: u64 = 100;

/// Whole tokens one account may receive over its lifetime in the reference deployment.
pub const DEFAULT_LIFETIME_TOKENS: u64 = 1000;

/// Minimum seconds between two claims by one account (24 hours).
pub const DEFAULT_COOLDOWN_SECS: u64 = 24 * 60 * 60;

/// Largest decimals value for which `10^decimals` still fits in a U256.
pub const MAX_DECIMALS: u8 = 77;

/// Scale a whole-token amount to the token's smallest unit.
///
/// Fails with [`Error::ArithmeticOverflow`] instead of wrapping.
pub fn to_base_units(whole_tokens: u64, decimals: u8) -> Result<U256> {
    if decimals > MAX_DECIMALS {
        return Err(Error::ArithmeticOverflow);
    }
    let scale = U256::from(10u64).pow(U256::from(decimals));
    U256::from(whole_tokens)
        .checked_mul(scale)
        .ok_or(Error::ArithmeticOverflow)
}

/// Claim policy enforced by the distribution engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Amount issued per successful claim, in base units
    pub claim_amount: U256,

    /// Maximum cumulative amount one account may receive, in base units
    pub lifetime_limit: U256,

    /// Minimum elapsed seconds between two claims by the same account
    pub cooldown_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let scale = U256::from(10u64).pow(U256::from(DEFAULT_DECIMALS));
        Self {
            claim_amount: U256::from(DEFAULT_CLAIM_TOKENS) * scale,
            lifetime_limit: U256::from(DEFAULT_LIFETIME_TOKENS) * scale,
            cooldown_secs: DEFAULT_COOLDOWN_SECS,
        }
    }
}

impl EngineConfig {
    /// Build a policy from whole-token amounts.
    pub fn from_whole_tokens(
        claim_tokens: u64,
        lifetime_tokens: u64,
        cooldown_secs: u64,
        decimals: u8,
    ) -> Result<Self> {
        let config = Self {
            claim_amount: to_base_units(claim_tokens, decimals)?,
            lifetime_limit: to_base_units(lifetime_tokens, decimals)?,
            cooldown_secs,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check internal consistency of the policy.
    pub fn validate(&self) -> Result<()> {
        if self.claim_amount.is_zero() {
            return Err(Error::InvalidConfig(
                "claim amount must be greater than 0".to_string(),
            ));
        }

        if self.lifetime_limit < self.claim_amount {
            return Err(Error::InvalidConfig(
                "lifetime limit must be at least one claim amount".to_string(),
            ));
        }

        Ok(())
    }
}

/// Descriptive metadata of the issued token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

impl Default for TokenMetadata {
    fn default() -> Self {
        Self {
            name: "Faucet Token".to_string(),
            symbol: "FCT".to_string(),
            decimals: DEFAULT_DECIMALS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::utils::parse_ether;

    #[test]
    fn test_default_engine_config() {
        let config = EngineConfig::default();

        assert_eq!(config.claim_amount, parse_ether("100").unwrap());
        assert_eq!(config.lifetime_limit, parse_ether("1000").unwrap());
        assert_eq!(config.cooldown_secs, 86_400);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_whole_tokens() {
        let config = EngineConfig::from_whole_tokens(5, 20, 60, 6).unwrap();
        assert_eq!(config.claim_amount, U256::from(5_000_000u64));
        assert_eq!(config.lifetime_limit, U256::from(20_000_000u64));
        assert_eq!(config.cooldown_secs, 60);
    }

    #[test]
    fn test_config_validation() {
        let mut config = EngineConfig::default();

        config.claim_amount = U256::ZERO;
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        config.claim_amount = U256::from(10u64);
        config.lifetime_limit = U256::from(9u64);
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));

        // A cap equal to one claim is allowed
        config.lifetime_limit = U256::from(10u64);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_to_base_units_overflow() {
        assert_eq!(to_base_units(1, 0).unwrap(), U256::from(1u64));
        assert_eq!(to_base_units(3, 2).unwrap(), U256::from(300u64));
        assert_eq!(to_base_units(1, 78), Err(Error::ArithmeticOverflow));
        assert_eq!(to_base_units(u64::MAX, 77), Err(Error::ArithmeticOverflow));
    }
}
