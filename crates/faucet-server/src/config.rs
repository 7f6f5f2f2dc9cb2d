//! Configuration management for the faucet server.

use alloy::primitives::Address;
use faucet_core::config::{
    DEFAULT_CLAIM_TOKENS, DEFAULT_COOLDOWN_SECS, DEFAULT_DECIMALS, DEFAULT_LIFETIME_TOKENS, MAX_DECIMALS,
};
use faucet_core::{EngineConfig, TokenMetadata};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Placeholder written by `--generate-config`; must be replaced before running.
pub const PLACEHOLDER_DEPLOYER: &str = "0x0000000000000000000000000000000000000000";

/// Configuration for the faucet server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaucetConfig {
    /// HTTP server configuration
    pub http: HttpConfig,

    /// Issued token description
    pub token: TokenConfig,

    /// Claim policy
    pub policy: PolicyConfig,

    /// Deployment identity and state persistence
    pub deployment: DeploymentConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Port to bind to
    pub port: u16,

    /// Address to bind to
    pub bind_address: String,
}

/// Token metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// Claim policy, amounts in whole tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Tokens issued per successful claim
    pub claim_amount: u64,

    /// Maximum tokens one account may ever receive
    pub lifetime_limit: u64,

    /// Minimum seconds between two claims by one account
    pub cooldown_secs: u64,
}

/// Deployment configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentConfig {
    /// Deployer address; owns the token and administers the faucet
    pub deployer_address: String,

    /// JSON snapshot file; state is kept in memory only when unset
    #[serde(default)]
    pub state_path: Option<String>,
}

impl Default for FaucetConfig {
    fn default() -> Self {
        Self {
            http: HttpConfig {
                port: 3030,
                bind_address: "127.0.0.1".to_string(),
            },
            token: TokenConfig {
                name: "Faucet Token".to_string(),
                symbol: "FCT".to_string(),
                decimals: DEFAULT_DECIMALS,
            },
            policy: PolicyConfig {
                claim_amount: DEFAULT_CLAIM_TOKENS,
                lifetime_limit: DEFAULT_LIFETIME_TOKENS,
                cooldown_secs: DEFAULT_COOLDOWN_SECS,
            },
            deployment: DeploymentConfig {
                deployer_address: PLACEHOLDER_DEPLOYER.to_string(),
                state_path: Some("faucet-state.json".to_string()),
            },
        }
    }
}

impl FaucetConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let path = path.as_ref();
        let settings = config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(
                config::Environment::with_prefix("FAUCET")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;
        Ok(())
    }

    /// Parsed deployer address
    pub fn deployer(&self) -> anyhow::Result<Address> {
        Address::from_str(&self.deployment.deployer_address).map_err(|e| {
            anyhow::anyhow!(
                "Invalid deployer address '{}': {}",
                self.deployment.deployer_address,
                e
            )
        })
    }

    pub fn token_metadata(&self) -> TokenMetadata {
        TokenMetadata {
            name: self.token.name.clone(),
            symbol: self.token.symbol.clone(),
            decimals: self.token.decimals,
        }
    }

    /// Claim policy scaled to the token's smallest unit
    pub fn engine_config(&self) -> anyhow::Result<EngineConfig> {
        Ok(EngineConfig::from_whole_tokens(
            self.policy.claim_amount,
            self.policy.lifetime_limit,
            self.policy.cooldown_secs,
            self.token.decimals,
        )?)
    }

    /// Validate the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        let deployer = self.deployer()?;
        if deployer == Address::ZERO {
            return Err(anyhow::anyhow!("Deployer address must be configured"));
        }

        if self.token.decimals > MAX_DECIMALS {
            return Err(anyhow::anyhow!(
                "Token decimals must be at most {}",
                MAX_DECIMALS
            ));
        }

        if self.policy.claim_amount == 0 {
            return Err(anyhow::anyhow!("Claim amount must be greater than 0"));
        }

        if self.policy.lifetime_limit < self.policy.claim_amount {
            return Err(anyhow::anyhow!(
                "Lifetime limit must be at least the claim amount"
            ));
        }

        self.engine_config()?;

        Ok(())
    }
}
