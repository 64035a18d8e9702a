// Path: crates/types/src/config/mod.rs

//! Configuration for the reward engine and its adapters.
//!
//! Secrets (wallet keys, ledger bearer tokens) are never read from the file;
//! they are supplied through the environment by the binary.
use crate::error::ConfigError;
use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

/// Connection settings for the reward ledger REST API.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LedgerConfig {
    /// Base URL, e.g. `https://api.example.com`.
    pub base_url: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Retry budget for reads that fail with 429 or 5xx.
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
    /// Base backoff between read retries, doubled per attempt.
    #[serde(default = "default_base_backoff_ms")]
    pub base_backoff_ms: u64,
}

fn default_request_timeout_secs() -> u64 {
    15
}
fn default_max_retries() -> usize {
    4
}
fn default_base_backoff_ms() -> u64 {
    200
}

impl LedgerConfig {
    /// The request timeout as a `Duration`.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// A chain with (possibly) a deployed reward distributor.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChainConfig {
    /// EIP-155 chain id.
    pub chain_id: u64,
    /// JSON-RPC endpoint.
    pub rpc_url: String,
    /// Distributor address; the zero address means "not deployed".
    #[serde(default)]
    pub distributor: Address,
    /// Native currency decimals used when displaying costs.
    #[serde(default = "default_native_decimals")]
    pub native_decimals: u8,
}

/// Largest decimals a `U256` amount can be scaled by.
const MAX_NATIVE_DECIMALS: u8 = 77;

fn default_native_decimals() -> u8 {
    18
}

impl ChainConfig {
    /// True when a distributor address is configured.
    pub fn is_deployed(&self) -> bool {
        self.distributor != Address::ZERO
    }
}

/// Gas estimation parameters.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GasConfig {
    /// Flat per-claim gas used when simulation fails.
    #[serde(default = "default_fallback_gas_per_claim")]
    pub fallback_gas_per_claim: u64,
    /// Largest batch the linear scaling is trusted for.
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
}

fn default_fallback_gas_per_claim() -> u64 {
    150_000
}
fn default_max_batch_size() -> usize {
    50
}

impl Default for GasConfig {
    fn default() -> Self {
        Self {
            fallback_gas_per_claim: default_fallback_gas_per_claim(),
            max_batch_size: default_max_batch_size(),
        }
    }
}

/// How long and how often to wait for on-chain confirmation.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ConfirmationConfig {
    /// Receipt poll interval.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Optional timeout; absent means wait until the receipt appears.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_poll_interval_ms() -> u64 {
    2_000
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            timeout_secs: None,
        }
    }
}

impl ConfirmationConfig {
    /// The poll interval as a `Duration`.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// The timeout as a `Duration`, if configured.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Periodic refresh used to discover late confirmations.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RefreshConfig {
    /// Interval between refreshes.
    #[serde(default = "default_refresh_interval_secs")]
    pub interval_secs: u64,
    /// Upper bound on refreshes while waiting for pending items.
    #[serde(default = "default_max_polls")]
    pub max_polls: u32,
}

fn default_refresh_interval_secs() -> u64 {
    15
}
fn default_max_polls() -> u32 {
    40
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_refresh_interval_secs(),
            max_polls: default_max_polls(),
        }
    }
}

/// Top-level configuration document.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EngineConfig {
    /// Ledger API settings.
    pub ledger: LedgerConfig,
    /// Chains with distributor deployments.
    #[serde(default)]
    pub chains: Vec<ChainConfig>,
    /// Gas estimation parameters.
    #[serde(default)]
    pub gas: GasConfig,
    /// Confirmation waiting.
    #[serde(default)]
    pub confirmation: ConfirmationConfig,
    /// Periodic refresh.
    #[serde(default)]
    pub refresh: RefreshConfig,
}

impl EngineConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// Semantic checks that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ledger.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("ledger.base_url is empty".into()));
        }
        let mut seen = HashSet::new();
        for chain in &self.chains {
            if !seen.insert(chain.chain_id) {
                return Err(ConfigError::Invalid(format!(
                    "chain {} is configured twice",
                    chain.chain_id
                )));
            }
            if chain.native_decimals > MAX_NATIVE_DECIMALS {
                return Err(ConfigError::Invalid(format!(
                    "chain {} has native_decimals {} (at most {MAX_NATIVE_DECIMALS})",
                    chain.chain_id, chain.native_decimals
                )));
            }
            if chain.rpc_url.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "chain {} has an empty rpc_url",
                    chain.chain_id
                )));
            }
        }
        if self.gas.fallback_gas_per_claim == 0 {
            return Err(ConfigError::Invalid(
                "gas.fallback_gas_per_claim must be positive".into(),
            ));
        }
        if self.gas.max_batch_size == 0 {
            return Err(ConfigError::Invalid(
                "gas.max_batch_size must be positive".into(),
            ));
        }
        if self.confirmation.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "confirmation.poll_interval_ms must be positive".into(),
            ));
        }
        Ok(())
    }

    /// The configuration of `chain_id`, if present.
    pub fn chain(&self, chain_id: u64) -> Option<&ChainConfig> {
        self.chains.iter().find(|c| c.chain_id == chain_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [ledger]
        base_url = "https://api.example.com"

        [[chains]]
        chain_id = 8453
        rpc_url = "https://mainnet.base.org"
        distributor = "0x1111111111111111111111111111111111111111"

        [[chains]]
        chain_id = 42161
        rpc_url = "https://arb1.arbitrum.io/rpc"

        [confirmation]
        timeout_secs = 600
    "#;

    #[test]
    fn parses_with_defaults() {
        let cfg = EngineConfig::from_toml_str(SAMPLE).expect("valid config");
        assert_eq!(cfg.ledger.max_retries, 4);
        assert_eq!(cfg.gas.fallback_gas_per_claim, 150_000);
        assert_eq!(cfg.confirmation.timeout(), Some(Duration::from_secs(600)));
        assert!(cfg.chain(8453).is_some_and(ChainConfig::is_deployed));
        assert!(cfg.chain(42161).is_some_and(|c| !c.is_deployed()));
        assert_eq!(cfg.refresh.max_polls, 40);
    }

    #[test]
    fn rejects_duplicate_chains() {
        let doc = r#"
            [ledger]
            base_url = "http://localhost"
            [[chains]]
            chain_id = 1
            rpc_url = "http://a"
            [[chains]]
            chain_id = 1
            rpc_url = "http://b"
        "#;
        assert!(matches!(
            EngineConfig::from_toml_str(doc),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn rejects_unscalable_native_decimals() {
        let doc = r#"
            [ledger]
            base_url = "http://localhost"
            [[chains]]
            chain_id = 1
            rpc_url = "http://a"
            native_decimals = 78
        "#;
        assert!(matches!(
            EngineConfig::from_toml_str(doc),
            Err(ConfigError::Invalid(_))
        ));
    }
}
