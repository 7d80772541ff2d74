//! Configuration Management Module
//!
//! Loads SDK settings from TOML: service endpoints, the settlement contract, salt
//! cache and payload timing, settlement polling, quoting and per-chain completion
//! timing overrides.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::bridge::asset::is_valid_account_id;
use crate::chain::Chain;
use crate::fee::QuoteOptions;
use crate::retry::{ExponentialBackoff, RetryPolicy};
use crate::watcher::{ChainTiming, MAX_CHAIN_P99};

// ============================================================================
// CONFIGURATION STRUCTURES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SdkConfig {
    pub env: EnvConfig,
    #[serde(default)]
    pub salt: SaltConfig,
    #[serde(default)]
    pub payload: PayloadConfig,
    #[serde(default)]
    pub settlement: SettlementConfig,
    #[serde(default)]
    pub quote: QuoteConfig,
    #[serde(default)]
    pub watch: WatchConfig,
}

/// Deployment the SDK talks to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvConfig {
    /// Settlement ("intents") contract account id
    pub verifying_contract: String,
    /// Wrapped native token contract (storage deposits are paid in it)
    #[serde(default = "default_wrapped_native_contract")]
    pub wrapped_native_contract: String,
    pub near_rpc_url: String,
    pub relay_url: String,
    pub price_oracle_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaltConfig {
    #[serde(default = "default_salt_ttl_secs")]
    pub ttl_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayloadConfig {
    /// Default payload lifetime
    #[serde(default = "default_deadline_secs")]
    pub deadline_secs: u64,
    /// Nonce lifetime beyond the payload deadline
    #[serde(default = "default_nonce_deadline_offset_secs")]
    pub nonce_deadline_offset_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementConfig {
    /// How long to wait for the relay to report settlement
    #[serde(default = "default_settlement_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteConfig {
    #[serde(default = "default_quote_wait_ms")]
    pub wait_ms: u64,
    #[serde(default = "default_quote_min_deadline_ms")]
    pub min_deadline_ms: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Per-chain p99 overrides (use [[watch.chain]] in TOML)
    #[serde(default)]
    pub chain: Vec<ChainTimingConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainTimingConfig {
    /// CAIP-2 chain id, e.g. "eip155:1"
    pub id: Chain,
    pub p99_secs: u64,
}

/// Upper limit of every duration setting (one week).
const MAX_DURATION_SECS: u64 = 7 * 24 * 60 * 60;

fn default_wrapped_native_contract() -> String {
    "wrap.near".to_string()
}

fn default_salt_ttl_secs() -> u64 {
    30
}

fn default_deadline_secs() -> u64 {
    60
}

fn default_nonce_deadline_offset_secs() -> u64 {
    300
}

fn default_settlement_timeout_secs() -> u64 {
    180
}

fn default_quote_wait_ms() -> u64 {
    3_000
}

fn default_quote_min_deadline_ms() -> u64 {
    60_000
}

impl Default for SaltConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_salt_ttl_secs(),
        }
    }
}

impl Default for PayloadConfig {
    fn default() -> Self {
        Self {
            deadline_secs: default_deadline_secs(),
            nonce_deadline_offset_secs: default_nonce_deadline_offset_secs(),
        }
    }
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_settlement_timeout_secs(),
        }
    }
}

impl Default for QuoteConfig {
    fn default() -> Self {
        Self {
            wait_ms: default_quote_wait_ms(),
            min_deadline_ms: default_quote_min_deadline_ms(),
        }
    }
}

// ============================================================================
// LOADING AND DERIVED SETTINGS
// ============================================================================

impl SdkConfig {
    /// Mainnet deployment with default timing.
    pub fn mainnet() -> Self {
        Self {
            env: EnvConfig {
                verifying_contract: "intents.near".to_string(),
                wrapped_native_contract: default_wrapped_native_contract(),
                near_rpc_url: "https://rpc.mainnet.near.org".to_string(),
                relay_url: "https://solver-relay-v2.chaindefuser.com/rpc".to_string(),
                price_oracle_url: "https://1click.chaindefuser.com".to_string(),
            },
            salt: SaltConfig::default(),
            payload: PayloadConfig::default(),
            settlement: SettlementConfig::default(),
            quote: QuoteConfig::default(),
            watch: WatchConfig::default(),
        }
    }

    /// Loads configuration from a TOML file.
    ///
    /// Uses `path`, else the `INTENTS_SDK_CONFIG_PATH` environment variable, else
    /// `config/intents-sdk.toml`. A missing file is an error pointing at the template.
    pub fn load_from_path(path: Option<&str>) -> anyhow::Result<Self> {
        let config_path = path
            .map(|p| p.to_string())
            .or_else(|| std::env::var("INTENTS_SDK_CONFIG_PATH").ok())
            .unwrap_or_else(|| "config/intents-sdk.toml".to_string());

        if std::path::Path::new(&config_path).exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config = Self::from_toml_str(&content)?;
            Ok(config)
        } else {
            Err(anyhow::anyhow!(
                "Configuration file '{}' not found. Please copy the template:\n\
                cp config/intents-sdk.template.toml config/intents-sdk.toml\n\
                Then edit config/intents-sdk.toml with your actual values.",
                config_path
            ))
        }
    }

    pub fn load() -> anyhow::Result<Self> {
        Self::load_from_path(None)
    }

    /// Parses and validates TOML content.
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: SdkConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks:
    /// - contract ids are valid account ids
    /// - endpoints are http(s) URLs
    /// - TTLs and timeouts are positive and at most a week
    /// - chain overrides are unique, positive and at most a week
    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, account) in [
            ("verifying_contract", &self.env.verifying_contract),
            ("wrapped_native_contract", &self.env.wrapped_native_contract),
        ] {
            if !is_valid_account_id(account) {
                return Err(anyhow::anyhow!(
                    "Configuration error: env.{} '{}' is not a valid account id",
                    name,
                    account
                ));
            }
        }

        for (name, value) in [
            ("near_rpc_url", &self.env.near_rpc_url),
            ("relay_url", &self.env.relay_url),
            ("price_oracle_url", &self.env.price_oracle_url),
        ] {
            let parsed = url::Url::parse(value)
                .map_err(|e| anyhow::anyhow!("Configuration error: env.{} '{}': {}", name, value, e))?;
            if parsed.scheme() != "http" && parsed.scheme() != "https" {
                return Err(anyhow::anyhow!(
                    "Configuration error: env.{} must be an http(s) URL, got '{}'",
                    name,
                    value
                ));
            }
        }

        for (name, value) in [
            ("salt.ttl_secs", self.salt.ttl_secs),
            ("payload.deadline_secs", self.payload.deadline_secs),
            ("settlement.timeout_secs", self.settlement.timeout_secs),
        ] {
            if value == 0 {
                return Err(anyhow::anyhow!("Configuration error: {} must be positive", name));
            }
        }

        for (name, value) in [
            ("salt.ttl_secs", self.salt.ttl_secs),
            ("payload.deadline_secs", self.payload.deadline_secs),
            ("payload.nonce_deadline_offset_secs", self.payload.nonce_deadline_offset_secs),
            ("settlement.timeout_secs", self.settlement.timeout_secs),
        ] {
            if value > MAX_DURATION_SECS {
                return Err(anyhow::anyhow!(
                    "Configuration error: {} must be at most {} seconds, got {}",
                    name,
                    MAX_DURATION_SECS,
                    value
                ));
            }
        }

        for (i, entry) in self.watch.chain.iter().enumerate() {
            if entry.p99_secs == 0 {
                return Err(anyhow::anyhow!(
                    "Configuration error: watch.chain {} has a zero p99",
                    entry.id
                ));
            }
            if entry.p99_secs > MAX_CHAIN_P99.as_secs() {
                return Err(anyhow::anyhow!(
                    "Configuration error: watch.chain {} p99 of {}s exceeds the {}s limit",
                    entry.id,
                    entry.p99_secs,
                    MAX_CHAIN_P99.as_secs()
                ));
            }
            if self.watch.chain[..i].iter().any(|other| other.id == entry.id) {
                return Err(anyhow::anyhow!(
                    "Configuration error: watch.chain {} is configured twice",
                    entry.id
                ));
            }
        }

        Ok(())
    }

    pub fn salt_ttl(&self) -> Duration {
        Duration::from_secs(self.salt.ttl_secs)
    }

    pub fn deadline_ttl(&self) -> Duration {
        Duration::from_secs(self.payload.deadline_secs)
    }

    pub fn nonce_deadline_offset(&self) -> Duration {
        Duration::from_secs(self.payload.nonce_deadline_offset_secs)
    }

    /// Settlement polling: short backoff, bounded by `settlement.timeout_secs`.
    pub fn settlement_policy(&self) -> RetryPolicy {
        RetryPolicy::for_bound(
            Duration::from_secs(self.settlement.timeout_secs),
            ExponentialBackoff::new(500, 15, 10, 5_000),
        )
    }

    pub fn quote_options(&self) -> QuoteOptions {
        QuoteOptions {
            wait_ms: self.quote.wait_ms,
            min_deadline_ms: self.quote.min_deadline_ms,
        }
    }

    pub fn chain_timing(&self) -> ChainTiming {
        self.watch
            .chain
            .iter()
            .fold(ChainTiming::default(), |timing, entry| {
                timing.with_p99(entry.id.clone(), Duration::from_secs(entry.p99_secs))
            })
    }
}
