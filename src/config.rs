//! Configuration module
//!
//! Loads the TOML configuration, applies environment overrides and provides
//! structured configuration types. Every field has a default, so an empty
//! file (or none at all) yields a working devnet setup.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use solana_sdk::commitment_config::{CommitmentConfig, CommitmentLevel};

use crate::rpc::client::MAX_SIGNATURE_PAGE;
use crate::tx_builder::FlowError;

/// Environment variable overriding `rpc.url`
pub const ENV_RPC_URL: &str = "SOLWALLET_RPC_URL";
/// Environment variable overriding `wallet.keypair_path`
pub const ENV_KEYPAIR: &str = "SOLWALLET_KEYPAIR";

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub rpc: RpcConfig,

    #[serde(default)]
    pub wallet: WalletConfig,

    #[serde(default)]
    pub transfer: TransferConfig,

    #[serde(default)]
    pub history: HistoryConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    /// JSON-RPC endpoint
    #[serde(default = "default_rpc_url")]
    pub url: String,

    /// Commitment used for reads, preflight and confirmation alike
    #[serde(default = "default_commitment")]
    pub commitment: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_rpc_timeout")]
    pub timeout_secs: u64,

    /// Bound on confirmation polling in seconds
    #[serde(default = "default_confirm_timeout")]
    pub confirm_timeout_secs: u64,

    /// Delay between signature status polls
    #[serde(default = "default_confirm_poll_interval")]
    pub confirm_poll_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Path to keypair file
    #[serde(default = "default_keypair_path")]
    pub keypair_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferConfig {
    /// Amount sent when the caller gives none
    #[serde(default = "default_transfer_lamports")]
    pub default_lamports: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Fail the fetch when a signature cannot be resolved
    #[serde(default)]
    pub strict: bool,

    /// Signatures resolved concurrently
    #[serde(default = "default_history_concurrency")]
    pub concurrency: usize,

    /// Signatures requested per listing page
    #[serde(default = "default_page_limit")]
    pub page_limit: usize,

    /// Stop listing after this many signatures
    #[serde(default)]
    pub max_signatures: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

// Default value functions
fn default_rpc_url() -> String { "https://api.devnet.solana.com".to_string() }
fn default_commitment() -> String { "confirmed".to_string() }
fn default_rpc_timeout() -> u64 { 30 }
fn default_confirm_timeout() -> u64 { 60 }
fn default_confirm_poll_interval() -> u64 { 500 }
fn default_keypair_path() -> String { "~/.config/solana/id.json".to_string() }
fn default_transfer_lamports() -> u64 { 500_000_000 }
fn default_history_concurrency() -> usize { 1 }
fn default_page_limit() -> usize { MAX_SIGNATURE_PAGE }
fn default_log_level() -> String { "solwallet=info,warn".to_string() }

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: default_rpc_url(),
            commitment: default_commitment(),
            timeout_secs: default_rpc_timeout(),
            confirm_timeout_secs: default_confirm_timeout(),
            confirm_poll_interval_ms: default_confirm_poll_interval(),
        }
    }
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            keypair_path: default_keypair_path(),
        }
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            default_lamports: default_transfer_lamports(),
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            strict: false,
            concurrency: default_history_concurrency(),
            page_limit: default_page_limit(),
            max_signatures: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl RpcConfig {
    /// Parse the commitment. Only levels at which at least one validator has
    /// voted are accepted.
    pub fn commitment_config(&self) -> Result<CommitmentConfig, FlowError> {
        let level = CommitmentLevel::from_str(&self.commitment).map_err(|_| {
            FlowError::Configuration(format!("unknown commitment '{}'", self.commitment))
        })?;
        match level {
            CommitmentLevel::Confirmed | CommitmentLevel::Finalized => {
                Ok(CommitmentConfig { commitment: level })
            }
            _ => Err(FlowError::Configuration(format!(
                "commitment '{}' is weaker than 'confirmed'",
                self.commitment
            ))),
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration, then apply `.env` and process environment overrides
    pub fn from_file_with_env(path: &str) -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let mut config = Self::from_file(path)?;
        config.apply_env();
        Ok(config)
    }

    /// Apply `SOLWALLET_*` overrides from the process environment
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_RPC_URL).filter(|v| !v.is_empty()) {
            self.rpc.url = url;
        }
        if let Some(path) = lookup(ENV_KEYPAIR).filter(|v| !v.is_empty()) {
            self.wallet.keypair_path = path;
        }
    }

    /// Check values that serde cannot
    pub fn validate(&self) -> Result<(), FlowError> {
        self.rpc.commitment_config()?;

        if !(self.rpc.url.starts_with("http://") || self.rpc.url.starts_with("https://")) {
            return Err(FlowError::Configuration(format!(
                "rpc.url must be an http(s) URL, got '{}'",
                self.rpc.url
            )));
        }
        if self.rpc.timeout_secs == 0 {
            return Err(FlowError::Configuration("rpc.timeout_secs must be > 0".to_string()));
        }
        if self.rpc.confirm_timeout_secs == 0 {
            return Err(FlowError::Configuration(
                "rpc.confirm_timeout_secs must be > 0".to_string(),
            ));
        }
        if self.rpc.confirm_poll_interval_ms == 0 {
            return Err(FlowError::Configuration(
                "rpc.confirm_poll_interval_ms must be > 0".to_string(),
            ));
        }
        if self.transfer.default_lamports == 0 {
            return Err(FlowError::Configuration(
                "transfer.default_lamports must be > 0".to_string(),
            ));
        }
        if self.history.concurrency == 0 {
            return Err(FlowError::Configuration(
                "history.concurrency must be > 0".to_string(),
            ));
        }
        if self.history.page_limit == 0 || self.history.page_limit > MAX_SIGNATURE_PAGE {
            return Err(FlowError::Configuration(format!(
                "history.page_limit must be within 1..={MAX_SIGNATURE_PAGE}"
            )));
        }
        Ok(())
    }
}
