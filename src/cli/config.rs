//! daoctl configuration file handling
//!
//! Configuration is TOML, stored at `<config dir>/daoctl/config.toml` unless
//! `--config` points elsewhere. It names the RPC endpoint, the required
//! network, both contract addresses and how long to wait for confirmations.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use daoctl::contracts::{ConfirmationPolicy, ContractAddresses};
use daoctl::ledger::{Address, ChainId, DEFAULT_CHAIN_ID};

/// Default log level
const DEFAULT_LOG_LEVEL: &str = "info";

pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";
const DEFAULT_CONFIRMATION_TIMEOUT: &str = "10m";
const DEFAULT_POLL_INTERVAL: &str = "2s";

/// Spelling of "no timeout" in `confirmation_timeout`.
const NO_TIMEOUT: &str = "none";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaoConfig {
    #[serde(default)]
    pub network: NetworkConfig,

    /// Governance and membership contract addresses
    pub contracts: ContractAddresses,

    #[serde(default)]
    pub transactions: TransactionConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Ledger endpoint and network
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// JSON-RPC endpoint of the wallet/node
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,

    /// Network the contracts are deployed on; anything else is refused
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,

    /// Signing account (optional, first unlocked account if not specified)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<Address>,
}

/// Confirmation waiting, as humantime durations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionConfig {
    /// "none" waits forever
    #[serde(default = "default_confirmation_timeout")]
    pub confirmation_timeout: String,

    #[serde(default = "default_poll_interval")]
    pub poll_interval: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

fn default_rpc_url() -> String {
    DEFAULT_RPC_URL.to_string()
}

fn default_chain_id() -> u64 {
    DEFAULT_CHAIN_ID.0
}

fn default_confirmation_timeout() -> String {
    DEFAULT_CONFIRMATION_TIMEOUT.to_string()
}

fn default_poll_interval() -> String {
    DEFAULT_POLL_INTERVAL.to_string()
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            chain_id: default_chain_id(),
            account: None,
        }
    }
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            confirmation_timeout: default_confirmation_timeout(),
            poll_interval: default_poll_interval(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            file: None,
        }
    }
}

impl NetworkConfig {
    pub fn chain_id(&self) -> ChainId {
        ChainId(self.chain_id)
    }
}

impl TransactionConfig {
    /// Parse both durations into a confirmation policy.
    pub fn policy(&self) -> Result<ConfirmationPolicy, Box<dyn std::error::Error>> {
        let timeout = if self.confirmation_timeout.trim().eq_ignore_ascii_case(NO_TIMEOUT) {
            None
        } else {
            Some(parse_duration("confirmation_timeout", &self.confirmation_timeout)?)
        };
        let poll_interval = parse_duration("poll_interval", &self.poll_interval)?;
        if poll_interval.is_zero() {
            return Err("poll_interval must be greater than zero".into());
        }
        Ok(ConfirmationPolicy {
            timeout,
            poll_interval,
        })
    }
}

fn parse_duration(field: &str, value: &str) -> Result<Duration, Box<dyn std::error::Error>> {
    humantime::parse_duration(value.trim())
        .map_err(|e| format!("Invalid {} '{}': {}", field, value, e).into())
}

impl DaoConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file '{}': {}", path.display(), e))?;

        let config: DaoConfig = toml::from_str(&contents)
            .map_err(|e| format!("Failed to parse config file '{}': {}", path.display(), e))?;

        Ok(config)
    }

    /// Generate default configuration content as a string with comments
    pub fn generate_default_toml(rpc_url: &str) -> String {
        format!(
            r#"# daoctl configuration

[network]
# JSON-RPC endpoint of a node or wallet that holds your unlocked account
rpc_url = "{rpc_url}"

# Network the DAO is deployed on (4 = Rinkeby). Other networks are refused.
chain_id = {chain_id}

# Signing account (optional, the first unlocked account is used if not set)
# account = "0x..."

[contracts]
# Replace with the deployed contract addresses
governance = "{zero}"
membership = "{zero}"

[transactions]
# How long to wait for a transaction to be mined ("none" waits forever)
confirmation_timeout = "{timeout}"

# How often to poll for a receipt
poll_interval = "{poll}"

[logging]
# Log level: trace, debug, info, warn, error
level = "{level}"

# Log file path (optional, logs to stderr if not specified)
# file = "/var/log/daoctl.log"
"#,
            rpc_url = rpc_url,
            chain_id = DEFAULT_CHAIN_ID,
            zero = Address::ZERO,
            timeout = DEFAULT_CONFIRMATION_TIMEOUT,
            poll = DEFAULT_POLL_INTERVAL,
            level = DEFAULT_LOG_LEVEL,
        )
    }

    /// Create and save a default configuration file
    pub fn create_default(
        config_path: &Path,
        rpc_url: &str,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let contents = Self::generate_default_toml(rpc_url);

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
        }

        fs::write(config_path, contents).map_err(|e| {
            format!(
                "Failed to write config file '{}': {}",
                config_path.display(),
                e
            )
        })?;

        Ok(())
    }

    /// Load from `--config` or the default location.
    pub fn resolve(path: Option<&Path>) -> Result<(Self, PathBuf), Box<dyn std::error::Error>> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
        if !path.exists() {
            return Err(format!(
                "No config file at '{}'. Run `daoctl init` to create one.",
                path.display()
            )
            .into());
        }
        let config = Self::load(&path)?;
        Ok((config, path))
    }
}

/// Get the default config file path
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("daoctl")
        .join("config.toml")
}
