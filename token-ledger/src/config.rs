//! Configuration for the ledger

use crate::types::{Account, Balance, CanisterId, Metadata, TokenId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// Identity of this ledger instance, used in `TokenIdentifier`
    pub canister_id: CanisterId,

    /// Bounded capacity of the writer mailbox
    pub mailbox_capacity: usize,

    /// Emit JSON logs
    pub log_json: bool,

    /// Collect Prometheus metrics
    pub metrics_enabled: bool,

    /// Destination/owner validity policy
    pub policy: PolicyConfig,

    /// Tokens and balances present at start
    pub genesis: GenesisConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "token-ledger".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            canister_id: CanisterId::new("aaaaa-aa"),
            mailbox_capacity: 1000,
            log_json: false,
            metrics_enabled: true,
            policy: PolicyConfig::default(),
            genesis: GenesisConfig::default(),
        }
    }
}

/// Account validity policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Reject the anonymous principal as destination or owner
    pub reject_anonymous: bool,

    /// Accounts that may never receive tokens or own an operator list
    pub blocked_accounts: Vec<Account>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            reject_anonymous: true,
            blocked_accounts: Vec::new(),
        }
    }
}

/// Genesis state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GenesisConfig {
    /// Pre-existing tokens
    pub tokens: Vec<GenesisToken>,
}

/// One pre-existing token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenesisToken {
    /// Token id
    pub id: TokenId,

    /// Metadata blob
    #[serde(default)]
    pub metadata: Metadata,

    /// Initial holdings
    #[serde(default)]
    pub balances: Vec<GenesisBalance>,
}

/// Initial holding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenesisBalance {
    /// Holder
    pub account: Account,

    /// Amount held; a decimal string for values past 64 bits
    pub amount: Balance,
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables
    ///
    /// `LEDGER_CONFIG` names a TOML file to start from; the remaining
    /// variables override individual fields.
    pub fn from_env() -> crate::Result<Self> {
        let mut config = match std::env::var("LEDGER_CONFIG") {
            Ok(path) => Config::from_file(path)?,
            Err(_) => Config::default(),
        };

        if let Ok(id) = std::env::var("LEDGER_CANISTER_ID") {
            config.canister_id = CanisterId::new(id);
        }

        if let Ok(capacity) = std::env::var("LEDGER_MAILBOX_CAPACITY") {
            config.mailbox_capacity = capacity.parse().map_err(|e| {
                crate::Error::Config(format!("Invalid LEDGER_MAILBOX_CAPACITY: {}", e))
            })?;
        }

        if let Ok(json) = std::env::var("LEDGER_LOG_JSON") {
            config.log_json = matches!(json.as_str(), "1" | "true" | "yes");
        }

        config.validate()?;
        Ok(config)
    }

    /// Check internal consistency
    pub fn validate(&self) -> crate::Result<()> {
        if self.mailbox_capacity == 0 {
            return Err(crate::Error::Config(
                "mailbox_capacity must be positive".to_string(),
            ));
        }

        if self.canister_id.as_str().is_empty() {
            return Err(crate::Error::Config("canister_id is empty".to_string()));
        }

        let mut seen = HashSet::new();
        for token in &self.genesis.tokens {
            if !seen.insert(token.id) {
                return Err(crate::Error::Config(format!(
                    "Duplicate genesis token {}",
                    token.id
                )));
            }
        }

        Ok(())
    }
}
