//! Configuration with TOML file support.
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! testnet-ready configuration. The loaded value is handed to the engine
//! explicitly; nothing is read from the environment at call time.

use crate::domain::request::Network;
use crate::error::ConfigError;
use crate::logging::LogFormat;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_TESTNET_URL: &str = "https://s.altnet.rippletest.net:51234";
pub const DEFAULT_MAINNET_PRIMARY_URL: &str = "https://s1.ripple.com:51234";
pub const DEFAULT_MAINNET_SECONDARY_URL: &str = "https://s2.ripple.com:51234";
pub const DEFAULT_SIGNER_URL: &str = "http://127.0.0.1:5005";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub networks: NetworkEndpoints,
    pub signer: SignerConfig,
    pub workflow: WorkflowSettings,
    pub logging: LoggingConfig,
}

/// The three ledger endpoints, one per [`Network`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NetworkEndpoints {
    pub testnet: String,
    pub mainnet_primary: String,
    pub mainnet_secondary: String,
}

/// Trusted node used for key derivation and signing. Credentials go here
/// and nowhere else.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SignerConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkflowSettings {
    /// Upper bound on waiting for a submitted transaction to validate.
    pub finalization_timeout_secs: u64,
    pub poll_interval_ms: u64,
    /// Per-request HTTP timeout towards nodes.
    pub request_timeout_secs: u64,
    /// Ledgers a transaction stays eligible after autofill.
    pub ledger_offset: u32,
    pub max_fee_drops: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

// ── Serde default helpers ──────────────────────────────────────────────

impl Default for NetworkEndpoints {
    fn default() -> Self {
        Self {
            testnet: DEFAULT_TESTNET_URL.to_string(),
            mainnet_primary: DEFAULT_MAINNET_PRIMARY_URL.to_string(),
            mainnet_secondary: DEFAULT_MAINNET_SECONDARY_URL.to_string(),
        }
    }
}

impl Default for SignerConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_SIGNER_URL.to_string(),
        }
    }
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            finalization_timeout_secs: 30,
            poll_interval_ms: 1000,
            request_timeout_secs: 10,
            ledger_offset: 20,
            max_fee_drops: 2_000_000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Human,
        }
    }
}

impl AppConfig {
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.networks.validate()?;
        validate_url("signer.url", &self.signer.url)?;
        self.workflow.validate()
    }
}

impl NetworkEndpoints {
    pub fn resolve(&self, network: Network) -> &str {
        match network {
            Network::Testnet => &self.testnet,
            Network::MainnetPrimary => &self.mainnet_primary,
            Network::MainnetSecondary => &self.mainnet_secondary,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_url("networks.testnet", &self.testnet)?;
        validate_url("networks.mainnet_primary", &self.mainnet_primary)?;
        validate_url("networks.mainnet_secondary", &self.mainnet_secondary)
    }
}

impl WorkflowSettings {
    pub fn finalization_timeout(&self) -> Duration {
        Duration::from_secs(self.finalization_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks: [(&'static str, u64); 5] = [
            ("workflow.finalization_timeout_secs", self.finalization_timeout_secs),
            ("workflow.poll_interval_ms", self.poll_interval_ms),
            ("workflow.request_timeout_secs", self.request_timeout_secs),
            ("workflow.ledger_offset", u64::from(self.ledger_offset)),
            ("workflow.max_fee_drops", self.max_fee_drops),
        ];
        for (field, value) in checks {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must be greater than zero".to_string(),
                });
            }
        }
        Ok(())
    }
}

fn validate_url(field: &'static str, value: &str) -> Result<(), ConfigError> {
    let url = reqwest::Url::parse(value).map_err(|e| ConfigError::Invalid {
        field,
        reason: format!("{value:?} is not a URL: {e}"),
    })?;
    match url.scheme() {
        "http" | "https" if url.has_host() => Ok(()),
        _ => Err(ConfigError::Invalid {
            field,
            reason: format!("{value:?} must be an http(s) URL with a host"),
        }),
    }
}
