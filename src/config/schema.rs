//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the unlock flow.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the payment-gated unlock client.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct UnlockConfig {
    /// Ledger node connection settings.
    pub ledger: LedgerConfig,

    /// Unlock payment parameters.
    pub unlock: UnlockSettings,

    /// Analysis and advice service endpoints.
    pub gateways: GatewayConfig,

    /// Wallet bridge settings.
    pub wallet: WalletConfig,

    /// Retry configuration for idempotent ledger reads.
    pub retries: RetryConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Ledger node configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Node REST endpoint URL.
    pub node_url: String,

    /// Failover node URLs, tried in order after the primary.
    pub failover_urls: Vec<String>,

    /// API token sent as `X-Algo-API-Token`.
    pub api_token: String,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Length of the validity window, in rounds, of a freshly built transaction.
    pub validity_rounds: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            node_url: "http://localhost:4001".to_string(),
            failover_urls: Vec::new(),
            api_token: String::new(),
            request_timeout_secs: 10,
            validity_rounds: 1000,
        }
    }
}

/// Parameters of the unlock payment itself.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UnlockSettings {
    /// Amount of the self-payment, in the smallest currency unit.
    pub amount: u64,

    /// Note attached to the payment.
    pub note: String,

    /// Rounds to wait for confirmation before reporting a timeout.
    pub max_confirmation_rounds: u64,
}

impl Default for UnlockSettings {
    fn default() -> Self {
        Self {
            amount: 1000,
            note: "premium-unlock".to_string(),
            max_confirmation_rounds: 20,
        }
    }
}

/// External analysis and advice services.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Base URL of the analysis service; the address is appended as a path segment.
    pub analysis_url: String,

    /// URL of the advice endpoint.
    pub advice_url: String,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            analysis_url: "http://localhost:3000/api/analysis".to_string(),
            advice_url: "http://localhost:3000/api/advice".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Wallet bridge configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WalletConfig {
    /// Base URL of the signing bridge.
    pub bridge_url: String,

    /// Connect timeout in seconds. Signing requests themselves are not time-bounded.
    pub connect_timeout_secs: u64,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            bridge_url: "http://localhost:7070".to_string(),
            connect_timeout_secs: 5,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of sweeps over the node list for a read.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 100,
            max_delay_ms: 2000,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = UnlockConfig::default();
        assert_eq!(config.unlock.max_confirmation_rounds, 20);
        assert_eq!(config.ledger.validity_rounds, 1000);
        assert!(!config.observability.metrics_enabled);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: UnlockConfig = toml::from_str(
            r#"
            [unlock]
            amount = 5000

            [ledger]
            node_url = "https://testnet-api.example.org"
            "#,
        )
        .unwrap();

        assert_eq!(config.unlock.amount, 5000);
        assert_eq!(config.unlock.note, "premium-unlock");
        assert_eq!(config.ledger.node_url, "https://testnet-api.example.org");
        assert_eq!(config.ledger.request_timeout_secs, 10);
        assert_eq!(config.retries.max_attempts, 3);
    }
}
