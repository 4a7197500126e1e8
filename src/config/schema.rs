//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the agent.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the agent.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AgentConfig {
    /// Marketplace endpoint and request defaults.
    pub api: ApiConfig,

    /// Account credentials (usually injected from the environment).
    pub account: AccountConfig,

    /// Login and token lifetime settings.
    pub auth: AuthConfig,

    /// Transport-level retry configuration.
    pub retries: RetryConfig,

    /// Anti-blocking escalation settings.
    pub escalation: EscalationConfig,

    /// Ordering and payment settings.
    pub orders: OrderConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Marketplace API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL every endpoint path is joined onto.
    pub base_url: String,

    /// Value of the `accept-language` header.
    pub language: String,

    /// Fixed user agent. When unset one is derived from the latest app version.
    pub user_agent: Option<String>,

    /// Request timeout in seconds (no timeout when unset).
    pub timeout_secs: Option<u64>,

    /// Device type reported during login.
    pub device_type: String,

    /// Outbound proxy URL (e.g. "http://10.0.0.1:3128").
    pub proxy: Option<String>,

    /// Accept invalid TLS certificates (needed behind many free proxies).
    pub accept_invalid_certs: bool,

    /// Store page used to look up the latest app version.
    pub app_version_url: String,

    /// App version used when the store lookup fails.
    pub default_app_version: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://apptoogoodtogo.com/api/".to_string(),
            language: "en-GB".to_string(),
            user_agent: None,
            timeout_secs: None,
            device_type: "ANDROID".to_string(),
            proxy: None,
            accept_invalid_certs: false,
            app_version_url: "https://play.google.com/store/apps/details?id=com.app.tgtg&hl=en&gl=US"
                .to_string(),
            default_app_version: "24.10.1".to_string(),
        }
    }
}

/// Account credentials.
///
/// Either `email` or the `access_token`/`refresh_token` pair must be present.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AccountConfig {
    pub email: Option<String>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub datadome_cookie: Option<String>,
}

impl AccountConfig {
    /// True when a full token pair is configured.
    pub fn has_token_pair(&self) -> bool {
        self.access_token.is_some() && self.refresh_token.is_some()
    }
}

/// Login configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Seconds an access token is trusted before it is refreshed.
    pub access_token_lifetime_secs: u64,

    /// Maximum number of confirmation polls after an email login request.
    pub max_polling_tries: u32,

    /// Seconds to wait between confirmation polls.
    pub polling_wait_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_token_lifetime_secs: 3600 * 4,
            max_polling_tries: 24,
            polling_wait_secs: 5,
        }
    }
}

/// Retry configuration for transient HTTP statuses.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt.
    pub max_retries: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,

    /// Statuses that are retried.
    pub status_forcelist: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay_ms: 1000,
            max_delay_ms: 120_000,
            status_forcelist: vec![429, 500, 502, 503, 504],
        }
    }
}

/// Escalation ladder configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EscalationConfig {
    /// Pause before every retry of a blocked call, in milliseconds.
    pub retry_pause_ms: u64,

    /// Cool-down once the ladder is exhausted, in seconds.
    pub cooldown_secs: u64,

    /// Plain-text list of `host:port` proxies.
    pub proxy_list_url: String,

    /// URL fetched through a candidate proxy to check that it works.
    pub proxy_probe_url: String,

    /// Probe timeout in seconds.
    pub proxy_probe_timeout_secs: u64,

    /// Maximum number of candidates probed per rotation.
    pub proxy_candidates: usize,

    /// Give up after this many consecutive failed attempts. Unset retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            retry_pause_ms: 1000,
            cooldown_secs: 15 * 60,
            proxy_list_url:
                "https://api.proxyscrape.com/v2/?request=displayproxies&protocol=http&anonymity=elite"
                    .to_string(),
            proxy_probe_url: "https://apptoogoodtogo.com/".to_string(),
            proxy_probe_timeout_secs: 15,
            proxy_candidates: 10,
            max_attempts: None,
        }
    }
}

/// Order placement and payment configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OrderConfig {
    /// Attempts made by spin ordering.
    pub spin_attempts: u32,

    /// Delay between failed spin attempts in milliseconds.
    pub spin_delay_ms: u64,

    /// Polls of the payment endpoint before giving up on a payment URL.
    pub payment_poll_attempts: u32,

    /// Delay before the first payment poll in milliseconds.
    pub payment_initial_delay_ms: u64,

    /// Payment method requested from the provider.
    pub payment_type: String,

    /// Payment provider name.
    pub payment_provider: String,

    /// Merchant id embedded in the authorization payload.
    pub merchant_id: String,

    /// Return URL handed to the payment provider.
    pub return_url: String,
}

impl Default for OrderConfig {
    fn default() -> Self {
        Self {
            spin_attempts: 32,
            spin_delay_ms: 800,
            payment_poll_attempts: 32,
            payment_initial_delay_ms: 1000,
            payment_type: "PAYPAL".to_string(),
            payment_provider: "ADYEN".to_string(),
            merchant_id: String::new(),
            return_url: "adyencheckout://com.app.tgtg.itemview".to_string(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: AgentConfig = toml::from_str(
            r#"
            [account]
            email = "user@example.com"
            "#,
        )
        .unwrap();

        assert_eq!(config.account.email.as_deref(), Some("user@example.com"));
        assert_eq!(config.auth.max_polling_tries, 24);
        assert_eq!(config.auth.polling_wait_secs, 5);
        assert_eq!(config.retries.max_retries, 5);
        assert_eq!(config.retries.status_forcelist, vec![429, 500, 502, 503, 504]);
        assert_eq!(config.escalation.cooldown_secs, 900);
        assert!(config.escalation.max_attempts.is_none());
        assert_eq!(config.orders.spin_attempts, 32);
        assert_eq!(config.observability.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_log_format_parses_lowercase() {
        let config: AgentConfig = toml::from_str(
            r#"
            [observability]
            log_format = "json"
            "#,
        )
        .unwrap();
        assert_eq!(config.observability.log_format, LogFormat::Json);
    }
}
