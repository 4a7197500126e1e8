//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate URLs, addresses and value ranges
//! - Require some way to log in (email or token pair)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AgentConfig → Result<(), Vec<ValidationError>>

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::AgentConfig;

/// A single semantic problem found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("api.base_url '{0}' is not a valid URL")]
    InvalidBaseUrl(String),

    #[error("api.proxy '{0}' is not a valid proxy URL")]
    InvalidProxy(String),

    #[error("account needs either an email or an access/refresh token pair")]
    MissingCredentials,

    #[error("{field} must be greater than zero")]
    MustBePositive { field: &'static str },

    #[error("observability.metrics_address '{0}' is not a socket address")]
    InvalidMetricsAddress(String),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &AgentConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match Url::parse(&config.api.base_url) {
        Ok(url) if !url.cannot_be_a_base() => {}
        _ => errors.push(ValidationError::InvalidBaseUrl(config.api.base_url.clone())),
    }

    if let Some(proxy) = &config.api.proxy {
        if reqwest::Proxy::all(proxy.as_str()).is_err() {
            errors.push(ValidationError::InvalidProxy(proxy.clone()));
        }
    }

    if config.account.email.is_none() && !config.account.has_token_pair() {
        errors.push(ValidationError::MissingCredentials);
    }

    if config.auth.max_polling_tries == 0 {
        errors.push(ValidationError::MustBePositive {
            field: "auth.max_polling_tries",
        });
    }
    if config.orders.spin_attempts == 0 {
        errors.push(ValidationError::MustBePositive {
            field: "orders.spin_attempts",
        });
    }
    if config.orders.payment_poll_attempts == 0 {
        errors.push(ValidationError::MustBePositive {
            field: "orders.payment_poll_attempts",
        });
    }
    if config.escalation.max_attempts == Some(0) {
        errors.push(ValidationError::MustBePositive {
            field: "escalation.max_attempts",
        });
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
