//! Errors surfaced by the marketplace client and reconciler.

use thiserror::Error;

use crate::dispatch::DispatchError;

/// Errors that can occur while talking to the marketplace.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Missing or unusable credentials.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Login endpoint answered with something other than a token pair.
    #[error("Login failed with status {status}: {body}")]
    Login { status: u16, body: String },

    /// Email confirmation never arrived.
    #[error("Polling error: {0}")]
    Polling(String),

    /// Explicit non-success business reply (order creation or abort rejected).
    #[error("API error (status {status}): {body}")]
    Api { status: u16, body: String },

    /// Reply parsed but lacked a required field.
    #[error("Unexpected reply from {endpoint}: {reason}")]
    UnexpectedReply { endpoint: String, reason: String },

    /// Reply body was not the JSON shape expected for the endpoint.
    #[error("Failed to decode reply from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    /// Request body could not be serialized.
    #[error("Failed to encode request for {endpoint}: {source}")]
    Encode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    /// The dispatcher gave up (only with a configured ceiling) or could not build a session.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

/// Result type for marketplace operations.
pub type AgentResult<T> = Result<T, AgentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AgentError::Login {
            status: 401,
            body: "nope".into(),
        };
        assert_eq!(err.to_string(), "Login failed with status 401: nope");

        let err = AgentError::Api {
            status: 200,
            body: r#"{"state":"SOLD_OUT"}"#.into(),
        };
        assert!(err.to_string().contains("SOLD_OUT"));
    }
}
