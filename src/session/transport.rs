//! Transport abstractions shared by the dispatcher and the HTTP session.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

/// A single outbound call: path relative to the base URL, optional JSON body, optional bearer token.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub path: String,
    pub body: Option<Value>,
    pub access_token: Option<String>,
}

impl ApiRequest {
    pub fn new(path: impl Into<String>, body: Option<Value>) -> Self {
        Self {
            path: path.into(),
            body,
            access_token: None,
        }
    }

    pub fn with_access_token(mut self, token: Option<&str>) -> Self {
        self.access_token = token.map(str::to_string);
        self
    }
}

/// A fully buffered response.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: u16, content_type: Option<&str>, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: content_type.map(str::to_string),
            body: body.into(),
        }
    }

    /// JSON reply with the given status.
    pub fn json_reply(status: u16, body: impl Into<String>) -> Self {
        Self::new(status, Some("application/json; charset=utf-8"), body)
    }

    /// 200 OK or 202 Accepted.
    pub fn is_ok_or_accepted(&self) -> bool {
        matches!(self.status, 200 | 202)
    }

    /// Content type announces JSON.
    pub fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| ct.trim().starts_with("application/json"))
            .unwrap_or(false)
    }

    /// Decode the body. An empty body decodes as `{}` so optional-field replies still parse.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        if self.body.trim().is_empty() {
            serde_json::from_str("{}")
        } else {
            serde_json::from_str(&self.body)
        }
    }
}

/// Errors raised below the dispatcher.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Invalid request path '{0}'")]
    InvalidUrl(String),

    #[error("Invalid proxy '{proxy}': {source}")]
    InvalidProxy {
        proxy: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Invalid value for header {0}")]
    InvalidHeader(&'static str),

    #[error("Failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Per-session identity. Everything the escalation ladder may rotate lives here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSettings {
    pub user_agent: String,
    pub proxy: Option<String>,
    pub datadome_cookie: Option<String>,
}

/// One logical HTTP session.
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST the request and return the buffered response.
    async fn post(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError>;

    /// Current value of the anti-bot session cookie.
    fn datadome_cookie(&self) -> Option<String>;
}

/// Creates fresh sessions. Sessions are never mutated, only replaced.
pub trait SessionFactory: Send + Sync {
    fn create(&self, settings: &SessionSettings) -> Result<Box<dyn Transport>, TransportError>;
}
