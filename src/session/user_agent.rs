//! Mobile-app user agent derivation.
//!
//! The marketplace only answers clients that look like its Android app, so the user agent
//! embeds the app version published on the store page.

use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

use crate::config::ApiConfig;

/// User agent templates; `{version}` is replaced by the app version.
pub const USER_AGENT_TEMPLATES: [&str; 3] = [
    "TGTG/{version} Dalvik/2.1.0 (Linux; U; Android 9; Nexus 5 Build/M4B30Z)",
    "TGTG/{version} Dalvik/2.1.0 (Linux; U; Android 10; SM-G935F Build/NRD90M)",
    "TGTG/{version} Dalvik/2.1.0 (Linux; Android 12; SM-G920V Build/MMB29K)",
];

/// Location of the version string inside the store page's `ds:5` data blob.
const VERSION_POINTER: &str = "/1/2/140/0/0/0";

fn app_data_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"AF_initDataCallback\(\{key:\s*'ds:5'.*?data:([\s\S]*?), sideChannel:.+</script")
            .expect("app data regex is valid")
    })
}

/// Errors from the store page lookup.
#[derive(Debug, Error)]
pub enum VersionLookupError {
    #[error("Store page request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("App version not found on store page")]
    NotFound,
}

/// Source of user agent strings for new sessions.
#[async_trait]
pub trait UserAgentProvider: Send + Sync {
    async fn user_agent(&self) -> String;
}

/// Derives the user agent from the latest published app version.
pub struct AppUserAgent {
    fixed: Option<String>,
    version_url: String,
    default_version: String,
    client: reqwest::Client,
}

impl AppUserAgent {
    pub fn new(api: &ApiConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self {
            fixed: api.user_agent.clone(),
            version_url: api.app_version_url.clone(),
            default_version: api.default_app_version.clone(),
            client,
        }
    }

    /// Latest app version listed on the store page.
    pub async fn latest_app_version(&self) -> Result<String, VersionLookupError> {
        let page = self
            .client
            .get(&self.version_url)
            .send()
            .await?
            .text()
            .await?;
        extract_app_version(&page).ok_or(VersionLookupError::NotFound)
    }
}

#[async_trait]
impl UserAgentProvider for AppUserAgent {
    async fn user_agent(&self) -> String {
        if let Some(fixed) = &self.fixed {
            return fixed.clone();
        }

        let version = match self.latest_app_version().await {
            Ok(version) => version,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to get latest app version");
                self.default_version.clone()
            }
        };
        tracing::debug!(version = %version, "Using app version");

        let template = USER_AGENT_TEMPLATES[fastrand::usize(..USER_AGENT_TEMPLATES.len())];
        render_user_agent(template, &version)
    }
}

/// Fill a template with an app version.
pub fn render_user_agent(template: &str, version: &str) -> String {
    template.replace("{version}", version)
}

/// Pull the app version out of a store page.
pub fn extract_app_version(page: &str) -> Option<String> {
    let data = app_data_regex().captures(page)?.get(1)?.as_str();
    let value: Value = serde_json::from_str(data).ok()?;
    value.pointer(VERSION_POINTER)?.as_str().map(str::to_string)
}
