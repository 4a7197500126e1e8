//! Outbound proxy rotation from a public proxy list.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Proxy};
use thiserror::Error;
use url::Url;

use crate::config::EscalationConfig;

/// Errors while acquiring a proxy.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("Failed to fetch proxy list: {0}")]
    List(#[from] reqwest::Error),
}

/// Source of fresh outbound proxies.
#[async_trait]
pub trait ProxyPool: Send + Sync {
    /// A working proxy URL, or `None` when no candidate passed the probe.
    async fn acquire(&self) -> Result<Option<String>, ProxyError>;
}

/// Picks random elite proxies from a public list and probes them against the marketplace.
pub struct PublicProxyPool {
    list_url: String,
    probe_url: String,
    probe_timeout: Duration,
    max_candidates: usize,
    client: Client,
}

impl PublicProxyPool {
    pub fn new(config: &EscalationConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self {
            list_url: config.proxy_list_url.clone(),
            probe_url: config.proxy_probe_url.clone(),
            probe_timeout: Duration::from_secs(config.proxy_probe_timeout_secs),
            max_candidates: config.proxy_candidates,
            client,
        }
    }

    /// A proxy works if a request through it returns a non-empty body.
    async fn probe(&self, candidate: &str) -> bool {
        let proxy = match Proxy::all(candidate) {
            Ok(proxy) => proxy,
            Err(_) => return false,
        };
        let client = match Client::builder()
            .proxy(proxy)
            .timeout(self.probe_timeout)
            .danger_accept_invalid_certs(true)
            .build()
        {
            Ok(client) => client,
            Err(_) => return false,
        };

        match client.get(&self.probe_url).send().await {
            Ok(response) if response.status().is_success() => response
                .text()
                .await
                .map(|body| !body.trim().is_empty())
                .unwrap_or(false),
            Ok(response) => {
                tracing::debug!(proxy = %candidate, status = %response.status(), "Proxy probe rejected");
                false
            }
            Err(e) => {
                tracing::debug!(proxy = %candidate, error = %e, "Proxy probe failed");
                false
            }
        }
    }
}

#[async_trait]
impl ProxyPool for PublicProxyPool {
    async fn acquire(&self) -> Result<Option<String>, ProxyError> {
        let list = self
            .client
            .get(&self.list_url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let mut candidates = parse_proxy_list(&list);
        fastrand::shuffle(&mut candidates);
        tracing::debug!(candidates = candidates.len(), "Fetched proxy list");

        for candidate in candidates.into_iter().take(self.max_candidates) {
            if self.probe(&candidate).await {
                tracing::info!(proxy = %candidate, "Found working proxy");
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }
}

/// Parse a plain-text proxy list (`host:port` or full URLs, one per line).
pub fn parse_proxy_list(list: &str) -> Vec<String> {
    list.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let candidate = if line.contains("://") {
                line.to_string()
            } else {
                format!("http://{line}")
            };
            let url = Url::parse(&candidate).ok()?;
            (url.host_str().is_some() && url.port_or_known_default().is_some()).then_some(candidate)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_proxy_list() {
        let list = "\n10.0.0.1:3128\n# comment\nsocks4://10.0.0.2:1080\r\nnot a proxy\n  \n";
        assert_eq!(
            parse_proxy_list(list),
            vec!["http://10.0.0.1:3128".to_string(), "socks4://10.0.0.2:1080".to_string()]
        );
    }
}
