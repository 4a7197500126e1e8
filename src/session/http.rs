//! reqwest-backed marketplace session.
//!
//! # Responsibilities
//! - Apply default headers (language, accept, content type, user agent)
//! - Route through the configured proxy
//! - Keep the `datadome` cookie in a per-session jar
//! - Retry transient statuses with backoff

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, Proxy};
use url::Url;

use crate::config::{ApiConfig, RetryConfig};
use crate::resilience::retries::{is_retryable_error, TransientRetryPolicy};
use crate::session::transport::{
    ApiRequest, ApiResponse, SessionFactory, SessionSettings, Transport, TransportError,
};

/// Name of the anti-bot session cookie.
pub const DATADOME_COOKIE: &str = "datadome";

/// Settings shared by every session of one client.
#[derive(Debug, Clone)]
pub struct SessionDefaults {
    pub base_url: Url,
    pub language: String,
    pub timeout: Option<Duration>,
    pub accept_invalid_certs: bool,
    pub retry: TransientRetryPolicy,
}

impl SessionDefaults {
    pub fn from_config(api: &ApiConfig, retries: &RetryConfig) -> Result<Self, TransportError> {
        let base_url =
            Url::parse(&api.base_url).map_err(|_| TransportError::InvalidUrl(api.base_url.clone()))?;
        Ok(Self {
            base_url,
            language: api.language.clone(),
            timeout: api.timeout_secs.map(Duration::from_secs),
            accept_invalid_certs: api.accept_invalid_certs,
            retry: TransientRetryPolicy::new(retries),
        })
    }
}

/// A single HTTP session with its own connection pool and cookie jar.
pub struct HttpSession {
    client: Client,
    jar: Arc<Jar>,
    base_url: Url,
    retry: TransientRetryPolicy,
}

impl HttpSession {
    pub fn new(defaults: &SessionDefaults, settings: &SessionSettings) -> Result<Self, TransportError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_str(&defaults.language)
                .map_err(|_| TransportError::InvalidHeader("accept-language"))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/json; charset=utf-8"),
        );
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&settings.user_agent)
                .map_err(|_| TransportError::InvalidHeader("user-agent"))?,
        );

        let jar = Arc::new(Jar::default());
        if let Some(value) = &settings.datadome_cookie {
            jar.add_cookie_str(&datadome_cookie_header(&defaults.base_url, value), &defaults.base_url);
        }

        let mut builder = Client::builder()
            .default_headers(headers)
            .cookie_provider(jar.clone())
            .gzip(true)
            .danger_accept_invalid_certs(defaults.accept_invalid_certs);

        if let Some(timeout) = defaults.timeout {
            builder = builder.timeout(timeout);
        }

        builder = match &settings.proxy {
            Some(proxy) => builder.proxy(Proxy::all(proxy.as_str()).map_err(|source| {
                TransportError::InvalidProxy {
                    proxy: proxy.clone(),
                    source,
                }
            })?),
            // Egress is managed explicitly by the escalation ladder.
            None => builder.no_proxy(),
        };

        let client = builder.build().map_err(TransportError::Build)?;

        Ok(Self {
            client,
            jar,
            base_url: defaults.base_url.clone(),
            retry: defaults.retry.clone(),
        })
    }

    async fn read(response: reqwest::Response) -> Result<ApiResponse, TransportError> {
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await?;
        Ok(ApiResponse {
            status,
            content_type,
            body,
        })
    }
}

#[async_trait]
impl Transport for HttpSession {
    async fn post(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        let url = self
            .base_url
            .join(&request.path)
            .map_err(|_| TransportError::InvalidUrl(request.path.clone()))?;

        let mut retries = 0;
        loop {
            let mut builder = self.client.post(url.clone());
            if let Some(token) = &request.access_token {
                builder = builder.bearer_auth(token);
            }
            if let Some(body) = &request.body {
                builder = builder.json(body);
            }

            match builder.send().await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    if self.retry.should_retry_status(status, retries) {
                        retries += 1;
                        let delay = self.retry.delay(retries);
                        tracing::debug!(
                            path = %request.path,
                            status,
                            retry = retries,
                            delay = ?delay,
                            "Transient status, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Self::read(response).await;
                }
                Err(e) if is_retryable_error(&e) && self.retry.has_budget(retries) => {
                    retries += 1;
                    let delay = self.retry.delay(retries);
                    tracing::debug!(
                        path = %request.path,
                        error = %e,
                        retry = retries,
                        delay = ?delay,
                        "Network error, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(TransportError::Request(e)),
            }
        }
    }

    fn datadome_cookie(&self) -> Option<String> {
        let header = self.jar.cookies(&self.base_url)?;
        let header = header.to_str().ok()?;
        find_cookie(header, DATADOME_COOKIE)
    }
}

/// Builds [`HttpSession`]s from shared defaults.
#[derive(Debug, Clone)]
pub struct HttpSessionFactory {
    defaults: SessionDefaults,
}

impl HttpSessionFactory {
    pub fn new(defaults: SessionDefaults) -> Self {
        Self { defaults }
    }
}

impl SessionFactory for HttpSessionFactory {
    fn create(&self, settings: &SessionSettings) -> Result<Box<dyn Transport>, TransportError> {
        Ok(Box::new(HttpSession::new(&self.defaults, settings)?))
    }
}

/// `Set-Cookie` style string for seeding the jar.
///
/// Domain names get a leading-dot domain cookie; `localhost` and IP hosts get a host-only
/// cookie since a domain attribute would never match them.
fn datadome_cookie_header(base_url: &Url, value: &str) -> String {
    let mut cookie = format!("{DATADOME_COOKIE}={value}; Path=/");
    if let Some(host) = base_url.host_str() {
        let is_ip = host.trim_matches(|c| c == '[' || c == ']').parse::<IpAddr>().is_ok();
        if host != "localhost" && !is_ip {
            cookie.push_str(&format!("; Domain=.{host}"));
        }
    }
    if base_url.scheme() == "https" {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Find `name` in a `Cookie` header value.
fn find_cookie(header: &str, name: &str) -> Option<String> {
    header.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name).then(|| value.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_header_for_domain() {
        let url = Url::parse("https://apptoogoodtogo.com/api/").unwrap();
        assert_eq!(
            datadome_cookie_header(&url, "abc"),
            "datadome=abc; Path=/; Domain=.apptoogoodtogo.com; Secure"
        );
    }

    #[test]
    fn test_cookie_header_for_local_hosts() {
        let url = Url::parse("http://127.0.0.1:8080/api/").unwrap();
        assert_eq!(datadome_cookie_header(&url, "abc"), "datadome=abc; Path=/");

        let url = Url::parse("http://localhost:8080/").unwrap();
        assert_eq!(datadome_cookie_header(&url, "abc"), "datadome=abc; Path=/");
    }

    #[test]
    fn test_find_cookie() {
        assert_eq!(find_cookie("a=1; datadome=xyz; b=2", "datadome").as_deref(), Some("xyz"));
        assert_eq!(find_cookie("a=1", "datadome"), None);
    }

    #[test]
    fn test_seeded_cookie_is_readable() {
        let defaults = SessionDefaults::from_config(
            &ApiConfig {
                base_url: "https://apptoogoodtogo.com/api/".into(),
                ..ApiConfig::default()
            },
            &RetryConfig::default(),
        )
        .unwrap();
        let session = HttpSession::new(
            &defaults,
            &SessionSettings {
                user_agent: "test-agent".into(),
                proxy: None,
                datadome_cookie: Some("seeded".into()),
            },
        )
        .unwrap();
        assert_eq!(session.datadome_cookie().as_deref(), Some("seeded"));
    }

    #[test]
    fn test_invalid_proxy_is_rejected() {
        let defaults =
            SessionDefaults::from_config(&ApiConfig::default(), &RetryConfig::default()).unwrap();
        let result = HttpSession::new(
            &defaults,
            &SessionSettings {
                user_agent: "test-agent".into(),
                proxy: Some("http://bad host:3128".into()),
                datadome_cookie: None,
            },
        );
        assert!(matches!(result, Err(TransportError::InvalidProxy { .. })));
    }
}
