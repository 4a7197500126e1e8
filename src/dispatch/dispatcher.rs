//! Request dispatcher with anti-blocking escalation.
//!
//! # Responsibilities
//! - Route every marketplace call through the current session
//! - Classify each attempt and drive the escalation counter
//! - Apply the remediation for the counter, recreate the session, try again
//!
//! # Design Decisions
//! - Explicit loop, never recursion
//! - Retries forever unless `max_attempts` is configured
//! - Connection state (user agent, proxy, cookie, counter) is owned here and nowhere else

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

use crate::config::EscalationConfig;
use crate::dispatch::escalation::{next_count, Outcome, Remediation};
use crate::notify::{Message, Notifier};
use crate::observability::metrics;
use crate::session::{
    ApiRequest, ApiResponse, ProxyPool, SessionFactory, SessionSettings, Transport,
    TransportError, UserAgentProvider,
};

/// Errors the dispatcher surfaces. Blocking itself is never an error unless capped.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Gave up on '{path}' after {attempts} consecutive failed attempts")]
    Exhausted { path: String, attempts: u32 },

    #[error("Could not create session: {0}")]
    Session(#[source] TransportError),
}

/// Timing and ceiling for the escalation loop.
#[derive(Debug, Clone)]
pub struct EscalationPolicy {
    pub retry_pause: Duration,
    pub cooldown: Duration,
    pub max_attempts: Option<u32>,
}

impl EscalationPolicy {
    pub fn from_config(config: &EscalationConfig) -> Self {
        Self {
            retry_pause: Duration::from_millis(config.retry_pause_ms),
            cooldown: Duration::from_secs(config.cooldown_secs),
            max_attempts: config.max_attempts,
        }
    }
}

impl Default for EscalationPolicy {
    fn default() -> Self {
        Self::from_config(&EscalationConfig::default())
    }
}

/// Connection sub-state of the client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionState {
    pub user_agent: Option<String>,
    pub proxy: Option<String>,
    pub datadome_cookie: Option<String>,
    pub escalation_count: u32,
}

/// Sends marketplace calls, escalating through remediations until one succeeds.
pub struct Dispatcher {
    factory: Box<dyn SessionFactory>,
    user_agents: Box<dyn UserAgentProvider>,
    proxies: Box<dyn ProxyPool>,
    notifier: Option<Arc<dyn Notifier>>,
    policy: EscalationPolicy,
    state: ConnectionState,
    session: Option<Box<dyn Transport>>,
}

impl Dispatcher {
    pub fn new(
        factory: Box<dyn SessionFactory>,
        user_agents: Box<dyn UserAgentProvider>,
        proxies: Box<dyn ProxyPool>,
        policy: EscalationPolicy,
    ) -> Self {
        Self {
            factory,
            user_agents,
            proxies,
            notifier: None,
            policy,
            state: ConnectionState::default(),
            session: None,
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Start with a configured proxy.
    pub fn with_proxy(mut self, proxy: Option<String>) -> Self {
        self.state.proxy = proxy;
        self
    }

    /// Start with a known anti-bot cookie.
    pub fn with_datadome_cookie(mut self, cookie: Option<String>) -> Self {
        self.state.datadome_cookie = cookie;
        self
    }

    pub fn set_notifier(&mut self, notifier: Option<Arc<dyn Notifier>>) {
        self.notifier = notifier;
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    pub fn escalation_count(&self) -> u32 {
        self.state.escalation_count
    }

    pub fn datadome_cookie(&self) -> Option<&str> {
        self.state.datadome_cookie.as_deref()
    }

    /// POST `body` to `path`, retrying until a clean JSON reply arrives.
    pub async fn post(
        &mut self,
        path: &str,
        body: Option<Value>,
        access_token: Option<&str>,
    ) -> Result<ApiResponse, DispatchError> {
        let request = ApiRequest::new(path, body).with_access_token(access_token);
        self.send(&request).await
    }

    pub async fn send(&mut self, request: &ApiRequest) -> Result<ApiResponse, DispatchError> {
        let mut failures = 0u32;

        loop {
            let session = match self.session.take() {
                Some(session) => session,
                None => self.create_session().await?,
            };
            let result = session.post(request).await;
            if let Some(cookie) = session.datadome_cookie() {
                self.state.datadome_cookie = Some(cookie);
            }
            self.session = Some(session);

            let outcome = Outcome::classify(&result);
            metrics::record_request(outcome.label());
            self.state.escalation_count = next_count(self.state.escalation_count, outcome);
            metrics::record_escalation_level(self.state.escalation_count);

            match result {
                Ok(response) if outcome == Outcome::Success => return Ok(response),
                Ok(response) => tracing::warn!(
                    path = %request.path,
                    status = response.status,
                    content_type = response.content_type.as_deref().unwrap_or(""),
                    outcome = outcome.label(),
                    escalation = self.state.escalation_count,
                    "Bad response"
                ),
                Err(e) => tracing::warn!(
                    path = %request.path,
                    error = %e,
                    escalation = self.state.escalation_count,
                    "Request failed"
                ),
            }

            failures += 1;
            let remediation = Remediation::for_count(self.state.escalation_count, outcome);
            self.apply(remediation).await;

            if let Some(max) = self.policy.max_attempts {
                if failures >= max {
                    return Err(DispatchError::Exhausted {
                        path: request.path.clone(),
                        attempts: failures,
                    });
                }
            }

            tokio::time::sleep(self.policy.retry_pause).await;
            self.session = None;
        }
    }

    async fn create_session(&mut self) -> Result<Box<dyn Transport>, DispatchError> {
        if self.state.user_agent.is_none() {
            self.state.user_agent = Some(self.user_agents.user_agent().await);
        }

        let settings = SessionSettings {
            user_agent: self.state.user_agent.clone().unwrap_or_default(),
            proxy: self.state.proxy.clone(),
            datadome_cookie: self.state.datadome_cookie.clone(),
        };

        match self.factory.create(&settings) {
            Ok(session) => Ok(session),
            Err(e) if settings.proxy.is_some() => {
                tracing::warn!(proxy = ?settings.proxy, error = %e, "Unusable proxy, dropping it");
                self.state.proxy = None;
                self.factory
                    .create(&SessionSettings {
                        proxy: None,
                        ..settings
                    })
                    .map_err(DispatchError::Session)
            }
            Err(e) => Err(DispatchError::Session(e)),
        }
    }

    async fn apply(&mut self, remediation: Remediation) {
        if remediation != Remediation::None {
            metrics::record_remediation(remediation.label());
        }

        match remediation {
            Remediation::None => {}
            Remediation::RotateUserAgent => {
                let user_agent = self.user_agents.user_agent().await;
                tracing::info!(user_agent = %user_agent, "Rotated user agent");
                self.state.user_agent = Some(user_agent);
            }
            Remediation::ResetSession => {
                tracing::info!("Resetting session");
            }
            Remediation::DropCookie => {
                tracing::info!("Dropping datadome cookie and resetting session");
                self.state.datadome_cookie = None;
            }
            Remediation::RotateProxy => {
                tracing::info!(attempt = self.state.escalation_count, "Looking for a new proxy");
                self.state.proxy = match self.proxies.acquire().await {
                    Ok(Some(proxy)) => {
                        tracing::info!(
                            attempt = self.state.escalation_count,
                            proxy = %proxy,
                            "Trying with new proxy"
                        );
                        Some(proxy)
                    }
                    Ok(None) => {
                        tracing::warn!("No working proxy found");
                        None
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "No working proxy found");
                        None
                    }
                };
            }
            Remediation::ClearProxy => {
                tracing::warn!("Giving up on proxies");
                self.state.proxy = None;
            }
            Remediation::CoolDown => self.cool_down().await,
        }
    }

    async fn cool_down(&mut self) {
        let minutes = self.policy.cooldown.as_secs() / 60;
        tracing::warn!(minutes, "No remediation helped, cooling down");

        if let Some(notifier) = &self.notifier {
            notifier.send(&Message::new(format!(
                "Marketplace connection failed. Sleeping for {minutes} minutes."
            )));
        }
        tokio::time::sleep(self.policy.cooldown).await;
        if let Some(notifier) = &self.notifier {
            notifier.send(&Message::new(format!(
                "Marketplace connection restarts now after sleeping for {minutes} minutes."
            )));
        }

        self.state.proxy = None;
        self.state.escalation_count = 0;
        metrics::record_escalation_level(0);
    }
}
