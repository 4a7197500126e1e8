//! Login, token refresh and email confirmation polling.
//!
//! # Responsibilities
//! - Decide on every call whether tokens are still fresh
//! - Refresh aged-out tokens
//! - Run the email login and poll until the user confirms
//!
//! # Design Decisions
//! - Requests go through the caller's dispatcher so blocking remediation applies to login too
//! - Token age is measured on the tokio clock
//! - A malformed refresh reply keeps the current pair; the next call tries again

use std::time::Duration;

use tokio::time::Instant;

use crate::api::types::{
    AuthByEmailRequest, AuthByEmailResponse, PollingRequest, RefreshRequest, TokenResponse,
};
use crate::api::{decode, encode, endpoints};
use crate::auth::state::{AuthPhase, Credentials};
use crate::config::{AccountConfig, ApiConfig, AuthConfig};
use crate::dispatch::Dispatcher;
use crate::error::{AgentError, AgentResult};
use crate::observability::metrics;

/// Login tuning.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub device_type: String,
    pub token_lifetime: Duration,
    pub max_polling_tries: u32,
    pub polling_wait: Duration,
}

impl AuthSettings {
    pub fn from_config(api: &ApiConfig, auth: &AuthConfig) -> Self {
        Self {
            device_type: api.device_type.clone(),
            token_lifetime: Duration::from_secs(auth.access_token_lifetime_secs),
            max_polling_tries: auth.max_polling_tries,
            polling_wait: Duration::from_secs(auth.polling_wait_secs),
        }
    }
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self::from_config(&ApiConfig::default(), &AuthConfig::default())
    }
}

/// Owns the token pair and the login phase.
#[derive(Debug)]
pub struct Authenticator {
    settings: AuthSettings,
    email: Option<String>,
    access_token: Option<String>,
    refresh_token: Option<String>,
    last_refresh: Option<Instant>,
    phase: AuthPhase,
}

impl Authenticator {
    pub fn new(settings: AuthSettings, email: Option<String>) -> Self {
        Self {
            settings,
            email,
            access_token: None,
            refresh_token: None,
            last_refresh: None,
            phase: AuthPhase::Unauthenticated,
        }
    }

    pub fn from_config(api: &ApiConfig, auth: &AuthConfig, account: &AccountConfig) -> Self {
        Self::new(AuthSettings::from_config(api, auth), account.email.clone())
            .with_tokens(account.access_token.clone(), account.refresh_token.clone())
    }

    /// Start from a known token pair. It is refreshed on the first login.
    pub fn with_tokens(mut self, access_token: Option<String>, refresh_token: Option<String>) -> Self {
        self.access_token = access_token;
        self.refresh_token = refresh_token;
        if self.has_token_pair() {
            self.phase = AuthPhase::Authenticated;
        }
        self
    }

    pub fn phase(&self) -> &AuthPhase {
        &self.phase
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    pub fn credentials(&self, datadome_cookie: Option<&str>) -> Credentials {
        Credentials {
            email: self.email.clone(),
            access_token: self.access_token.clone(),
            refresh_token: self.refresh_token.clone(),
            datadome_cookie: datadome_cookie.map(str::to_string),
        }
    }

    fn has_token_pair(&self) -> bool {
        self.access_token.is_some() && self.refresh_token.is_some()
    }

    fn is_fresh(&self) -> bool {
        self.last_refresh
            .map(|at| at.elapsed() <= self.settings.token_lifetime)
            .unwrap_or(false)
    }

    /// Make sure a usable access token is held.
    pub async fn login(&mut self, dispatcher: &mut Dispatcher) -> AgentResult<()> {
        if self.has_token_pair() {
            return self.refresh(dispatcher).await;
        }

        let Some(email) = self.email.clone() else {
            return Err(AgentError::Configuration(
                "You must provide at least email or access_token and refresh_token".to_string(),
            ));
        };

        tracing::info!("Starting login process");
        metrics::record_login("email");

        let body = encode(
            endpoints::AUTH_BY_EMAIL,
            &AuthByEmailRequest {
                device_type: &self.settings.device_type,
                email: &email,
            },
        )?;
        let response = dispatcher
            .post(endpoints::AUTH_BY_EMAIL, Some(body), None)
            .await?;
        let reply: AuthByEmailResponse = decode(endpoints::AUTH_BY_EMAIL, &response)?;

        match reply.state.as_deref() {
            Some("TERMS") => Err(AgentError::Configuration(format!(
                "The email {email} is not linked to an account. Sign up with this email first."
            ))),
            Some("WAIT") => match reply.polling_id {
                Some(polling_id) => self.start_polling(dispatcher, polling_id).await,
                None => Err(AgentError::UnexpectedReply {
                    endpoint: endpoints::AUTH_BY_EMAIL.to_string(),
                    reason: "WAIT without polling_id".to_string(),
                }),
            },
            _ => Err(AgentError::Login {
                status: response.status,
                body: response.body,
            }),
        }
    }

    /// Refresh the pair unless it is younger than the configured lifetime.
    pub async fn refresh(&mut self, dispatcher: &mut Dispatcher) -> AgentResult<()> {
        if self.is_fresh() {
            return Ok(());
        }
        let Some(refresh_token) = self.refresh_token.clone() else {
            return Err(AgentError::Configuration(
                "No refresh token to refresh with".to_string(),
            ));
        };

        self.phase = AuthPhase::Refreshing;
        metrics::record_login("refresh");

        let body = encode(
            endpoints::REFRESH,
            &RefreshRequest {
                refresh_token: &refresh_token,
            },
        )?;
        let result = dispatcher
            .post(endpoints::REFRESH, Some(body), self.access_token.as_deref())
            .await;
        self.phase = AuthPhase::Authenticated;

        match result?.json::<TokenResponse>() {
            Ok(TokenResponse {
                access_token: Some(access_token),
                refresh_token,
            }) => {
                self.access_token = Some(access_token);
                if refresh_token.is_some() {
                    self.refresh_token = refresh_token;
                }
                self.last_refresh = Some(Instant::now());
                tracing::debug!("Access token refreshed");
            }
            Ok(_) => tracing::warn!("Refresh reply carried no access token, keeping current tokens"),
            Err(e) => tracing::warn!(error = %e, "Malformed refresh reply, keeping current tokens"),
        }
        Ok(())
    }

    /// Poll until the login mail is confirmed or the tries run out.
    pub async fn start_polling(
        &mut self,
        dispatcher: &mut Dispatcher,
        polling_id: String,
    ) -> AgentResult<()> {
        let Some(email) = self.email.clone() else {
            return Err(AgentError::Configuration(
                "Polling needs an email address".to_string(),
            ));
        };

        self.phase = AuthPhase::PollingConfirmation {
            polling_id: polling_id.clone(),
        };
        let result = self.poll(dispatcher, &email, &polling_id).await;
        if result.is_err() {
            self.phase = AuthPhase::Unauthenticated;
        }
        result
    }

    async fn poll(
        &mut self,
        dispatcher: &mut Dispatcher,
        email: &str,
        polling_id: &str,
    ) -> AgentResult<()> {
        let body = encode(
            endpoints::AUTH_POLLING,
            &PollingRequest {
                device_type: &self.settings.device_type,
                email,
                request_polling_id: polling_id,
            },
        )?;

        for attempt in 1..=self.settings.max_polling_tries {
            let response = dispatcher
                .post(endpoints::AUTH_POLLING, Some(body.clone()), None)
                .await?;

            match response.status {
                202 => {
                    tracing::warn!(
                        attempt,
                        "Check your mailbox on PC to continue... (Mailbox on mobile won't work if the app is installed)"
                    );
                    tokio::time::sleep(self.settings.polling_wait).await;
                }
                200 => {
                    let tokens: TokenResponse = decode(endpoints::AUTH_POLLING, &response)?;
                    let (Some(access_token), Some(refresh_token)) =
                        (tokens.access_token, tokens.refresh_token)
                    else {
                        return Err(AgentError::UnexpectedReply {
                            endpoint: endpoints::AUTH_POLLING.to_string(),
                            reason: "confirmation without token pair".to_string(),
                        });
                    };
                    self.access_token = Some(access_token);
                    self.refresh_token = Some(refresh_token);
                    self.last_refresh = Some(Instant::now());
                    self.phase = AuthPhase::Authenticated;
                    metrics::record_login("confirmed");
                    tracing::info!("Logged in");
                    return Ok(());
                }
                status => {
                    return Err(AgentError::Login {
                        status,
                        body: response.body,
                    })
                }
            }
        }

        metrics::record_login("polling_timeout");
        Err(AgentError::Polling(
            "Max polling retries reached. Try again.".to_string(),
        ))
    }
}
