//! Session transport subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatcher
//!     → SessionFactory::create(SessionSettings)   (user agent, proxy, datadome cookie)
//!     → Transport::post(ApiRequest)
//!         → http.rs (default headers, cookie jar, proxy)
//!         → resilience::retries (transient statuses, bounded, backoff)
//!     → ApiResponse (status, content type, body)
//! ```
//!
//! # Design Decisions
//! - Sessions are immutable; identity changes mean a new session
//! - The `datadome` cookie is read back after every call so it survives recreation
//! - User agent and proxy sources are traits so the escalation ladder can be tested offline

pub mod http;
pub mod proxy;
pub mod transport;
pub mod user_agent;

#[cfg(test)]
pub(crate) mod testing;

pub use http::{HttpSession, HttpSessionFactory, SessionDefaults, DATADOME_COOKIE};
pub use proxy::{ProxyError, ProxyPool, PublicProxyPool};
pub use transport::{
    ApiRequest, ApiResponse, SessionFactory, SessionSettings, Transport, TransportError,
};
pub use user_agent::{AppUserAgent, UserAgentProvider};
