//! Surplus-food marketplace agent.
//!
//! Polls a marketplace that lists limited surplus-food offers, keeps the session alive
//! against anti-bot blocking, and turns reservations into paid orders.
//!
//! # Architecture Overview
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                          reservations                                │
//!   │   pending reservations ──stock > 0──▶ create order ──▶ pay ──▶ URL   │
//!   └───────────────────────────────┬──────────────────────────────────────┘
//!                                   │ OrderApi
//!                                   ▼
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                        api::MarketplaceClient                        │
//!   │     auth::Authenticator (login / refresh / email polling)            │
//!   └───────────────────────────────┬──────────────────────────────────────┘
//!                                   │ post(path, body, bearer)
//!                                   ▼
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                       dispatch::Dispatcher                           │
//!   │   classify ─▶ escalation counter ─▶ remediation ─▶ new session       │
//!   │   (user agent · session · datadome cookie · proxy · cool-down)       │
//!   └───────────────────────────────┬──────────────────────────────────────┘
//!                                   │ Transport
//!                                   ▼
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │          session::HttpSession (reqwest, cookies, retries)            │
//!   └──────────────────────────────────────────────────────────────────────┘
//!
//!   Cross-cutting: config · observability · resilience · notify
//! ```

// Core subsystems
pub mod api;
pub mod auth;
pub mod dispatch;
pub mod reservations;
pub mod session;

// Cross-cutting concerns
pub mod config;
pub mod error;
pub mod notify;
pub mod observability;
pub mod resilience;

pub use api::MarketplaceClient;
pub use config::AgentConfig;
pub use error::{AgentError, AgentResult};
pub use reservations::Reservations;
