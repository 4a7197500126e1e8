//! Request dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! MarketplaceClient operation
//!     → dispatcher.rs (session per connection state, post)
//!     → escalation.rs (classify attempt, next counter value, remediation)
//!     → remediation applied (user agent / session / cookie / proxy / cool-down)
//!     → session recreated, same call retried
//! ```

pub mod dispatcher;
pub mod escalation;

pub use dispatcher::{ConnectionState, DispatchError, Dispatcher, EscalationPolicy};
pub use escalation::{Outcome, Remediation};
