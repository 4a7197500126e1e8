//! Authentication subsystem.
//!
//! # States
//! ```text
//! Unauthenticated ──authByEmail WAIT──▶ PollingConfirmation ──200──▶ Authenticated
//!        ▲                                      │                        │  ▲
//!        └────────── tries exhausted ───────────┘             aged out  ▼  │ new pair
//!                                                                    Refreshing
//! ```

pub mod authenticator;
pub mod state;

pub use authenticator::{AuthSettings, Authenticator};
pub use state::{AuthPhase, Credentials};
