//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to the marketplace:
//!     → retries.rs (transient status? retry with backoff, bounded)
//!     → backoff.rs (exponential delay + jitter)
//!     → anything still failing is classified by the dispatcher's escalation ladder
//! ```

pub mod backoff;
pub mod retries;

pub use backoff::calculate_backoff;
pub use retries::TransientRetryPolicy;
