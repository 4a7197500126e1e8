//! Marketplace API subsystem.
//!
//! # Data Flow
//! ```text
//! MarketplaceClient operation
//!     → Authenticator::login (refresh or email confirmation as needed)
//!     → types.rs request envelope → serde_json::Value
//!     → Dispatcher::post(endpoints.rs path, body, bearer)
//!     → types.rs reply envelope
//! ```

pub mod client;
pub mod endpoints;
pub mod types;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{AgentError, AgentResult};
use crate::session::ApiResponse;

pub use client::{extract_payment_url, MarketplaceClient, FAVORITES_PAGE_SIZE};
pub use types::{Item, ItemQuery, OrderStatus, Origin};

pub(crate) fn encode<T: Serialize>(endpoint: &str, body: &T) -> AgentResult<Value> {
    serde_json::to_value(body).map_err(|source| AgentError::Encode {
        endpoint: endpoint.to_string(),
        source,
    })
}

pub(crate) fn decode<T: DeserializeOwned>(endpoint: &str, response: &ApiResponse) -> AgentResult<T> {
    response.json().map_err(|source| AgentError::Decode {
        endpoint: endpoint.to_string(),
        source,
    })
}
