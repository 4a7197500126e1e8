//! Marketplace client.
//!
//! # Responsibilities
//! - Own the dispatcher (connection state) and the authenticator (token state)
//! - Log in before every operation
//! - Translate between typed envelopes and dispatcher calls
//!
//! # Design Decisions
//! - `&mut self` everywhere: one caller at a time per client
//! - Business rejections (`state != SUCCESS`) surface as `AgentError::Api`

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use regex::Regex;
use serde_json::Value;
use url::Url;

use crate::api::types::{
    AbortOrderRequest, CreateOrderRequest, CreateOrderResponse, FavoriteRequest, Item,
    ItemDetailRequest, ItemQuery, ItemsResponse, ManufacturerItemsRequest, OrderStatus,
    PayOrderRequest, PayOrderResponse, PaymentStatusResponse, StateResponse, STATE_SUCCESS,
};
use crate::api::{decode, encode, endpoints};
use crate::auth::{Authenticator, Credentials};
use crate::config::{AgentConfig, OrderConfig};
use crate::dispatch::{Dispatcher, EscalationPolicy};
use crate::error::{AgentError, AgentResult};
use crate::notify::Notifier;
use crate::session::{
    ApiResponse, AppUserAgent, HttpSessionFactory, PublicProxyPool, SessionDefaults,
};

/// Page size used when walking the favorites list.
pub const FAVORITES_PAGE_SIZE: u32 = 100;

fn payment_url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""(https?://[^"\s]+)""#).expect("payment url regex is valid"))
}

/// First quoted http(s) URL in a payment payload.
pub fn extract_payment_url(payload: &str) -> Option<String> {
    payment_url_regex()
        .captures_iter(payload)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .find(|candidate| Url::parse(candidate).is_ok())
        .map(str::to_string)
}

/// Client for the marketplace API.
pub struct MarketplaceClient {
    dispatcher: Dispatcher,
    auth: Authenticator,
    orders: OrderConfig,
}

impl MarketplaceClient {
    pub fn new(dispatcher: Dispatcher, auth: Authenticator, orders: OrderConfig) -> Self {
        Self {
            dispatcher,
            auth,
            orders,
        }
    }

    /// Client wired to the real HTTP session, store-page user agents and the public proxy list.
    pub fn from_config(config: &AgentConfig) -> AgentResult<Self> {
        let defaults = SessionDefaults::from_config(&config.api, &config.retries)
            .map_err(|e| AgentError::Configuration(e.to_string()))?;

        let dispatcher = Dispatcher::new(
            Box::new(HttpSessionFactory::new(defaults)),
            Box::new(AppUserAgent::new(&config.api)),
            Box::new(PublicProxyPool::new(&config.escalation)),
            EscalationPolicy::from_config(&config.escalation),
        )
        .with_proxy(config.api.proxy.clone())
        .with_datadome_cookie(config.account.datadome_cookie.clone());

        let auth = Authenticator::from_config(&config.api, &config.auth, &config.account);

        Ok(Self::new(dispatcher, auth, config.orders.clone()))
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.dispatcher.set_notifier(Some(notifier));
        self
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn authenticator(&self) -> &Authenticator {
        &self.auth
    }

    pub async fn login(&mut self) -> AgentResult<()> {
        self.auth.login(&mut self.dispatcher).await
    }

    /// Current credentials, logging in first so they are usable.
    pub async fn credentials(&mut self) -> AgentResult<Credentials> {
        self.login().await?;
        Ok(self.auth.credentials(self.dispatcher.datadome_cookie()))
    }

    async fn call(&mut self, path: &str, body: Option<Value>) -> AgentResult<ApiResponse> {
        self.login().await?;
        let response = self
            .dispatcher
            .post(path, body, self.auth.access_token())
            .await?;
        Ok(response)
    }

    pub async fn get_items(&mut self, query: &ItemQuery) -> AgentResult<Vec<Item>> {
        let body = encode(endpoints::ITEMS, query)?;
        let response = self.call(endpoints::ITEMS, Some(body)).await?;
        let reply: ItemsResponse = decode(endpoints::ITEMS, &response)?;
        Ok(reply.items)
    }

    pub async fn get_item(&mut self, item_id: &str) -> AgentResult<Item> {
        let path = endpoints::item(item_id);
        let body = encode(&path, &ItemDetailRequest { origin: None })?;
        let response = self.call(&path, Some(body)).await?;
        decode(&path, &response)
    }

    /// Every favorite, walking pages until a short one.
    pub async fn get_favorites(&mut self) -> AgentResult<Vec<Item>> {
        let mut items = Vec::new();
        let mut page = 1;
        loop {
            let batch = self
                .get_items(&ItemQuery::favorites_page(page, FAVORITES_PAGE_SIZE))
                .await?;
            let len = batch.len();
            items.extend(batch);
            if len < FAVORITES_PAGE_SIZE as usize {
                break;
            }
            page += 1;
        }
        Ok(items)
    }

    pub async fn set_favorite(&mut self, item_id: &str, is_favorite: bool) -> AgentResult<()> {
        let path = endpoints::favorite(item_id);
        let body = encode(&path, &FavoriteRequest { is_favorite })?;
        self.call(&path, Some(body)).await?;
        Ok(())
    }

    /// Place an order; returns the new order id, or `None` when the order was
    /// accepted without one.
    pub async fn create_order(
        &mut self,
        item_id: &str,
        item_count: u32,
    ) -> AgentResult<Option<String>> {
        let path = endpoints::create_order(item_id);
        let body = encode(&path, &CreateOrderRequest { item_count })?;
        let response = self.call(&path, Some(body)).await?;
        let reply: CreateOrderResponse = decode(&path, &response)?;

        if reply.state.as_deref() != Some(STATE_SUCCESS) {
            return Err(AgentError::Api {
                status: response.status,
                body: response.body,
            });
        }

        let order_id = reply.order.and_then(|order| order.id);
        match &order_id {
            Some(id) => tracing::info!(item_id, order_id = %id, "New order"),
            None => tracing::warn!(item_id, "Order created without id, cannot track it"),
        }
        Ok(order_id)
    }

    /// Authorize payment and wait for the provider URL. Empty if none arrives in time.
    pub async fn pay_order(&mut self, order_id: &str) -> AgentResult<String> {
        let path = endpoints::pay_order(order_id);
        let request = PayOrderRequest::from_config(&self.orders).map_err(|source| {
            AgentError::Encode {
                endpoint: path.clone(),
                source,
            }
        })?;
        let body = encode(&path, &request)?;

        tracing::info!(order_id, "Paying order");
        let response = self.call(&path, Some(body)).await?;
        let reply: PayOrderResponse = decode(&path, &response)?;
        let Some(payment_id) = reply.payment_id else {
            return Err(AgentError::UnexpectedReply {
                endpoint: path,
                reason: "missing payment_id".to_string(),
            });
        };

        tokio::time::sleep(Duration::from_millis(self.orders.payment_initial_delay_ms)).await;

        let payment_path = endpoints::payment(&payment_id);
        for attempt in 1..=self.orders.payment_poll_attempts {
            let response = self.call(&payment_path, None).await?;
            let status: PaymentStatusResponse = decode(&payment_path, &response)?;

            if let Some(url) = status.payload.as_deref().and_then(extract_payment_url) {
                tracing::info!(order_id, url = %url, "Payment URL ready");
                return Ok(url);
            }
            tracing::debug!(order_id, attempt, state = ?status.state, "Payment not ready");
        }

        tracing::warn!(order_id, "No payment URL received");
        Ok(String::new())
    }

    pub async fn get_order_status(&mut self, order_id: &str) -> AgentResult<OrderStatus> {
        let path = endpoints::order_status(order_id);
        let response = self.call(&path, None).await?;
        decode(&path, &response)
    }

    /// Cancel an unpaid order.
    pub async fn abort_order(&mut self, order_id: &str) -> AgentResult<()> {
        let path = endpoints::abort_order(order_id);
        let body = encode(&path, &AbortOrderRequest { cancel_reason_id: 1 })?;
        let response = self.call(&path, Some(body)).await?;
        let reply: StateResponse = decode(&path, &response)?;

        if reply.state.as_deref() != Some(STATE_SUCCESS) {
            return Err(AgentError::Api {
                status: response.status,
                body: response.body,
            });
        }
        Ok(())
    }

    pub async fn get_manufacturer_items(&mut self) -> AgentResult<Value> {
        let body = encode(endpoints::MANUFACTURER_ITEMS, &ManufacturerItemsRequest::default())?;
        let response = self.call(endpoints::MANUFACTURER_ITEMS, Some(body)).await?;
        decode(endpoints::MANUFACTURER_ITEMS, &response)
    }
}
