//! Reservation to order reconciliation.
//!
//! # Responsibilities
//! - Queue reservations and turn them into orders when stock appears
//! - Track active orders until they leave `RESERVED`
//! - Cancel orders on demand
//!
//! # Design Decisions
//! - Business failures inside `make_orders` are logged; the reservation stays queued
//! - A payment failure after creation never re-creates the order
//! - An order accepted without an id is dequeued but neither tracked nor paid
//! - Payment URLs go out on an optional channel instead of opening a browser

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;

use crate::api::{Item, MarketplaceClient, OrderStatus};
use crate::config::OrderConfig;
use crate::error::AgentResult;
use crate::observability::metrics;
use crate::reservations::types::{Order, PaymentUrlReady, Reservation};

/// Order operations the reconciler needs from the marketplace.
#[async_trait]
pub trait OrderApi: Send {
    /// Returns the new order id; `None` if the order exists upstream without one.
    async fn create_order(&mut self, item_id: &str, amount: u32) -> AgentResult<Option<String>>;
    /// Returns the payment URL, empty if none arrived.
    async fn pay_order(&mut self, order_id: &str) -> AgentResult<String>;
    async fn get_order_status(&mut self, order_id: &str) -> AgentResult<OrderStatus>;
    async fn abort_order(&mut self, order_id: &str) -> AgentResult<()>;
}

#[async_trait]
impl OrderApi for MarketplaceClient {
    async fn create_order(&mut self, item_id: &str, amount: u32) -> AgentResult<Option<String>> {
        MarketplaceClient::create_order(self, item_id, amount).await
    }

    async fn pay_order(&mut self, order_id: &str) -> AgentResult<String> {
        MarketplaceClient::pay_order(self, order_id).await
    }

    async fn get_order_status(&mut self, order_id: &str) -> AgentResult<OrderStatus> {
        MarketplaceClient::get_order_status(self, order_id).await
    }

    async fn abort_order(&mut self, order_id: &str) -> AgentResult<()> {
        MarketplaceClient::abort_order(self, order_id).await
    }
}

/// Anything that knows how many units are left.
pub trait StockLevel {
    fn items_available(&self) -> u32;
}

impl StockLevel for Item {
    fn items_available(&self) -> u32 {
        self.items_available
    }
}

impl StockLevel for u32 {
    fn items_available(&self) -> u32 {
        *self
    }
}

/// Spin ordering tuning.
#[derive(Debug, Clone)]
pub struct ReservationSettings {
    pub spin_attempts: u32,
    pub spin_delay: Duration,
}

impl ReservationSettings {
    pub fn from_config(config: &OrderConfig) -> Self {
        Self {
            spin_attempts: config.spin_attempts,
            spin_delay: Duration::from_millis(config.spin_delay_ms),
        }
    }
}

impl Default for ReservationSettings {
    fn default() -> Self {
        Self::from_config(&OrderConfig::default())
    }
}

/// Pending reservations and active orders over an [`OrderApi`].
pub struct Reservations<A> {
    api: A,
    settings: ReservationSettings,
    pending: Vec<Reservation>,
    active_orders: BTreeMap<String, Order>,
    payment_events: Option<UnboundedSender<PaymentUrlReady>>,
}

impl<A: OrderApi> Reservations<A> {
    pub fn new(api: A, settings: ReservationSettings) -> Self {
        Self {
            api,
            settings,
            pending: Vec::new(),
            active_orders: BTreeMap::new(),
            payment_events: None,
        }
    }

    pub fn with_payment_events(mut self, tx: UnboundedSender<PaymentUrlReady>) -> Self {
        self.payment_events = Some(tx);
        self
    }

    pub fn api_mut(&mut self) -> &mut A {
        &mut self.api
    }

    pub fn pending(&self) -> &[Reservation] {
        &self.pending
    }

    pub fn active_orders(&self) -> &BTreeMap<String, Order> {
        &self.active_orders
    }

    /// Queue a reservation. Duplicates are allowed.
    pub fn reserve(&mut self, item_id: impl Into<String>, display_name: impl Into<String>, amount: u32) {
        let reservation = Reservation::new(item_id, display_name, amount);
        tracing::info!(
            item_id = %reservation.item_id,
            amount = reservation.amount,
            "Reservation queued"
        );
        self.pending.push(reservation);
    }

    /// Order every pending reservation whose item is in stock.
    pub async fn make_orders<S, F>(&mut self, stock: &HashMap<String, S>, mut on_order: F)
    where
        S: StockLevel,
        F: FnMut(&Reservation),
    {
        let mut index = 0;
        while index < self.pending.len() {
            let available = stock
                .get(&self.pending[index].item_id)
                .map(StockLevel::items_available)
                .unwrap_or(0);
            if available == 0 {
                index += 1;
                continue;
            }

            let mut reservation = self.pending[index].clone();
            match self.place_order(&mut reservation).await {
                Ok(()) => {
                    self.pending.remove(index);
                    on_order(&reservation);
                }
                Err(e) => {
                    tracing::warn!(item_id = %reservation.item_id, error = %e, "Order failed");
                    index += 1;
                }
            }
        }
    }

    /// Keep trying to order one unit of `item_id`.
    pub async fn make_orders_spin(&mut self, item_id: &str) -> Option<Reservation> {
        for attempt in 1..=self.settings.spin_attempts {
            let mut reservation = Reservation::new(item_id, "spin", 1);
            match self.place_order(&mut reservation).await {
                Ok(()) => return Some(reservation),
                Err(e) => {
                    tracing::warn!(item_id, attempt, error = %e, "Order failed");
                    tokio::time::sleep(self.settings.spin_delay).await;
                }
            }
        }
        None
    }

    /// Drop orders that are no longer `RESERVED`.
    pub async fn update_active_orders(&mut self) {
        let ids: Vec<String> = self.active_orders.keys().cloned().collect();
        for id in ids {
            match self.api.get_order_status(&id).await {
                Ok(status) if status.is_reserved() => {
                    tracing::info!(order_id = %id, "Order still reserved");
                }
                Ok(status) => {
                    tracing::info!(order_id = %id, state = ?status.state, "Order no longer active");
                    self.active_orders.remove(&id);
                }
                Err(e) => {
                    tracing::warn!(order_id = %id, error = %e, "Order status query failed");
                }
            }
        }
    }

    /// Abort one order. It stays tracked if the abort is rejected.
    pub async fn cancel_order(&mut self, order_id: &str) -> AgentResult<()> {
        self.api.abort_order(order_id).await?;
        self.active_orders.remove(order_id);
        metrics::record_order("cancelled");
        tracing::info!(order_id, "Order cancelled");
        Ok(())
    }

    /// Abort every tracked order; returns how many were cancelled.
    pub async fn cancel_all_orders(&mut self) -> usize {
        let ids: Vec<String> = self.active_orders.keys().cloned().collect();
        let mut cancelled = 0;
        for id in ids {
            match self.cancel_order(&id).await {
                Ok(()) => cancelled += 1,
                Err(e) => tracing::warn!(order_id = %id, error = %e, "Cancellation failed"),
            }
        }
        cancelled
    }

    async fn place_order(&mut self, reservation: &mut Reservation) -> AgentResult<()> {
        let order_id = match self
            .api
            .create_order(&reservation.item_id, reservation.amount)
            .await
        {
            Ok(id) => id,
            Err(e) => {
                metrics::record_order("failed");
                return Err(e);
            }
        };
        metrics::record_order("created");

        let Some(order_id) = order_id else {
            tracing::warn!(
                item_id = %reservation.item_id,
                "Order placed without id; skipping tracking and payment"
            );
            reservation.payment_url.clear();
            return Ok(());
        };

        self.active_orders.insert(
            order_id.clone(),
            Order {
                id: order_id.clone(),
                item_id: reservation.item_id.clone(),
                amount: reservation.amount,
                display_name: reservation.display_name.clone(),
            },
        );

        reservation.payment_url = match self.api.pay_order(&order_id).await {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(order_id = %order_id, error = %e, "Payment failed");
                String::new()
            }
        };

        if !reservation.payment_url.is_empty() {
            if let Some(tx) = &self.payment_events {
                let event = PaymentUrlReady {
                    order_id,
                    item_id: reservation.item_id.clone(),
                    display_name: reservation.display_name.clone(),
                    url: reservation.payment_url.clone(),
                };
                if tx.send(event).is_err() {
                    tracing::debug!("Payment event receiver dropped");
                }
            }
        }
        Ok(())
    }
}
