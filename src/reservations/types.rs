use serde::Serialize;

/// Intent to buy `amount` of an item once it is in stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reservation {
    pub item_id: String,
    pub amount: u32,
    pub display_name: String,
    /// Filled once an order is placed; empty if no payment URL arrived.
    pub payment_url: String,
}

impl Reservation {
    pub fn new(item_id: impl Into<String>, display_name: impl Into<String>, amount: u32) -> Self {
        Self {
            item_id: item_id.into(),
            amount,
            display_name: display_name.into(),
            payment_url: String::new(),
        }
    }
}

/// Order confirmed upstream and not yet resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    pub id: String,
    pub item_id: String,
    pub amount: u32,
    pub display_name: String,
}

/// Published when a payment URL is ready to be opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentUrlReady {
    pub order_id: String,
    pub item_id: String,
    pub display_name: String,
    pub url: String,
}
