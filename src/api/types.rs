//! Wire types, one per request/reply envelope.
//!
//! Field names follow the upstream JSON. Nullable or optional reply fields are
//! `Option` so partial replies still decode; required-ness is checked by the client.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::OrderConfig;

// ---------------------------------------------------------------------------
// Authentication
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct AuthByEmailRequest<'a> {
    pub device_type: &'a str,
    pub email: &'a str,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthByEmailResponse {
    pub state: Option<String>,
    pub polling_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PollingRequest<'a> {
    pub device_type: &'a str,
    pub email: &'a str,
    pub request_polling_id: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

/// Token pair returned by a confirmed poll or a refresh.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenResponse {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

// ---------------------------------------------------------------------------
// Items
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Origin {
    pub latitude: f64,
    pub longitude: f64,
}

/// Item search. Fields serialize in the order the app sends them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemQuery {
    pub origin: Origin,
    pub radius: u32,
    pub page_size: u32,
    pub page: u32,
    pub discover: bool,
    pub favorites_only: bool,
    pub item_categories: Vec<String>,
    pub diet_categories: Vec<String>,
    pub pickup_earliest: Option<String>,
    pub pickup_latest: Option<String>,
    pub search_phrase: Option<String>,
    pub with_stock_only: bool,
    pub hidden_only: bool,
    pub we_care_only: bool,
}

impl Default for ItemQuery {
    fn default() -> Self {
        Self {
            origin: Origin::default(),
            radius: 21,
            page_size: 20,
            page: 1,
            discover: false,
            favorites_only: true,
            item_categories: Vec::new(),
            diet_categories: Vec::new(),
            pickup_earliest: None,
            pickup_latest: None,
            search_phrase: None,
            with_stock_only: false,
            hidden_only: false,
            we_care_only: false,
        }
    }
}

impl ItemQuery {
    /// One page of favorites.
    pub fn favorites_page(page: u32, page_size: u32) -> Self {
        Self {
            page,
            page_size,
            favorites_only: true,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemsResponse {
    #[serde(default)]
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemDetailRequest {
    pub origin: Option<Origin>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemInfo {
    pub item_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Store {
    #[serde(default)]
    pub store_id: Option<String>,
    #[serde(default)]
    pub store_name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A listed offer. Only the fields the agent acts on are typed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub item: ItemInfo,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub items_available: u32,
    #[serde(default)]
    pub store: Option<Store>,
    #[serde(default)]
    pub favorite: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Item {
    pub fn item_id(&self) -> &str {
        &self.item.item_id
    }

    /// Display name, else "store - item", else the id.
    pub fn label(&self) -> String {
        if let Some(name) = &self.display_name {
            return name.clone();
        }
        let store = self.store.as_ref().and_then(|s| s.store_name.as_deref());
        match (store, self.item.name.as_deref()) {
            (Some(store), Some(name)) => format!("{store} - {name}"),
            (Some(store), None) => store.to_string(),
            _ => self.item.item_id.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FavoriteRequest {
    pub is_favorite: bool,
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct CreateOrderRequest {
    pub item_count: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateOrderResponse {
    pub state: Option<String>,
    pub order: Option<OrderInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct OrderInfo {
    pub id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Order status reply; `state` is `RESERVED` while the order is still open.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct OrderStatus {
    pub state: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl OrderStatus {
    pub const RESERVED: &'static str = "RESERVED";

    pub fn is_reserved(&self) -> bool {
        self.state.as_deref() == Some(Self::RESERVED)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AbortOrderRequest {
    pub cancel_reason_id: u32,
}

/// Business reply carrying only a state.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StateResponse {
    pub state: Option<String>,
}

pub const STATE_SUCCESS: &str = "SUCCESS";

// ---------------------------------------------------------------------------
// Payment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct PayOrderRequest {
    pub authorization: Authorization,
}

#[derive(Debug, Clone, Serialize)]
pub struct Authorization {
    pub authorization_payload: AuthorizationPayload,
    pub payment_provider: String,
    pub return_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationPayload {
    pub save_payment_method: bool,
    pub payment_type: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// Wallet configuration, JSON-encoded into a string.
    pub payload: String,
}

#[derive(Debug, Clone, Serialize)]
struct WalletPayload<'a> {
    configuration: WalletConfiguration<'a>,
    name: &'a str,
    #[serde(rename = "type")]
    kind: &'a str,
}

#[derive(Debug, Clone, Serialize)]
struct WalletConfiguration<'a> {
    #[serde(rename = "merchantId")]
    merchant_id: &'a str,
    intent: &'a str,
}

impl PayOrderRequest {
    pub fn from_config(config: &OrderConfig) -> Result<Self, serde_json::Error> {
        let payload = serde_json::to_string(&WalletPayload {
            configuration: WalletConfiguration {
                merchant_id: &config.merchant_id,
                intent: "authorize",
            },
            name: "PayPal",
            kind: "paypal",
        })?;

        Ok(Self {
            authorization: Authorization {
                authorization_payload: AuthorizationPayload {
                    save_payment_method: false,
                    payment_type: config.payment_type.clone(),
                    kind: "adyenAuthorizationPayload".to_string(),
                    payload,
                },
                payment_provider: config.payment_provider.clone(),
                return_url: config.return_url.clone(),
            },
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PayOrderResponse {
    pub payment_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentStatusResponse {
    pub payload: Option<String>,
    pub state: Option<String>,
}

// ---------------------------------------------------------------------------
// Manufacturer items
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ManufacturerItemsRequest {
    pub action_types_accepted: Vec<&'static str>,
    pub display_types_accepted: Vec<&'static str>,
    pub element_types_accepted: Vec<&'static str>,
}

impl Default for ManufacturerItemsRequest {
    fn default() -> Self {
        Self {
            action_types_accepted: vec!["QUERY"],
            display_types_accepted: vec!["LIST", "FILL"],
            element_types_accepted: vec![
                "ITEM",
                "HIGHLIGHTED_ITEM",
                "MANUFACTURER_STORY_CARD",
                "DUO_ITEMS",
                "DUO_ITEMS_V2",
                "TEXT",
                "PARCEL_TEXT",
                "NPS",
                "SMALL_CARDS_CAROUSEL",
                "ITEM_CARDS_CAROUSEL",
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_query_field_order() {
        let body = serde_json::to_string(&ItemQuery::default()).unwrap();
        assert!(body.starts_with(r#"{"origin":{"latitude":0.0,"longitude":0.0},"radius":21,"page_size":20,"page":1,"#));
        assert!(body.ends_with(r#""search_phrase":null,"with_stock_only":false,"hidden_only":false,"we_care_only":false}"#));
    }

    #[test]
    fn test_item_decodes_with_unknown_fields() {
        let item: Item = serde_json::from_str(
            r#"{
                "item": {"item_id": "123", "name": "Magic Bag", "price": {"code": "EUR"}},
                "store": {"store_name": "Bakery"},
                "items_available": 3,
                "pickup_location": {"address": {}}
            }"#,
        )
        .unwrap();

        assert_eq!(item.item_id(), "123");
        assert_eq!(item.items_available, 3);
        assert_eq!(item.label(), "Bakery - Magic Bag");
        assert!(item.extra.contains_key("pickup_location"));
        assert!(item.item.extra.contains_key("price"));
    }

    #[test]
    fn test_pay_payload_shape() {
        let config = OrderConfig {
            merchant_id: "Merchant_1".into(),
            ..OrderConfig::default()
        };
        let body = serde_json::to_value(PayOrderRequest::from_config(&config).unwrap()).unwrap();
        let auth = &body["authorization"];

        assert_eq!(auth["payment_provider"], "ADYEN");
        assert_eq!(auth["return_url"], "adyencheckout://com.app.tgtg.itemview");
        assert_eq!(auth["authorization_payload"]["type"], "adyenAuthorizationPayload");
        assert_eq!(auth["authorization_payload"]["payment_type"], "PAYPAL");
        assert_eq!(
            auth["authorization_payload"]["payload"],
            r#"{"configuration":{"merchantId":"Merchant_1","intent":"authorize"},"name":"PayPal","type":"paypal"}"#
        );
    }

    #[test]
    fn test_order_status() {
        let status: OrderStatus = serde_json::from_str(r#"{"state":"RESERVED","id":"o"}"#).unwrap();
        assert!(status.is_reserved());
        let status: OrderStatus = serde_json::from_str(r#"{"state":"CANCELLED"}"#).unwrap();
        assert!(!status.is_reserved());
    }
}
