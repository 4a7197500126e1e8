//! Endpoint paths, relative to the configured base URL.

pub const ITEMS: &str = "item/v8/";
pub const AUTH_BY_EMAIL: &str = "auth/v4/authByEmail";
pub const AUTH_POLLING: &str = "auth/v4/authByRequestPollingId";
pub const REFRESH: &str = "auth/v4/token/refresh";
pub const MANUFACTURER_ITEMS: &str = "manufactureritem/v2/";

pub fn item(item_id: &str) -> String {
    format!("{ITEMS}{item_id}")
}

pub fn favorite(item_id: &str) -> String {
    format!("user/favorite/v1/{item_id}/update")
}

pub fn create_order(item_id: &str) -> String {
    format!("order/v7/create/{item_id}")
}

pub fn order_status(order_id: &str) -> String {
    format!("order/v7/{order_id}/status")
}

pub fn abort_order(order_id: &str) -> String {
    format!("order/v7/{order_id}/abort")
}

pub fn pay_order(order_id: &str) -> String {
    format!("order/v7/{order_id}/pay")
}

pub fn payment(payment_id: &str) -> String {
    format!("payment/v3/{payment_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        assert_eq!(item("42"), "item/v8/42");
        assert_eq!(favorite("42"), "user/favorite/v1/42/update");
        assert_eq!(create_order("42"), "order/v7/create/42");
        assert_eq!(order_status("o-1"), "order/v7/o-1/status");
        assert_eq!(abort_order("o-1"), "order/v7/o-1/abort");
        assert_eq!(pay_order("o-1"), "order/v7/o-1/pay");
        assert_eq!(payment("p-9"), "payment/v3/p-9");
    }
}
