use serde::Serialize;

use super::Leg;

/// Pushed to `/events` subscribers whenever an order changes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderEvent {
    #[serde(skip)]
    pub name: &'static str,
    pub order_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leg: Option<Leg>,
}

impl OrderEvent {
    pub const ORDERS_UPDATED: &'static str = "ordersUpdated";

    pub fn created(order_id: &str) -> Self {
        OrderEvent {
            name: Self::ORDERS_UPDATED,
            order_id: order_id.to_string(),
            leg: None,
        }
    }

    pub fn leg_executed(order_id: &str, leg: Leg) -> Self {
        OrderEvent {
            name: Self::ORDERS_UPDATED,
            order_id: order_id.to_string(),
            leg: Some(leg),
        }
    }
}
