use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::models::{Leg, LegStatus, Order};

use super::order_store::{OrderStore, StoreError};

/// Process-local order store. Used by tests and by `ORDER_STORE=memory`.
#[derive(Default)]
pub struct MemoryOrderStore {
    orders: RwLock<Vec<Order>>,
    next_id: AtomicU64,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn create(&self, mut order: Order) -> Result<Order, StoreError> {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        order.id = format!("{n:024x}");
        self.orders.write().await.push(order.clone());
        Ok(order)
    }

    async fn list_by_timestamp_desc(&self) -> Result<Vec<Order>, StoreError> {
        let mut items = self.orders.read().await.clone();
        items.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(items)
    }

    async fn get(&self, id: &str) -> Result<Option<Order>, StoreError> {
        let orders = self.orders.read().await;
        Ok(orders.iter().find(|o| o.id == id).cloned())
    }

    async fn mark_leg_executed(&self, id: &str, leg: Leg, at: DateTime<Utc>) -> Result<bool, StoreError> {
        let mut orders = self.orders.write().await;
        let Some(order) = orders.iter_mut().find(|o| o.id == id) else {
            return Ok(false);
        };
        if order.status(leg) == LegStatus::Executed {
            return Ok(false);
        }
        order.mark_executed(leg, at);
        Ok(true)
    }

    async fn list_pending(&self) -> Result<Vec<Order>, StoreError> {
        let orders = self.orders.read().await;
        Ok(orders
            .iter()
            .filter(|o| !o.pending_legs().is_empty())
            .cloned()
            .collect())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
