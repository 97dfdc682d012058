use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::{Leg, Order};

#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("store error: {0}")]
    Backend(String),
    #[error("store operation timed out")]
    Timeout,
    #[error("invalid order id: {0}")]
    InvalidId(String),
}

impl From<mongodb::error::Error> for StoreError {
    fn from(e: mongodb::error::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}

/// Persistence for orders. Handlers and the scheduler only ever see this trait.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Inserts the order and returns it with its assigned id.
    async fn create(&self, order: Order) -> Result<Order, StoreError>;

    /// All orders, newest `timestamp` first.
    async fn list_by_timestamp_desc(&self) -> Result<Vec<Order>, StoreError>;

    async fn get(&self, id: &str) -> Result<Option<Order>, StoreError>;

    /// Moves `leg` from pending to executed. Returns `false` when the leg was
    /// already executed (or the order is gone), so a repeat call changes nothing.
    async fn mark_leg_executed(&self, id: &str, leg: Leg, at: DateTime<Utc>) -> Result<bool, StoreError>;

    /// Orders with at least one leg still pending.
    async fn list_pending(&self) -> Result<Vec<Order>, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}
