use std::future::Future;

use chrono::Utc;

use crate::{
    models::{Order, OrderCreateRequest, OrderEvent},
    AppState,
};

use super::{
    order_store::StoreError,
    validation::{self, FieldErrors},
};

#[derive(Debug, thiserror::Error)]
pub enum CreateOrderError {
    #[error("validation failed")]
    Validation(FieldErrors),
    #[error(transparent)]
    Store(#[from] StoreError),
}

async fn with_timeout<T>(
    state: &AppState,
    fut: impl Future<Output = Result<T, StoreError>>,
) -> Result<T, StoreError> {
    tokio::time::timeout(state.settings.request_timeout, fut)
        .await
        .map_err(|_| StoreError::Timeout)?
}

pub async fn list_orders(state: &AppState) -> Result<Vec<Order>, StoreError> {
    with_timeout(state, state.store.list_by_timestamp_desc()).await
}

/// Validates, persists and schedules both legs. Does not wait for either leg.
pub async fn create_order(state: &AppState, req: &OrderCreateRequest) -> Result<Order, CreateOrderError> {
    let valid = validation::validate_create(req).map_err(CreateOrderError::Validation)?;

    let order = Order::new(&valid.symbol, valid.schedule_time, valid.price, Utc::now());
    let order = with_timeout(state, state.store.create(order)).await?;

    state.scheduler.schedule_buy(&order);
    state.scheduler.schedule_sell(&order);

    let _ = state.events_tx.send(OrderEvent::created(&order.id));

    tracing::info!(
        order_id = %order.id,
        symbol = %order.symbol,
        buy_at = %order.schedule_buy_time,
        sell_at = %order.schedule_sell_time,
        "order created"
    );

    Ok(order)
}
