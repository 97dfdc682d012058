use async_trait::async_trait;

use crate::models::{Leg, Order};

/// The domain action run when a leg's trigger fires.
#[async_trait]
pub trait LegAction: Send + Sync {
    async fn execute(&self, order: &Order, leg: Leg) -> Result<(), String>;
}

/// Records the leg in the log and nothing else. No exchange is wired in.
pub struct LogLegAction;

#[async_trait]
impl LegAction for LogLegAction {
    async fn execute(&self, order: &Order, leg: Leg) -> Result<(), String> {
        tracing::info!(
            order_id = %order.id,
            symbol = %order.symbol,
            price = order.price,
            %leg,
            "executing {} leg",
            leg
        );
        Ok(())
    }
}
