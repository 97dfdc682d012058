//! Delayed buy/sell triggers for orders.
//!
//! Every leg gets its own tokio task which sleeps until the leg's trigger
//! time and then fires once. Triggers live in memory only; `rearm_pending`
//! re-creates them from the store after a restart.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::models::{Leg, LegStatus, Order, OrderEvent};

use super::leg_action::LegAction;
use super::order_store::{OrderStore, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireOutcome {
    /// Action ran and the leg was recorded executed.
    Executed,
    /// Another trigger for the same leg is running or already ran in this process.
    AlreadyFired,
    /// The store already shows the leg executed.
    AlreadyExecuted,
    /// The action returned an error; the leg stays pending.
    ActionFailed,
    /// The action ran but the executed status could not be written.
    PersistFailed,
    /// The leg's stored status could not be read; the action was not run.
    StatusUnknown,
}

/// Time left until `trigger`. Past-due triggers get zero so they fire right away.
pub fn fire_delay(trigger: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (trigger - now).to_std().unwrap_or(Duration::ZERO)
}

fn saturating_millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[derive(Clone)]
pub struct Scheduler {
    store: Arc<dyn OrderStore>,
    action: Arc<dyn LegAction>,
    events_tx: broadcast::Sender<OrderEvent>,
    /// Legs currently firing. A leg is released once the store reflects its
    /// outcome. Legs that end in `ActionFailed` or `PersistFailed` stay here
    /// for the life of the process so they never fire twice; the set grows
    /// by one entry per such failure.
    in_flight: Arc<Mutex<HashSet<(String, Leg)>>>,
}

impl Scheduler {
    pub fn new(
        store: Arc<dyn OrderStore>,
        action: Arc<dyn LegAction>,
        events_tx: broadcast::Sender<OrderEvent>,
    ) -> Self {
        Scheduler {
            store,
            action,
            events_tx,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn schedule_buy(&self, order: &Order) -> JoinHandle<FireOutcome> {
        self.schedule(order.clone(), Leg::Buy)
    }

    pub fn schedule_sell(&self, order: &Order) -> JoinHandle<FireOutcome> {
        self.schedule(order.clone(), Leg::Sell)
    }

    /// Spawns the trigger for one leg and returns immediately.
    pub fn schedule(&self, order: Order, leg: Leg) -> JoinHandle<FireOutcome> {
        let delay = fire_delay(order.trigger_time(leg), Utc::now());
        let delay_ms = saturating_millis(delay);
        tracing::debug!(order_id = %order.id, %leg, delay_ms, "leg scheduled");

        let this = self.clone();
        tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            this.fire(&order, leg).await
        })
    }

    /// Schedules every pending leg found in the store. Overdue legs fire at once.
    pub async fn rearm_pending(&self) -> Result<Vec<JoinHandle<FireOutcome>>, StoreError> {
        let orders = self.store.list_pending().await?;

        let mut handles = Vec::new();
        for order in orders {
            for leg in order.pending_legs() {
                handles.push(self.schedule(order.clone(), leg));
            }
        }

        tracing::info!("re-armed {} pending legs", handles.len());
        Ok(handles)
    }

    pub async fn fire(&self, order: &Order, leg: Leg) -> FireOutcome {
        if !self.claim(&order.id, leg) {
            tracing::warn!(order_id = %order.id, %leg, "leg already fired, skipping");
            return FireOutcome::AlreadyFired;
        }

        match self.store.get(&order.id).await {
            Ok(Some(current)) if current.status(leg) == LegStatus::Executed => {
                self.release(&order.id, leg);
                return FireOutcome::AlreadyExecuted;
            }
            Ok(_) => {}
            // without the stored status a released leg could run twice; skip it
            Err(e) => {
                tracing::error!(order_id = %order.id, %leg, "status lookup failed, not firing: {}", e);
                self.release(&order.id, leg);
                return FireOutcome::StatusUnknown;
            }
        }

        if let Err(e) = self.action.execute(order, leg).await {
            tracing::error!(order_id = %order.id, %leg, "leg action failed: {}", e);
            return FireOutcome::ActionFailed;
        }

        match self.store.mark_leg_executed(&order.id, leg, Utc::now()).await {
            Ok(true) => {}
            Ok(false) => tracing::warn!(order_id = %order.id, %leg, "leg was already recorded executed"),
            Err(e) => {
                tracing::error!(order_id = %order.id, %leg, "failed to record executed leg: {}", e);
                return FireOutcome::PersistFailed;
            }
        }

        self.release(&order.id, leg);
        let _ = self.events_tx.send(OrderEvent::leg_executed(&order.id, leg));

        tracing::info!(order_id = %order.id, symbol = %order.symbol, %leg, "leg executed");
        FireOutcome::Executed
    }

    fn claim(&self, id: &str, leg: Leg) -> bool {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        in_flight.insert((id.to_string(), leg))
    }

    // Only called once the store reflects the outcome; later fires then see it there.
    fn release(&self, id: &str, leg: Leg) {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        in_flight.remove(&(id.to_string(), leg));
    }
}
