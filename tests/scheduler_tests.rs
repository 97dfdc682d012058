use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use listingbot::{
    models::{Leg, LegStatus, Order, OrderEvent},
    services::{
        leg_action::LegAction,
        memory_store::MemoryOrderStore,
        order_store::{OrderStore, StoreError},
        scheduler::{FireOutcome, Scheduler},
    },
};
use tokio::sync::broadcast;

#[derive(Default)]
struct CountingAction {
    buys: AtomicUsize,
    sells: AtomicUsize,
    fail: AtomicBool,
}

impl CountingAction {
    fn calls(&self, leg: Leg) -> usize {
        match leg {
            Leg::Buy => self.buys.load(Ordering::SeqCst),
            Leg::Sell => self.sells.load(Ordering::SeqCst),
        }
    }
}

#[async_trait]
impl LegAction for CountingAction {
    async fn execute(&self, _order: &Order, leg: Leg) -> Result<(), String> {
        if self.fail.load(Ordering::SeqCst) {
            return Err("exchange rejected".into());
        }
        match leg {
            Leg::Buy => self.buys.fetch_add(1, Ordering::SeqCst),
            Leg::Sell => self.sells.fetch_add(1, Ordering::SeqCst),
        };
        Ok(())
    }
}

/// Memory store whose status write-back always fails.
struct ReadOnlyStore(MemoryOrderStore);

#[async_trait]
impl OrderStore for ReadOnlyStore {
    async fn create(&self, order: Order) -> Result<Order, StoreError> {
        self.0.create(order).await
    }
    async fn list_by_timestamp_desc(&self) -> Result<Vec<Order>, StoreError> {
        self.0.list_by_timestamp_desc().await
    }
    async fn get(&self, id: &str) -> Result<Option<Order>, StoreError> {
        self.0.get(id).await
    }
    async fn mark_leg_executed(&self, _id: &str, _leg: Leg, _at: DateTime<Utc>) -> Result<bool, StoreError> {
        Err(StoreError::Backend("write rejected".into()))
    }
    async fn list_pending(&self) -> Result<Vec<Order>, StoreError> {
        self.0.list_pending().await
    }
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Memory store whose status lookup works once and then fails.
struct FlakyLookupStore {
    inner: MemoryOrderStore,
    lookups: AtomicUsize,
}

#[async_trait]
impl OrderStore for FlakyLookupStore {
    async fn create(&self, order: Order) -> Result<Order, StoreError> {
        self.inner.create(order).await
    }
    async fn list_by_timestamp_desc(&self) -> Result<Vec<Order>, StoreError> {
        self.inner.list_by_timestamp_desc().await
    }
    async fn get(&self, id: &str) -> Result<Option<Order>, StoreError> {
        if self.lookups.fetch_add(1, Ordering::SeqCst) == 0 {
            self.inner.get(id).await
        } else {
            Err(StoreError::Backend("lookup timed out".into()))
        }
    }
    async fn mark_leg_executed(&self, id: &str, leg: Leg, at: DateTime<Utc>) -> Result<bool, StoreError> {
        self.inner.mark_leg_executed(id, leg, at).await
    }
    async fn list_pending(&self) -> Result<Vec<Order>, StoreError> {
        self.inner.list_pending().await
    }
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

fn scheduler(store: Arc<dyn OrderStore>, action: Arc<CountingAction>) -> (Scheduler, broadcast::Receiver<OrderEvent>) {
    let (tx, rx) = broadcast::channel(16);
    (Scheduler::new(store, action, tx), rx)
}

async fn saved_order(store: &dyn OrderStore, schedule_time: DateTime<Utc>) -> Order {
    store
        .create(Order::new("ABC", schedule_time, 10.0, Utc::now()))
        .await
        .unwrap()
}

#[tokio::test(start_paused = true)]
async fn buy_fires_only_after_its_delay() {
    let store = Arc::new(MemoryOrderStore::new());
    let action = Arc::new(CountingAction::default());
    let (sched, _rx) = scheduler(store.clone(), action.clone());

    // buy leg is due 30s from now
    let order = saved_order(store.as_ref(), Utc::now() + Duration::seconds(60)).await;
    let handle = sched.schedule_buy(&order);

    tokio::time::sleep(StdDuration::from_secs(29)).await;
    assert!(!handle.is_finished());
    assert_eq!(action.calls(Leg::Buy), 0);

    assert_eq!(handle.await.unwrap(), FireOutcome::Executed);
    assert_eq!(action.calls(Leg::Buy), 1);

    let stored = store.get(&order.id).await.unwrap().unwrap();
    assert_eq!(stored.status(Leg::Buy), LegStatus::Executed);
    assert!(stored.buy_executed_at.is_some());
    assert_eq!(stored.status(Leg::Sell), LegStatus::Pending);
}

#[tokio::test(start_paused = true)]
async fn both_legs_fire_and_buy_comes_first() {
    let store = Arc::new(MemoryOrderStore::new());
    let action = Arc::new(CountingAction::default());
    let (sched, _rx) = scheduler(store.clone(), action.clone());

    let order = saved_order(store.as_ref(), Utc::now() + Duration::seconds(45)).await;
    let buy = sched.schedule_buy(&order);
    let sell = sched.schedule_sell(&order);

    assert_eq!(buy.await.unwrap(), FireOutcome::Executed);
    assert_eq!(action.calls(Leg::Sell), 0);

    assert_eq!(sell.await.unwrap(), FireOutcome::Executed);
    assert_eq!(action.calls(Leg::Buy), 1);
    assert_eq!(action.calls(Leg::Sell), 1);

    let stored = store.get(&order.id).await.unwrap().unwrap();
    assert!(stored.pending_legs().is_empty());
}

#[tokio::test]
async fn past_due_trigger_fires_immediately() {
    let store = Arc::new(MemoryOrderStore::new());
    let action = Arc::new(CountingAction::default());
    let (sched, _rx) = scheduler(store.clone(), action.clone());

    let order = saved_order(store.as_ref(), Utc::now() - Duration::minutes(10)).await;
    let outcome = tokio::time::timeout(StdDuration::from_secs(5), sched.schedule_sell(&order))
        .await
        .expect("past-due trigger should not wait")
        .unwrap();

    assert_eq!(outcome, FireOutcome::Executed);
    assert_eq!(action.calls(Leg::Sell), 1);
}

#[tokio::test]
async fn firing_a_leg_twice_runs_the_action_once() {
    let store = Arc::new(MemoryOrderStore::new());
    let action = Arc::new(CountingAction::default());
    let (sched, _rx) = scheduler(store.clone(), action.clone());

    let order = saved_order(store.as_ref(), Utc::now()).await;

    assert_eq!(sched.fire(&order, Leg::Buy).await, FireOutcome::Executed);
    assert_eq!(sched.fire(&order, Leg::Buy).await, FireOutcome::AlreadyExecuted);
    assert_eq!(action.calls(Leg::Buy), 1);
}

#[tokio::test]
async fn concurrent_fires_of_one_leg_run_the_action_once() {
    let store = Arc::new(MemoryOrderStore::new());
    let action = Arc::new(CountingAction::default());
    let (sched, _rx) = scheduler(store.clone(), action.clone());

    let order = saved_order(store.as_ref(), Utc::now()).await;

    let (a, b) = tokio::join!(sched.fire(&order, Leg::Sell), sched.fire(&order, Leg::Sell));
    let outcomes = [a, b];
    assert_eq!(outcomes.iter().filter(|o| **o == FireOutcome::Executed).count(), 1);
    assert!(outcomes
        .iter()
        .any(|o| matches!(o, FireOutcome::AlreadyFired | FireOutcome::AlreadyExecuted)));
    assert_eq!(action.calls(Leg::Sell), 1);
}

#[tokio::test]
async fn action_failure_leaves_leg_pending() {
    let store = Arc::new(MemoryOrderStore::new());
    let action = Arc::new(CountingAction::default());
    action.fail.store(true, Ordering::SeqCst);
    let (sched, _rx) = scheduler(store.clone(), action.clone());

    let order = saved_order(store.as_ref(), Utc::now()).await;
    assert_eq!(sched.fire(&order, Leg::Buy).await, FireOutcome::ActionFailed);

    let stored = store.get(&order.id).await.unwrap().unwrap();
    assert_eq!(stored.status(Leg::Buy), LegStatus::Pending);
}

#[tokio::test]
async fn persist_failure_is_not_retried() {
    let store = Arc::new(ReadOnlyStore(MemoryOrderStore::new()));
    let action = Arc::new(CountingAction::default());
    let (sched, mut rx) = scheduler(store.clone(), action.clone());

    let order = saved_order(store.as_ref(), Utc::now()).await;

    assert_eq!(sched.fire(&order, Leg::Buy).await, FireOutcome::PersistFailed);
    assert_eq!(action.calls(Leg::Buy), 1);

    // the action already happened, so a second trigger must not repeat it
    assert_eq!(sched.fire(&order, Leg::Buy).await, FireOutcome::AlreadyFired);
    assert_eq!(action.calls(Leg::Buy), 1);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn executed_leg_publishes_orders_updated() {
    let store = Arc::new(MemoryOrderStore::new());
    let action = Arc::new(CountingAction::default());
    let (sched, mut rx) = scheduler(store.clone(), action);

    let order = saved_order(store.as_ref(), Utc::now()).await;
    assert_eq!(sched.fire(&order, Leg::Sell).await, FireOutcome::Executed);
    let event = rx.try_recv().unwrap();
    assert_eq!(event.name, OrderEvent::ORDERS_UPDATED);
    assert_eq!(event.order_id, order.id);
    assert_eq!(event.leg, Some(Leg::Sell));
}

#[tokio::test]
async fn triggers_of_different_orders_are_independent() {
    let store = Arc::new(MemoryOrderStore::new());
    let action = Arc::new(CountingAction::default());
    let (sched, _rx) = scheduler(store.clone(), action.clone());

    let first = saved_order(store.as_ref(), Utc::now() - Duration::minutes(5)).await;
    let second = saved_order(store.as_ref(), Utc::now() - Duration::minutes(5)).await;

    let handles = vec![
        sched.schedule_buy(&first),
        sched.schedule_buy(&second),
        sched.schedule_sell(&first),
        sched.schedule_sell(&second),
    ];
    for h in handles {
        assert_eq!(h.await.unwrap(), FireOutcome::Executed);
    }
    assert_eq!(action.calls(Leg::Buy), 2);
    assert_eq!(action.calls(Leg::Sell), 2);
}

#[tokio::test(start_paused = true)]
async fn rearm_schedules_only_pending_legs() {
    let store = Arc::new(MemoryOrderStore::new());
    let action = Arc::new(CountingAction::default());
    let (sched, _rx) = scheduler(store.clone(), action.clone());

    // buy already done before the "restart", sell overdue
    let half_done = saved_order(store.as_ref(), Utc::now() - Duration::minutes(2)).await;
    store.mark_leg_executed(&half_done.id, Leg::Buy, Utc::now()).await.unwrap();

    // both legs still in the future
    let upcoming = saved_order(store.as_ref(), Utc::now() + Duration::minutes(5)).await;

    // fully executed, must be ignored
    let done = saved_order(store.as_ref(), Utc::now() - Duration::minutes(5)).await;
    store.mark_leg_executed(&done.id, Leg::Buy, Utc::now()).await.unwrap();
    store.mark_leg_executed(&done.id, Leg::Sell, Utc::now()).await.unwrap();

    let handles = sched.rearm_pending().await.unwrap();
    assert_eq!(handles.len(), 3);

    for h in handles {
        assert_eq!(h.await.unwrap(), FireOutcome::Executed);
    }
    assert_eq!(action.calls(Leg::Buy), 1);
    assert_eq!(action.calls(Leg::Sell), 2);

    for id in [&half_done.id, &upcoming.id, &done.id] {
        let stored = store.get(id).await.unwrap().unwrap();
        assert!(stored.pending_legs().is_empty());
    }
}

#[tokio::test]
async fn refire_with_failing_status_lookup_does_not_repeat_action() {
    let store = Arc::new(FlakyLookupStore {
        inner: MemoryOrderStore::new(),
        lookups: AtomicUsize::new(0),
    });
    let action = Arc::new(CountingAction::default());
    let (sched, _rx) = scheduler(store.clone(), action.clone());

    let order = saved_order(store.as_ref(), Utc::now()).await;

    assert_eq!(sched.fire(&order, Leg::Buy).await, FireOutcome::Executed);
    assert_eq!(sched.fire(&order, Leg::Buy).await, FireOutcome::StatusUnknown);
    assert_eq!(action.calls(Leg::Buy), 1);
}

#[tokio::test]
async fn failing_status_lookup_skips_a_pending_leg() {
    let store = Arc::new(FlakyLookupStore {
        inner: MemoryOrderStore::new(),
        lookups: AtomicUsize::new(1),
    });
    let action = Arc::new(CountingAction::default());
    let (sched, mut rx) = scheduler(store.clone(), action.clone());

    let order = saved_order(store.as_ref(), Utc::now()).await;

    assert_eq!(sched.fire(&order, Leg::Sell).await, FireOutcome::StatusUnknown);
    assert_eq!(action.calls(Leg::Sell), 0);
    assert!(rx.try_recv().is_err());

    // left pending for the next re-arm
    let pending = store.inner.list_pending().await.unwrap();
    assert_eq!(pending[0].pending_legs(), vec![Leg::Buy, Leg::Sell]);
}
