//! Library entrypoint for listing-bot.
//!
//! Integration tests under `tests/` import the app state, routers,
//! controllers and services from here.

use std::sync::Arc;

pub mod config;
pub mod models;
pub mod services;
pub mod controllers;
pub mod routes;

use services::{leg_action::LegAction, order_store::OrderStore, scheduler::Scheduler};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn OrderStore>,
    pub scheduler: Scheduler,
    pub settings: config::Settings,
    pub events_tx: tokio::sync::broadcast::Sender<models::OrderEvent>,
}

impl AppState {
    pub fn new(
        settings: config::Settings,
        store: Arc<dyn OrderStore>,
        action: Arc<dyn LegAction>,
    ) -> Self {
        let (events_tx, _events_rx) = tokio::sync::broadcast::channel::<models::OrderEvent>(64);
        let scheduler = Scheduler::new(store.clone(), action, events_tx.clone());

        AppState {
            store,
            scheduler,
            settings,
            events_tx,
        }
    }
}
