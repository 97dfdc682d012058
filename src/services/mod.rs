pub mod validation;
pub mod order_store;
pub mod memory_store;
pub mod mongo_store;

pub mod leg_action;
pub mod scheduler;
pub mod order_service;
