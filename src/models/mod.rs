pub mod event;
pub mod order;
pub mod response;

pub use event::OrderEvent;
pub use order::{Leg, LegStatus, Order, OrderCreateRequest};
pub use response::ApiResponse;
