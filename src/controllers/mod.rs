pub mod home_controller;
pub mod order_controller;
pub mod events_controller;
