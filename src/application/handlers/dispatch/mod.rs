//! Dispatch handlers - message routing and order announcements.

mod broadcast_new_order;
mod fanout;
mod route_message;

pub use broadcast_new_order::{BroadcastError, BroadcastNewOrderCommand, BroadcastNewOrderHandler};
pub use fanout::{deliver, reply, DeliveryReport};
pub use route_message::{RouteMessageHandler, RouteOutcome};
