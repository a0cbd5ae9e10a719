//! Application handlers.
//!
//! Command handlers that orchestrate domain operations over ports.

pub mod dispatch;

pub use dispatch::{
    BroadcastError, BroadcastNewOrderCommand, BroadcastNewOrderHandler, DeliveryReport,
    RouteMessageHandler, RouteOutcome,
};
