//! Client adapters for the dispatch hub.
//!
//! - [`DriverClient`] - receives `new_order`, sends `driver_location`
//! - [`CustomerClient`] - tracks one order
//! - [`notify_new_order`] - one-shot `order_created` announcement
//! - [`AdminClient`] - HTTP trigger used by the order store

mod admin;
mod customer;
mod driver;
mod error;
mod hub_client;

pub use admin::AdminClient;
pub use customer::{notify_new_order, order_created_frame, CustomerClient, GUEST_IDENTITY};
pub use driver::DriverClient;
pub use error::ClientError;
pub use hub_client::{ClientHandshake, HubClient};
