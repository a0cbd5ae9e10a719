//! Customer side of the hub: order tracking and order announcement.

use serde_json::{Map, Value};

use crate::domain::dispatch::{Payload, TYPE_FIELD};

use super::error::ClientError;
use super::hub_client::{ClientHandshake, HubClient};

/// Identity used by [`notify_new_order`] when the order carries no phone.
pub const GUEST_IDENTITY: &str = "guest";

/// A customer tracking one order.
///
/// Receives `driver_location` pushes and anything else addressed to the
/// order.
pub struct CustomerClient {
    hub: HubClient,
}

impl CustomerClient {
    pub async fn connect(
        base_url: impl Into<String>,
        customer_id: impl Into<String>,
        order_id: impl Into<String>,
    ) -> Result<Self, ClientError> {
        let handshake = ClientHandshake::customer(customer_id, Some(order_id.into()));
        let mut hub = HubClient::new(base_url, handshake);
        hub.connect().await?;
        Ok(Self { hub })
    }

    /// Next frame addressed to this customer (never a `pong`).
    pub async fn next_update(&mut self) -> Option<Value> {
        self.hub.recv().await
    }

    pub async fn reconnect(&mut self) -> Result<(), ClientError> {
        self.hub.connect().await
    }

    pub fn hub(&self) -> &HubClient {
        &self.hub
    }

    pub async fn close(mut self) {
        self.hub.close().await;
    }
}

/// Builds the `order_created` frame for `order`.
///
/// The order id is written under both `orderId` and `order_id`; all other
/// fields are copied unchanged.
pub fn order_created_frame(order: &Payload) -> Value {
    let order_id = order
        .get("orderId")
        .or_else(|| order.get("order_id"))
        .cloned()
        .unwrap_or(Value::Null);

    let mut frame = Map::new();
    frame.insert(TYPE_FIELD.to_string(), Value::from("order_created"));
    frame.insert("orderId".to_string(), order_id.clone());
    frame.insert("order_id".to_string(), order_id);
    for (key, value) in order {
        if key != TYPE_FIELD {
            frame.insert(key.clone(), value.clone());
        }
    }
    Value::Object(frame)
}

/// Announces a freshly stored order over a one-shot customer connection.
///
/// Connects as `role=customer&id=<phone|guest>`, sends `order_created`,
/// then closes.
pub async fn notify_new_order(base_url: &str, order: &Payload) -> Result<(), ClientError> {
    let identity = order
        .get("phone")
        .and_then(Value::as_str)
        .filter(|phone| !phone.is_empty())
        .unwrap_or(GUEST_IDENTITY);

    let mut hub = HubClient::new(base_url, ClientHandshake::customer(identity, None));
    hub.connect().await?;
    let sent = hub.send(&order_created_frame(order)).await;
    hub.close().await;
    sent
}
