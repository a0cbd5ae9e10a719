//! Driver side of the hub: receives new orders, reports position.

use serde_json::{json, Value};

use crate::domain::dispatch::TYPE_FIELD;

use super::error::ClientError;
use super::hub_client::{ClientHandshake, HubClient};

/// A driver's connection, registered under `role=driver&id=<driver_id>`.
pub struct DriverClient {
    hub: HubClient,
}

impl DriverClient {
    /// Connects a driver to the hub at `base_url`.
    pub async fn connect(
        base_url: impl Into<String>,
        driver_id: impl Into<String>,
    ) -> Result<Self, ClientError> {
        let mut hub = HubClient::new(base_url, ClientHandshake::driver(driver_id));
        hub.connect().await?;
        Ok(Self { hub })
    }

    /// Wraps an already configured client.
    pub fn from_hub(hub: HubClient) -> Self {
        Self { hub }
    }

    /// Relays the driver's position to everyone tracking `order_id`.
    pub async fn send_location(&self, order_id: &str, lat: f64, lng: f64) -> Result<(), ClientError> {
        self.hub
            .send(&json!({
                "type": "driver_location",
                "orderId": order_id,
                "lat": lat,
                "lng": lng,
            }))
            .await
    }

    /// Waits for the next `new_order`, skipping other frames.
    pub async fn next_new_order(&mut self) -> Option<Value> {
        loop {
            let frame = self.hub.recv().await?;
            if frame.get(TYPE_FIELD).and_then(Value::as_str) == Some("new_order") {
                return Some(frame);
            }
            tracing::trace!("Driver skipped non-order frame");
        }
    }

    /// Reconnects after the hub dropped the socket.
    pub async fn reconnect(&mut self) -> Result<(), ClientError> {
        self.hub.connect().await
    }

    pub fn hub(&self) -> &HubClient {
        &self.hub
    }

    pub fn hub_mut(&mut self) -> &mut HubClient {
        &mut self.hub
    }

    pub async fn close(mut self) {
        self.hub.close().await;
    }
}
