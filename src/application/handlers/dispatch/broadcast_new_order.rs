//! BroadcastNewOrderHandler - Command handler announcing orders to drivers.
//!
//! Entry point for the order store: when an order record is created it is
//! pushed here and relayed to every connected driver as `new_order`.

use std::sync::Arc;

use thiserror::Error;

use crate::domain::dispatch::{OrderPayload, OrderPayloadError, OutboundMessage, Role};
use crate::ports::ConnectionRegistry;

use super::fanout::{deliver, DeliveryReport};

/// Command to announce an order to all drivers.
#[derive(Debug, Clone)]
pub struct BroadcastNewOrderCommand {
    pub order: OrderPayload,
}

/// Errors turning a request body into a command.
#[derive(Debug, Error)]
pub enum BroadcastError {
    #[error("{0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("{0}")]
    InvalidOrder(#[from] OrderPayloadError),
}

impl BroadcastNewOrderCommand {
    /// Parses a raw JSON body.
    ///
    /// # Errors
    ///
    /// - `InvalidJson` if the body does not parse (including an empty body)
    /// - `InvalidOrder` if it is not an object carrying an order id
    pub fn from_body(body: &[u8]) -> Result<Self, BroadcastError> {
        let value: serde_json::Value = serde_json::from_slice(body)?;
        Ok(Self {
            order: OrderPayload::from_document(value)?,
        })
    }
}

/// Handler relaying new orders to the driver pool.
pub struct BroadcastNewOrderHandler {
    registry: Arc<dyn ConnectionRegistry>,
}

impl BroadcastNewOrderHandler {
    pub fn new(registry: Arc<dyn ConnectionRegistry>) -> Self {
        Self { registry }
    }

    pub async fn handle(&self, cmd: BroadcastNewOrderCommand) -> DeliveryReport {
        let order_id = cmd.order.order_id.clone();
        let drivers = self.registry.all_of(Role::Driver).await;
        let report = deliver(&OutboundMessage::from(cmd.order), &drivers);

        tracing::info!(
            order_id = order_id.as_ref().map(|id| id.as_str()).unwrap_or("<none>"),
            drivers = report.attempted,
            queued = report.queued,
            "Broadcast new order to drivers"
        );

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::websocket::InMemoryConnectionRegistry;
    use crate::domain::dispatch::Handshake;
    use crate::domain::foundation::ConnectionId;
    use crate::ports::{ConnectionHandle, OutboundQueue};
    use serde_json::{json, Value};

    async fn connect(
        registry: &InMemoryConnectionRegistry,
        role: &str,
        id: &str,
    ) -> (ConnectionHandle, OutboundQueue) {
        let (conn, queue) = ConnectionHandle::new(
            ConnectionId::new(),
            Handshake::from_raw(Some(role), Some(id), None),
            8,
        );
        registry.register(conn.clone()).await;
        (conn, queue)
    }

    #[test]
    fn from_body_accepts_order_with_camel_case_id() {
        let cmd = BroadcastNewOrderCommand::from_body(br#"{"orderId":"42","pickupAddress":"A"}"#)
            .unwrap();
        assert_eq!(cmd.order.order_id.unwrap().as_str(), "42");
    }

    #[test]
    fn from_body_accepts_snake_case_id() {
        let cmd = BroadcastNewOrderCommand::from_body(br#"{"order_id":"42"}"#).unwrap();
        assert_eq!(cmd.order.order_id.unwrap().as_str(), "42");
    }

    #[test]
    fn from_body_rejects_malformed_json() {
        let err = BroadcastNewOrderCommand::from_body(b"{oops").unwrap_err();
        assert!(matches!(err, BroadcastError::InvalidJson(_)));
        assert!(!err.to_string().is_empty());
    }

    #[test]
    fn from_body_rejects_empty_body() {
        assert!(matches!(
            BroadcastNewOrderCommand::from_body(b"").unwrap_err(),
            BroadcastError::InvalidJson(_)
        ));
    }

    #[test]
    fn from_body_rejects_order_without_id() {
        let err = BroadcastNewOrderCommand::from_body(br#"{"pickupAddress":"A"}"#).unwrap_err();
        assert!(matches!(
            err,
            BroadcastError::InvalidOrder(OrderPayloadError::MissingOrderId)
        ));
    }

    #[tokio::test]
    async fn delivers_to_drivers_only() {
        let registry = Arc::new(InMemoryConnectionRegistry::new());
        let (_d1, mut q1) = connect(&registry, "driver", "d-1").await;
        let (_d2, mut q2) = connect(&registry, "driver", "d-2").await;
        let (_c1, mut qc) = connect(&registry, "customer", "c-1").await;

        let handler = BroadcastNewOrderHandler::new(registry.clone());
        let cmd = BroadcastNewOrderCommand::from_body(br#"{"orderId":"42","pickupAddress":"A"}"#)
            .unwrap();
        let report = handler.handle(cmd).await;

        assert_eq!(report.queued, 2);
        for queue in [&mut q1, &mut q2] {
            let frame: Value = serde_json::from_str(&queue.frames.recv().await.unwrap()).unwrap();
            assert_eq!(frame, json!({"type":"new_order","orderId":"42","pickupAddress":"A"}));
        }
        assert!(qc.frames.try_recv().is_err());
    }

    #[tokio::test]
    async fn no_drivers_means_nothing_attempted() {
        let registry = Arc::new(InMemoryConnectionRegistry::new());
        let handler = BroadcastNewOrderHandler::new(registry);
        let cmd = BroadcastNewOrderCommand::from_body(br#"{"orderId":"1"}"#).unwrap();

        assert_eq!(handler.handle(cmd).await, DeliveryReport::default());
    }
}
