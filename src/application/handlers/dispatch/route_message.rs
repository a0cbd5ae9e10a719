//! RouteMessageHandler - interprets one inbound frame from one connection.
//!
//! | inbound type      | action                                         |
//! |-------------------|------------------------------------------------|
//! | `ping`            | `pong{at}` to the sender only                  |
//! | `driver_location` | verbatim to subscribers of `orderId`, if any   |
//! | `order_created`   | re-tagged `new_order` to every driver          |
//! | anything else     | `error{message:"unknown type"}` to the sender  |
//! | invalid JSON      | `error{message:<parse error>}` to the sender   |
//!
//! Binary frames carrying UTF-8 JSON are routed the same way as text.

use std::sync::Arc;

use crate::domain::dispatch::{DecodeError, InboundMessage, OutboundMessage, Role, UNKNOWN_TYPE_MESSAGE};
use crate::domain::foundation::Timestamp;
use crate::ports::{ConnectionHandle, ConnectionRegistry, SendOutcome};

use super::fanout::{deliver, reply, DeliveryReport};

/// What the router did with a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Answered the sender with `pong`.
    Pong(SendOutcome),
    /// Answered the sender with `error`.
    Rejected { message: String, outcome: SendOutcome },
    /// Fanned out to a group.
    Broadcast(DeliveryReport),
    /// Valid frame with nothing to do.
    Ignored,
}

/// Handler dispatching inbound frames.
pub struct RouteMessageHandler {
    registry: Arc<dyn ConnectionRegistry>,
}

impl RouteMessageHandler {
    pub fn new(registry: Arc<dyn ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Decodes `text` and performs the resulting sends.
    ///
    /// Never fails: problems with the frame are reported to `sender` as an
    /// `error` frame and the connection stays open.
    pub async fn handle(&self, sender: &ConnectionHandle, text: &str) -> RouteOutcome {
        self.route(sender, InboundMessage::decode(text)).await
    }

    /// Same as [`handle`](Self::handle) for a binary frame.
    pub async fn handle_bytes(&self, sender: &ConnectionHandle, bytes: &[u8]) -> RouteOutcome {
        self.route(sender, InboundMessage::decode_slice(bytes)).await
    }

    async fn route(
        &self,
        sender: &ConnectionHandle,
        decoded: Result<InboundMessage, DecodeError>,
    ) -> RouteOutcome {
        let message = match decoded {
            Ok(message) => message,
            Err(e) => {
                tracing::debug!(connection_id = %sender.id(), error = %e, "Malformed frame");
                return reject(sender, e.to_string());
            }
        };

        tracing::trace!(
            connection_id = %sender.id(),
            frame_type = message.type_tag(),
            "Routing frame"
        );

        match message {
            InboundMessage::Ping => {
                RouteOutcome::Pong(reply(&OutboundMessage::pong(Timestamp::now()), sender))
            }
            InboundMessage::DriverLocation(location) => {
                let Some(order_id) = location.order_id.clone() else {
                    return RouteOutcome::Ignored;
                };
                let subscribers = self.registry.subscribers_of(&order_id).await;
                let report = deliver(&OutboundMessage::from(location), &subscribers);
                tracing::trace!(
                    order_id = %order_id,
                    recipients = report.attempted,
                    "Relayed driver location"
                );
                RouteOutcome::Broadcast(report)
            }
            InboundMessage::OrderCreated(order) => {
                let order_id = order.order_id.clone();
                let drivers = self.registry.all_of(Role::Driver).await;
                let report = deliver(&OutboundMessage::from(order), &drivers);
                tracing::info!(
                    connection_id = %sender.id(),
                    order_id = order_id.as_ref().map(|id| id.as_str()).unwrap_or("<none>"),
                    drivers = report.attempted,
                    "Customer order announced to drivers"
                );
                RouteOutcome::Broadcast(report)
            }
            InboundMessage::Unknown { type_tag } => {
                tracing::debug!(
                    connection_id = %sender.id(),
                    type_tag = type_tag.as_deref().unwrap_or("<none>"),
                    "Unknown message type"
                );
                reject(sender, UNKNOWN_TYPE_MESSAGE.to_string())
            }
        }
    }
}

fn reject(sender: &ConnectionHandle, message: String) -> RouteOutcome {
    let outcome = reply(&OutboundMessage::error(message.clone()), sender);
    RouteOutcome::Rejected { message, outcome }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::websocket::InMemoryConnectionRegistry;
    use crate::domain::dispatch::Handshake;
    use crate::domain::foundation::ConnectionId;
    use crate::ports::OutboundQueue;
    use serde_json::{json, Value};

    struct Peer {
        conn: ConnectionHandle,
        queue: OutboundQueue,
    }

    impl Peer {
        fn next(&mut self) -> Option<Value> {
            self.queue
                .frames
                .try_recv()
                .ok()
                .map(|frame| serde_json::from_str(&frame).unwrap())
        }
    }

    struct Hub {
        registry: Arc<InMemoryConnectionRegistry>,
        router: RouteMessageHandler,
    }

    impl Hub {
        fn new() -> Self {
            let registry = Arc::new(InMemoryConnectionRegistry::new());
            let router = RouteMessageHandler::new(registry.clone());
            Self { registry, router }
        }

        async fn connect(&self, role: Option<&str>, id: Option<&str>, order: Option<&str>) -> Peer {
            let (conn, queue) = ConnectionHandle::new(
                ConnectionId::new(),
                Handshake::from_raw(role, id, order),
                16,
            );
            self.registry.register(conn.clone()).await;
            Peer { conn, queue }
        }

        async fn send(&self, from: &Peer, frame: Value) -> RouteOutcome {
            self.router.handle(&from.conn, &frame.to_string()).await
        }
    }

    #[tokio::test]
    async fn ping_replies_pong_to_sender_only() {
        let hub = Hub::new();
        let mut sender = hub.connect(Some("driver"), Some("d-1"), Some("7")).await;
        let mut other = hub.connect(Some("driver"), Some("d-2"), Some("7")).await;

        let outcome = hub.send(&sender, json!({"type": "ping"})).await;

        assert_eq!(outcome, RouteOutcome::Pong(SendOutcome::Queued));
        let pong = sender.next().expect("pong");
        assert_eq!(pong["type"], "pong");
        assert!(pong["at"].as_i64().unwrap() > 0);
        assert!(sender.next().is_none(), "exactly one pong");
        assert!(other.next().is_none());
    }

    #[tokio::test]
    async fn driver_location_reaches_only_that_orders_subscribers() {
        let hub = Hub::new();
        let driver = hub.connect(Some("driver"), Some("d-1"), None).await;
        let mut watcher_a = hub.connect(Some("customer"), Some("c-1"), Some("7")).await;
        let mut watcher_b = hub.connect(None, None, Some("7")).await;
        let mut other_order = hub.connect(Some("customer"), Some("c-2"), Some("8")).await;

        let frame = json!({"type":"driver_location","orderId":"7","lat":25.0,"lng":121.5});
        let outcome = hub.send(&driver, frame.clone()).await;

        assert!(matches!(outcome, RouteOutcome::Broadcast(r) if r.queued == 2));
        assert_eq!(watcher_a.next(), Some(frame.clone()));
        assert_eq!(watcher_b.next(), Some(frame));
        assert!(other_order.next().is_none());
    }

    #[tokio::test]
    async fn driver_location_without_order_is_ignored() {
        let hub = Hub::new();
        let mut driver = hub.connect(Some("driver"), Some("d-1"), None).await;
        let mut watcher = hub.connect(None, None, Some("7")).await;

        let outcome = hub
            .send(&driver, json!({"type":"driver_location","lat":1,"lng":2}))
            .await;

        assert_eq!(outcome, RouteOutcome::Ignored);
        assert!(driver.next().is_none(), "no error reply");
        assert!(watcher.next().is_none());
    }

    #[tokio::test]
    async fn driver_location_to_order_without_subscribers_delivers_nothing() {
        let hub = Hub::new();
        let driver = hub.connect(Some("driver"), Some("d-1"), None).await;

        let outcome = hub
            .send(&driver, json!({"type":"driver_location","orderId":"nobody"}))
            .await;

        assert_eq!(outcome, RouteOutcome::Broadcast(DeliveryReport::default()));
    }

    #[tokio::test]
    async fn order_created_goes_to_every_driver_as_new_order() {
        let hub = Hub::new();
        let mut customer = hub.connect(Some("customer"), Some("c-1"), None).await;
        let mut d1 = hub.connect(Some("driver"), Some("d-1"), None).await;
        let mut d2 = hub.connect(Some("driver"), Some("d-2"), None).await;
        let mut other_customer = hub.connect(Some("customer"), Some("c-2"), Some("7")).await;

        hub.send(&customer, json!({"type":"order_created","orderId":"7","phone":"0912"}))
            .await;

        let expected = json!({"type":"new_order","orderId":"7","phone":"0912"});
        assert_eq!(d1.next(), Some(expected.clone()));
        assert_eq!(d2.next(), Some(expected));
        assert!(customer.next().is_none(), "no acknowledgement");
        assert!(other_customer.next().is_none());
    }

    #[tokio::test]
    async fn disconnected_driver_misses_later_orders() {
        let hub = Hub::new();
        let customer = hub.connect(Some("customer"), Some("c-1"), None).await;
        let mut d1 = hub.connect(Some("driver"), Some("d-1"), None).await;
        let mut d2 = hub.connect(Some("driver"), Some("d-2"), None).await;

        hub.send(&customer, json!({"type":"order_created","orderId":"7"})).await;
        assert_eq!(d1.next().unwrap()["orderId"], "7");
        assert_eq!(d2.next().unwrap()["orderId"], "7");

        hub.registry.unregister(&d1.conn.id()).await;
        hub.send(&customer, json!({"type":"order_created","orderId":"8"})).await;

        assert!(d1.next().is_none());
        assert_eq!(d2.next().unwrap()["orderId"], "8");
    }

    #[tokio::test]
    async fn unknown_type_yields_one_error_and_no_broadcast() {
        let hub = Hub::new();
        let mut sender = hub.connect(Some("driver"), Some("d-1"), Some("7")).await;
        let mut bystander = hub.connect(Some("driver"), Some("d-2"), Some("7")).await;

        let outcome = hub.send(&sender, json!({"type":"bogus"})).await;

        assert_eq!(
            outcome,
            RouteOutcome::Rejected {
                message: "unknown type".to_string(),
                outcome: SendOutcome::Queued
            }
        );
        assert_eq!(
            sender.next(),
            Some(json!({"type":"error","message":"unknown type"}))
        );
        assert!(sender.next().is_none());
        assert!(bystander.next().is_none());
    }

    #[tokio::test]
    async fn malformed_json_is_reported_to_sender() {
        let hub = Hub::new();
        let mut sender = hub.connect(Some("customer"), Some("c-1"), None).await;

        let outcome = hub.router.handle(&sender.conn, "{not json").await;

        let RouteOutcome::Rejected { message, .. } = outcome else {
            panic!("expected rejection, got {:?}", outcome);
        };
        let reply = sender.next().unwrap();
        assert_eq!(reply["type"], "error");
        assert_eq!(reply["message"], json!(message));
        assert_ne!(message, "unknown type");
    }

    #[tokio::test]
    async fn binary_json_frame_is_routed_like_text() {
        let hub = Hub::new();
        let mut sender = hub.connect(Some("driver"), Some("d-1"), None).await;
        let mut watcher = hub.connect(None, None, Some("7")).await;

        let outcome = hub.router.handle_bytes(&sender.conn, br#"{"type":"ping"}"#).await;
        assert_eq!(outcome, RouteOutcome::Pong(SendOutcome::Queued));
        assert_eq!(sender.next().unwrap()["type"], "pong");

        let frame = json!({"type":"driver_location","orderId":"7","lat":1.5});
        hub.router
            .handle_bytes(&sender.conn, frame.to_string().as_bytes())
            .await;
        assert_eq!(watcher.next(), Some(frame));
    }

    #[tokio::test]
    async fn binary_frame_that_is_not_utf8_json_gets_error_reply() {
        let hub = Hub::new();
        let mut sender = hub.connect(Some("driver"), Some("d-1"), None).await;

        let outcome = hub.router.handle_bytes(&sender.conn, &[0xff, 0xfe, 0x01]).await;

        assert!(matches!(outcome, RouteOutcome::Rejected { .. }));
        let reply = sender.next().unwrap();
        assert_eq!(reply["type"], "error");
        assert_ne!(reply["message"], "unknown type");
        assert!(sender.next().is_none());
    }

    #[tokio::test]
    async fn full_sender_queue_drops_reply_silently() {
        let registry = Arc::new(InMemoryConnectionRegistry::new());
        let router = RouteMessageHandler::new(registry);
        let (conn, _queue) = ConnectionHandle::new(ConnectionId::new(), Handshake::default(), 1);
        conn.try_send("filler".into());

        let outcome = router.handle(&conn, r#"{"type":"ping"}"#).await;

        assert_eq!(outcome, RouteOutcome::Pong(SendOutcome::DroppedFull));
    }
}
