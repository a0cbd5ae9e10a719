//! WebSocket upgrade handler - the hub's ingress for persistent connections.
//!
//! Manages the connection lifecycle:
//! 1. Read role / identity / order from the query string
//! 2. Upgrade to WebSocket
//! 3. Register every membership in one registry step (`Open`)
//! 4. Route inbound frames and drain the outbound queue until disconnect
//! 5. Unregister exactly once (`Closed`)
//!
//! A connection displaced from its role slot is evicted only when it holds
//! no order subscription. An evicted connection keeps flushing its queue
//! for the grace period, then sends a close frame and routes the inbound
//! frames that were already in flight before it unregisters.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
    routing::get,
    Router,
};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;

use crate::application::{RouteMessageHandler, RouteOutcome};
use crate::domain::dispatch::{CloseReason, Connection, Handshake, DEFAULT_HEARTBEAT_INTERVAL};
use crate::domain::foundation::{ConnectionId, Timestamp};
use crate::ports::{ConnectionHandle, ConnectionRegistry, OutboundQueue};

/// Default number of frames buffered for one slow peer.
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 64;

/// Default time an evicted connection keeps writing before its close frame.
pub const DEFAULT_EVICTION_GRACE: Duration = Duration::from_secs(1);

/// Upper bound on routing an evicted peer's in-flight frames.
const EVICTION_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// State required for WebSocket handling.
#[derive(Clone)]
pub struct WebSocketState {
    pub registry: Arc<dyn ConnectionRegistry>,
    pub router: Arc<RouteMessageHandler>,
    /// Capacity of each connection's outbound queue.
    pub outbound_capacity: usize,
    /// Heartbeat interval clients are expected to keep.
    pub heartbeat: Duration,
    /// Delay between eviction and the close frame.
    pub eviction_grace: Duration,
}

impl WebSocketState {
    /// Creates state with default queue capacity and heartbeat.
    pub fn new(registry: Arc<dyn ConnectionRegistry>) -> Self {
        let router = Arc::new(RouteMessageHandler::new(registry.clone()));
        Self {
            registry,
            router,
            outbound_capacity: DEFAULT_OUTBOUND_CAPACITY,
            heartbeat: DEFAULT_HEARTBEAT_INTERVAL,
            eviction_grace: DEFAULT_EVICTION_GRACE,
        }
    }

    pub fn with_outbound_capacity(mut self, capacity: usize) -> Self {
        self.outbound_capacity = capacity;
        self
    }

    pub fn with_heartbeat(mut self, heartbeat: Duration) -> Self {
        self.heartbeat = heartbeat;
        self
    }

    pub fn with_eviction_grace(mut self, grace: Duration) -> Self {
        self.eviction_grace = grace;
        self
    }
}

/// Handshake query: `?role=driver&id=d-1&orderId=42`.
#[derive(Debug, Default, Deserialize)]
pub struct ConnectQuery {
    pub role: Option<String>,
    #[serde(alias = "identity")]
    pub id: Option<String>,
    #[serde(rename = "orderId", alias = "order_id")]
    pub order_id: Option<String>,
}

impl ConnectQuery {
    pub fn handshake(&self) -> Handshake {
        Handshake::from_raw(
            self.role.as_deref(),
            self.id.as_deref(),
            self.order_id.as_deref(),
        )
    }
}

/// Handle WebSocket upgrade requests.
///
/// Route: `GET /` and `GET /ws`
///
/// Every upgrade is accepted. A handshake without a usable role slot or
/// order is registered nowhere and never receives a frame.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<ConnectQuery>,
    State(state): State<WebSocketState>,
) -> Response {
    let handshake = query.handshake();
    ws.on_upgrade(move |socket| handle_socket(socket, handshake, state))
}

/// Runs one established connection until it closes.
async fn handle_socket(socket: WebSocket, handshake: Handshake, state: WebSocketState) {
    let mut connection = Connection::new(handshake);
    let (handle, queue) = ConnectionHandle::new(
        connection.id(),
        connection.handshake().clone(),
        state.outbound_capacity,
    );

    if let Err(e) = connection.open() {
        tracing::warn!(connection_id = %connection.id(), error = %e, "Could not open connection");
        return;
    }

    if let Some(displaced) = state.registry.register(handle.clone()).await {
        if displaced.should_evict() {
            tracing::info!(
                connection_id = %connection.id(),
                displaced_id = %displaced.handle.id(),
                "Replacing earlier connection with the same identity"
            );
            displaced.handle.evict();
        } else {
            tracing::info!(
                connection_id = %connection.id(),
                displaced_id = %displaced.handle.id(),
                "Took over role slot; earlier connection keeps its order subscriptions"
            );
        }
    }

    let stats = state.registry.stats().await;
    tracing::info!(
        connection_id = %connection.id(),
        role = connection.handshake().role.map(|r| r.as_str()).unwrap_or("<none>"),
        identity = connection.handshake().identity.as_ref().map(|i| i.as_str()).unwrap_or("<none>"),
        order_id = connection.handshake().order_id.as_ref().map(|o| o.as_str()).unwrap_or("<none>"),
        addressable = connection.handshake().is_addressable(),
        drivers = stats.drivers,
        connections = stats.connections,
        "Connection opened"
    );

    let connection_id = connection.id();
    let (sink, mut stream) = socket.split();
    let mut writer = tokio::spawn(write_loop(sink, queue, connection_id, state.eviction_grace));

    let reason = {
        let read = read_loop(&mut stream, &mut connection, &handle, &state.router);
        tokio::pin!(read);

        let reason = tokio::select! {
            reason = &mut read => {
                writer.abort();
                reason
            }
            result = &mut writer => result.unwrap_or(CloseReason::WriterFailed),
        };

        // Frames the evicted peer sent before seeing our close are still routed.
        if reason == CloseReason::Evicted
            && tokio::time::timeout(EVICTION_DRAIN_TIMEOUT, &mut read)
                .await
                .is_err()
        {
            tracing::debug!(connection_id = %connection_id, "Evicted peer never closed");
        }
        reason
    };

    if connection.close(reason) {
        let removed = state.registry.unregister(&connection_id).await;
        let now = Timestamp::now();
        let liveness = connection.liveness();
        tracing::info!(
            connection_id = %connection_id,
            reason = %reason,
            removed,
            connected_ms = now.duration_since(&connection.opened_at()).num_milliseconds(),
            frames = liveness.frames_seen(),
            pings = liveness.pings_seen(),
            idle_ms = liveness.idle_for(now).as_millis() as u64,
            missed_heartbeat = liveness.missed_heartbeat(now, state.heartbeat),
            "Connection closed"
        );
    }
}

/// Routes inbound frames until the peer goes away.
async fn read_loop(
    stream: &mut SplitStream<WebSocket>,
    connection: &mut Connection,
    handle: &ConnectionHandle,
    router: &RouteMessageHandler,
) -> CloseReason {
    while let Some(result) = stream.next().await {
        let now = Timestamp::now();
        match result {
            Ok(Message::Text(text)) => {
                if let RouteOutcome::Pong(_) = router.handle(handle, &text).await {
                    connection.liveness_mut().record_ping(now);
                } else {
                    connection.liveness_mut().record_frame(now);
                }
            }
            Ok(Message::Binary(bytes)) => {
                if let RouteOutcome::Pong(_) = router.handle_bytes(handle, &bytes).await {
                    connection.liveness_mut().record_ping(now);
                } else {
                    connection.liveness_mut().record_frame(now);
                }
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                // Protocol-level control frames; axum answers pings itself.
                connection.liveness_mut().record_frame(now);
            }
            Ok(Message::Close(_)) => {
                tracing::debug!(connection_id = %connection.id(), "Client sent close frame");
                return CloseReason::ClientClosed;
            }
            Err(e) => {
                tracing::debug!(connection_id = %connection.id(), "Receive error: {}", e);
                return CloseReason::TransportError;
            }
        }
    }
    CloseReason::ClientClosed
}

/// Drains the outbound queue into the socket.
///
/// Ends when a write fails or the connection is evicted by a newer one.
/// After eviction the queue keeps draining for `grace` before the close
/// frame goes out.
async fn write_loop(
    mut sink: SplitSink<WebSocket, Message>,
    mut queue: OutboundQueue,
    connection_id: ConnectionId,
    grace: Duration,
) -> CloseReason {
    loop {
        tokio::select! {
            frame = queue.frames.recv() => {
                let Some(frame) = frame else {
                    return CloseReason::ClientClosed;
                };
                if !send_frame(&mut sink, frame, connection_id).await {
                    return CloseReason::WriterFailed;
                }
            }
            _ = queue.eviction.notified() => break,
        }
    }

    tracing::debug!(
        connection_id = %connection_id,
        grace_ms = grace.as_millis() as u64,
        "Evicted, closing after grace period"
    );
    let deadline = tokio::time::sleep(grace);
    tokio::pin!(deadline);
    loop {
        tokio::select! {
            _ = &mut deadline => break,
            frame = queue.frames.recv() => {
                let Some(frame) = frame else { break };
                if !send_frame(&mut sink, frame, connection_id).await {
                    return CloseReason::WriterFailed;
                }
            }
        }
    }
    let _ = sink.send(Message::Close(None)).await;
    CloseReason::Evicted
}

async fn send_frame(
    sink: &mut SplitSink<WebSocket, Message>,
    frame: String,
    connection_id: ConnectionId,
) -> bool {
    match sink.send(Message::Text(frame)).await {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!(
                connection_id = %connection_id,
                "Send error, closing connection: {}",
                e
            );
            false
        }
    }
}

/// Create axum router for the WebSocket endpoint.
///
/// # Example
///
/// ```ignore
/// let app = Router::new()
///     .merge(websocket_router())
///     .with_state(ws_state);
/// ```
pub fn websocket_router() -> Router<WebSocketState> {
    Router::new()
        .route("/", get(ws_handler))
        .route("/ws", get(ws_handler))
}
