//! Generic hub connection with client-side heartbeat.
//!
//! A [`HubClient`] owns one socket at a time. While connected it runs three
//! tasks: a writer draining the outgoing queue, a reader forwarding every
//! non-`pong` frame to [`HubClient::recv`], and a heartbeat sending `ping`
//! on a fixed interval. Calling [`HubClient::connect`] again after a drop
//! reconnects with the same handshake.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use reqwest::Url;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tokio_tungstenite::{connect_async, tungstenite::Message};

use crate::domain::dispatch::{Role, DEFAULT_HEARTBEAT_INTERVAL, TYPE_FIELD};

use super::error::ClientError;

const QUEUE_DEPTH: usize = 64;

/// Query parameters sent when connecting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientHandshake {
    pub role: Option<Role>,
    pub id: Option<String>,
    pub order_id: Option<String>,
}

impl ClientHandshake {
    pub fn driver(driver_id: impl Into<String>) -> Self {
        Self {
            role: Some(Role::Driver),
            id: Some(driver_id.into()),
            order_id: None,
        }
    }

    pub fn customer(customer_id: impl Into<String>, order_id: Option<String>) -> Self {
        Self {
            role: Some(Role::Customer),
            id: Some(customer_id.into()),
            order_id,
        }
    }

    /// Appends the handshake to `base` as a percent-encoded query string.
    pub fn to_url(&self, base: &str) -> Result<Url, ClientError> {
        let mut url = Url::parse(base).map_err(|e| ClientError::invalid_url(base, e))?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(role) = self.role {
                query.append_pair("role", role.as_str());
            }
            if let Some(id) = &self.id {
                query.append_pair("id", id);
            }
            if let Some(order_id) = &self.order_id {
                query.append_pair("orderId", order_id);
            }
        }
        Ok(url)
    }
}

struct Session {
    outgoing: mpsc::Sender<Message>,
    incoming: mpsc::Receiver<Value>,
    writer: JoinHandle<()>,
    reader: JoinHandle<()>,
    heartbeat: JoinHandle<()>,
}

impl Drop for Session {
    fn drop(&mut self) {
        self.writer.abort();
        self.reader.abort();
        self.heartbeat.abort();
    }
}

/// Reconnectable connection to the dispatch hub.
pub struct HubClient {
    base_url: String,
    handshake: ClientHandshake,
    heartbeat: Duration,
    session: Option<Session>,
}

impl HubClient {
    pub fn new(base_url: impl Into<String>, handshake: ClientHandshake) -> Self {
        Self {
            base_url: base_url.into(),
            handshake,
            heartbeat: DEFAULT_HEARTBEAT_INTERVAL,
            session: None,
        }
    }

    pub fn with_heartbeat(mut self, heartbeat: Duration) -> Self {
        self.heartbeat = heartbeat;
        self
    }

    pub fn handshake(&self) -> &ClientHandshake {
        &self.handshake
    }

    /// Opens the socket, replacing any previous session.
    pub async fn connect(&mut self) -> Result<(), ClientError> {
        self.session = None;

        let url = self.handshake.to_url(&self.base_url)?;
        let (socket, _) = connect_async(url.as_str()).await?;
        let (mut sink, mut stream) = socket.split();

        let (outgoing, mut outgoing_rx) = mpsc::channel::<Message>(QUEUE_DEPTH);
        let (incoming_tx, incoming) = mpsc::channel::<Value>(QUEUE_DEPTH);

        let writer = tokio::spawn(async move {
            while let Some(message) = outgoing_rx.recv().await {
                let closing = matches!(message, Message::Close(_));
                if let Err(e) = sink.send(message).await {
                    tracing::debug!("Hub send failed: {}", e);
                    break;
                }
                if closing {
                    break;
                }
            }
        });

        let reader = tokio::spawn(async move {
            while let Some(result) = stream.next().await {
                match result {
                    Ok(Message::Text(text)) => {
                        let Ok(value) = serde_json::from_str::<Value>(&text) else {
                            tracing::debug!("Ignoring non-JSON frame from hub");
                            continue;
                        };
                        if value.get(TYPE_FIELD).and_then(Value::as_str) == Some("pong") {
                            continue;
                        }
                        if incoming_tx.send(value).await.is_err() {
                            break;
                        }
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        tracing::debug!("Hub receive failed: {}", e);
                        break;
                    }
                }
            }
        });

        let heartbeat = {
            let outgoing = outgoing.clone();
            let period = self.heartbeat;
            tokio::spawn(async move {
                let mut ticker = interval_at(Instant::now() + period, period);
                loop {
                    ticker.tick().await;
                    let ping = Message::Text(json!({ "type": "ping" }).to_string());
                    if outgoing.send(ping).await.is_err() {
                        break;
                    }
                }
            })
        };

        tracing::debug!(url = %url, "Connected to hub");
        self.session = Some(Session {
            outgoing,
            incoming,
            writer,
            reader,
            heartbeat,
        });
        Ok(())
    }

    /// True while the hub side of the socket is still open.
    pub fn is_connected(&self) -> bool {
        self.session
            .as_ref()
            .map(|session| !session.reader.is_finished() && !session.writer.is_finished())
            .unwrap_or(false)
    }

    /// Sends one JSON frame.
    pub async fn send(&self, frame: &Value) -> Result<(), ClientError> {
        let session = self.session.as_ref().ok_or(ClientError::NotConnected)?;
        session
            .outgoing
            .send(Message::Text(frame.to_string()))
            .await
            .map_err(|_| ClientError::NotConnected)
    }

    /// Next inbound frame other than `pong`.
    ///
    /// Returns `None` once the hub closes the connection or when not
    /// connected.
    pub async fn recv(&mut self) -> Option<Value> {
        self.session.as_mut()?.incoming.recv().await
    }

    /// Inbound frames as a channel receiver.
    pub fn incoming(&mut self) -> Option<&mut mpsc::Receiver<Value>> {
        self.session.as_mut().map(|session| &mut session.incoming)
    }

    /// Sends a close frame and stops the heartbeat.
    pub async fn close(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };
        session.heartbeat.abort();
        if session.outgoing.send(Message::Close(None)).await.is_ok() {
            let _ = (&mut session.writer).await;
        }
    }
}
