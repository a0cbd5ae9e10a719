//! ConnectionRegistry port - Interface for tracking live hub connections.
//!
//! The registry answers two questions for the router:
//! - who currently holds the (role, identity) slot, and
//! - which connections care about a given order.
//!
//! Broadcast lookups return snapshots. Callers send to the snapshot after
//! the registry lock is released, so a slow peer never stalls registration.
//!
//! ## Lifecycle
//!
//! 1. Ingress builds a [`ConnectionHandle`] bound to a live transport
//! 2. `register` records every membership in one step
//! 3. Router snapshots recipients with `all_of` / `subscribers_of`
//! 4. On close, `unregister` removes every membership together

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};

use crate::domain::dispatch::{Handshake, Role};
use crate::domain::foundation::{ConnectionId, OrderId, ParticipantId};

/// Sending half of a live connection, as stored in the registry.
///
/// Cloning is cheap; every clone feeds the same bounded outbound queue.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    handshake: Arc<Handshake>,
    outbound: mpsc::Sender<String>,
    eviction: Arc<Notify>,
}

/// Receiving half of a connection's outbound queue, owned by its writer.
#[derive(Debug)]
pub struct OutboundQueue {
    pub frames: mpsc::Receiver<String>,
    pub eviction: Arc<Notify>,
}

/// Result of a non-blocking enqueue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Queued,
    /// Queue at capacity; the frame was dropped.
    DroppedFull,
    /// Writer has gone away; the frame was dropped.
    DroppedClosed,
}

impl ConnectionHandle {
    /// Creates a handle and the queue its writer drains.
    ///
    /// `capacity` bounds the frames buffered for a slow peer.
    pub fn new(id: ConnectionId, handshake: Handshake, capacity: usize) -> (Self, OutboundQueue) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let eviction = Arc::new(Notify::new());
        let handle = Self {
            id,
            handshake: Arc::new(handshake),
            outbound: tx,
            eviction: eviction.clone(),
        };
        (
            handle,
            OutboundQueue {
                frames: rx,
                eviction,
            },
        )
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn handshake(&self) -> &Handshake {
        &self.handshake
    }

    /// Enqueues a text frame without waiting.
    pub fn try_send(&self, frame: String) -> SendOutcome {
        match self.outbound.try_send(frame) {
            Ok(()) => SendOutcome::Queued,
            Err(mpsc::error::TrySendError::Full(_)) => SendOutcome::DroppedFull,
            Err(mpsc::error::TrySendError::Closed(_)) => SendOutcome::DroppedClosed,
        }
    }

    /// Tells the connection's tasks to shut down.
    ///
    /// The permit is stored, so the signal is not lost if the writer is
    /// not currently waiting on it.
    pub fn evict(&self) {
        self.eviction.notify_one();
    }

    /// True once the writer side has been dropped.
    pub fn is_closed(&self) -> bool {
        self.outbound.is_closed()
    }
}

impl PartialEq for ConnectionHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ConnectionHandle {}

/// A connection pushed out of its role slot by a newer one.
#[derive(Debug, Clone)]
pub struct Displaced {
    pub handle: ConnectionHandle,
    /// The displaced connection still belongs to at least one order.
    pub still_subscribed: bool,
}

impl Displaced {
    /// Only a connection left with no memberships is closed; one that
    /// still tracks an order keeps receiving that order's frames.
    pub fn should_evict(&self) -> bool {
        !self.still_subscribed
    }
}

/// Point-in-time registry counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    pub drivers: usize,
    pub customers: usize,
    pub orders: usize,
    /// Connections holding at least one membership.
    pub connections: usize,
}

/// Port for tracking which connections are reachable and how.
#[async_trait]
pub trait ConnectionRegistry: Send + Sync {
    /// Puts `conn` in the (role, identity) slot.
    ///
    /// Last writer wins. Returns the previously stored connection when a
    /// different one was displaced.
    async fn register_role(
        &self,
        role: Role,
        identity: ParticipantId,
        conn: ConnectionHandle,
    ) -> Option<ConnectionHandle>;

    /// Adds `conn` to the subscribers of `order_id`.
    async fn register_order_subscription(&self, order_id: OrderId, conn: ConnectionHandle);

    /// Records every membership the handshake of `conn` asks for, atomically.
    ///
    /// Returns the connection displaced from the role slot, if any.
    async fn register(&self, conn: ConnectionHandle) -> Option<Displaced>;

    /// Removes `id` from its role slot (if it still holds it) and from every
    /// order it subscribed to. Empty order sets are pruned.
    ///
    /// Idempotent. Returns `true` if anything was removed.
    async fn unregister(&self, id: &ConnectionId) -> bool;

    /// Current holder of the (role, identity) slot.
    async fn lookup_role(&self, role: Role, identity: &ParticipantId) -> Option<ConnectionHandle>;

    /// Snapshot of every connection holding a slot for `role`.
    async fn all_of(&self, role: Role) -> Vec<ConnectionHandle>;

    /// Snapshot of every connection subscribed to `order_id`.
    async fn subscribers_of(&self, order_id: &OrderId) -> Vec<ConnectionHandle>;

    /// Current counts, for health checks and logging.
    async fn stats(&self) -> RegistryStats;
}
