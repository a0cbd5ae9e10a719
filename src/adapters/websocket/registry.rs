//! In-process connection registry.
//!
//! ```text
//! drivers:   d-1 → conn-a      customers: c-9 → conn-c
//!            d-2 → conn-b
//! orders:    order-7 → {conn-c, conn-e}
//!            order-8 → {conn-f}
//! ```
//!
//! A reverse index from connection to memberships makes `unregister` touch
//! only the entries that connection owns.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::dispatch::Role;
use crate::domain::foundation::{ConnectionId, OrderId, ParticipantId};
use crate::ports::{ConnectionHandle, ConnectionRegistry, Displaced, RegistryStats};

/// Everything one connection is registered under.
#[derive(Debug, Default)]
struct Membership {
    role_slot: Option<(Role, ParticipantId)>,
    orders: HashSet<OrderId>,
}

impl Membership {
    fn is_empty(&self) -> bool {
        self.role_slot.is_none() && self.orders.is_empty()
    }
}

#[derive(Debug, Default)]
struct RegistryState {
    drivers: HashMap<ParticipantId, ConnectionHandle>,
    customers: HashMap<ParticipantId, ConnectionHandle>,
    orders: HashMap<OrderId, HashMap<ConnectionId, ConnectionHandle>>,
    memberships: HashMap<ConnectionId, Membership>,
}

impl RegistryState {
    fn channel(&self, role: Role) -> &HashMap<ParticipantId, ConnectionHandle> {
        match role {
            Role::Driver => &self.drivers,
            Role::Customer => &self.customers,
        }
    }

    fn channel_mut(&mut self, role: Role) -> &mut HashMap<ParticipantId, ConnectionHandle> {
        match role {
            Role::Driver => &mut self.drivers,
            Role::Customer => &mut self.customers,
        }
    }

    fn set_role(
        &mut self,
        role: Role,
        identity: ParticipantId,
        conn: ConnectionHandle,
    ) -> Option<Displaced> {
        let conn_id = conn.id();

        // A connection holds at most one slot; release the old one first.
        let previous_slot = self
            .memberships
            .get_mut(&conn_id)
            .and_then(|m| m.role_slot.take());
        if let Some((old_role, old_identity)) = previous_slot {
            self.release_slot(old_role, &old_identity, conn_id);
        }

        let displaced = self
            .channel_mut(role)
            .insert(identity.clone(), conn)
            .filter(|prev| prev.id() != conn_id);

        let displaced = displaced.map(|handle| Displaced {
            still_subscribed: self.forget_slot_of(handle.id()),
            handle,
        });

        self.memberships.entry(conn_id).or_default().role_slot = Some((role, identity));
        displaced
    }

    fn add_subscription(&mut self, order_id: OrderId, conn: ConnectionHandle) {
        let conn_id = conn.id();
        self.orders
            .entry(order_id.clone())
            .or_default()
            .insert(conn_id, conn);
        self.memberships
            .entry(conn_id)
            .or_default()
            .orders
            .insert(order_id);
    }

    /// Clears the slot only if `conn_id` still owns it.
    fn release_slot(&mut self, role: Role, identity: &ParticipantId, conn_id: ConnectionId) {
        let channel = self.channel_mut(role);
        if channel.get(identity).map(ConnectionHandle::id) == Some(conn_id) {
            channel.remove(identity);
        }
    }

    /// Drops the displaced connection's slot from its membership record.
    ///
    /// Returns `true` if the connection still has order subscriptions.
    fn forget_slot_of(&mut self, conn_id: ConnectionId) -> bool {
        let Some(membership) = self.memberships.get_mut(&conn_id) else {
            return false;
        };
        membership.role_slot = None;
        if membership.is_empty() {
            self.memberships.remove(&conn_id);
            return false;
        }
        true
    }

    fn remove(&mut self, conn_id: &ConnectionId) -> bool {
        let Some(membership) = self.memberships.remove(conn_id) else {
            return false;
        };

        if let Some((role, identity)) = membership.role_slot {
            self.release_slot(role, &identity, *conn_id);
        }

        for order_id in membership.orders {
            if let Some(subscribers) = self.orders.get_mut(&order_id) {
                subscribers.remove(conn_id);
                if subscribers.is_empty() {
                    self.orders.remove(&order_id);
                }
            }
        }

        true
    }

    fn stats(&self) -> RegistryStats {
        RegistryStats {
            drivers: self.drivers.len(),
            customers: self.customers.len(),
            orders: self.orders.len(),
            connections: self.memberships.len(),
        }
    }
}

/// Connection registry guarded by a single coarse lock.
///
/// Connection churn and message rates are modest, so one `Mutex` over all
/// maps is enough. Lookups clone handles out and release the lock before
/// any frame is sent.
#[derive(Debug, Default)]
pub struct InMemoryConnectionRegistry {
    state: Mutex<RegistryState>,
}

impl InMemoryConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConnectionRegistry for InMemoryConnectionRegistry {
    async fn register_role(
        &self,
        role: Role,
        identity: ParticipantId,
        conn: ConnectionHandle,
    ) -> Option<ConnectionHandle> {
        self.state
            .lock()
            .await
            .set_role(role, identity, conn)
            .map(|displaced| displaced.handle)
    }

    async fn register_order_subscription(&self, order_id: OrderId, conn: ConnectionHandle) {
        self.state.lock().await.add_subscription(order_id, conn);
    }

    async fn register(&self, conn: ConnectionHandle) -> Option<Displaced> {
        let handshake = conn.handshake().clone();
        let mut state = self.state.lock().await;

        let displaced = handshake
            .role_slot()
            .and_then(|(role, identity)| state.set_role(role, identity.clone(), conn.clone()));

        if let Some(order_id) = handshake.order_id {
            state.add_subscription(order_id, conn);
        }

        displaced
    }

    async fn unregister(&self, id: &ConnectionId) -> bool {
        self.state.lock().await.remove(id)
    }

    async fn lookup_role(&self, role: Role, identity: &ParticipantId) -> Option<ConnectionHandle> {
        self.state.lock().await.channel(role).get(identity).cloned()
    }

    async fn all_of(&self, role: Role) -> Vec<ConnectionHandle> {
        self.state
            .lock()
            .await
            .channel(role)
            .values()
            .cloned()
            .collect()
    }

    async fn subscribers_of(&self, order_id: &OrderId) -> Vec<ConnectionHandle> {
        self.state
            .lock()
            .await
            .orders
            .get(order_id)
            .map(|subscribers| subscribers.values().cloned().collect())
            .unwrap_or_default()
    }

    async fn stats(&self) -> RegistryStats {
        self.state.lock().await.stats()
    }
}
