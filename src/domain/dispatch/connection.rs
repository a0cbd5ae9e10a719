//! Connection lifecycle.
//!
//! Transport events are folded into three states:
//!
//! ```text
//! Connecting ──open()──▶ Open ──close(reason)──▶ Closed
//!      └─────────────close(reason)──────────────────┘
//! ```
//!
//! Registry registration happens on entry to `Open`; cleanup happens on
//! entry to `Closed`, whatever caused it.

use std::fmt;

use crate::domain::foundation::{
    ConnectionId, OrderId, ParticipantId, StateMachine, Timestamp, ValidationError,
};

use super::liveness::Liveness;
use super::role::Role;

/// Addressing information supplied when the connection is established.
///
/// Every field is optional. A handshake with nothing usable is still
/// accepted; such a connection simply never receives broadcasts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Handshake {
    pub role: Option<Role>,
    pub identity: Option<ParticipantId>,
    pub order_id: Option<OrderId>,
}

impl Handshake {
    /// Builds a handshake from raw query values.
    ///
    /// Empty strings count as absent and unrecognized roles are ignored.
    pub fn from_raw(role: Option<&str>, identity: Option<&str>, order_id: Option<&str>) -> Self {
        Self {
            role: role.and_then(|r| r.parse().ok()),
            identity: identity.and_then(|id| ParticipantId::new(id).ok()),
            order_id: order_id.and_then(|id| OrderId::new(id).ok()),
        }
    }

    /// The RoleChannel slot this connection claims: both role and identity
    /// must be present.
    pub fn role_slot(&self) -> Option<(Role, &ParticipantId)> {
        match (self.role, self.identity.as_ref()) {
            (Some(role), Some(identity)) => Some((role, identity)),
            _ => None,
        }
    }

    /// True if the connection will be reachable through the registry.
    pub fn is_addressable(&self) -> bool {
        self.role_slot().is_some() || self.order_id.is_some()
    }
}

/// Lifecycle state of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    #[default]
    Connecting,
    Open,
    Closed,
}

impl StateMachine for ConnectionState {
    fn valid_transitions(&self) -> Vec<Self> {
        use ConnectionState::*;
        match self {
            Connecting => vec![Open, Closed],
            Open => vec![Closed],
            Closed => vec![],
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// Why a connection entered `Closed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Peer sent a close frame or the stream ended.
    ClientClosed,
    /// Reading from the transport failed.
    TransportError,
    /// A newer connection took over the same (role, identity) slot.
    Evicted,
    /// Writing to the transport failed.
    WriterFailed,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CloseReason::ClientClosed => "client closed",
            CloseReason::TransportError => "transport error",
            CloseReason::Evicted => "evicted by newer connection",
            CloseReason::WriterFailed => "writer failed",
        };
        f.write_str(s)
    }
}

/// Server-side view of one persistent connection.
#[derive(Debug, Clone)]
pub struct Connection {
    id: ConnectionId,
    handshake: Handshake,
    state: ConnectionState,
    opened_at: Timestamp,
    liveness: Liveness,
    close_reason: Option<CloseReason>,
}

impl Connection {
    /// Creates a connection in `Connecting`.
    pub fn new(handshake: Handshake) -> Self {
        let now = Timestamp::now();
        Self {
            id: ConnectionId::new(),
            handshake,
            state: ConnectionState::Connecting,
            opened_at: now,
            liveness: Liveness::new(now),
            close_reason: None,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn handshake(&self) -> &Handshake {
        &self.handshake
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn opened_at(&self) -> Timestamp {
        self.opened_at
    }

    pub fn liveness(&self) -> &Liveness {
        &self.liveness
    }

    pub fn liveness_mut(&mut self) -> &mut Liveness {
        &mut self.liveness
    }

    pub fn close_reason(&self) -> Option<CloseReason> {
        self.close_reason
    }

    /// Enters `Open`.
    ///
    /// # Errors
    ///
    /// Fails if the connection is not `Connecting`.
    pub fn open(&mut self) -> Result<(), ValidationError> {
        self.state = self.state.transition_to(ConnectionState::Open)?;
        self.opened_at = Timestamp::now();
        Ok(())
    }

    /// Enters `Closed`.
    ///
    /// Returns `true` only for the call that performed the transition, so
    /// callers can run cleanup exactly once however many close paths fire.
    pub fn close(&mut self, reason: CloseReason) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        self.state = ConnectionState::Closed;
        self.close_reason = Some(reason);
        true
    }

    pub fn is_open(&self) -> bool {
        self.state == ConnectionState::Open
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn driver_handshake() -> Handshake {
        Handshake::from_raw(Some("driver"), Some("d-1"), None)
    }

    #[test]
    fn handshake_parses_all_fields() {
        let handshake = Handshake::from_raw(Some("customer"), Some("c-1"), Some("42"));
        assert_eq!(handshake.role, Some(Role::Customer));
        assert_eq!(handshake.identity, Some(ParticipantId::new("c-1").unwrap()));
        assert_eq!(handshake.order_id, Some(OrderId::new("42").unwrap()));
    }

    #[test]
    fn handshake_treats_empty_values_as_absent() {
        let handshake = Handshake::from_raw(Some(""), Some(""), Some(""));
        assert_eq!(handshake, Handshake::default());
        assert!(!handshake.is_addressable());
    }

    #[test]
    fn handshake_ignores_unknown_role() {
        let handshake = Handshake::from_raw(Some("admin"), Some("a-1"), None);
        assert!(handshake.role.is_none());
        assert!(handshake.role_slot().is_none());
        assert!(!handshake.is_addressable());
    }

    #[test]
    fn role_without_identity_claims_no_slot() {
        let handshake = Handshake::from_raw(Some("driver"), None, None);
        assert!(handshake.role_slot().is_none());
    }

    #[test]
    fn order_only_handshake_is_addressable() {
        let handshake = Handshake::from_raw(None, None, Some("7"));
        assert!(handshake.role_slot().is_none());
        assert!(handshake.is_addressable());
    }

    #[test]
    fn connecting_can_open_or_close() {
        assert!(ConnectionState::Connecting.can_transition_to(&ConnectionState::Open));
        assert!(ConnectionState::Connecting.can_transition_to(&ConnectionState::Closed));
        assert!(!ConnectionState::Open.can_transition_to(&ConnectionState::Connecting));
        assert!(ConnectionState::Closed.is_terminal());
    }

    #[test]
    fn open_moves_connecting_to_open() {
        let mut conn = Connection::new(driver_handshake());
        assert_eq!(conn.state(), ConnectionState::Connecting);

        conn.open().unwrap();
        assert!(conn.is_open());
    }

    #[test]
    fn open_twice_fails() {
        let mut conn = Connection::new(driver_handshake());
        conn.open().unwrap();
        assert!(conn.open().is_err());
    }

    #[test]
    fn close_reports_only_the_first_transition() {
        let mut conn = Connection::new(driver_handshake());
        conn.open().unwrap();

        assert!(conn.close(CloseReason::ClientClosed));
        assert!(!conn.close(CloseReason::WriterFailed));
        assert_eq!(conn.state(), ConnectionState::Closed);
        assert_eq!(conn.close_reason(), Some(CloseReason::ClientClosed));
    }

    #[test]
    fn closed_connection_cannot_reopen() {
        let mut conn = Connection::new(driver_handshake());
        conn.close(CloseReason::TransportError);
        assert!(conn.open().is_err());
    }

    #[test]
    fn connections_get_distinct_ids() {
        let a = Connection::new(driver_handshake());
        let b = Connection::new(driver_handshake());
        assert_ne!(a.id(), b.id());
    }
}
