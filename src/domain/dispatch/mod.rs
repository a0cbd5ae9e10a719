//! Dispatch domain - who is connected and what they say to each other.
//!
//! - `role` - driver / customer classification
//! - `connection` - handshake addressing and the connection state machine
//! - `message` - the typed frame protocol
//! - `liveness` - heartbeat bookkeeping

mod connection;
mod liveness;
mod message;
mod role;

pub use connection::{CloseReason, Connection, ConnectionState, Handshake};
pub use liveness::{Liveness, DEFAULT_HEARTBEAT_INTERVAL};
pub use message::{
    DecodeError, DriverLocation, InboundMessage, OrderPayload, OrderPayloadError,
    OutboundMessage, Payload, TYPE_FIELD, UNKNOWN_TYPE_MESSAGE,
};
pub use role::Role;
