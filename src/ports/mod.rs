//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the application layer and the outside world. Adapters implement them.
//!
//! - `ConnectionRegistry` - live connection tracking by role and by order

mod connection_registry;

pub use connection_registry::{
    ConnectionHandle, ConnectionRegistry, Displaced, OutboundQueue, RegistryStats, SendOutcome,
};
