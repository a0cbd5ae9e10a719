//! WebSocket adapters for the real-time dispatch hub.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                 ws_handler  (GET /  ·  GET /ws)                       │
//! │   - Reads role / id / orderId from the query                         │
//! │   - Reader task: frames → RouteMessageHandler                        │
//! │   - Writer task: OutboundQueue → socket                              │
//! └─────────────────────────────────────────────────────────────────────┘
//!                                     │
//!                                     │ register / unregister / lookups
//!                                     ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                   InMemoryConnectionRegistry                         │
//! │   drivers:   d-1 → conn       orders:  42 → {conn, conn}             │
//! │   customers: c-7 → conn                7  → {conn}                   │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`handler`] - Axum WebSocket upgrade handler
//! - [`registry`] - In-memory connection registry

pub mod handler;
pub mod registry;

pub use handler::{
    websocket_router, ws_handler, ConnectQuery, WebSocketState, DEFAULT_EVICTION_GRACE,
    DEFAULT_OUTBOUND_CAPACITY,
};
pub use registry::InMemoryConnectionRegistry;
