//! Adapters - implementations of ports and the hub's outer surfaces.

pub mod client;
pub mod http;
pub mod websocket;
