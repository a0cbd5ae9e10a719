//! HTTP adapters - REST API implementations.
//!
//! The dispatch module exposes the administrative endpoints; [`app`] merges
//! them with the WebSocket ingress into one router.

pub mod app;
pub mod dispatch;

// Re-export key types for convenience
pub use app::{build_router, cors_layer};
pub use dispatch::{dispatch_router, DispatchAppState};
