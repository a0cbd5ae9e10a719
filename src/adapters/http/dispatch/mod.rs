//! Dispatch HTTP adapter - administrative entry points into the hub.
//!
//! Provides endpoints for:
//! - Announcing a newly stored order to every connected driver
//! - Reporting registry counts for health checks

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::*;

pub use handlers::DispatchAppState;
pub use routes::dispatch_router;
