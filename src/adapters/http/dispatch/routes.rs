//! Axum router configuration for dispatch endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{broadcast_new_order, health, DispatchAppState};

/// Create the dispatch API router.
///
/// # Routes
///
/// - `POST /broadcast-new-order` - Relay an order to every driver as `new_order`
/// - `GET /health` - Registry counts
pub fn dispatch_router() -> Router<DispatchAppState> {
    Router::new()
        .route("/broadcast-new-order", post(broadcast_new_order))
        .route("/health", get(health))
}
