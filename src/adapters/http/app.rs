//! Assembles the hub's HTTP surface.
//!
//! ```text
//! GET  /, /ws                 → WebSocket ingress      (no timeout)
//! POST /broadcast-new-order   → admin broadcast        (request timeout)
//! GET  /health                → registry counts
//! *                           → 404 {"error":"not found"}
//! ```

use std::sync::Arc;

use axum::Router;
use http::{HeaderValue, Method};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::adapters::websocket::{websocket_router, WebSocketState};
use crate::config::{AppConfig, ServerConfig};
use crate::ports::ConnectionRegistry;

use super::dispatch::handlers::not_found;
use super::dispatch::{dispatch_router, DispatchAppState};

/// Builds the complete router over a shared registry.
pub fn build_router(config: &AppConfig, registry: Arc<dyn ConnectionRegistry>) -> Router {
    let ws_state = WebSocketState::new(registry.clone())
        .with_outbound_capacity(config.hub.outbound_queue_capacity)
        .with_heartbeat(config.hub.heartbeat_interval())
        .with_eviction_grace(config.hub.eviction_grace());

    let admin = dispatch_router()
        .layer(TimeoutLayer::new(config.server.request_timeout()))
        .with_state(DispatchAppState::new(registry));

    websocket_router()
        .with_state(ws_state)
        .merge(admin)
        .fallback(not_found)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&config.server)),
        )
}

/// CORS for the admin endpoints.
///
/// Without configured origins any origin is allowed, matching a
/// development setup where the order store runs on another port.
pub fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins_list()
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    if origins.is_empty() {
        cors.allow_origin(Any)
    } else {
        cors.allow_origin(origins)
    }
}
