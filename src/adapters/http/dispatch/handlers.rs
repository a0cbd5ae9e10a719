//! HTTP handlers for dispatch endpoints.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::application::{BroadcastNewOrderCommand, BroadcastNewOrderHandler};
use crate::ports::ConnectionRegistry;

use super::dto::{ErrorResponse, HealthResponse, OkResponse};

/// Application state for dispatch endpoints.
#[derive(Clone)]
pub struct DispatchAppState {
    pub registry: Arc<dyn ConnectionRegistry>,
    pub broadcast_handler: Arc<BroadcastNewOrderHandler>,
}

impl DispatchAppState {
    pub fn new(registry: Arc<dyn ConnectionRegistry>) -> Self {
        let broadcast_handler = Arc::new(BroadcastNewOrderHandler::new(registry.clone()));
        Self {
            registry,
            broadcast_handler,
        }
    }
}

/// Announce an order to every connected driver.
///
/// POST /broadcast-new-order
///
/// The body is read raw so that malformed JSON, a non-object body and a
/// missing order id all produce the same `{"error": ...}` shape.
pub async fn broadcast_new_order(
    State(state): State<DispatchAppState>,
    body: Bytes,
) -> Response {
    let cmd = match BroadcastNewOrderCommand::from_body(&body) {
        Ok(cmd) => cmd,
        Err(e) => {
            tracing::debug!(error = %e, "Rejected broadcast request");
            return (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(e.to_string())))
                .into_response();
        }
    };

    state.broadcast_handler.handle(cmd).await;
    (StatusCode::OK, Json(OkResponse::default())).into_response()
}

/// Registry counts.
///
/// GET /health
pub async fn health(State(state): State<DispatchAppState>) -> Json<HealthResponse> {
    Json(HealthResponse::from(state.registry.stats().await))
}

/// Fallback for unknown paths.
pub async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(ErrorResponse::not_found())).into_response()
}
