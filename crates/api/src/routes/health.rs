//! Health check endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use message_bus::{RouterState, Streamer};
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Lifecycle state of the message bus router.
    pub bus: &'static str,
}

/// GET /health: reports liveness and whether the bus is dispatching.
pub async fn check(State(streamer): State<Arc<Streamer>>) -> Json<HealthResponse> {
    let bus = match streamer.state() {
        RouterState::Stopped => "stopped",
        RouterState::Running => "running",
        RouterState::Draining => "draining",
    };
    Json(HealthResponse { status: "ok", bus })
}
