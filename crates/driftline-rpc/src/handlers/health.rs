// crates/driftline-rpc/src/handlers/health.rs
//
// GET /health: engine readiness for load balancers and operators.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use driftline_inference::EngineStatus;

use crate::server::AppState;

/// Health response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// "ready" or "uninitialized", mirroring the engine state.
    pub status: String,
    /// Software version.
    pub version: String,
    pub engine: EngineStatus,
}

/// 200 when the engine is ready, 503 while it is uninitialized.
pub async fn handle_health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let engine = state.engine.status();
    let code = if state.engine.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        code,
        Json(HealthResponse {
            status: engine.state.clone(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            engine,
        }),
    )
}
