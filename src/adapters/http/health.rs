//! Health probe endpoints.
//!
//! Liveness answers unconditionally; readiness pings the database under
//! the shorter health-probe timeout. Probe results never influence
//! routing decisions.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use sqlx::PgPool;
use std::time::Duration;
use tokio::time::timeout;
use tracing::warn;

/// Shared state of the health endpoints.
#[derive(Clone)]
pub struct HealthState {
    pool: PgPool,
    probe_timeout: Duration,
}

impl HealthState {
    /// Creates health state with the probe timeout from configuration.
    pub fn new(pool: PgPool, probe_timeout: Duration) -> Self {
        Self {
            pool,
            probe_timeout,
        }
    }
}

/// GET /health - liveness.
async fn liveness() -> Response {
    Json(serde_json::json!({ "status": "ok" })).into_response()
}

/// GET /health/ready - readiness (database reachable).
async fn readiness(State(state): State<HealthState>) -> Response {
    let ping = sqlx::query("SELECT 1").execute(&state.pool);
    match timeout(state.probe_timeout, ping).await {
        Ok(Ok(_)) => Json(serde_json::json!({ "status": "ready" })).into_response(),
        Ok(Err(error)) => {
            warn!(error = %error, "readiness probe failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({ "status": "unavailable" })),
            )
                .into_response()
        }
        Err(_) => {
            warn!(timeout_ms = state.probe_timeout.as_millis() as u64, "readiness probe timed out");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({ "status": "unavailable" })),
            )
                .into_response()
        }
    }
}

/// Combined router for the health endpoints.
pub fn health_router(state: HealthState) -> Router {
    Router::new()
        .route("/health", get(liveness))
        .route("/health/ready", get(readiness))
        .with_state(state)
}
