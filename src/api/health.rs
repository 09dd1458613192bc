use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::sync::Arc;

use super::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub uptime_seconds: u64,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct HealthReadyResponse {
    pub ready: bool,
    pub checks: HealthReadinessChecks,
}

#[derive(Debug, Serialize)]
pub struct HealthReadinessChecks {
    pub database: bool,
    pub litellm: bool,
}

/// `GET /health`
///
/// Liveness check; answers as long as the process is serving requests.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_seconds: state.start_time.elapsed().as_secs(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `GET /health/ready`
///
/// Readiness check covering database connectivity and, when keys are
/// issued by LiteLLM, that the gateway answers.
pub async fn health_ready(State(state): State<Arc<AppState>>) -> Response {
    let db_ready = state.store().ping().await.is_ok();

    let litellm_ready = if state.shared.keys.is_remote() {
        state.shared.keys.available_models().await.is_ok()
    } else {
        true
    };

    let ready = db_ready && litellm_ready;
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(HealthReadyResponse {
            ready,
            checks: HealthReadinessChecks {
                database: db_ready,
                litellm: litellm_ready,
            },
        }),
    )
        .into_response()
}
