//! Health check handlers

use crate::state::AppState;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::fmt::Write;
use std::sync::Arc;
use utoipa::ToSchema;

/// Health check response
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
}

/// Liveness probe - basic health check
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is alive", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_secs(),
    })
}

/// Readiness response
#[derive(Serialize, ToSchema)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub checks: ReadinessChecks,
}

#[derive(Serialize, ToSchema)]
pub struct ReadinessChecks {
    /// Revocation backend name
    pub revocation_store: String,
    /// Whether the revocation backend answered within the deadline
    pub revocation_store_reachable: bool,
}

/// Readiness probe - pings the revocation store
///
/// Without a reachable store every protected request would fail with 503,
/// so the instance reports itself unready.
#[utoipa::path(
    get,
    path = "/ready",
    tag = "health",
    responses(
        (status = 200, description = "Service is ready", body = ReadinessResponse),
        (status = 503, description = "Service not ready", body = ReadinessResponse)
    )
)]
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let reachable = state.auth.store_ready().await;

    let response = ReadinessResponse {
        ready: reachable,
        checks: ReadinessChecks {
            revocation_store: state.auth.store_name().to_string(),
            revocation_store_reachable: reachable,
        },
    };

    if reachable {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}

/// Prometheus-compatible metrics endpoint
pub async fn prometheus_metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let uptime = state.uptime_secs();
    let total_requests = state.get_request_count();

    let mut output = String::new();

    output.push_str("# HELP rollcall_uptime_seconds Time since server start\n");
    output.push_str("# TYPE rollcall_uptime_seconds gauge\n");
    let _ = writeln!(output, "rollcall_uptime_seconds {uptime}\n");

    output.push_str("# HELP rollcall_requests_total Total number of HTTP requests\n");
    output.push_str("# TYPE rollcall_requests_total counter\n");
    let _ = writeln!(output, "rollcall_requests_total {total_requests}\n");

    output.push_str("# HELP rollcall_build_info Build information\n");
    output.push_str("# TYPE rollcall_build_info gauge\n");
    let _ = writeln!(
        output,
        "rollcall_build_info{{version=\"{}\",revocation_store=\"{}\"}} 1\n",
        env!("CARGO_PKG_VERSION"),
        state.auth.store_name()
    );

    state.metrics.render(&mut output);

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        output,
    )
}
