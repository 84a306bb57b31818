//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "ok", or "degraded" when no completion service is configured
    pub status: String,
    /// Module name ("bloom-api")
    pub module: String,
    /// Crate version from Cargo.toml
    pub version: String,
    /// Seconds since service started
    pub uptime_seconds: u64,
    /// Whether uploads can reach a completion service
    pub completion_configured: bool,
    /// Last fatal handler error, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = Utc::now().signed_duration_since(state.startup_time);
    let uptime_seconds = uptime.num_seconds().max(0) as u64;

    let completion_configured = state.completion.read().await.is_some();
    let last_error = state.last_error.read().await.clone();

    Json(HealthResponse {
        status: if completion_configured { "ok" } else { "degraded" }.to_string(),
        module: "bloom-api".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds,
        completion_configured,
        last_error,
    })
}

pub fn health_routes() -> Router<crate::AppState> {
    Router::new().route("/health", get(health_check))
}
