//! Settings API endpoint
//!
//! Provides POST /api/settings/completion_api_key for runtime configuration

use super::ApiJson;
use crate::{ApiError, ApiResult, AppState};
use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
pub struct SetApiKeyRequest {
    pub api_key: String,
}

#[derive(Debug, Serialize)]
pub struct SetApiKeyResponse {
    pub success: bool,
    /// Human-readable status message
    pub message: String,
}

/// POST /api/settings/completion_api_key handler
///
/// **Request:** `{"api_key": "sk-..."}`
/// **Response:** `{"success": true, "message": "..."}`
///
/// **Behavior:**
/// 1. Validate key (non-empty, non-whitespace)
/// 2. Write to database (authoritative)
/// 3. Swap in a completion client using the new key
/// 4. Sync to TOML when a config path is known (best-effort)
pub async fn set_completion_api_key(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<SetApiKeyRequest>,
) -> ApiResult<Json<SetApiKeyResponse>> {
    if !crate::config::is_valid_key(&payload.api_key) {
        return Err(ApiError::BadRequest(
            "API key cannot be empty or whitespace-only".to_string(),
        ));
    }
    let api_key = payload.api_key.trim().to_string();

    crate::db::settings::set_completion_api_key(&state.db, &api_key)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to save API key to database: {}", e)))?;

    state.install_api_key(api_key.clone()).await?;
    info!("Completion API key configured via API");

    if let Some(toml_path) = state.toml_path.as_deref() {
        let mut settings = HashMap::new();
        settings.insert("completion_api_key".to_string(), api_key);

        if let Err(e) = crate::config::sync_settings_to_toml(settings, toml_path).await {
            warn!("TOML sync failed (database write succeeded): {}", e);
        }
    }

    Ok(Json(SetApiKeyResponse {
        success: true,
        message: "Completion API key configured successfully".to_string(),
    }))
}

pub fn settings_routes() -> Router<AppState> {
    Router::new().route("/api/settings/completion_api_key", post(set_completion_api_key))
}
