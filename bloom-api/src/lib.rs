//! bloom-api library interface
//!
//! Exposes the router and application state for the binary and for
//! integration tests.

pub mod api;
pub mod blob;
pub mod completion;
pub mod config;
pub mod curriculum;
pub mod db;
pub mod error;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use crate::blob::BlobStore;
use crate::completion::{CompletionService, OpenAiClient};
use crate::config::GenerationSettings;
use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Swappable completion service; empty until an API key is configured
pub type CompletionSlot = Arc<RwLock<Option<Arc<dyn CompletionService>>>>;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Storage for uploaded material files
    pub blobs: Arc<dyn BlobStore>,
    /// Language-model completion service
    pub completion: CompletionSlot,
    /// Pipeline settings loaded at startup
    pub settings: Arc<GenerationSettings>,
    /// TOML file that mirrors settings changed through the API
    pub toml_path: Option<PathBuf>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last fatal handler error, reported by /health
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(db: SqlitePool, blobs: Arc<dyn BlobStore>, settings: GenerationSettings) -> Self {
        Self {
            db,
            blobs,
            completion: Arc::new(RwLock::new(None)),
            settings: Arc::new(settings),
            toml_path: None,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    pub fn with_completion_service(self, service: Arc<dyn CompletionService>) -> Self {
        Self {
            completion: Arc::new(RwLock::new(Some(service))),
            ..self
        }
    }

    pub fn with_toml_path(self, toml_path: PathBuf) -> Self {
        Self {
            toml_path: Some(toml_path),
            ..self
        }
    }

    /// Current completion service, or a configuration error when no key is set
    pub async fn completion_service(&self) -> ApiResult<Arc<dyn CompletionService>> {
        self.completion
            .read()
            .await
            .clone()
            .ok_or_else(|| ApiError::Config("Completion API key not configured".to_string()))
    }

    /// Build an OpenAI-compatible client for `api_key` and make it current
    pub async fn install_api_key(&self, api_key: String) -> ApiResult<()> {
        let client = OpenAiClient::new(
            api_key,
            &self.settings.completion_base_url,
            self.settings.completion_timeout(),
        )
        .map_err(|e| ApiError::Internal(format!("Failed to build completion client: {}", e)))?;

        *self.completion.write().await = Some(Arc::new(client));
        Ok(())
    }

    pub async fn record_error(&self, message: impl Into<String>) {
        *self.last_error.write().await = Some(message.into());
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.settings.max_upload_bytes;

    Router::new()
        .merge(api::health_routes())
        .merge(api::upload_routes())
        .merge(api::curriculum_routes())
        .merge(api::generation_routes())
        .merge(api::subject_routes())
        .merge(api::people_routes())
        .merge(api::material_routes())
        .merge(api::settings_routes())
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
