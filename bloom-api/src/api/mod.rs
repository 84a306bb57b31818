//! HTTP API handlers for bloom-api

pub mod curriculums;
pub mod generation;
pub mod health;
pub mod materials;
pub mod people;
pub mod settings;
pub mod subjects;
pub mod upload;

pub use curriculums::curriculum_routes;
pub use generation::generation_routes;
pub use health::health_routes;
pub use materials::material_routes;
pub use people::people_routes;
pub use settings::settings_routes;
pub use subjects::subject_routes;
pub use upload::upload_routes;

use crate::ApiError;
use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, Request},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

/// `Json` extractor whose rejections use the API error body
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(ApiError::BadRequest(rejection.body_text())),
        }
    }
}

/// `{"success": true}`
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Json<Self> {
        Json(Self { success: true })
    }
}

/// Parse an identifier from a path or body, reporting `what` on failure
pub fn parse_id(raw: &str, what: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::BadRequest(format!("Invalid {}", what)))
}

/// Required non-blank string field
pub fn require<'a>(value: &'a Option<String>, message: &str) -> Result<&'a str, ApiError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ApiError::BadRequest(message.to_string())),
    }
}
