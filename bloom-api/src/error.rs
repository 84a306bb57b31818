//! Error types for bloom-api
//!
//! Every error response body is `{"error": <message>, "code": <CODE>}`.

use crate::blob::BlobError;
use crate::curriculum::CurriculumError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("{0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("{0}")]
    BadRequest(String),

    /// Conflict (409), e.g. duplicate username or enrollment
    #[error("{0}")]
    Conflict(String),

    /// Missing or invalid server configuration (500)
    #[error("{0}")]
    Config(String),

    /// Internal server error (500)
    #[error("{0}")]
    Internal(String),

    #[error(transparent)]
    Curriculum(#[from] CurriculumError),

    #[error(transparent)]
    Blob(#[from] BlobError),

    /// bloom-common error
    #[error(transparent)]
    Common(bloom_common::Error),

    /// Generic error
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<bloom_common::Error> for ApiError {
    fn from(err: bloom_common::Error) -> Self {
        use bloom_common::Error as E;

        if crate::db::is_unique_violation(&err) {
            return ApiError::Conflict("Resource already exists".to_string());
        }
        match err {
            E::NotFound(msg) => ApiError::NotFound(format!("{} not found", msg)),
            E::InvalidInput(msg) => ApiError::BadRequest(msg),
            E::Config(msg) => ApiError::Config(msg),
            other => ApiError::Common(other),
        }
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Config(_) | ApiError::Internal(_) | ApiError::Common(_) | ApiError::Other(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::Curriculum(err) => match err {
                CurriculumError::ExtractionFailed(_)
                | CurriculumError::ChapterIndexOutOfRange { .. }
                | CurriculumError::DuplicateChapter { .. } => StatusCode::BAD_REQUEST,
                CurriculumError::NoCurriculumGenerated => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Blob(err) => match err {
                BlobError::InvalidPath(_) => StatusCode::BAD_REQUEST,
                BlobError::NotFound(_) => StatusCode::NOT_FOUND,
                BlobError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::Config(_) => "CONFIG_ERROR",
            ApiError::Internal(_) | ApiError::Other(_) => "INTERNAL_ERROR",
            ApiError::Common(_) => "COMMON_ERROR",
            ApiError::Curriculum(CurriculumError::ExtractionFailed(_)) => "EXTRACTION_FAILED",
            ApiError::Curriculum(CurriculumError::NoCurriculumGenerated) => "PIPELINE_EXHAUSTED",
            ApiError::Curriculum(
                CurriculumError::ChapterIndexOutOfRange { .. } | CurriculumError::DuplicateChapter { .. },
            ) => "BAD_REQUEST",
            ApiError::Blob(_) => "BLOB_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();
        let message = match &self {
            // Extraction messages are already user-facing
            ApiError::Curriculum(CurriculumError::ExtractionFailed(msg)) => msg.clone(),
            other => other.to_string(),
        };

        if status.is_server_error() {
            error!(code, "{}", message);
        }

        let body = Json(json!({
            "error": message,
            "code": code,
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::BadRequest("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::from(CurriculumError::NoCurriculumGenerated).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::from(CurriculumError::ExtractionFailed("No text extracted from PDF".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(bloom_common::Error::NotFound("Module 1".into())).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(bloom_common::Error::InvalidInput("bad".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(BlobError::InvalidPath("../x".into())).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_extraction_message_is_passed_through() {
        let response = ApiError::from(CurriculumError::ExtractionFailed("No text extracted from PDF".into()))
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
