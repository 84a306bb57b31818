//! Completion-backed lesson details and subject roadmaps

use super::{require, ApiJson};
use crate::db::roadmaps::{get_published_roadmap, publish_roadmap, PublishedRoadmap};
use crate::services::{LessonDetails, LessonDetailsService, Roadmap, RoadmapService};
use crate::{ApiError, ApiResult, AppState};
use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonDetailsRequest {
    pub lesson_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RoadmapQuery {
    pub subject: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RoadmapResponse {
    pub roadmap: Roadmap,
}

#[derive(Debug, Deserialize)]
pub struct PublishRoadmapRequest {
    pub subject: Option<String>,
    pub roadmap: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct PublishRoadmapResponse {
    pub success: bool,
    pub roadmap: PublishedRoadmap,
}

/// POST /api/lesson-details
///
/// **Request:** `{"lessonName": "..."}`
/// **Response:** `{"objectives": "...", "coreConcepts": "..."}`; both empty
/// when the model reply could not be parsed
pub async fn lesson_details(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LessonDetailsRequest>,
) -> ApiResult<Json<LessonDetails>> {
    let lesson_name = require(&payload.lesson_name, "Missing lessonName")?;
    let service = state.completion_service().await?;

    let details = LessonDetailsService::new(service, state.settings.completion_model.clone())
        .describe(lesson_name)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(details))
}

/// GET /api/generate-roadmap?subject=...
pub async fn generate_roadmap(
    State(state): State<AppState>,
    Query(query): Query<RoadmapQuery>,
) -> ApiResult<Json<RoadmapResponse>> {
    let subject = require(&query.subject, "Subject parameter is required")?;
    let service = state.completion_service().await?;

    match RoadmapService::new(service, state.settings.completion_model.clone())
        .generate(subject)
        .await
    {
        Ok(roadmap) => {
            info!(subject, milestones = roadmap.milestones.len(), "Generated roadmap");
            Ok(Json(RoadmapResponse { roadmap }))
        }
        Err(e) => {
            warn!(subject, "Roadmap generation failed: {}", e);
            Err(ApiError::Internal("Failed to generate roadmap".to_string()))
        }
    }
}

/// GET /api/publish-roadmap?subject=...
pub async fn get_published(
    State(state): State<AppState>,
    Query(query): Query<RoadmapQuery>,
) -> ApiResult<Json<PublishedRoadmap>> {
    let subject = require(&query.subject, "Subject parameter is required")?;

    get_published_roadmap(&state.db, subject)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Roadmap not found".to_string()))
}

/// POST /api/publish-roadmap
pub async fn publish(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<PublishRoadmapRequest>,
) -> ApiResult<Json<PublishRoadmapResponse>> {
    let subject = require(&payload.subject, "Missing subject")?;
    let roadmap = payload
        .roadmap
        .filter(|r| !r.is_null())
        .ok_or_else(|| ApiError::BadRequest("Missing roadmap".to_string()))?;

    let published = publish_roadmap(&state.db, subject, &roadmap).await?;
    info!(subject, "Published roadmap");

    Ok(Json(PublishRoadmapResponse {
        success: true,
        roadmap: published,
    }))
}

pub fn generation_routes() -> Router<AppState> {
    Router::new()
        .route("/api/lesson-details", post(lesson_details))
        .route("/api/generate-roadmap", get(generate_roadmap))
        .route("/api/publish-roadmap", get(get_published).post(publish))
}
