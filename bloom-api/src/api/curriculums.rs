//! Module and curriculum editing endpoints

use super::{parse_id, ApiJson, SuccessResponse};
use crate::curriculum::{Chapter, Curriculum, Lesson, QuizQuestion};
use crate::db::modules::{self, Module};
use crate::{ApiError, ApiResult, AppState};
use axum::{
    extract::{Path, State},
    routing::{patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

/// Read-modify-write attempts before a chapter edit gives up with 409
const MAX_EDIT_ATTEMPTS: usize = 5;

#[derive(Debug, Serialize)]
pub struct ModulesResponse {
    pub modules: Vec<Module>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateModuleRequest {
    pub title: Option<String>,
    pub curriculum: Option<Curriculum>,
}

#[derive(Debug, Deserialize)]
pub struct NewChapterRequest {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub lessons: Vec<Lesson>,
    #[serde(default)]
    pub quiz: Vec<QuizQuestion>,
}

#[derive(Debug, Deserialize)]
pub struct EditChapterRequest {
    pub title: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RoadmapRequest {
    pub roadmap: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonDetailsBulkRequest {
    pub module_id: Option<String>,
    pub lesson_details: Option<Value>,
}

/// GET /api/curriculums
pub async fn list_curriculums(State(state): State<AppState>) -> ApiResult<Json<ModulesResponse>> {
    let modules = modules::list_modules(&state.db).await?;
    Ok(Json(ModulesResponse { modules }))
}

/// PATCH /api/curriculums/:id
///
/// Replaces the title and/or the whole curriculum. A replaced curriculum is
/// renumbered.
pub async fn update_curriculum(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<UpdateModuleRequest>,
) -> ApiResult<Json<Module>> {
    let id = parse_id(&id, "curriculum ID")?;

    let title = payload
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty());
    let curriculum = payload.curriculum.map(|mut curriculum| {
        curriculum.renumber();
        curriculum
    });

    if title.is_none() && curriculum.is_none() {
        return Err(ApiError::BadRequest("No valid update data provided".to_string()));
    }
    if curriculum.as_ref().is_some_and(Curriculum::has_duplicates) {
        return Err(ApiError::BadRequest(
            "Curriculum contains duplicate chapters".to_string(),
        ));
    }

    let module = modules::update_module(&state.db, id, title, curriculum.as_ref()).await?;
    Ok(Json(module))
}

/// DELETE /api/curriculums/:id
pub async fn delete_curriculum(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<SuccessResponse>> {
    let id = parse_id(&id, "curriculum ID")?;

    if !modules::delete_module(&state.db, id).await? {
        return Err(ApiError::NotFound("Curriculum not found".to_string()));
    }

    info!(module_id = %id, "Deleted module");
    Ok(SuccessResponse::ok())
}

/// POST /api/curriculums/:id/chapters
pub async fn append_chapter(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<NewChapterRequest>,
) -> ApiResult<Json<Module>> {
    let id = parse_id(&id, "curriculum ID")?;

    if payload.title.trim().is_empty() {
        return Err(ApiError::BadRequest("Chapter title is required".to_string()));
    }
    if let Some(question) = payload.quiz.iter().find(|q| !q.options.contains(&q.answer)) {
        return Err(ApiError::BadRequest(format!(
            "Quiz answer for \"{}\" is not one of its options",
            question.question
        )));
    }

    let chapter = Chapter {
        title: payload.title,
        content: payload.content,
        lessons: payload.lessons,
        quiz: payload.quiz,
    };

    edit_curriculum(&state, id, |curriculum| {
        curriculum.append_chapter(chapter.clone())?;
        Ok(())
    })
    .await
    .map(Json)
}

/// PATCH /api/curriculums/:id/chapters/:index
pub async fn edit_chapter(
    State(state): State<AppState>,
    Path((id, index)): Path<(String, String)>,
    ApiJson(payload): ApiJson<EditChapterRequest>,
) -> ApiResult<Json<Module>> {
    let id = parse_id(&id, "curriculum ID")?;
    let index = parse_index(&index)?;

    let name = payload.title.as_deref().map(str::trim).filter(|t| !t.is_empty());
    if name.is_none() && payload.content.is_none() {
        return Err(ApiError::BadRequest("No valid update data provided".to_string()));
    }

    edit_curriculum(&state, id, |curriculum| {
        if let Some(name) = name {
            curriculum.rename_chapter(index, name)?;
        }
        if let Some(content) = &payload.content {
            curriculum.set_chapter_content(index, content.clone())?;
        }
        Ok(())
    })
    .await
    .map(Json)
}

/// DELETE /api/curriculums/:id/chapters/:index
pub async fn delete_chapter(
    State(state): State<AppState>,
    Path((id, index)): Path<(String, String)>,
) -> ApiResult<Json<Module>> {
    let id = parse_id(&id, "curriculum ID")?;
    let index = parse_index(&index)?;

    edit_curriculum(&state, id, |curriculum| {
        curriculum.remove_chapter(index)?;
        Ok(())
    })
    .await
    .map(Json)
}

/// Load a module, apply `edit` to its curriculum and store the result
///
/// The write only lands if nobody else changed the curriculum in between;
/// otherwise the edit is replayed on the fresh copy.
async fn edit_curriculum<F>(state: &AppState, id: Uuid, edit: F) -> ApiResult<Module>
where
    F: Fn(&mut Curriculum) -> ApiResult<()>,
{
    for attempt in 1..=MAX_EDIT_ATTEMPTS {
        let module = modules::get_module(&state.db, id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Curriculum not found".to_string()))?;

        let mut curriculum = module.curriculum.clone();
        edit(&mut curriculum)?;

        if let Some(updated) = modules::replace_curriculum(&state.db, id, &module.curriculum, &curriculum).await? {
            info!(module_id = %id, chapters = curriculum.chapters.len(), "Edited curriculum");
            return Ok(updated);
        }
        debug!(module_id = %id, attempt, "Curriculum changed during edit, retrying");
    }

    Err(ApiError::Conflict(
        "Curriculum was modified concurrently, retry the edit".to_string(),
    ))
}

fn parse_index(raw: &str) -> ApiResult<usize> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid chapter index: {}", raw)))
}

/// PATCH /api/roadmap/:id
pub async fn set_module_roadmap(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<RoadmapRequest>,
) -> ApiResult<Json<Module>> {
    let id = parse_id(&id, "module ID")?;
    let roadmap = payload
        .roadmap
        .filter(|r| !r.is_null())
        .ok_or_else(|| ApiError::BadRequest("Missing roadmap".to_string()))?;

    Ok(Json(modules::set_roadmap(&state.db, id, &roadmap).await?))
}

/// PATCH /api/lesson-details/bulk
pub async fn set_lesson_details_bulk(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LessonDetailsBulkRequest>,
) -> ApiResult<Json<Module>> {
    let (Some(module_id), Some(details)) = (payload.module_id, payload.lesson_details.filter(|d| !d.is_null()))
    else {
        return Err(ApiError::BadRequest("Missing moduleId or lessonDetails".to_string()));
    };
    let id = parse_id(&module_id, "module ID")?;

    Ok(Json(modules::set_lesson_details(&state.db, id, &details).await?))
}

pub fn curriculum_routes() -> Router<AppState> {
    Router::new()
        .route("/api/curriculums", axum::routing::get(list_curriculums))
        .route(
            "/api/curriculums/:id",
            patch(update_curriculum).delete(delete_curriculum),
        )
        .route("/api/curriculums/:id/chapters", post(append_chapter))
        .route(
            "/api/curriculums/:id/chapters/:index",
            patch(edit_chapter).delete(delete_chapter),
        )
        .route("/api/roadmap/:id", patch(set_module_roadmap))
        .route("/api/lesson-details/bulk", patch(set_lesson_details_bulk))
}
