//! Subjects and enrollments

use super::{parse_id, require, ApiJson, SuccessResponse};
use crate::db::enrollments::{self, Enrollment};
use crate::db::subjects::{self, Subject, SubjectSummary};
use crate::{ApiError, ApiResult, AppState};
use axum::{
    extract::State,
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubjectRequest {
    pub name: Option<String>,
    pub teacher_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentRequest {
    pub subject_id: Option<String>,
    pub student_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRequest {
    pub subject_id: Option<String>,
    pub student_id: Option<String>,
    pub progress: Option<i64>,
}

/// GET /api/subjects
pub async fn list_subjects(State(state): State<AppState>) -> ApiResult<Json<Vec<SubjectSummary>>> {
    Ok(Json(subjects::list_subjects(&state.db).await?))
}

/// POST /api/subjects
pub async fn create_subject(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateSubjectRequest>,
) -> ApiResult<Json<Subject>> {
    let (Ok(name), Ok(teacher_id)) = (
        require(&payload.name, ""),
        require(&payload.teacher_id, ""),
    ) else {
        return Err(ApiError::BadRequest("Missing name or teacherId".to_string()));
    };
    let teacher_id = parse_id(teacher_id, "teacherId")?;

    let subject = subjects::create_subject(&state.db, name, teacher_id).await?;
    info!(subject_id = %subject.id, "Created subject");
    Ok(Json(subject))
}

fn enrollment_ids(
    subject_id: &Option<String>,
    student_id: &Option<String>,
) -> ApiResult<(uuid::Uuid, uuid::Uuid)> {
    let (Ok(subject), Ok(student)) = (require(subject_id, ""), require(student_id, "")) else {
        return Err(ApiError::BadRequest("Missing subject or student".to_string()));
    };
    Ok((parse_id(subject, "subjectId")?, parse_id(student, "studentId")?))
}

/// POST /api/subjects/enroll
pub async fn enroll(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<EnrollmentRequest>,
) -> ApiResult<Json<SuccessResponse>> {
    let (subject_id, student_id) = enrollment_ids(&payload.subject_id, &payload.student_id)?;

    enrollments::enroll(&state.db, subject_id, student_id).await?;
    Ok(SuccessResponse::ok())
}

/// POST /api/subjects/remove
pub async fn unenroll(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<EnrollmentRequest>,
) -> ApiResult<Json<SuccessResponse>> {
    let (subject_id, student_id) = enrollment_ids(&payload.subject_id, &payload.student_id)?;

    if !enrollments::unenroll(&state.db, subject_id, student_id).await? {
        return Err(ApiError::NotFound("Enrollment not found".to_string()));
    }
    Ok(SuccessResponse::ok())
}

/// PATCH /api/enrollments/progress
pub async fn update_progress(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<ProgressRequest>,
) -> ApiResult<Json<Enrollment>> {
    let (subject_id, student_id) = enrollment_ids(&payload.subject_id, &payload.student_id)?;
    let progress = payload
        .progress
        .ok_or_else(|| ApiError::BadRequest("Missing progress".to_string()))?;

    let enrollment = enrollments::set_progress(&state.db, subject_id, student_id, progress).await?;
    Ok(Json(enrollment))
}

pub fn subject_routes() -> Router<AppState> {
    Router::new()
        .route("/api/subjects", get(list_subjects).post(create_subject))
        .route("/api/subjects/enroll", post(enroll))
        .route("/api/subjects/remove", post(unenroll))
        .route("/api/enrollments/progress", patch(update_progress))
}
