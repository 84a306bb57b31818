//! Teachers and students

use super::{parse_id, require, ApiJson, SuccessResponse};
use crate::db::students::{self, Student, StudentSummary};
use crate::db::teachers::{self, Teacher};
use crate::{ApiError, ApiResult, AppState};
use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentQuery {
    pub teacher_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateStudentRequest {
    pub name: Option<String>,
    pub username: Option<String>,
    pub preferences: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct TeacherQuery {
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddStudentRequest {
    pub teacher_id: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveStudentRequest {
    pub teacher_id: Option<String>,
    pub student_id: Option<String>,
}

/// GET /api/students?teacherId=...
pub async fn list_students(
    State(state): State<AppState>,
    Query(query): Query<StudentQuery>,
) -> ApiResult<Json<Vec<StudentSummary>>> {
    let teacher_id = match query.teacher_id.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => Some(parse_id(raw, "teacherId")?),
        _ => None,
    };

    Ok(Json(students::list_students(&state.db, teacher_id).await?))
}

/// POST /api/students
///
/// `name` defaults to the username.
pub async fn create_student(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateStudentRequest>,
) -> ApiResult<Json<Student>> {
    let username = require(&payload.username, "Username is required")?;
    let name = payload
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(username);

    let student = students::create_student(&state.db, name, username, payload.preferences.as_ref()).await?;
    info!(student_id = %student.id, "Created student");
    Ok(Json(student))
}

/// GET /api/teacher?username=...
///
/// Without a username, returns the first teacher.
pub async fn get_teacher(
    State(state): State<AppState>,
    Query(query): Query<TeacherQuery>,
) -> ApiResult<Json<Teacher>> {
    let teacher = match query.username.as_deref().map(str::trim) {
        Some(username) if !username.is_empty() => teachers::find_teacher_by_username(&state.db, username).await?,
        _ => teachers::first_teacher(&state.db).await?,
    };

    teacher
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Teacher not found".to_string()))
}

/// POST /api/teacher/add-student
pub async fn add_student(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<AddStudentRequest>,
) -> ApiResult<Json<Student>> {
    let (Ok(teacher_id), Ok(username)) = (
        require(&payload.teacher_id, ""),
        require(&payload.username, ""),
    ) else {
        return Err(ApiError::BadRequest("Missing teacherId or username".to_string()));
    };
    let teacher_id = parse_id(teacher_id, "teacherId")?;

    let student = students::find_student_by_username(&state.db, username)
        .await?
        .ok_or_else(|| ApiError::NotFound("Student not found".to_string()))?;

    teachers::add_student(&state.db, teacher_id, student.id).await?;
    info!(teacher_id = %teacher_id, student_id = %student.id, "Linked student to teacher");
    Ok(Json(student))
}

/// POST /api/teacher/remove-student
pub async fn remove_student(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RemoveStudentRequest>,
) -> ApiResult<Json<SuccessResponse>> {
    let (Ok(teacher_id), Ok(student_id)) = (
        require(&payload.teacher_id, ""),
        require(&payload.student_id, ""),
    ) else {
        return Err(ApiError::BadRequest("Missing teacherId or studentId".to_string()));
    };
    let teacher_id = parse_id(teacher_id, "teacherId")?;
    let student_id = parse_id(student_id, "studentId")?;

    if !teachers::remove_student(&state.db, teacher_id, student_id).await? {
        return Err(ApiError::NotFound("Student is not linked to this teacher".to_string()));
    }
    Ok(SuccessResponse::ok())
}

pub fn people_routes() -> Router<AppState> {
    Router::new()
        .route("/api/students", get(list_students).post(create_student))
        .route("/api/teacher", get(get_teacher))
        .route("/api/teacher/add-student", post(add_student))
        .route("/api/teacher/remove-student", post(remove_student))
}
