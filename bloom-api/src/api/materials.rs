//! Course materials and raw blob access

use super::{parse_id, require, ApiJson, SuccessResponse};
use crate::blob::validate_blob_path;
use crate::db::materials::{self, Material, NewMaterial};
use crate::db::subjects::get_subject;
use crate::{ApiError, ApiResult, AppState};
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialQuery {
    pub subject_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    pub id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMaterialRequest {
    pub title: Option<String>,
    pub content_url: Option<String>,
    pub subject_id: Option<String>,
    pub storage_path: Option<String>,
}

/// GET /api/materials?subjectId=...
pub async fn list_materials(
    State(state): State<AppState>,
    Query(query): Query<MaterialQuery>,
) -> ApiResult<Json<Vec<Material>>> {
    let subject_id = require(&query.subject_id, "Missing subjectId")?;
    let subject_id = parse_id(subject_id, "subjectId")?;

    Ok(Json(materials::list_materials(&state.db, subject_id).await?))
}

/// POST /api/materials
///
/// A material either points at an external `contentUrl` or at a blob
/// previously stored under `storagePath`; blob-backed materials get
/// `/api/blobs/<storagePath>` as their URL when none is given.
pub async fn create_material(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateMaterialRequest>,
) -> ApiResult<Json<Material>> {
    let (Ok(title), Ok(subject_id)) = (
        require(&payload.title, ""),
        require(&payload.subject_id, ""),
    ) else {
        return Err(ApiError::BadRequest("Missing title or subjectId".to_string()));
    };
    let subject_id = parse_id(subject_id, "subjectId")?;
    if get_subject(&state.db, subject_id).await?.is_none() {
        return Err(ApiError::NotFound("Subject not found".to_string()));
    }

    let storage_path = match payload.storage_path.as_deref().map(str::trim) {
        Some(path) if !path.is_empty() => {
            validate_blob_path(path)?;
            Some(path.to_string())
        }
        _ => None,
    };

    let content_url = match (payload.content_url.as_deref().map(str::trim), &storage_path) {
        (Some(url), _) if !url.is_empty() => url.to_string(),
        (_, Some(path)) => format!("/api/blobs/{}", path),
        _ => return Err(ApiError::BadRequest("Missing contentUrl or storagePath".to_string())),
    };

    let material = materials::create_material(
        &state.db,
        NewMaterial {
            title: title.to_string(),
            content_url,
            subject_id,
            storage_path,
        },
    )
    .await?;

    info!(material_id = %material.id, subject_id = %subject_id, "Created material");
    Ok(Json(material))
}

/// DELETE /api/materials?id=...
///
/// Removes the stored blob before the row. A blob that is already gone does
/// not block deletion of the row.
pub async fn delete_material(
    State(state): State<AppState>,
    Query(query): Query<DeleteQuery>,
) -> ApiResult<Json<SuccessResponse>> {
    let id = require(&query.id, "Missing id")?;
    let id = parse_id(id, "material ID")?;

    let material = materials::get_material(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Material not found".to_string()))?;

    if let Some(path) = material.storage_path.as_deref() {
        if !state.blobs.delete(path).await? {
            warn!(material_id = %id, path, "Material blob was already missing");
        }
    }

    materials::delete_material(&state.db, id).await?;
    info!(material_id = %id, "Deleted material");
    Ok(SuccessResponse::ok())
}

/// PUT /api/blobs/*path
pub async fn put_blob(
    State(state): State<AppState>,
    Path(path): Path<String>,
    body: Bytes,
) -> ApiResult<Json<SuccessResponse>> {
    state.blobs.put(&path, &body).await?;
    info!(path = %path, bytes = body.len(), "Stored blob");
    Ok(SuccessResponse::ok())
}

/// GET /api/blobs/*path
pub async fn get_blob(State(state): State<AppState>, Path(path): Path<String>) -> ApiResult<impl IntoResponse> {
    let bytes = state.blobs.get(&path).await?;
    Ok(([(header::CONTENT_TYPE, content_type_for(&path))], bytes))
}

fn content_type_for(path: &str) -> &'static str {
    let extension = path.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase());
    match extension.as_deref() {
        Some("pdf") => "application/pdf",
        Some("txt") | Some("md") => "text/plain; charset=utf-8",
        Some("json") => "application/json",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}

pub fn material_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/materials",
            get(list_materials).post(create_material).delete(delete_material),
        )
        .route("/api/blobs/*path", get(get_blob).put(put_blob))
}
