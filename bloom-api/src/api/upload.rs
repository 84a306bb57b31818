//! Teacher upload endpoint
//!
//! POST /api/teacher-upload accepts either a multipart form carrying a PDF or
//! a JSON body carrying raw text, runs the curriculum pipeline and persists
//! the result as a new module.

use crate::curriculum::chunker::{chunk_text, chunk_texts};
use crate::curriculum::extractor::extract_pdf_text_blocking;
use crate::curriculum::{
    ChapterGenerator, Curriculum, CurriculumAssembler, CurriculumError, TextChunk, UNTITLED_TEXTBOOK,
};
use crate::db::modules::{insert_module, Module, NewModule};
use crate::db::teachers::{ensure_default_teacher_on, get_teacher};
use crate::{ApiError, ApiResult, AppState};
use axum::{
    extract::{FromRequest, Multipart, Request, State},
    http::header::CONTENT_TYPE,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// JSON upload body
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextUpload {
    /// Whole text, chunked server-side
    pub text: Option<String>,
    /// Caller-chunked text; takes precedence over `text`
    pub text_chunks: Option<Vec<String>>,
    pub textbook_or_subject: Option<String>,
    pub teacher_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub module: Module,
    pub curriculum: Curriculum,
}

enum UploadSource {
    Pdf(Vec<u8>),
    Texts(Vec<String>),
}

struct UploadInput {
    source: UploadSource,
    textbook_or_subject: Option<String>,
    teacher_id: Option<String>,
}

/// POST /api/teacher-upload handler
///
/// **Responses:**
/// - 200 `{"success": true, "module": {...}, "curriculum": {"chapters": [...]}}`
/// - 400 missing PDF, unreadable PDF, empty text, unsupported content type
/// - 500 no completion key configured, or no chapters generated
pub async fn teacher_upload(State(state): State<AppState>, request: Request) -> ApiResult<Json<UploadResponse>> {
    let content_type = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    let input = if content_type.starts_with("multipart/form-data") {
        let multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        read_multipart(multipart).await?
    } else if content_type.starts_with("application/json") {
        let Json(body) = Json::<TextUpload>::from_request(request, &state)
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        read_json(body)?
    } else {
        return Err(ApiError::BadRequest("Unsupported content type".to_string()));
    };

    let service = state.completion_service().await?;

    let chunks = match input.source {
        UploadSource::Pdf(bytes) => {
            let extracted = extract_pdf_text_blocking(bytes, state.settings.extraction_budget()).await?;
            info!(
                pages = extracted.page_count,
                truncated = extracted.truncated,
                "Extracted text from uploaded PDF"
            );
            chunk_text(&extracted.text, state.settings.chunk_max_chars)
        }
        UploadSource::Texts(texts) => chunk_texts(&texts, state.settings.chunk_max_chars),
    };

    // The default teacher is only created once there is a module to own
    let teacher_id = match input.teacher_id.as_deref() {
        Some(raw) => {
            let id = super::parse_id(raw, "teacherId")?;
            let teacher = get_teacher(&state.db, id)
                .await?
                .ok_or_else(|| ApiError::NotFound("Teacher not found".to_string()))?;
            Some(teacher.id)
        }
        None => None,
    };

    let assembled = match assemble(&state, service, chunks).await {
        Ok(assembled) => assembled,
        Err(e) => {
            warn!("Curriculum generation failed: {}", e);
            state.record_error(e.to_string()).await;
            return Err(e.into());
        }
    };

    let textbook_or_subject = input
        .textbook_or_subject
        .map(|label| label.trim().to_string())
        .filter(|label| !label.is_empty())
        .unwrap_or_else(|| UNTITLED_TEXTBOOK.to_string());

    let module = persist_module(
        &state,
        teacher_id,
        assembled.title,
        assembled.curriculum.clone(),
        textbook_or_subject,
    )
    .await?;

    info!(
        module_id = %module.id,
        chapters = module.curriculum.chapters.len(),
        "Created module from upload"
    );

    Ok(Json(UploadResponse {
        success: true,
        module,
        curriculum: assembled.curriculum,
    }))
}

async fn assemble(
    state: &AppState,
    service: Arc<dyn crate::completion::CompletionService>,
    chunks: Vec<TextChunk>,
) -> Result<crate::curriculum::AssembledCurriculum, CurriculumError> {
    let generator = Arc::new(ChapterGenerator::new(service, state.settings.generation_params()));
    CurriculumAssembler::new(generator, state.settings.chapter_ordering)
        .assemble(chunks)
        .await
}

/// Resolve the owning teacher and insert the module in one transaction
async fn persist_module(
    state: &AppState,
    teacher_id: Option<Uuid>,
    title: String,
    curriculum: Curriculum,
    textbook_or_subject: String,
) -> ApiResult<Module> {
    let mut tx = state.db.begin().await.map_err(bloom_common::Error::from)?;

    let teacher_id = match teacher_id {
        Some(id) => id,
        None => ensure_default_teacher_on(&mut tx).await?.id,
    };

    let module = insert_module(
        &mut *tx,
        NewModule {
            title,
            teacher_id,
            curriculum,
            textbook_or_subject,
        },
    )
    .await?;

    tx.commit().await.map_err(bloom_common::Error::from)?;
    Ok(module)
}

async fn read_multipart(mut multipart: Multipart) -> ApiResult<UploadInput> {
    let mut pdf = None;
    let mut textbook_or_subject = None;
    let mut teacher_id = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "pdf" => {
                let bytes = field.bytes().await.map_err(|e| ApiError::BadRequest(e.body_text()))?;
                pdf = Some(bytes.to_vec());
            }
            "textbookOrSubject" => {
                textbook_or_subject = Some(field.text().await.map_err(|e| ApiError::BadRequest(e.body_text()))?);
            }
            "teacherId" => {
                let text = field.text().await.map_err(|e| ApiError::BadRequest(e.body_text()))?;
                teacher_id = Some(text).filter(|t| !t.trim().is_empty());
            }
            _ => {}
        }
    }

    let pdf = pdf
        .filter(|bytes| !bytes.is_empty())
        .ok_or_else(|| ApiError::BadRequest("No PDF uploaded".to_string()))?;

    Ok(UploadInput {
        source: UploadSource::Pdf(pdf),
        textbook_or_subject,
        teacher_id,
    })
}

fn read_json(body: TextUpload) -> ApiResult<UploadInput> {
    let texts = match (body.text_chunks, body.text) {
        (Some(chunks), _) => chunks,
        (None, Some(text)) => vec![text],
        (None, None) => Vec::new(),
    };

    if texts.iter().all(|t| t.trim().is_empty()) {
        return Err(ApiError::BadRequest("No text provided in JSON".to_string()));
    }

    Ok(UploadInput {
        source: UploadSource::Texts(texts),
        textbook_or_subject: body.textbook_or_subject,
        teacher_id: body.teacher_id.filter(|t| !t.trim().is_empty()),
    })
}

pub fn upload_routes() -> Router<AppState> {
    Router::new().route("/api/teacher-upload", post(teacher_upload))
}
