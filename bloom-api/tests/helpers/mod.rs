//! Shared fixtures for bloom-api integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use bloom_api::blob::LocalBlobStore;
use bloom_api::completion::{CompletionError, CompletionRequest, CompletionResponse, CompletionService};
use bloom_api::config::GenerationSettings;
use bloom_api::AppState;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt;

type Responder = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Completion service answering from a prompt-inspecting closure
///
/// `None` from the closure is reported as a 503 from the service.
pub struct FakeCompletion {
    responder: Responder,
    calls: AtomicUsize,
}

impl FakeCompletion {
    pub fn new(responder: impl Fn(&str) -> Option<String> + Send + Sync + 'static) -> Self {
        Self {
            responder: Box::new(responder),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn always(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::new(move |_| Some(text.clone()))
    }

    pub fn failing() -> Self {
        Self::new(|_| None)
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionService for FakeCompletion {
    fn name(&self) -> &str {
        "fake"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, CompletionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match (self.responder)(&request.prompt) {
            Some(text) => Ok(CompletionResponse { text }),
            None => Err(CompletionError::Status {
                status: 503,
                body: "unavailable".to_string(),
            }),
        }
    }
}

/// Chapter reply in the shape the generator expects
pub fn chapter_reply(title: &str, content: &str) -> String {
    json!({
        "chapters": [{
            "title": title,
            "content": content,
            "lessons": [{ "title": format!("{} basics", title), "content": content }],
            "quiz": [{
                "question": format!("What is {}?", title),
                "options": ["A topic", "A tool"],
                "answer": "A topic"
            }]
        }]
    })
    .to_string()
}

/// State over an in-memory database and a temporary blob directory
pub async fn test_state() -> (AppState, TempDir) {
    let db = bloom_common::db::init_memory_database()
        .await
        .expect("Failed to create in-memory database");
    let blob_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let blobs = Arc::new(LocalBlobStore::new(blob_dir.path().join("blobs")));

    (AppState::new(db, blobs, GenerationSettings::default()), blob_dir)
}

pub async fn test_state_with(service: Arc<dyn CompletionService>) -> (AppState, TempDir) {
    let (state, dir) = test_state().await;
    (state.with_completion_service(service), dir)
}

pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body).into_owned()))
    };
    (status, json)
}

pub fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn delete(uri: &str) -> Request<Body> {
    Request::builder().method("DELETE").uri(uri).body(Body::empty()).unwrap()
}

/// Minimal valid PDF with one Helvetica text line per page
///
/// Page text must not contain parentheses or backslashes.
pub fn minimal_pdf(pages: &[&str]) -> Vec<u8> {
    let kids: Vec<String> = (0..pages.len()).map(|i| format!("{} 0 R", 4 + i * 2)).collect();
    let mut objects = vec![
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        format!("<< /Type /Pages /Kids [{}] /Count {} >>", kids.join(" "), pages.len()),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>".to_string(),
    ];
    for (i, text) in pages.iter().enumerate() {
        objects.push(format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Resources << /Font << /F1 3 0 R >> >> /Contents {} 0 R >>",
            5 + i * 2
        ));
        let stream = format!("BT /F1 12 Tf 72 720 Td ({}) Tj ET", text);
        objects.push(format!("<< /Length {} >>\nstream\n{}\nendstream", stream.len(), stream));
    }

    let mut pdf = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        pdf.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
    }

    let xref_offset = pdf.len();
    let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
    for offset in offsets {
        xref.push_str(&format!("{:010} 00000 n \n", offset));
    }
    pdf.extend_from_slice(xref.as_bytes());
    pdf.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_offset
        )
        .as_bytes(),
    );
    pdf
}
