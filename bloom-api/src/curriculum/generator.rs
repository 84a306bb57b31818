//! Chapter generation for a single text chunk
//!
//! One chunk becomes one completion call. The reply is cut down to its JSON
//! object and strictly validated; anything short of a fully valid chapter
//! list is rejected as a whole.

use super::chunker::TextChunk;
use super::numbering::strip_chapter_prefix;
use super::{Chapter, Lesson, QuizQuestion};
use crate::completion::{extract_json_object, CompletionError, CompletionRequest, CompletionService};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Sampling parameters for chapter generation calls
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    pub model: String,
    pub max_output_tokens: u32,
    pub temperature: f32,
    /// Upper bound on a single completion call
    pub timeout: Duration,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            model: "gpt-4".to_string(),
            max_output_tokens: 1500,
            temperature: 0.2,
            timeout: Duration::from_secs(120),
        }
    }
}

/// Why a completion reply could not be turned into chapters
#[derive(Debug, Error)]
pub enum UpstreamParseError {
    #[error("Response contains no JSON object")]
    NoJsonObject,

    #[error("Response is not valid curriculum JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Response has no chapters")]
    MissingChapters,

    #[error("Chapter {index} is invalid: {reason}")]
    InvalidChapter { index: usize, reason: String },
}

/// Why a chunk contributed no chapters
#[derive(Debug, Error)]
pub enum ChunkFailure {
    #[error(transparent)]
    Completion(#[from] CompletionError),

    #[error("Completion call timed out after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Parse(#[from] UpstreamParseError),
}

pub struct ChapterGenerator {
    service: Arc<dyn CompletionService>,
    params: GenerationParams,
}

impl ChapterGenerator {
    pub fn new(service: Arc<dyn CompletionService>, params: GenerationParams) -> Self {
        Self { service, params }
    }

    pub fn params(&self) -> &GenerationParams {
        &self.params
    }

    /// Generate chapters for one chunk
    ///
    /// Blank chunks produce no chapters without calling the service.
    pub async fn try_generate(&self, chunk: &TextChunk) -> Result<Vec<Chapter>, ChunkFailure> {
        if chunk.is_blank() {
            debug!("Skipping blank chunk");
            return Ok(Vec::new());
        }

        let request = CompletionRequest {
            model: self.params.model.clone(),
            prompt: build_prompt(chunk.as_str()),
            temperature: self.params.temperature,
            max_output_tokens: self.params.max_output_tokens,
        };

        let response = tokio::time::timeout(self.params.timeout, self.service.complete(request))
            .await
            .map_err(|_| ChunkFailure::Timeout(self.params.timeout))??;

        Ok(parse_chapters(&response.text)?)
    }

    /// Like [`try_generate`](Self::try_generate), but a failed chunk yields no chapters
    pub async fn generate(&self, chunk: &TextChunk) -> Vec<Chapter> {
        match self.try_generate(chunk).await {
            Ok(chapters) => chapters,
            Err(e) => {
                warn!(service = self.service.name(), "Chunk contributed no chapters: {}", e);
                Vec::new()
            }
        }
    }
}

/// Instruction sent for one chunk
pub fn build_prompt(chunk: &str) -> String {
    format!(
        r#"You are an expert university-level curriculum designer. Given the following section from a university textbook, generate a thorough and detailed curriculum in JSON format, suitable for university students.

The JSON object must have exactly this shape:
{{
  "chapters": [
    {{
      "title": "Chapter name",
      "content": "A detailed summary or main content for the chapter",
      "lessons": [
        {{ "title": "Lesson title", "content": "A thorough explanation of the lesson topic" }}
      ],
      "quiz": [
        {{ "question": "Quiz question", "options": ["A", "B", "C", "D"], "answer": "A" }}
      ]
    }}
  ]
}}

Rules:
1. Do NOT number chapter titles and do not prefix them with "Chapter"; give only the chapter name.
2. Each chapter must have a unique title and unique content.
3. Every quiz answer must be exactly one of its options.
4. If the section is not enough for a full chapter, extract as much as you can (lessons, summaries or quiz questions).

Respond ONLY with valid JSON. Do not include any explanation or commentary.

Textbook content:
{}
"#,
        chunk
    )
}

#[derive(Deserialize)]
struct RawCurriculum {
    chapters: Option<Vec<RawChapter>>,
}

#[derive(Deserialize)]
struct RawChapter {
    title: Option<String>,
    content: Option<String>,
    lessons: Option<Vec<Lesson>>,
    quiz: Option<Vec<QuizQuestion>>,
}

/// Parse and validate a completion reply into chapters
pub fn parse_chapters(text: &str) -> Result<Vec<Chapter>, UpstreamParseError> {
    let json = extract_json_object(text).ok_or(UpstreamParseError::NoJsonObject)?;
    let raw: RawCurriculum = serde_json::from_str(json)?;

    let chapters = match raw.chapters {
        Some(chapters) if !chapters.is_empty() => chapters,
        _ => return Err(UpstreamParseError::MissingChapters),
    };

    chapters
        .into_iter()
        .enumerate()
        .map(|(index, raw)| {
            validate_chapter(raw).map_err(|reason| UpstreamParseError::InvalidChapter { index, reason })
        })
        .collect()
}

fn validate_chapter(raw: RawChapter) -> Result<Chapter, String> {
    let title = raw.title.ok_or("missing title")?;
    if strip_chapter_prefix(&title).is_empty() {
        return Err("blank title".to_string());
    }

    let content = raw.content.ok_or("missing content")?;
    if content.trim().is_empty() {
        return Err("blank content".to_string());
    }

    let lessons = raw.lessons.ok_or("missing lessons")?;
    if let Some(position) = lessons.iter().position(|l| l.title.trim().is_empty()) {
        return Err(format!("lesson {} has a blank title", position));
    }

    let quiz = raw.quiz.ok_or("missing quiz")?;
    for (position, question) in quiz.iter().enumerate() {
        if question.question.trim().is_empty() {
            return Err(format!("quiz question {} is blank", position));
        }
        if question.options.is_empty() {
            return Err(format!("quiz question {} has no options", position));
        }
        if !question.options.contains(&question.answer) {
            return Err(format!("quiz question {} answer is not among its options", position));
        }
    }

    Ok(Chapter {
        title: title.trim().to_string(),
        content,
        lessons,
        quiz,
    })
}
