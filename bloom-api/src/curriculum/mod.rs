//! Curriculum model and generation pipeline
//!
//! PDF or raw text → [`extractor`] → [`chunker`] → [`generator`] (one call per
//! chunk, concurrently) → [`assembler`] → persisted module.
//!
//! The model never numbers chapter titles; the assembler always does, using
//! the grammar in [`numbering`].

pub mod assembler;
pub mod chunker;
pub mod extractor;
pub mod generator;
pub mod numbering;

pub use assembler::{AssembledCurriculum, ChapterOrdering, ChunkOutcome, CurriculumAssembler};
pub use chunker::{chunk_text, TextChunk};
pub use extractor::{extract_pdf_text, ExtractedText};
pub use generator::{ChapterGenerator, ChunkFailure, GenerationParams, UpstreamParseError};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Module title used when no chapter title is available
pub const UNTITLED_MODULE: &str = "Untitled Module";

/// Label used when an upload carries no textbook/subject label
pub const UNTITLED_TEXTBOOK: &str = "Untitled Textbook/Subject";

/// Pipeline and curriculum-edit errors
#[derive(Debug, Error)]
pub enum CurriculumError {
    /// PDF could not be parsed, or yielded no text after trimming
    #[error("Text extraction failed: {0}")]
    ExtractionFailed(String),

    /// Every chunk contributed zero chapters
    #[error("No curriculum chapters generated from the completion service")]
    NoCurriculumGenerated,

    /// Edit operation addressed a chapter that does not exist
    #[error("Chapter index {index} out of range (curriculum has {len} chapters)")]
    ChapterIndexOutOfRange { index: usize, len: usize },

    /// Edit would leave two chapters with the same name or content
    #[error("Chapter duplicates existing chapter \"{existing}\"")]
    DuplicateChapter { existing: String },
}

/// Multiple-choice quiz question; `answer` must equal one of `options`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub title: String,
    pub content: String,
    pub lessons: Vec<Lesson>,
    pub quiz: Vec<QuizQuestion>,
}

impl Chapter {
    /// Title with any "Chapter N:" prefix removed
    pub fn name(&self) -> &str {
        numbering::strip_chapter_prefix(&self.title)
    }

    /// Same content, or same name once numbering is stripped
    pub fn duplicates(&self, other: &Chapter) -> bool {
        self.content == other.content || self.name() == other.name()
    }
}

/// Ordered chapter structure produced for one upload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Curriculum {
    pub chapters: Vec<Chapter>,
}

impl Curriculum {
    pub fn new(chapters: Vec<Chapter>) -> Self {
        Self { chapters }
    }

    pub fn is_empty(&self) -> bool {
        self.chapters.is_empty()
    }

    /// Rewrite every title as "Chapter {i+1}: {name}"
    pub fn renumber(&mut self) {
        assembler::renumber_chapters(&mut self.chapters);
    }

    /// Append a chapter at the end and renumber
    pub fn append_chapter(&mut self, chapter: Chapter) -> Result<(), CurriculumError> {
        self.ensure_unique(None, Some(chapter.name()), Some(&chapter.content))?;
        self.chapters.push(chapter);
        self.renumber();
        Ok(())
    }

    /// Remove the chapter at `index` and renumber the rest
    pub fn remove_chapter(&mut self, index: usize) -> Result<Chapter, CurriculumError> {
        self.check_index(index)?;
        let removed = self.chapters.remove(index);
        self.renumber();
        Ok(removed)
    }

    /// Give the chapter at `index` a new name, keeping its number
    pub fn rename_chapter(&mut self, index: usize, name: &str) -> Result<(), CurriculumError> {
        self.check_index(index)?;
        let name = numbering::strip_chapter_prefix(name);
        self.ensure_unique(Some(index), Some(name), None)?;
        self.chapters[index].title = name.to_string();
        self.renumber();
        Ok(())
    }

    /// Replace the content of the chapter at `index`
    pub fn set_chapter_content(&mut self, index: usize, content: String) -> Result<(), CurriculumError> {
        self.check_index(index)?;
        self.ensure_unique(Some(index), None, Some(&content))?;
        self.chapters[index].content = content;
        Ok(())
    }

    /// Whether any two chapters duplicate each other
    pub fn has_duplicates(&self) -> bool {
        self.chapters
            .iter()
            .enumerate()
            .any(|(i, a)| self.chapters[i + 1..].iter().any(|b| a.duplicates(b)))
    }

    /// Reject `name` or `content` if a chapter other than `skip` already has it
    fn ensure_unique(&self, skip: Option<usize>, name: Option<&str>, content: Option<&str>) -> Result<(), CurriculumError> {
        let clash = self
            .chapters
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != skip)
            .find(|(_, c)| name == Some(c.name()) || content == Some(c.content.as_str()));

        match clash {
            Some((_, c)) => Err(CurriculumError::DuplicateChapter {
                existing: c.title.clone(),
            }),
            None => Ok(()),
        }
    }

    fn check_index(&self, index: usize) -> Result<(), CurriculumError> {
        if index >= self.chapters.len() {
            return Err(CurriculumError::ChapterIndexOutOfRange {
                index,
                len: self.chapters.len(),
            });
        }
        Ok(())
    }
}
