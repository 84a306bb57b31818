//! Curriculum assembly
//!
//! Runs the [`ChapterGenerator`] over every chunk concurrently and folds the
//! per-chunk chapter lists into one curriculum:
//!
//! 1. join all chunk tasks, reassembling results by chunk index
//! 2. flatten in chunk order, then chapter order
//! 3. drop any chapter that duplicates an earlier one, dropped or not
//! 4. order (see [`ChapterOrdering`])
//! 5. renumber as "Chapter {i+1}: {name}"
//!
//! A failed or panicked chunk contributes zero chapters and never aborts its
//! siblings. Only an empty final list is fatal.

use super::chunker::TextChunk;
use super::generator::ChapterGenerator;
use super::numbering::{chapter_number, format_chapter_title, strip_chapter_prefix};
use super::{Chapter, Curriculum, CurriculumError, UNTITLED_MODULE};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// How chapters are ordered before renumbering
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChapterOrdering {
    /// Longest content first
    ContentLength,
    /// By "Chapter N:" number when every title carries one, else by content length
    #[default]
    Numbered,
}

impl fmt::Display for ChapterOrdering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChapterOrdering::ContentLength => write!(f, "content_length"),
            ChapterOrdering::Numbered => write!(f, "numbered"),
        }
    }
}

impl FromStr for ChapterOrdering {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "content_length" => Ok(ChapterOrdering::ContentLength),
            "numbered" => Ok(ChapterOrdering::Numbered),
            other => Err(format!("Unknown chapter ordering: {}", other)),
        }
    }
}

/// What one chunk contributed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkOutcome {
    Fulfilled { chapters: usize },
    ContributedEmpty { reason: String },
}

impl ChunkOutcome {
    pub fn is_fulfilled(&self) -> bool {
        matches!(self, ChunkOutcome::Fulfilled { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AssemblyPhase {
    ChunksDispatched,
    AllResolved,
    Deduplicated,
    Renumbered,
    Done,
    Failed,
}

/// Result of a successful assembly
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledCurriculum {
    /// First chapter title
    pub title: String,
    pub curriculum: Curriculum,
    /// One entry per input chunk, in chunk order
    pub outcomes: Vec<ChunkOutcome>,
}

pub struct CurriculumAssembler {
    generator: Arc<ChapterGenerator>,
    ordering: ChapterOrdering,
}

impl CurriculumAssembler {
    pub fn new(generator: Arc<ChapterGenerator>, ordering: ChapterOrdering) -> Self {
        Self { generator, ordering }
    }

    /// Generate and assemble a curriculum from ordered chunks
    ///
    /// Fails with [`CurriculumError::NoCurriculumGenerated`] when no chunk
    /// yields a chapter.
    pub async fn assemble(&self, chunks: Vec<TextChunk>) -> Result<AssembledCurriculum, CurriculumError> {
        let chunk_count = chunks.len();
        let mut tasks = JoinSet::new();

        for (index, chunk) in chunks.into_iter().enumerate() {
            let generator = Arc::clone(&self.generator);
            tasks.spawn(async move { (index, generator.try_generate(&chunk).await) });
        }
        log_phase(AssemblyPhase::ChunksDispatched, chunk_count);

        let mut per_chunk: Vec<Vec<Chapter>> = vec![Vec::new(); chunk_count];
        let mut outcomes: Vec<ChunkOutcome> = vec![
            ChunkOutcome::ContributedEmpty {
                reason: "task did not complete".to_string(),
            };
            chunk_count
        ];

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, Ok(chapters))) => {
                    debug!(chunk = index, chapters = chapters.len(), "Chunk resolved");
                    outcomes[index] = if chapters.is_empty() {
                        ChunkOutcome::ContributedEmpty {
                            reason: "no chapters".to_string(),
                        }
                    } else {
                        ChunkOutcome::Fulfilled {
                            chapters: chapters.len(),
                        }
                    };
                    per_chunk[index] = chapters;
                }
                Ok((index, Err(e))) => {
                    warn!(chunk = index, error = %e, "Chunk contributed no chapters");
                    outcomes[index] = ChunkOutcome::ContributedEmpty { reason: e.to_string() };
                }
                Err(e) => {
                    // Slot keeps its default outcome
                    warn!(error = %e, "Chunk task aborted");
                }
            }
        }
        log_phase(AssemblyPhase::AllResolved, chunk_count);

        let curriculum = match finalize_chapters(per_chunk, self.ordering) {
            Ok(curriculum) => curriculum,
            Err(e) => {
                log_phase(AssemblyPhase::Failed, 0);
                return Err(e);
            }
        };

        let title = module_title(&curriculum.chapters);
        log_phase(AssemblyPhase::Done, curriculum.chapters.len());
        info!(
            chunks = chunk_count,
            fulfilled = outcomes.iter().filter(|o| o.is_fulfilled()).count(),
            chapters = curriculum.chapters.len(),
            "Curriculum assembled"
        );

        Ok(AssembledCurriculum {
            title,
            curriculum,
            outcomes,
        })
    }
}

fn log_phase(phase: AssemblyPhase, count: usize) {
    debug!(phase = ?phase, count, "Assembly phase");
}

/// Fold per-chunk chapter lists (in chunk order) into a final curriculum
pub fn finalize_chapters(
    per_chunk: Vec<Vec<Chapter>>,
    ordering: ChapterOrdering,
) -> Result<Curriculum, CurriculumError> {
    let merged = merge_chunk_results(per_chunk);
    let mut chapters = dedup_chapters(merged);
    log_phase(AssemblyPhase::Deduplicated, chapters.len());

    if chapters.is_empty() {
        return Err(CurriculumError::NoCurriculumGenerated);
    }

    order_chapters(&mut chapters, ordering);
    renumber_chapters(&mut chapters);
    log_phase(AssemblyPhase::Renumbered, chapters.len());

    Ok(Curriculum::new(chapters))
}

/// Flatten in chunk order, then chapter order
pub fn merge_chunk_results(per_chunk: Vec<Vec<Chapter>>) -> Vec<Chapter> {
    per_chunk.into_iter().flatten().collect()
}

/// Keep a chapter only if it duplicates no earlier chapter
///
/// Two chapters are duplicates when their content is identical or their
/// titles match once any "Chapter N:" prefix is stripped. Earlier means any
/// earlier chapter in flattened order, including ones already dropped.
pub fn dedup_chapters(chapters: Vec<Chapter>) -> Vec<Chapter> {
    let mut seen_content: HashSet<String> = HashSet::new();
    let mut seen_names: HashSet<String> = HashSet::new();
    let mut kept = Vec::with_capacity(chapters.len());

    for chapter in chapters {
        let name = chapter.name().to_string();
        let duplicate = seen_content.contains(&chapter.content) || seen_names.contains(&name);
        seen_content.insert(chapter.content.clone());
        seen_names.insert(name);

        if duplicate {
            debug!(title = %chapter.title, "Dropping duplicate chapter");
            continue;
        }
        kept.push(chapter);
    }

    kept
}

/// Stable sort according to `ordering`
pub fn order_chapters(chapters: &mut [Chapter], ordering: ChapterOrdering) {
    let all_numbered = chapters.iter().all(|c| chapter_number(&c.title).is_some());

    match ordering {
        ChapterOrdering::Numbered if all_numbered => {
            chapters.sort_by_key(|c| chapter_number(&c.title).unwrap_or(u64::MAX));
        }
        _ => {
            chapters.sort_by_key(|c| std::cmp::Reverse(c.content.chars().count()));
        }
    }
}

/// Rewrite titles as "Chapter {i+1}: {name}"
pub fn renumber_chapters(chapters: &mut [Chapter]) {
    for (i, chapter) in chapters.iter_mut().enumerate() {
        let name = strip_chapter_prefix(&chapter.title).to_string();
        chapter.title = format_chapter_title(i + 1, &name);
    }
}

/// Module title for an assembled chapter list
pub fn module_title(chapters: &[Chapter]) -> String {
    chapters
        .first()
        .map(|c| c.title.clone())
        .unwrap_or_else(|| UNTITLED_MODULE.to_string())
}
