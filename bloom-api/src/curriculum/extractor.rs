//! PDF text extraction
//!
//! Wraps `pdf-extract`. The result is truncated to a character budget so a
//! whole textbook never turns into an unbounded number of completion calls.

use super::CurriculumError;
use tracing::debug;

/// Default extraction budget in characters
pub const DEFAULT_EXTRACTION_CHAR_BUDGET: usize = 5000;

/// Text extracted from a PDF
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    /// Trimmed text, at most `char_budget` characters
    pub text: String,
    /// Pages that produced any text
    pub page_count: usize,
    /// Whether the budget cut the text short
    pub truncated: bool,
}

/// Extract plain text from PDF bytes
///
/// `char_budget` of `None` keeps the full text. Fails with
/// [`CurriculumError::ExtractionFailed`] when the document cannot be parsed
/// or contains no text once trimmed.
pub fn extract_pdf_text(
    pdf_bytes: &[u8],
    char_budget: Option<usize>,
) -> Result<ExtractedText, CurriculumError> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(pdf_bytes)
        .map_err(|e| CurriculumError::ExtractionFailed(format!("Invalid PDF file: {}", e)))?;

    let pages: Vec<&str> = pages
        .iter()
        .map(|page| page.trim())
        .filter(|page| !page.is_empty())
        .collect();
    let page_count = pages.len();

    let raw = pages.join("\n\n");
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CurriculumError::ExtractionFailed(
            "No text extracted from PDF".to_string(),
        ));
    }

    let (text, truncated) = match char_budget {
        Some(budget) => truncate_chars(trimmed, budget),
        None => (trimmed, false),
    };

    debug!(
        page_count,
        chars = text.chars().count(),
        truncated,
        "Extracted PDF text"
    );

    Ok(ExtractedText {
        text: text.to_string(),
        page_count,
        truncated,
    })
}

/// Extract on the blocking pool; a panic inside the PDF parser becomes an extraction failure
pub async fn extract_pdf_text_blocking(
    pdf_bytes: Vec<u8>,
    char_budget: Option<usize>,
) -> Result<ExtractedText, CurriculumError> {
    tokio::task::spawn_blocking(move || extract_pdf_text(&pdf_bytes, char_budget))
        .await
        .map_err(|e| CurriculumError::ExtractionFailed(format!("PDF parser aborted: {}", e)))?
}

/// First `budget` characters of `text`, and whether anything was cut
pub fn truncate_chars(text: &str, budget: usize) -> (&str, bool) {
    match text.char_indices().nth(budget) {
        Some((byte_index, _)) => (&text[..byte_index], true),
        None => (text, false),
    }
}
