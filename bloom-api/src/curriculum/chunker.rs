//! Splits source text into bounded-length chunks
//!
//! Lengths are counted in characters (Unicode scalar values), so a chunk
//! boundary never falls inside a character.

/// Default maximum chunk length in characters
pub const DEFAULT_CHUNK_MAX_CHARS: usize = 4000;

/// A contiguous slice of source text, at most the configured length
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk(String);

impl TextChunk {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn char_len(&self) -> usize {
        self.0.chars().count()
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// Partition `text` into ordered, non-overlapping chunks of at most `max_chars`
///
/// Concatenating the result yields `text` exactly. Input no longer than
/// `max_chars` (including the empty string) yields a single chunk.
/// A `max_chars` of zero is treated as one.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<TextChunk> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut count = 0;

    for (byte_index, _) in text.char_indices() {
        if count == max_chars {
            chunks.push(TextChunk::new(&text[start..byte_index]));
            start = byte_index;
            count = 0;
        }
        count += 1;
    }
    chunks.push(TextChunk::new(&text[start..]));

    chunks
}

/// Chunk several caller-supplied texts, keeping their order
pub fn chunk_texts<I, S>(texts: I, max_chars: usize) -> Vec<TextChunk>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    texts
        .into_iter()
        .flat_map(|text| chunk_text(text.as_ref(), max_chars))
        .collect()
}
