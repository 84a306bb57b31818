//! "Chapter N:" title prefix handling
//!
//! Grammar (case-insensitive, anchored after leading whitespace):
//!
//! ```text
//! prefix := "Chapter" WS+ DIGITS ":" WS*
//! ```
//!
//! Everything after the prefix, trimmed, is the chapter name.

/// A parsed "Chapter N:" prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChapterPrefix<'a> {
    pub number: u64,
    pub name: &'a str,
}

const KEYWORD: &str = "chapter";

/// Parse a leading "Chapter N:" prefix, if present
pub fn parse_chapter_prefix(title: &str) -> Option<ChapterPrefix<'_>> {
    let rest = title.trim_start();

    let keyword = rest.get(..KEYWORD.len())?;
    if !keyword.eq_ignore_ascii_case(KEYWORD) {
        return None;
    }
    let rest = &rest[KEYWORD.len()..];

    let after_ws = rest.trim_start();
    if after_ws.len() == rest.len() {
        // "Chapter" must be followed by at least one whitespace character
        return None;
    }

    let digit_len = after_ws
        .bytes()
        .take_while(|b| b.is_ascii_digit())
        .count();
    if digit_len == 0 {
        return None;
    }
    let name = after_ws[digit_len..].strip_prefix(':')?;

    // Digits only, so the one possible failure is overflow
    let number = after_ws[..digit_len].parse::<u64>().unwrap_or(u64::MAX);

    Some(ChapterPrefix {
        number,
        name: name.trim(),
    })
}

/// Chapter number encoded in the title, if any
pub fn chapter_number(title: &str) -> Option<u64> {
    parse_chapter_prefix(title).map(|prefix| prefix.number)
}

/// Title without its "Chapter N:" prefix, trimmed
pub fn strip_chapter_prefix(title: &str) -> &str {
    match parse_chapter_prefix(title) {
        Some(prefix) => prefix.name,
        None => title.trim(),
    }
}

pub fn format_chapter_title(number: usize, name: &str) -> String {
    format!("Chapter {}: {}", number, name)
}
