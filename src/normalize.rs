//! Text canonicalization applied before any similarity scoring.
//!
//! Both sides of every comparison (chapter snippets and transcript
//! windows) pass through [`normalize_text`] exactly once, so scorers
//! always see the same canonical form: lowercase, no punctuation,
//! single-space separated.

use crate::models::Chapter;

/// Canonicalize text for comparison.
///
/// Lowercases, treats every non-alphanumeric character as a separator,
/// and collapses separator runs into single spaces. Leading and trailing
/// whitespace is removed.
pub fn normalize_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_alphanumeric() {
            out.extend(c.to_lowercase());
        } else if !out.is_empty() && !out.ends_with(' ') {
            out.push(' ');
        }
    }
    while out.ends_with(' ') {
        out.pop();
    }
    out
}

/// Normalize every snippet of every chapter in place, dropping snippets
/// that canonicalize to nothing (e.g. punctuation-only paragraphs).
pub fn normalize_chapters(chapters: &mut [Chapter]) {
    for chapter in chapters.iter_mut() {
        for snippet in &mut chapter.snippets {
            *snippet = normalize_text(snippet);
        }
        chapter.snippets.retain(|s| !s.is_empty());
    }
}
