//! Similarity scoring contract and the lexical fuzzy backend.
//!
//! The matcher is agnostic to how similarity is measured; it only
//! requires a [`SimilarityScorer`] that returns scores on a 0-100 scale,
//! deterministic for fixed inputs and comparable across calls within one
//! run. Two backends are provided:
//!
//! - **lexical** ([`LexicalScorer`]) — partial-ratio fuzzy matching: the
//!   snippet is slid across the window text and scored by normalized
//!   edit distance against the best-aligned slice.
//! - **embedding** ([`crate::embedding::EmbeddingScorer`]) — cosine
//!   similarity of precomputed embedding vectors, rescaled to 0-100.
//!
//! Use [`create_scorer`] to instantiate the backend selected by
//! configuration.

use anyhow::{bail, Result};

use crate::config::Config;
use crate::embedding::EmbeddingScorer;
use crate::models::{Chapter, Window};

/// Interface every scoring backend implements.
///
/// Inputs are expected to be pre-normalized (see [`crate::normalize`]);
/// scorers never canonicalize text themselves.
pub trait SimilarityScorer: Send + Sync {
    /// Backend name for diagnostics (e.g. `"lexical"`).
    fn name(&self) -> &str;

    /// Similarity of `snippet` against one window, in `[0, 100]`.
    /// Higher is more similar.
    fn score(&self, snippet: &str, window: &Window) -> Result<f64>;
}

/// Create the scorer selected by `config.scoring.backend`.
///
/// The embedding backend embeds every window and every chapter snippet
/// up front, so all network calls happen here; the matcher itself never
/// blocks on I/O.
pub async fn create_scorer(
    config: &Config,
    chapters: &[Chapter],
    windows: &[Window],
) -> Result<Box<dyn SimilarityScorer>> {
    match config.scoring.backend.as_str() {
        "lexical" => Ok(Box::new(LexicalScorer)),
        "embedding" => Ok(Box::new(
            EmbeddingScorer::prepare(&config.embedding, chapters, windows).await?,
        )),
        other => bail!(
            "Unknown scoring backend: '{}'. Use lexical or embedding.",
            other
        ),
    }
}

// ============ Lexical backend ============

/// Partial-ratio fuzzy matcher.
///
/// Scores a snippet against the best-aligned same-length slice of the
/// window text, so a snippet that appears verbatim anywhere inside a
/// window scores 100 regardless of the surrounding speech.
pub struct LexicalScorer;

impl SimilarityScorer for LexicalScorer {
    fn name(&self) -> &str {
        "lexical"
    }

    fn score(&self, snippet: &str, window: &Window) -> Result<f64> {
        Ok(partial_ratio(snippet, &window.text))
    }
}

/// Best normalized edit-distance similarity of `needle` against any
/// slice of `haystack` starting at a word boundary.
///
/// Returns a value in `[0, 100]`. Empty inputs score 0. When the needle
/// is at least as long as the haystack the two are compared directly.
pub fn partial_ratio(needle: &str, haystack: &str) -> f64 {
    let n: Vec<char> = needle.chars().collect();
    let h: Vec<char> = haystack.chars().collect();

    if n.is_empty() || h.is_empty() {
        return 0.0;
    }
    if n.len() >= h.len() {
        return similarity(&n, &h);
    }

    let mut best = similarity(&n, &h[..n.len()]);
    for i in 1..h.len() {
        // normalized text separates words with single spaces
        if h[i - 1] != ' ' {
            continue;
        }
        if best >= 100.0 {
            break;
        }
        let end = (i + n.len()).min(h.len());
        best = best.max(similarity(&n, &h[i..end]));
    }
    best
}

/// Levenshtein similarity of two char slices on the 0-100 scale.
fn similarity(a: &[char], b: &[char]) -> f64 {
    let longest = a.len().max(b.len());
    if longest == 0 {
        return 100.0;
    }
    let distance = levenshtein(a, b);
    100.0 * (1.0 - distance as f64 / longest as f64)
}

/// Two-row Levenshtein edit distance.
fn levenshtein(a: &[char], b: &[char]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitute = prev[j] + usize::from(ca != cb);
            curr[j + 1] = substitute.min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}
