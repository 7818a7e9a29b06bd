//! Core data types used throughout the alignment pipeline.
//!
//! These types represent the chapters, transcript segments, comparison
//! windows, and matches that flow from extraction through alignment to
//! the final container chapter marks.

use serde::{Deserialize, Serialize};

/// A structural unit of the source book, with candidate text snippets
/// used as matching queries against the transcript.
#[derive(Debug, Clone)]
pub struct Chapter {
    pub title: String,
    /// Candidate snippets, shortest/most-specific first, longest last.
    pub snippets: Vec<String>,
}

/// One time-stamped unit of transcribed speech.
#[derive(Debug, Clone)]
pub struct Segment {
    pub index: usize,
    /// Start time in seconds.
    pub start: f64,
    /// End time in seconds. Invariant: `start < end`.
    pub end: f64,
    pub text: String,
    /// Canonicalized text, computed once before matching.
    pub normalized_text: String,
}

/// A contiguous run of segments concatenated into one comparable span.
#[derive(Debug, Clone)]
pub struct Window {
    pub index: usize,
    /// First covered segment index (inclusive).
    pub start_segment: usize,
    /// Last covered segment index (inclusive).
    pub end_segment: usize,
    /// Normalized texts of the covered segments, joined with single spaces.
    pub text: String,
}

/// A committed chapter-to-time-range match.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChapterMatch {
    pub title: String,
    /// Similarity score on the 0-100 scale.
    pub score: f64,
    pub start_time: f64,
    pub end_time: f64,
    pub window_index: usize,
    pub matched_text: String,
    pub source_snippet: String,
}

/// Why an alignment run terminated before its last chapter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EarlyStop {
    /// Title of the chapter whose best score fell below the threshold.
    pub title: String,
    pub best_score: f64,
}

/// Outcome of one alignment run.
///
/// `matches` is in chapter order with non-decreasing start times.
/// Chapters attempted after an early stop are simply absent; a
/// shorter-than-expected list means the run stopped early, not that it
/// failed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AlignmentReport {
    pub matches: Vec<ChapterMatch>,
    /// Titles whose candidate search space was empty (cursor already
    /// past the last window).
    pub unmatched: Vec<String>,
    /// Present when similarity collapsed below the confidence threshold
    /// and the run aborted.
    pub stop: Option<EarlyStop>,
}

/// A final chapter boundary, as written to (or read from) an audio
/// container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterMark {
    pub title: String,
    /// Start time in seconds.
    pub start: f64,
    /// End time in seconds.
    pub end: f64,
}
