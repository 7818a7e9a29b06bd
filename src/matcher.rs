//! Sequential chapter-to-transcript matcher.
//!
//! The core alignment algorithm: for each chapter in book order, search
//! the not-yet-consumed suffix of the window sequence for the
//! best-scoring `(snippet, window)` pair, accept or reject it against
//! the confidence threshold, and advance a forward-only cursor.
//!
//! # Invariants
//!
//! - **Monotonicity** — accepted matches have strictly increasing window
//!   indices; the cursor only moves forward and never resets, so no
//!   chapter can match a window at or before the previous chapter's.
//! - **Threshold gate** — no accepted match scores below the confidence
//!   threshold.
//! - **Early stop** — once a chapter's best score falls below the
//!   threshold the whole run terminates; committed matches are kept and
//!   later chapters are not attempted. Collapsed similarity means the
//!   transcript ended, is misaligned, or diverged, and further greedy
//!   search is unreliable.
//!
//! Exhaustion (cursor past the last window) and low confidence are
//! expected outcomes reported in the [`AlignmentReport`], never errors.
//! Only structural precondition violations (empty transcript, chapter
//! without snippets) fail the call.

use anyhow::{bail, Result};

use crate::models::{AlignmentReport, Chapter, ChapterMatch, EarlyStop, Segment, Window};
use crate::score::SimilarityScorer;

/// Best candidate found for one chapter's search space.
struct Candidate {
    score: f64,
    window_index: usize,
    snippet_index: usize,
}

/// Align `chapters` against the precomputed `windows`, in order.
///
/// `windows` must have been built over `segments` (the matcher maps a
/// committed window back to wall-clock times through the segment list).
/// Runs to completion or stops at the first low-confidence chapter;
/// either way the returned report carries every committed match in
/// chapter order with non-decreasing start times.
///
/// # Errors
///
/// Fails fast on malformed input: no chapters, a chapter with zero
/// snippets, an empty transcript, unordered segments, or a segment with
/// a non-positive duration. An empty `windows` slice is not an error —
/// every chapter is then reported as unmatched.
pub fn align_chapters(
    chapters: &[Chapter],
    segments: &[Segment],
    windows: &[Window],
    scorer: &dyn SimilarityScorer,
    confidence_threshold: f64,
) -> Result<AlignmentReport> {
    validate_inputs(chapters, segments)?;

    let mut report = AlignmentReport::default();
    let mut cursor = 0usize;

    for chapter in chapters {
        if cursor >= windows.len() {
            report.unmatched.push(chapter.title.clone());
            continue;
        }

        let best = best_candidate(chapter, &windows[cursor..], scorer)?;

        if best.score < confidence_threshold {
            report.stop = Some(EarlyStop {
                title: chapter.title.clone(),
                best_score: best.score,
            });
            break;
        }

        let window = &windows[best.window_index];
        report.matches.push(ChapterMatch {
            title: chapter.title.clone(),
            score: best.score,
            start_time: segments[window.start_segment].start,
            end_time: segments[window.end_segment].end,
            window_index: window.index,
            matched_text: window.text.clone(),
            source_snippet: chapter.snippets[best.snippet_index].clone(),
        });
        cursor = best.window_index + 1;
    }

    Ok(report)
}

/// Best `(snippet, window, score)` triple over all of the chapter's
/// snippets and all windows in the search space.
///
/// Ties are broken by earliest window index, then by earlier snippet in
/// the candidate list. The iteration order (snippets outer, windows
/// inner) plus the explicit window comparison yields exactly that:
/// an equal score only displaces the incumbent when it sits on an
/// earlier window.
fn best_candidate(
    chapter: &Chapter,
    search_space: &[Window],
    scorer: &dyn SimilarityScorer,
) -> Result<Candidate> {
    let mut best: Option<Candidate> = None;

    for (snippet_index, snippet) in chapter.snippets.iter().enumerate() {
        for window in search_space {
            let score = scorer.score(snippet, window)?;
            let replace = match &best {
                None => true,
                Some(b) => score > b.score || (score == b.score && window.index < b.window_index),
            };
            if replace {
                best = Some(Candidate {
                    score,
                    window_index: window.index,
                    snippet_index,
                });
            }
        }
    }

    // search_space and snippets are both non-empty here (validated)
    best.ok_or_else(|| anyhow::anyhow!("Empty candidate search space"))
}

fn validate_inputs(chapters: &[Chapter], segments: &[Segment]) -> Result<()> {
    if chapters.is_empty() {
        bail!("No chapters to align");
    }
    for chapter in chapters {
        if chapter.snippets.is_empty() {
            bail!("Chapter '{}' has no snippets", chapter.title);
        }
    }
    if segments.is_empty() {
        bail!("Transcript contains no segments");
    }
    for segment in segments {
        if segment.start >= segment.end {
            bail!(
                "Segment {} has a non-positive duration ({} >= {})",
                segment.index,
                segment.start,
                segment.end
            );
        }
    }
    for pair in segments.windows(2) {
        if pair[1].start < pair[0].start {
            bail!(
                "Transcript segments are not ordered by start time (segment {})",
                pair[1].index
            );
        }
    }
    Ok(())
}
