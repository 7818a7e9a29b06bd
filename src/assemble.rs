//! Chapter boundary reconciliation.
//!
//! Converts the matcher's committed matches into the final chapter
//! marks written to a container. A matched window rarely ends exactly
//! where the next chapter begins, so each mark's end is snapped to the
//! next mark's start; the last chapter extends to the container's total
//! duration when known. Pure post-processing — which windows matched is
//! never altered.

use crate::models::{ChapterMark, ChapterMatch};

/// Build contiguous chapter marks from accepted matches.
///
/// `total_duration` (seconds), when present, becomes the last chapter's
/// end time if it lies beyond that chapter's start.
pub fn assemble_marks(matches: &[ChapterMatch], total_duration: Option<f64>) -> Vec<ChapterMark> {
    let mut marks: Vec<ChapterMark> = matches
        .iter()
        .map(|m| ChapterMark {
            title: m.title.clone(),
            start: m.start_time,
            end: m.end_time,
        })
        .collect();

    for i in 0..marks.len() {
        if i + 1 < marks.len() {
            marks[i].end = marks[i + 1].start;
        } else if let Some(total) = total_duration {
            if total > marks[i].start {
                marks[i].end = total;
            }
        }
    }

    marks
}
