//! Fixed-size overlapping transcript windows.
//!
//! A short chapter snippet rarely lines up with a single transcript
//! segment, so segments are grouped into overlapping windows of
//! `window_size` consecutive segments and the scorer compares snippets
//! against whole windows. Windows are computed once per run and shared
//! read-only across every chapter's search.
//!
//! # Algorithm
//!
//! For each starting index `i` in `0..=len - window_size`, emit one
//! window covering segments `[i, i + window_size - 1]`, its text being
//! the segments' normalized texts joined with single spaces.
//!
//! # Guarantees
//!
//! - Exactly `max(0, N - window_size + 1)` windows for `N` segments.
//! - Window indices are contiguous: `0, 1, 2, …`.
//! - Every window covers exactly `window_size` segments; truncated
//!   boundary windows are never emitted.
//! - Fewer segments than `window_size` yields an empty result, which
//!   the matcher treats as "no match possible", not as an error.

use crate::models::{Segment, Window};

/// Build the ordered window sequence over `segments`.
///
/// `window_size` must be at least 1; configuration validation enforces
/// this before the pipeline runs.
pub fn build_windows(segments: &[Segment], window_size: usize) -> Vec<Window> {
    if window_size == 0 || segments.len() < window_size {
        return Vec::new();
    }

    let count = segments.len() - window_size + 1;
    let mut windows = Vec::with_capacity(count);

    for start in 0..count {
        let end = start + window_size - 1;
        let mut text = String::new();
        for segment in &segments[start..=end] {
            if segment.normalized_text.is_empty() {
                continue;
            }
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(&segment.normalized_text);
        }
        windows.push(Window {
            index: start,
            start_segment: start,
            end_segment: end,
            text,
        });
    }

    windows
}
