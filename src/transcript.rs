//! Transcript loading and validation.
//!
//! Reads the JSON segment dump produced by the transcription step: an
//! array of `{start, end, text}` objects in time order (the format
//! faster-whisper pipelines conventionally emit). Segments are indexed,
//! normalized once, and validated before any matching happens.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::models::Segment;
use crate::normalize::normalize_text;

#[derive(Debug, Deserialize)]
struct RawSegment {
    start: f64,
    end: f64,
    text: String,
}

/// Load and validate a transcript JSON file.
pub fn load_transcript(path: &Path) -> Result<Vec<Segment>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read transcript file: {}", path.display()))?;
    parse_transcript(&content)
}

/// Parse a transcript from its JSON text.
///
/// # Errors
///
/// Fails on an empty segment list, a segment with `start >= end`, or
/// segments out of start-time order — these violate the matcher's
/// structural preconditions and are surfaced before alignment begins.
pub fn parse_transcript(json: &str) -> Result<Vec<Segment>> {
    let raw: Vec<RawSegment> =
        serde_json::from_str(json).context("Failed to parse transcript JSON")?;

    if raw.is_empty() {
        bail!("Transcript contains no segments");
    }

    let mut segments = Vec::with_capacity(raw.len());
    let mut prev_start = f64::NEG_INFINITY;

    for (index, seg) in raw.into_iter().enumerate() {
        if seg.start >= seg.end {
            bail!(
                "Transcript segment {} has start {} >= end {}",
                index,
                seg.start,
                seg.end
            );
        }
        if seg.start < prev_start {
            bail!(
                "Transcript segment {} starts before its predecessor ({} < {})",
                index,
                seg.start,
                prev_start
            );
        }
        prev_start = seg.start;

        let normalized_text = normalize_text(&seg.text);
        segments.push(Segment {
            index,
            start: seg.start,
            end: seg.end,
            text: seg.text.trim().to_string(),
            normalized_text,
        });
    }

    Ok(segments)
}
