//! FFmpeg and ffprobe invocation for container chapter metadata.
//!
//! The crate never parses or mutates audio containers itself: reading
//! durations and existing chapter marks goes through `ffprobe`, and
//! writing new marks goes through `ffmpeg -map_chapters` with a
//! generated `;FFMETADATA1` document handed over in a temp file. Audio
//! streams are stream-copied, never re-encoded.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::io::Write;
use std::path::Path;
use std::process::Command;

use crate::models::ChapterMark;

/// Total duration of a media file in seconds, via ffprobe.
pub fn total_duration(path: &Path) -> Result<f64> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(path)
        .output()
        .with_context(|| "Failed to execute 'ffprobe'. Is FFmpeg installed and in PATH?")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("ffprobe failed: {}", stderr.trim());
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    stdout
        .trim()
        .parse::<f64>()
        .with_context(|| format!("Unexpected ffprobe duration output: '{}'", stdout.trim()))
}

#[derive(Debug, Deserialize)]
struct ProbeChapters {
    #[serde(default)]
    chapters: Vec<ProbeChapter>,
}

#[derive(Debug, Deserialize)]
struct ProbeChapter {
    start_time: String,
    end_time: String,
    #[serde(default)]
    tags: ProbeTags,
}

#[derive(Debug, Deserialize, Default)]
struct ProbeTags {
    #[serde(default)]
    title: Option<String>,
}

/// Chapter marks already present in a media file, via ffprobe.
pub fn read_chapters(path: &Path) -> Result<Vec<ChapterMark>> {
    let output = Command::new("ffprobe")
        .args(["-v", "error", "-print_format", "json", "-show_chapters"])
        .arg(path)
        .output()
        .with_context(|| "Failed to execute 'ffprobe'. Is FFmpeg installed and in PATH?")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("ffprobe failed: {}", stderr.trim());
    }

    let probe: ProbeChapters = serde_json::from_slice(&output.stdout)
        .context("Failed to parse ffprobe chapter output")?;

    probe
        .chapters
        .into_iter()
        .map(|c| {
            Ok(ChapterMark {
                title: c.tags.title.unwrap_or_else(|| "<no title>".to_string()),
                start: c
                    .start_time
                    .parse()
                    .with_context(|| format!("Bad chapter start time: {}", c.start_time))?,
                end: c
                    .end_time
                    .parse()
                    .with_context(|| format!("Bad chapter end time: {}", c.end_time))?,
            })
        })
        .collect()
}

/// Render the `;FFMETADATA1` chapter block consumed by
/// `ffmpeg -map_chapters`, with millisecond timebase.
pub fn render_ffmetadata(marks: &[ChapterMark]) -> String {
    let mut out = String::from(";FFMETADATA1\n");
    for mark in marks {
        out.push_str("[CHAPTER]\n");
        out.push_str("TIMEBASE=1/1000\n");
        out.push_str(&format!("START={}\n", (mark.start * 1000.0).round() as i64));
        out.push_str(&format!("END={}\n", (mark.end * 1000.0).round() as i64));
        out.push_str(&format!("title={}\n", escape_metadata(&mark.title)));
    }
    out
}

/// `=`, `;`, `#`, `\` and newline are special in ffmetadata values.
fn escape_metadata(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '=' | ';' | '#' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            '\n' => out.push_str("\\\n"),
            _ => out.push(c),
        }
    }
    out
}

/// Write `marks` into a copy of `input` at `output` via FFmpeg.
///
/// Streams are copied (`-codec copy`); only the chapter metadata
/// changes. Cover-art video streams are carried over when present.
pub fn write_chapters(input: &Path, output: &Path, marks: &[ChapterMark]) -> Result<()> {
    let mut meta = tempfile::NamedTempFile::new()
        .context("Failed to create temporary metadata file")?;
    meta.write_all(render_ffmetadata(marks).as_bytes())
        .context("Failed to write temporary metadata file")?;
    meta.flush()
        .context("Failed to flush temporary metadata file")?;

    let result = Command::new("ffmpeg")
        .arg("-i")
        .arg(input)
        .arg("-i")
        .arg(meta.path())
        .args([
            "-map",
            "0:a",
            "-map",
            "0:v?",
            "-map_chapters",
            "1",
            "-codec",
            "copy",
            "-y",
        ])
        .arg(output)
        .output()
        .with_context(|| "Failed to execute 'ffmpeg'. Is FFmpeg installed and in PATH?")?;

    if !result.status.success() {
        let stderr = String::from_utf8_lossy(&result.stderr);
        bail!("ffmpeg chapter tagging failed: {}", stderr.trim());
    }

    Ok(())
}

/// Format seconds as `HH:MM:SS` for chapter listings.
pub fn format_timestamp(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let h = total / 3600;
    let m = (total % 3600) / 60;
    let s = total % 60;
    format!("{:02}:{:02}:{:02}", h, m, s)
}
