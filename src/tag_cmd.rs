//! `chap tag` — align and write chapter metadata into a new audio file.
//!
//! Runs the same pipeline as `chap align`, reconciles chapter
//! boundaries against the container's total duration, and hands the
//! marks to FFmpeg. The input file is never modified; a tagged copy is
//! written to the output path.

use anyhow::{bail, Result};
use std::path::Path;

use crate::align_cmd;
use crate::config::Config;
use crate::media::format_timestamp;
use crate::{assemble, media};

pub async fn run_tag(
    config: &Config,
    ebook: &Path,
    transcript_path: &Path,
    input: &Path,
    output: &Path,
    start_chapter: usize,
) -> Result<()> {
    let (report, _segments) =
        align_cmd::run_pipeline(config, ebook, transcript_path, start_chapter).await?;

    if report.matches.is_empty() {
        bail!("No chapters matched; nothing to tag");
    }

    align_cmd::print_outcome_summary(&report);

    let duration = media::total_duration(input)?;
    let marks = assemble::assemble_marks(&report.matches, Some(duration));

    for mark in &marks {
        eprintln!(
            "  chapter '{}'  {} -> {}",
            mark.title,
            format_timestamp(mark.start),
            format_timestamp(mark.end)
        );
    }

    media::write_chapters(input, output, &marks)?;
    println!("Tagged {} chapters into {}", marks.len(), output.display());
    Ok(())
}
