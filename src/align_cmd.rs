//! `chap align` — run the alignment pipeline and print the matches.
//!
//! Results go to stdout; progress and diagnostics go to stderr so
//! stdout stays parseable for scripts.

use anyhow::{bail, Result};
use std::path::Path;

use crate::config::Config;
use crate::media::format_timestamp;
use crate::models::{AlignmentReport, Chapter, Segment};
use crate::{epub, matcher, normalize, score, transcript, window};

/// Full extraction-to-report pipeline shared by `align` and `tag`.
///
/// `start_chapter` is 1-based; chapters before it are skipped before
/// the matcher runs, so the cursor starts fresh at the first requested
/// chapter.
pub(crate) async fn run_pipeline(
    config: &Config,
    ebook: &Path,
    transcript_path: &Path,
    start_chapter: usize,
) -> Result<(AlignmentReport, Vec<Segment>)> {
    let mut chapters = epub::extract_chapters(ebook)?;
    eprintln!(
        "extracted {} chapters from {}",
        chapters.len(),
        ebook.display()
    );

    if start_chapter > 1 {
        let skip = start_chapter - 1;
        if skip >= chapters.len() {
            bail!(
                "--start-chapter {} is beyond the last chapter ({})",
                start_chapter,
                chapters.len()
            );
        }
        chapters.drain(..skip);
    }

    normalize::normalize_chapters(&mut chapters);
    for chapter in chapters.iter().filter(|c| c.snippets.is_empty()) {
        eprintln!(
            "dropping chapter '{}' (no usable snippet text)",
            chapter.title
        );
    }
    chapters.retain(|c: &Chapter| !c.snippets.is_empty());
    if chapters.is_empty() {
        bail!("No chapters with usable snippets after normalization");
    }

    let segments = transcript::load_transcript(transcript_path)?;
    let windows = window::build_windows(&segments, config.alignment.window_size);
    eprintln!(
        "built {} windows of {} segments from {} transcript segments",
        windows.len(),
        config.alignment.window_size,
        segments.len()
    );

    let scorer = score::create_scorer(config, &chapters, &windows).await?;
    eprintln!(
        "aligning {} chapters (scorer: {}, threshold: {})",
        chapters.len(),
        scorer.name(),
        config.alignment.confidence_threshold
    );

    let report = matcher::align_chapters(
        &chapters,
        &segments,
        &windows,
        scorer.as_ref(),
        config.alignment.confidence_threshold,
    )?;

    Ok((report, segments))
}

pub async fn run_align(
    config: &Config,
    ebook: &Path,
    transcript_path: &Path,
    start_chapter: usize,
    json: bool,
) -> Result<()> {
    let (report, _segments) = run_pipeline(config, ebook, transcript_path, start_chapter).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if report.matches.is_empty() {
        println!("No chapters matched.");
    }

    for (i, m) in report.matches.iter().enumerate() {
        println!("{}. [{:.1}] {}", i + 1, m.score, m.title);
        println!(
            "    {} -> {}  (window {})",
            format_timestamp(m.start_time),
            format_timestamp(m.end_time),
            m.window_index
        );
        println!("    snippet: \"{}\"", m.source_snippet);
    }

    print_outcome_summary(&report);
    Ok(())
}

/// Unmatched chapters and early-stop details, printed after the matches.
pub(crate) fn print_outcome_summary(report: &AlignmentReport) {
    if !report.unmatched.is_empty() {
        println!();
        println!(
            "{} chapter(s) had no remaining transcript to search:",
            report.unmatched.len()
        );
        for title in &report.unmatched {
            println!("    {}", title);
        }
    }

    if let Some(stop) = &report.stop {
        println!();
        println!(
            "Alignment stopped early at '{}' (best score {:.1} below threshold); later chapters were not attempted.",
            stop.title, stop.best_score
        );
    }
}
