//! `chap chapters` — list the chapter marks already in an audio file.

use anyhow::Result;
use std::path::Path;

use crate::media::{self, format_timestamp};

pub fn run_chapters(audio: &Path) -> Result<()> {
    let marks = media::read_chapters(audio)?;

    if marks.is_empty() {
        println!("No chapters found in {}", audio.display());
        return Ok(());
    }

    for mark in &marks {
        println!(
            "{} -> {}   {}",
            format_timestamp(mark.start),
            format_timestamp(mark.end),
            mark.title
        );
    }
    Ok(())
}
