//! # Chapterize CLI (`chap`)
//!
//! The `chap` binary aligns an ebook's chapter structure with a speech
//! transcript of its audio narration and writes the resulting chapter
//! marks into an audio container.
//!
//! ## Usage
//!
//! ```bash
//! chap [--config ./chapterize.toml] <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `chap align <ebook> <transcript>` | Align chapters and print the matches |
//! | `chap tag <ebook> <transcript> <in> <out>` | Align and write chapter metadata via FFmpeg |
//! | `chap chapters <audio>` | List the chapter marks already in an audio file |
//!
//! ## Examples
//!
//! ```bash
//! # Inspect the alignment before touching any audio
//! chap align book.epub book.json
//!
//! # Use the embedding scorer with a lower acceptance bar
//! chap align book.epub book.json --scorer embedding --threshold 55
//!
//! # Skip front matter and start matching at chapter 3
//! chap tag book.epub book.json in.m4b out.m4b --start-chapter 3
//!
//! # Verify the written marks
//! chap chapters out.m4b
//! ```

mod align_cmd;
mod assemble;
mod chapters_cmd;
mod config;
mod embedding;
mod epub;
mod matcher;
mod media;
mod models;
mod normalize;
mod score;
mod tag_cmd;
mod transcript;
mod window;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Chapterize CLI — align audiobook narration with ebook chapters and
/// tag container chapter metadata.
#[derive(Parser)]
#[command(
    name = "chap",
    about = "Align audiobook narration with ebook chapters and tag container chapter metadata",
    version,
    long_about = "Chapterize extracts chapter titles and opening snippets from an EPUB, matches \
    them against a time-stamped speech transcript using fuzzy or embedding similarity, and \
    writes the resulting timestamps into an audio container's chapter metadata via FFmpeg."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults apply when the file is absent; CLI flags override file
    /// values.
    #[arg(long, global = true, default_value = "./chapterize.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Align ebook chapters against a transcript and print the matches.
    ///
    /// Chapters absent from the output were either beyond the end of
    /// the transcript or came after an early stop — a short list means
    /// alignment stopped early, not that it failed.
    Align {
        /// Path to the EPUB file.
        ebook: PathBuf,

        /// Path to the transcript JSON file (array of {start, end, text}).
        transcript: PathBuf,

        /// Consecutive transcript segments per comparison window.
        #[arg(long)]
        window_size: Option<usize>,

        /// Minimum similarity score (0-100) required to accept a match.
        #[arg(long)]
        threshold: Option<f64>,

        /// Scoring backend: `lexical` (fuzzy text) or `embedding` (cosine).
        #[arg(long)]
        scorer: Option<String>,

        /// 1-based chapter number to start matching from (skips front matter).
        #[arg(long, default_value_t = 1)]
        start_chapter: usize,

        /// Print the full alignment report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Align and write chapter metadata into a new audio file via FFmpeg.
    ///
    /// The input file is never modified; streams are copied into the
    /// output with the new chapter marks attached.
    Tag {
        /// Path to the EPUB file.
        ebook: PathBuf,

        /// Path to the transcript JSON file (array of {start, end, text}).
        transcript: PathBuf,

        /// Path to the input audio file (e.g. M4B).
        input: PathBuf,

        /// Path for the new, tagged audio file.
        output: PathBuf,

        /// Consecutive transcript segments per comparison window.
        #[arg(long)]
        window_size: Option<usize>,

        /// Minimum similarity score (0-100) required to accept a match.
        #[arg(long)]
        threshold: Option<f64>,

        /// Scoring backend: `lexical` (fuzzy text) or `embedding` (cosine).
        #[arg(long)]
        scorer: Option<String>,

        /// 1-based chapter number to start matching from (skips front matter).
        #[arg(long, default_value_t = 1)]
        start_chapter: usize,
    },

    /// List the chapter marks already present in an audio file.
    Chapters {
        /// Path to the audio file.
        audio: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Align {
            ebook,
            transcript,
            window_size,
            threshold,
            scorer,
            start_chapter,
            json,
        } => {
            config::apply_overrides(&mut cfg, window_size, threshold, scorer)?;
            align_cmd::run_align(&cfg, &ebook, &transcript, start_chapter, json).await?;
        }
        Commands::Tag {
            ebook,
            transcript,
            input,
            output,
            window_size,
            threshold,
            scorer,
            start_chapter,
        } => {
            config::apply_overrides(&mut cfg, window_size, threshold, scorer)?;
            tag_cmd::run_tag(&cfg, &ebook, &transcript, &input, &output, start_chapter).await?;
        }
        Commands::Chapters { audio } => {
            chapters_cmd::run_chapters(&audio)?;
        }
    }

    Ok(())
}
