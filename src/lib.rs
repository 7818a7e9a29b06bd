//! # Chapterize
//!
//! Align audiobook narration with ebook chapter structure and tag the
//! resulting timestamps into container chapter metadata.
//!
//! Chapterize extracts a title and an opening-paragraph snippet for
//! every chapter of an EPUB, slides fixed-size windows over a
//! time-stamped speech transcript, and greedily matches chapters to
//! windows in order using noisy text-similarity scores — never moving
//! backward in time, and stopping once confidence collapses. Matched
//! time ranges can then be written into an M4B (or any FFmpeg-supported
//! container) as chapter marks.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────┐   ┌────────────┐   ┌──────────┐   ┌──────────┐
//! │  EPUB  │──▶│  Chapters  │──▶│          │   │          │
//! └────────┘   │ + snippets │   │ Matcher  │──▶│ Assemble │──▶ ffmpeg
//! ┌────────┐   ├────────────┤   │ (cursor, │   │ (marks)  │
//! │ JSON   │──▶│  Segments  │──▶│ scorer)  │   └──────────┘
//! │ transcript  │ → Windows │   └──────────┘
//! └────────┘   └────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! chap align book.epub book.json                 # print chapter matches
//! chap tag book.epub book.json in.m4b out.m4b    # write chapter marks
//! chap chapters out.m4b                          # list container chapters
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`normalize`] | Text canonicalization |
//! | [`epub`] | EPUB chapter snippet extraction |
//! | [`transcript`] | Transcript JSON loading |
//! | [`window`] | Fixed-size transcript windows |
//! | [`score`] | Similarity scorer contract + lexical backend |
//! | [`embedding`] | OpenAI embedding provider + embedding scorer |
//! | [`matcher`] | Sequential chapter-to-transcript matcher |
//! | [`assemble`] | Chapter boundary reconciliation |
//! | [`media`] | FFmpeg/ffprobe invocation |

pub mod assemble;
pub mod config;
pub mod embedding;
pub mod epub;
pub mod matcher;
pub mod media;
pub mod models;
pub mod normalize;
pub mod score;
pub mod transcript;
pub mod window;
