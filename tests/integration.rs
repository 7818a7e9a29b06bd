use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn chap_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("chap");
    path
}

fn run_chap(dir: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = chap_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(dir.join("chapterize.toml").to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run chap binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

/// Build a minimal two-chapter EPUB on disk.
fn write_epub(path: &Path, chapters: &[(&str, &str)]) {
    let file = fs::File::create(path).unwrap();
    let mut writer = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default();

    writer.start_file("mimetype", options).unwrap();
    writer.write_all(b"application/epub+zip").unwrap();

    writer.start_file("META-INF/container.xml", options).unwrap();
    writer
        .write_all(
            br#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#,
        )
        .unwrap();

    let mut manifest = String::new();
    let mut spine = String::new();
    for (i, _) in chapters.iter().enumerate() {
        manifest.push_str(&format!(
            r#"<item id="ch{}" href="ch{}.xhtml" media-type="application/xhtml+xml"/>"#,
            i, i
        ));
        spine.push_str(&format!(r#"<itemref idref="ch{}"/>"#, i));
    }
    writer.start_file("OEBPS/content.opf", options).unwrap();
    writer
        .write_all(
            format!(
                r#"<?xml version="1.0"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="uid">
  <manifest>{}</manifest>
  <spine>{}</spine>
</package>"#,
                manifest, spine
            )
            .as_bytes(),
        )
        .unwrap();

    for (i, (title, paragraph)) in chapters.iter().enumerate() {
        writer
            .start_file(format!("OEBPS/ch{}.xhtml", i), options)
            .unwrap();
        writer
            .write_all(
                format!(
                    "<html><body><h1>{}</h1><p>{}</p></body></html>",
                    title, paragraph
                )
                .as_bytes(),
            )
            .unwrap();
    }

    writer.finish().unwrap();
}

fn write_transcript(path: &Path, texts: &[&str]) {
    let segments: Vec<serde_json::Value> = texts
        .iter()
        .enumerate()
        .map(|(i, text)| {
            serde_json::json!({
                "start": i as f64 * 2.0,
                "end": i as f64 * 2.0 + 2.0,
                "text": text,
            })
        })
        .collect();
    fs::write(path, serde_json::to_string_pretty(&segments).unwrap()).unwrap();
}

fn narrated_transcript() -> Vec<&'static str> {
    vec![
        "This is an audiobook production.",
        "Read by a narrator.",
        "Chapter one.",
        "It was a bright cold day in April.",
        "And the clocks were striking thirteen.",
        "Winston Smith hurried home.",
        "His chin nuzzled into his breast.",
        "More narration follows here.",
        "Chapter two.",
        "The hallway smelt of boiled cabbage.",
        "And old rag mats.",
        "At one end of it a coloured poster.",
        "Too large for indoor display.",
        "Had been tacked to the wall.",
    ]
}

fn book_chapters() -> Vec<(&'static str, &'static str)> {
    vec![
        (
            "Chapter One",
            "It was a bright cold day in April, and the clocks were striking thirteen. \
             Winston Smith hurried home, his chin nuzzled into his breast.",
        ),
        (
            "Chapter Two",
            "The hallway smelt of boiled cabbage and old rag mats. At one end of it a \
             coloured poster, too large for indoor display, had been tacked to the wall.",
        ),
    ]
}

fn setup(chapters: &[(&str, &str)], transcript: &[&str]) -> TempDir {
    let tmp = TempDir::new().unwrap();
    write_epub(&tmp.path().join("book.epub"), chapters);
    write_transcript(&tmp.path().join("book.json"), transcript);
    tmp
}

#[test]
fn align_matches_both_chapters() {
    let tmp = setup(&book_chapters(), &narrated_transcript());
    let dir = tmp.path();

    let (stdout, stderr, ok) = run_chap(
        dir,
        &[
            "align",
            dir.join("book.epub").to_str().unwrap(),
            dir.join("book.json").to_str().unwrap(),
        ],
    );

    assert!(ok, "align failed.\nstdout: {}\nstderr: {}", stdout, stderr);
    assert!(stdout.contains("Chapter One"), "stdout: {}", stdout);
    assert!(stdout.contains("Chapter Two"), "stdout: {}", stdout);
    assert!(stderr.contains("scorer: lexical"), "stderr: {}", stderr);
    assert!(!stdout.contains("stopped early"), "stdout: {}", stdout);
}

#[test]
fn align_json_report_is_monotonic_and_gated() {
    let tmp = setup(&book_chapters(), &narrated_transcript());
    let dir = tmp.path();

    let (stdout, stderr, ok) = run_chap(
        dir,
        &[
            "align",
            dir.join("book.epub").to_str().unwrap(),
            dir.join("book.json").to_str().unwrap(),
            "--json",
        ],
    );
    assert!(ok, "align failed.\nstderr: {}", stderr);

    let report: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let matches = report["matches"].as_array().unwrap();
    assert_eq!(matches.len(), 2);

    let w0 = matches[0]["window_index"].as_u64().unwrap();
    let w1 = matches[1]["window_index"].as_u64().unwrap();
    assert!(w0 < w1, "window indices not increasing: {} {}", w0, w1);

    for m in matches {
        assert!(m["score"].as_f64().unwrap() >= 65.0);
    }
    assert!(report["stop"].is_null());
}

#[test]
fn align_stops_early_when_transcript_diverges() {
    // the narration never reaches chapter two's text
    let transcript = vec![
        "Chapter one.",
        "It was a bright cold day in April.",
        "And the clocks were striking thirteen.",
        "Winston Smith hurried home.",
        "His chin nuzzled into his breast.",
        "Completely unrelated closing remarks.",
        "Thanks for listening to this preview.",
        "Goodbye and good night everyone.",
        "The end of the recording.",
        "Nothing further is narrated.",
    ];
    let tmp = setup(&book_chapters(), &transcript);
    let dir = tmp.path();

    let (stdout, stderr, ok) = run_chap(
        dir,
        &[
            "align",
            dir.join("book.epub").to_str().unwrap(),
            dir.join("book.json").to_str().unwrap(),
            "--json",
        ],
    );
    assert!(ok, "align failed.\nstderr: {}", stderr);

    let report: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(report["matches"].as_array().unwrap().len(), 1);
    assert_eq!(report["stop"]["title"].as_str().unwrap(), "Chapter Two");
}

#[test]
fn align_reports_exhaustion_for_short_transcript() {
    // 3 segments with the default window size of 5 -> zero windows
    let transcript = vec!["One.", "Two.", "Three."];
    let tmp = setup(&book_chapters(), &transcript);
    let dir = tmp.path();

    let (stdout, stderr, ok) = run_chap(
        dir,
        &[
            "align",
            dir.join("book.epub").to_str().unwrap(),
            dir.join("book.json").to_str().unwrap(),
            "--json",
        ],
    );
    assert!(ok, "align failed.\nstderr: {}", stderr);

    let report: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert!(report["matches"].as_array().unwrap().is_empty());
    assert_eq!(report["unmatched"].as_array().unwrap().len(), 2);
}

#[test]
fn align_start_chapter_skips_prefix() {
    let tmp = setup(&book_chapters(), &narrated_transcript());
    let dir = tmp.path();

    let (stdout, stderr, ok) = run_chap(
        dir,
        &[
            "align",
            dir.join("book.epub").to_str().unwrap(),
            dir.join("book.json").to_str().unwrap(),
            "--start-chapter",
            "2",
            "--json",
        ],
    );
    assert!(ok, "align failed.\nstderr: {}", stderr);

    let report: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let matches = report["matches"].as_array().unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0]["title"].as_str().unwrap(), "Chapter Two");
}

#[test]
fn align_reports_dropped_snippetless_chapters() {
    // the middle chapter's only paragraph normalizes to nothing
    let chapters = vec![
        book_chapters()[0],
        ("Ornament", "*** ~~~ ***"),
        book_chapters()[1],
    ];
    let tmp = setup(&chapters, &narrated_transcript());
    let dir = tmp.path();

    let (stdout, stderr, ok) = run_chap(
        dir,
        &[
            "align",
            dir.join("book.epub").to_str().unwrap(),
            dir.join("book.json").to_str().unwrap(),
            "--json",
        ],
    );
    assert!(ok, "align failed.\nstderr: {}", stderr);
    assert!(
        stderr.contains("dropping chapter 'Ornament'"),
        "stderr: {}",
        stderr
    );

    let report: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let titles: Vec<&str> = report["matches"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Chapter One", "Chapter Two"]);
}

#[test]
fn align_rejects_malformed_transcript() {
    let tmp = setup(&book_chapters(), &narrated_transcript());
    let dir = tmp.path();
    fs::write(dir.join("book.json"), "{ not json").unwrap();

    let (_stdout, stderr, ok) = run_chap(
        dir,
        &[
            "align",
            dir.join("book.epub").to_str().unwrap(),
            dir.join("book.json").to_str().unwrap(),
        ],
    );
    assert!(!ok);
    assert!(stderr.contains("transcript"), "stderr: {}", stderr);
}

#[test]
fn align_respects_config_file_overrides() {
    let tmp = setup(&book_chapters(), &narrated_transcript());
    let dir = tmp.path();
    // an impossible threshold makes even perfect matches stop the run
    fs::write(
        dir.join("chapterize.toml"),
        "[alignment]\nconfidence_threshold = 100.0\nwindow_size = 5\n",
    )
    .unwrap();

    let (stdout, stderr, ok) = run_chap(
        dir,
        &[
            "align",
            dir.join("book.epub").to_str().unwrap(),
            dir.join("book.json").to_str().unwrap(),
            "--json",
        ],
    );
    assert!(ok, "align failed.\nstderr: {}", stderr);

    let report: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    // exact-substring matches still score 100.0 and pass; anything
    // noisier stops the run, so either outcome keeps the gate honest
    for m in report["matches"].as_array().unwrap() {
        assert!(m["score"].as_f64().unwrap() >= 100.0);
    }
}

#[test]
fn chapters_command_fails_cleanly_without_file() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();

    let (_stdout, stderr, ok) = run_chap(
        dir,
        &["chapters", dir.join("missing.m4b").to_str().unwrap()],
    );
    assert!(!ok);
    assert!(!stderr.is_empty());
}
