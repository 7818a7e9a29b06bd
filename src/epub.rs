//! EPUB chapter snippet extraction.
//!
//! Walks the EPUB package in spine order and produces one [`Chapter`]
//! per `h1`/`h2`/`h3` heading, using the first non-empty paragraph after
//! the heading as the snippet source. Parsing is streaming: the archive
//! is opened with `zip` and each document is read with `quick-xml`
//! events, with zip-entry reads bounded for zip-bomb protection.
//!
//! Snippet candidates per chapter, shortest/most-specific first:
//! 1. the opening words of the paragraph;
//! 2. the fuller paragraph, capped in length.

use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use crate::models::Chapter;

/// Maximum decompressed bytes to read from a single ZIP entry.
const MAX_ENTRY_BYTES: u64 = 50 * 1024 * 1024;
/// Word count of the short, most-specific snippet candidate.
const SNIPPET_OPENING_WORDS: usize = 12;
/// Word cap of the fuller snippet candidate.
const SNIPPET_MAX_WORDS: usize = 60;

/// Extract chapters from an EPUB file on disk.
pub fn extract_chapters(path: &Path) -> Result<Vec<Chapter>> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read EPUB file: {}", path.display()))?;
    extract_chapters_from_bytes(&bytes)
}

/// Extract chapters from EPUB bytes.
///
/// Resolves `META-INF/container.xml` to the OPF package document, walks
/// the spine's XHTML documents in reading order, and collects headings
/// with their first following paragraph.
pub fn extract_chapters_from_bytes(bytes: &[u8]) -> Result<Vec<Chapter>> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .context("Failed to open EPUB as a ZIP archive")?;

    let opf_path = rootfile_path(&mut archive)?;
    let documents = spine_documents(&mut archive, &opf_path)?;

    let mut chapters = Vec::new();
    for name in documents {
        // spine entries can reference files missing from the archive
        let xml = match read_entry(&mut archive, &name) {
            Ok(xml) => xml,
            Err(_) => continue,
        };
        collect_chapters(&xml, &mut chapters)?;
    }

    if chapters.is_empty() {
        bail!("No chapter headings found in EPUB");
    }
    Ok(chapters)
}

fn read_entry(
    archive: &mut zip::ZipArchive<std::io::Cursor<&[u8]>>,
    name: &str,
) -> Result<Vec<u8>> {
    let mut entry = archive
        .by_name(name)
        .with_context(|| format!("EPUB entry not found: {}", name))?;
    let mut out = Vec::new();
    entry
        .take(MAX_ENTRY_BYTES)
        .read_to_end(&mut out)
        .with_context(|| format!("Failed to read EPUB entry: {}", name))?;
    if out.len() as u64 >= MAX_ENTRY_BYTES {
        bail!("EPUB entry {} exceeds size limit ({} bytes)", name, MAX_ENTRY_BYTES);
    }
    Ok(out)
}

fn attribute_value(e: &quick_xml::events::BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes().filter_map(|a| a.ok()).find_map(|a| {
        if a.key.as_ref() == key {
            Some(
                a.unescape_value()
                    .map(|v| v.into_owned())
                    .unwrap_or_else(|_| String::from_utf8_lossy(&a.value).into_owned()),
            )
        } else {
            None
        }
    })
}

/// Locate the OPF package document via `META-INF/container.xml`.
fn rootfile_path(archive: &mut zip::ZipArchive<std::io::Cursor<&[u8]>>) -> Result<String> {
    let xml = read_entry(archive, "META-INF/container.xml")?;
    let mut reader = quick_xml::Reader::from_reader(xml.as_slice());
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) | Ok(quick_xml::events::Event::Empty(e)) => {
                if e.local_name().as_ref() == b"rootfile" {
                    if let Some(path) = attribute_value(&e, b"full-path") {
                        return Ok(path);
                    }
                }
            }
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => bail!("Malformed container.xml: {}", e),
            _ => {}
        }
        buf.clear();
    }
    bail!("EPUB container.xml has no rootfile entry");
}

/// List the spine's document entry names, in reading order.
fn spine_documents(
    archive: &mut zip::ZipArchive<std::io::Cursor<&[u8]>>,
    opf_path: &str,
) -> Result<Vec<String>> {
    let xml = read_entry(archive, opf_path)?;
    let opf_dir = match opf_path.rfind('/') {
        Some(i) => &opf_path[..=i],
        None => "",
    };

    // id -> (href, media-type)
    let mut manifest: HashMap<String, (String, String)> = HashMap::new();
    let mut spine: Vec<String> = Vec::new();

    let mut reader = quick_xml::Reader::from_reader(xml.as_slice());
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) | Ok(quick_xml::events::Event::Empty(e)) => {
                match e.local_name().as_ref() {
                    b"item" => {
                        let id = attribute_value(&e, b"id");
                        let href = attribute_value(&e, b"href");
                        let media_type = attribute_value(&e, b"media-type").unwrap_or_default();
                        if let (Some(id), Some(href)) = (id, href) {
                            manifest.insert(id, (href, media_type));
                        }
                    }
                    b"itemref" => {
                        if let Some(idref) = attribute_value(&e, b"idref") {
                            spine.push(idref);
                        }
                    }
                    _ => {}
                }
            }
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => bail!("Malformed OPF package document: {}", e),
            _ => {}
        }
        buf.clear();
    }

    let documents: Vec<String> = spine
        .iter()
        .filter_map(|idref| manifest.get(idref))
        .filter(|(_, media_type)| {
            media_type.is_empty() || media_type == "application/xhtml+xml"
        })
        .map(|(href, _)| format!("{}{}", opf_dir, href))
        .collect();

    if documents.is_empty() {
        bail!("EPUB spine lists no readable documents");
    }
    Ok(documents)
}

/// Collect chapters from one spine document.
///
/// A heading opens a pending chapter; the first following paragraph with
/// content completes it. A heading followed by another heading before
/// any paragraph is dropped, matching how front matter usually reads.
fn collect_chapters(xml: &[u8], chapters: &mut Vec<Chapter>) -> Result<()> {
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    let mut heading_tag: Option<Vec<u8>> = None;
    let mut heading_text = String::new();
    let mut pending_title: Option<String> = None;
    let mut in_paragraph = false;
    let mut paragraph_text = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => {
                let name = e.local_name();
                if is_heading(name.as_ref()) && heading_tag.is_none() && !in_paragraph {
                    heading_tag = Some(name.as_ref().to_vec());
                    heading_text.clear();
                } else if name.as_ref() == b"p"
                    && heading_tag.is_none()
                    && pending_title.is_some()
                {
                    in_paragraph = true;
                    paragraph_text.clear();
                }
            }
            Ok(quick_xml::events::Event::Text(t)) => {
                let text = t.unescape().unwrap_or_default();
                let text = text.trim();
                if text.is_empty() {
                    // trimmed-away whitespace node
                } else if heading_tag.is_some() {
                    if !heading_text.is_empty() {
                        heading_text.push(' ');
                    }
                    heading_text.push_str(text);
                } else if in_paragraph {
                    if !paragraph_text.is_empty() {
                        paragraph_text.push(' ');
                    }
                    paragraph_text.push_str(text);
                }
            }
            Ok(quick_xml::events::Event::End(e)) => {
                let name = e.local_name();
                if heading_tag.as_deref() == Some(name.as_ref()) {
                    heading_tag = None;
                    if !heading_text.is_empty() {
                        pending_title = Some(heading_text.clone());
                    }
                } else if name.as_ref() == b"p" && in_paragraph {
                    in_paragraph = false;
                    if let Some(title) = pending_title.take() {
                        let snippets = snippet_candidates(&paragraph_text);
                        if snippets.is_empty() {
                            // empty paragraph; keep waiting for one with content
                            pending_title = Some(title);
                        } else {
                            chapters.push(Chapter { title, snippets });
                        }
                    }
                }
            }
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => bail!("Malformed spine document: {}", e),
            _ => {}
        }
        buf.clear();
    }
    Ok(())
}

fn is_heading(local_name: &[u8]) -> bool {
    matches!(local_name, b"h1" | b"h2" | b"h3")
}

/// Derive snippet candidates from a chapter's opening paragraph,
/// shortest first, longest last.
fn snippet_candidates(paragraph: &str) -> Vec<String> {
    let words: Vec<&str> = paragraph.split_whitespace().collect();
    if words.is_empty() {
        return Vec::new();
    }
    let mut snippets = Vec::new();
    if words.len() > SNIPPET_OPENING_WORDS {
        snippets.push(words[..SNIPPET_OPENING_WORDS].join(" "));
    }
    snippets.push(words[..words.len().min(SNIPPET_MAX_WORDS)].join(" "));
    snippets
}
