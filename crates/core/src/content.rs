//! Blog content discovery.
//!
//! Scans the content directory for markdown posts, splits the YAML
//! front-matter from the body and keeps every document that declares a
//! `slug`. Documents without one are skipped quietly; they never become
//! routes.

use crate::error::{Error, Result};
use crate::types::{Document, DocumentMeta};
use chrono::NaiveDate;
use pulldown_cmark::{Event, Parser, Tag, TagEnd};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Recognized markdown extensions (lowercase)
const MARKDOWN_EXTENSIONS: &[&str] = &["md", "markdown"];

const WORDS_PER_MINUTE: usize = 200;

/// Front-matter as written by authors. Everything is optional here;
/// [`discover`] decides what is required.
#[derive(Debug, Default, Deserialize)]
struct RawFrontMatter {
    slug: Option<String>,
    title: Option<String>,
    description: Option<String>,
    date: Option<serde_yaml_ng::Value>,
    #[serde(default)]
    topics: Vec<String>,
    author: Option<String>,
    image: Option<String>,
    icon: Option<String>,
    #[serde(rename = "readingTime")]
    reading_time: Option<u32>,
}

/// Discover all slugged markdown documents in `dir`.
///
/// Files are returned in file-name order so the render worklist is stable
/// between runs.
pub fn discover(dir: &Path) -> Result<Vec<Document>> {
    if !dir.is_dir() {
        return Err(Error::MissingContentDir(dir.to_path_buf()));
    }

    let mut documents = Vec::new();
    let mut seen: HashMap<String, PathBuf> = HashMap::new();

    for path in scan_markdown_files(dir)? {
        let source = fs::read_to_string(&path)?;
        let Some(document) = parse_document(&path, &source)? else {
            tracing::debug!(path = %path.display(), "skipping document without slug");
            continue;
        };

        if let Some(first) = seen.get(&document.meta.slug) {
            return Err(Error::DuplicateSlug {
                slug: document.meta.slug,
                first: first.clone(),
                path,
            });
        }
        seen.insert(document.meta.slug.clone(), path);
        documents.push(document);
    }

    Ok(documents)
}

fn scan_markdown_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(dir).max_depth(1) {
        let entry = entry.map_err(|e| Error::IoError(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        if let Some(ext) = entry.path().extension()
            && MARKDOWN_EXTENSIONS.contains(&ext.to_string_lossy().to_lowercase().as_str())
        {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort();
    Ok(files)
}

/// Parse one markdown source. `Ok(None)` means the document has no slug.
pub fn parse_document(path: &Path, source: &str) -> Result<Option<Document>> {
    let Some((front_matter, body)) = split_front_matter(source) else {
        return Ok(None);
    };

    let raw: RawFrontMatter = if front_matter.trim().is_empty() {
        RawFrontMatter::default()
    } else {
        serde_yaml_ng::from_str(front_matter).map_err(|e| Error::FrontMatter {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?
    };

    let Some(slug) = raw.slug.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    if let Err(reason) = check_slug(&slug) {
        return Err(Error::InvalidSlug {
            path: path.to_path_buf(),
            slug,
            reason,
        });
    }

    let date = raw.date.as_ref().and_then(|value| {
        let parsed = parse_date(value);
        if parsed.is_none() {
            tracing::warn!(path = %path.display(), date = ?value, "ignoring unparseable date");
        }
        parsed
    });

    let stats = body_stats(body);
    let reading_minutes = raw
        .reading_time
        .unwrap_or_else(|| stats.word_count.div_ceil(WORDS_PER_MINUTE).max(1) as u32);

    Ok(Some(Document {
        source: path.to_path_buf(),
        meta: DocumentMeta {
            slug,
            title: raw.title.unwrap_or_default(),
            description: raw.description.unwrap_or_default(),
            date,
            topics: raw.topics,
            author: raw.author,
            image: raw.image,
            icon: raw.icon,
        },
        word_count: stats.word_count,
        reading_minutes,
        summary: stats.summary,
    }))
}

/// Split `---` delimited front-matter from the markdown body.
fn split_front_matter(source: &str) -> Option<(&str, &str)> {
    let source = source.strip_prefix('\u{feff}').unwrap_or(source);
    let rest = source
        .strip_prefix("---\r\n")
        .or_else(|| source.strip_prefix("---\n"))?;

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            let front_matter = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return Some((front_matter, body));
        }
        offset += line.len();
    }

    None
}

/// Slugs become directory names under the output tree.
fn check_slug(slug: &str) -> std::result::Result<(), &'static str> {
    if slug == "." || slug == ".." || slug.contains("..") {
        return Err("parent directory references are not allowed");
    }
    if slug.contains(['/', '\\']) {
        return Err("path separators are not allowed");
    }
    if slug.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err("whitespace is not allowed");
    }
    // The slug is used verbatim in the route URL
    if slug.contains(['?', '#', '%']) {
        return Err("URL query, fragment and escape characters are not allowed");
    }
    Ok(())
}

/// YAML may hand us a bare date string or a full timestamp.
fn parse_date(value: &serde_yaml_ng::Value) -> Option<NaiveDate> {
    let text = value.as_str()?.trim();
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            chrono::DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|dt| dt.date_naive())
        })
        .or_else(|| text.get(..10).and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()))
}

struct BodyStats {
    word_count: usize,
    summary: String,
}

/// Count words of rendered text and capture the first paragraph.
fn body_stats(body: &str) -> BodyStats {
    let mut word_count = 0;
    let mut summary = String::new();
    let mut in_paragraph = false;
    let mut summary_done = false;

    for event in Parser::new(body) {
        match event {
            Event::Start(Tag::Paragraph) => in_paragraph = true,
            Event::End(TagEnd::Paragraph) => {
                in_paragraph = false;
                if !summary.is_empty() {
                    summary_done = true;
                }
            }
            Event::Text(text) | Event::Code(text) => {
                word_count += text.split_whitespace().count();
                if in_paragraph && !summary_done {
                    summary.push_str(&text);
                }
            }
            Event::SoftBreak | Event::HardBreak if in_paragraph && !summary_done => {
                summary.push(' ');
            }
            _ => {}
        }
    }

    BodyStats {
        word_count,
        summary: summary.trim().to_string(),
    }
}

/// Newest first; undated documents sort last, ties keep discovery order.
pub fn sorted_by_date_desc(documents: &[Document]) -> Vec<&Document> {
    let mut sorted: Vec<&Document> = documents.iter().collect();
    sorted.sort_by(|a, b| b.meta.date.cmp(&a.meta.date));
    sorted
}
