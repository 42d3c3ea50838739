use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Complete folio configuration
#[derive(Debug, Clone)]
pub struct FolioConfig {
    pub site: SiteInfo,
    pub paths: Paths,
    pub server: ServerSettings,
    pub readiness: ReadinessSettings,
    pub browser: BrowserSettings,
    pub render: RenderSettings,
    pub routes: Vec<StaticRoute>,
    pub news: NewsSettings,
}

/// Public site identity, used by the sitemap and feeds
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SiteInfo {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub email: String,
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_language() -> String {
    "en-us".to_string()
}

impl SiteInfo {
    /// Site URL without a trailing slash, if configured
    pub fn base_url(&self) -> Option<&str> {
        self.url
            .as_deref()
            .map(|u| u.trim_end_matches('/'))
            .filter(|u| !u.is_empty())
    }
}

/// Resolved input and output locations
#[derive(Debug, Clone)]
pub struct Paths {
    /// Pre-built application bundle; artifacts are written here too
    pub dist: PathBuf,
    /// Directory of markdown blog posts
    pub content: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub port: u16,
    /// Custom server argv with `{dir}` and `{port}` placeholders.
    /// `None` means the built-in `folio serve`.
    pub command: Option<Vec<String>>,
    pub ready_markers: Vec<String>,
    pub startup_timeout: Duration,
    pub shutdown_grace: Duration,
}

#[derive(Debug, Clone)]
pub struct ReadinessSettings {
    pub max_attempts: u32,
    pub interval: Duration,
}

#[derive(Debug, Clone)]
pub struct BrowserSettings {
    pub executable: Option<PathBuf>,
    pub args: Vec<String>,
    pub navigation_timeout: Duration,
    pub settle: Duration,
    /// When set, a captured DOM must contain this string to count as rendered
    pub ready_marker: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub max_retries: u32,
    pub backoff: Duration,
}

/// The news channel: a feed of short dated updates kept in folio.toml
#[derive(Debug, Clone, Default)]
pub struct NewsSettings {
    /// Channel title; empty means the site title
    pub title: String,
    /// Channel description; empty means the site description
    pub description: String,
    pub items: Vec<NewsItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewsItem {
    pub id: String,
    pub date: NaiveDate,
    pub title: String,
    pub description: String,
    /// Absolute URL or site-relative path; `None` points at the news page
    pub link: Option<String>,
}

/// Statically configured route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticRoute {
    pub path: String,
    pub output: PathBuf,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changefreq: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<f32>,
}

impl StaticRoute {
    pub fn new(path: &str, label: &str) -> Self {
        Self {
            path: path.to_string(),
            output: crate::routes::output_for_path(path),
            label: label.to_string(),
            changefreq: None,
            priority: None,
        }
    }
}

/// Front-matter metadata of a blog post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMeta {
    pub slug: String,
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    pub topics: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// A discovered markdown document with a slug
#[derive(Debug, Clone)]
pub struct Document {
    pub source: PathBuf,
    pub meta: DocumentMeta,
    pub word_count: usize,
    pub reading_minutes: u32,
    /// Plain text of the first paragraph
    pub summary: String,
}

impl Document {
    /// Description for feeds: front-matter first, body summary otherwise
    pub fn description(&self) -> &str {
        if self.meta.description.trim().is_empty() {
            &self.summary
        } else {
            &self.meta.description
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteKind {
    Static,
    Post { slug: String },
}

/// One unit of prerendering work
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub path: String,
    /// Destination relative to the dist directory
    pub output: PathBuf,
    pub label: String,
    pub kind: RouteKind,
}

impl Route {
    pub fn is_post(&self) -> bool {
        matches!(self.kind, RouteKind::Post { .. })
    }
}
