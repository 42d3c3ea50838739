use crate::error::{Error, Result};
use crate::types::*;
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the configuration file looked up by default
pub const CONFIG_FILE: &str = "folio.toml";

/// Raw TOML configuration structure
/// This matches the folio.toml file structure exactly
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    site: SiteInfo,
    #[serde(default)]
    paths: RawPaths,
    #[serde(default)]
    server: RawServer,
    #[serde(default)]
    readiness: RawReadiness,
    #[serde(default)]
    browser: RawBrowser,
    #[serde(default)]
    render: RawRender,
    #[serde(default)]
    route: Option<Vec<RawRoute>>,
    #[serde(default)]
    news: RawNews,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawPaths {
    dist: String,
    content: String,
}

impl Default for RawPaths {
    fn default() -> Self {
        Self {
            dist: "dist".to_string(),
            content: "src/content/blog".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawServer {
    port: u16,
    command: Option<Vec<String>>,
    ready_markers: Vec<String>,
    startup_timeout_ms: u64,
    shutdown_grace_ms: u64,
}

impl Default for RawServer {
    fn default() -> Self {
        Self {
            port: 3001,
            command: None,
            ready_markers: vec!["Accepting connections".to_string(), "Listening".to_string()],
            startup_timeout_ms: 5000,
            shutdown_grace_ms: 1000,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawReadiness {
    max_attempts: u32,
    interval_ms: u64,
}

impl Default for RawReadiness {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            interval_ms: 1000,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawBrowser {
    executable: Option<String>,
    args: Vec<String>,
    navigation_timeout_ms: u64,
    settle_ms: u64,
    ready_marker: Option<String>,
}

impl Default for RawBrowser {
    fn default() -> Self {
        Self {
            executable: None,
            args: vec![
                "--no-sandbox".to_string(),
                "--disable-setuid-sandbox".to_string(),
            ],
            navigation_timeout_ms: 30_000,
            settle_ms: 1000,
            ready_marker: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawRender {
    max_retries: u32,
    backoff_ms: u64,
}

impl Default for RawRender {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_ms: 2000,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRoute {
    path: String,
    output: Option<String>, // Convert to PathBuf
    label: String,
    changefreq: Option<String>,
    priority: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawNews {
    title: String,
    description: String,
    items: Vec<RawNewsItem>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawNewsItem {
    id: String,
    date: String, // Convert to NaiveDate
    title: String,
    description: String,
    link: Option<String>,
}

/// The six pages every portfolio build prerenders unless configured otherwise
pub fn default_routes() -> Vec<StaticRoute> {
    vec![
        listed("/", "Home", "weekly", 1.0),
        listed("/about", "About", "monthly", 0.8),
        listed("/projects", "Projects", "weekly", 0.9),
        listed("/contact", "Contact", "monthly", 0.7),
        listed("/news", "News", "weekly", 0.8),
        listed("/blog", "Blog", "weekly", 0.9),
    ]
}

fn listed(path: &str, label: &str, changefreq: &str, priority: f32) -> StaticRoute {
    StaticRoute {
        changefreq: Some(changefreq.to_string()),
        priority: Some(priority),
        ..StaticRoute::new(path, label)
    }
}

/// Load configuration, falling back to defaults when the file does not exist.
///
/// Relative paths inside the file are resolved against the file's directory.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<FolioConfig> {
    let path = path.as_ref();
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        return convert(RawConfig::default(), base_dir);
    }
    parse_folio_toml(path)
}

/// Parse folio.toml from a file path
pub fn parse_folio_toml<P: AsRef<Path>>(path: P) -> Result<FolioConfig> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    parse_folio_toml_str(&content, base_dir)
}

/// Parse folio.toml from a string (useful for testing)
pub fn parse_folio_toml_str(content: &str, base_dir: &Path) -> Result<FolioConfig> {
    let raw: RawConfig = toml::from_str(content)?;
    convert(raw, base_dir)
}

fn convert(raw: RawConfig, base_dir: &Path) -> Result<FolioConfig> {
    let paths = Paths {
        dist: base_dir.join(validate_path(&raw.paths.dist, "paths.dist")?),
        content: base_dir.join(validate_path(&raw.paths.content, "paths.content")?),
    };

    if raw.readiness.max_attempts == 0 {
        return Err(Error::ConfigParse(
            "readiness.max_attempts must be at least 1".to_string(),
        ));
    }
    if raw.render.max_retries == 0 {
        return Err(Error::ConfigParse(
            "render.max_retries must be at least 1".to_string(),
        ));
    }
    if let Some(command) = &raw.server.command
        && command.is_empty()
    {
        return Err(Error::ConfigParse(
            "server.command must name a program".to_string(),
        ));
    }

    let routes = match raw.route {
        Some(raw_routes) => convert_routes(raw_routes)?,
        None => default_routes(),
    };

    Ok(FolioConfig {
        site: raw.site,
        paths,
        server: ServerSettings {
            port: raw.server.port,
            command: raw.server.command,
            ready_markers: raw.server.ready_markers,
            startup_timeout: Duration::from_millis(raw.server.startup_timeout_ms),
            shutdown_grace: Duration::from_millis(raw.server.shutdown_grace_ms),
        },
        readiness: ReadinessSettings {
            max_attempts: raw.readiness.max_attempts,
            interval: Duration::from_millis(raw.readiness.interval_ms),
        },
        browser: BrowserSettings {
            executable: raw.browser.executable.map(PathBuf::from),
            args: raw.browser.args,
            navigation_timeout: Duration::from_millis(raw.browser.navigation_timeout_ms),
            settle: Duration::from_millis(raw.browser.settle_ms),
            ready_marker: raw.browser.ready_marker.filter(|m| !m.is_empty()),
        },
        render: RenderSettings {
            max_retries: raw.render.max_retries,
            backoff: Duration::from_millis(raw.render.backoff_ms),
        },
        routes,
        news: convert_news(raw.news)?,
    })
}

fn convert_news(raw: RawNews) -> Result<NewsSettings> {
    let mut seen = HashSet::new();
    let items = raw
        .items
        .into_iter()
        .map(|item| {
            let id = item.id.trim().to_string();
            if id.is_empty() {
                return Err(Error::ConfigParse(format!(
                    "News item '{}' needs an id",
                    item.title
                )));
            }
            if !seen.insert(id.clone()) {
                return Err(Error::ConfigParse(format!("Duplicate news id: '{}'", id)));
            }
            let date = NaiveDate::parse_from_str(item.date.trim(), "%Y-%m-%d").map_err(|_| {
                Error::ConfigParse(format!(
                    "News item '{}' has invalid date '{}', expected YYYY-MM-DD",
                    id, item.date
                ))
            })?;

            Ok(NewsItem {
                id,
                date,
                title: item.title,
                description: item.description,
                link: item.link.filter(|l| !l.trim().is_empty()),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(NewsSettings {
        title: raw.title,
        description: raw.description,
        items,
    })
}

fn convert_routes(raw_routes: Vec<RawRoute>) -> Result<Vec<StaticRoute>> {
    let mut seen = HashSet::new();
    raw_routes
        .into_iter()
        .map(|r| {
            if !r.path.starts_with('/') {
                return Err(Error::ConfigParse(format!(
                    "Route path must start with '/': '{}'",
                    r.path
                )));
            }
            if !seen.insert(r.path.clone()) {
                return Err(Error::ConfigParse(format!(
                    "Duplicate route path: '{}'",
                    r.path
                )));
            }
            if let Some(priority) = r.priority
                && !(0.0..=1.0).contains(&priority)
            {
                return Err(Error::ConfigParse(format!(
                    "Priority for '{}' must be between 0.0 and 1.0, got {}",
                    r.path, priority
                )));
            }

            let output = match r.output {
                Some(output) => validate_path(&output, "route.output")?,
                None => crate::routes::output_for_path(&r.path),
            };

            Ok(StaticRoute {
                path: r.path,
                output,
                label: r.label,
                changefreq: r.changefreq,
                priority: r.priority,
            })
        })
        .collect()
}

/// Validate and convert a path string to PathBuf.
///
/// Rejects absolute paths and parent directory references (`..`) so that
/// nothing in folio.toml can point the pipeline outside the project.
///
/// ```text
/// validate_path("dist", "paths.dist")             → Ok(PathBuf)
/// validate_path("blog/index.html", "route.output") → Ok(PathBuf)
/// validate_path("/etc/passwd", "route.output")     → Err("Absolute paths not allowed...")
/// validate_path("../out", "paths.dist")            → Err("Parent directory references...")
/// ```
pub(crate) fn validate_path(path_str: &str, field_name: &str) -> Result<PathBuf> {
    let path = Path::new(path_str);

    // Reject absolute paths
    if path.is_absolute() {
        return Err(Error::ConfigParse(format!(
            "Absolute paths not allowed in '{}': '{}'. Use relative paths only.",
            field_name, path_str
        )));
    }

    for component in path.components() {
        if component == std::path::Component::ParentDir {
            return Err(Error::ConfigParse(format!(
                "Parent directory references (..) not allowed in '{}': '{}'",
                field_name, path_str
            )));
        }
    }

    if path_str.trim().is_empty() {
        return Err(Error::ConfigParse(format!(
            "Empty path in '{}' field",
            field_name
        )));
    }

    Ok(path.to_path_buf())
}
