use crate::browser::{Browser, NavigationOptions, Page};
use crate::error::{RenderError, chain};
use folio_core::FolioConfig;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Per-route rendering policy
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Total attempts per route, including the first
    pub max_retries: u32,
    pub backoff: Duration,
    pub navigation: NavigationOptions,
    pub ready_marker: Option<String>,
}

impl RenderOptions {
    pub fn from_config(config: &FolioConfig) -> Self {
        Self {
            max_retries: config.render.max_retries,
            backoff: config.render.backoff,
            navigation: NavigationOptions {
                timeout: config.browser.navigation_timeout,
                settle: config.browser.settle,
            },
            ready_marker: config.browser.ready_marker.clone(),
        }
    }
}

/// A prerendered HTML file on disk
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub path: PathBuf,
    pub bytes: usize,
    /// Lowercase hex SHA-256 of the written document
    pub digest: String,
    /// Whether the write replaced different (or no) content
    pub changed: bool,
}

/// Render one route to `output_path`, retrying failed attempts.
///
/// Every attempt uses a fresh page which is closed before the attempt
/// returns, so no page outlives this call on any path. Only the last
/// failure is reported once all attempts are spent.
pub async fn render_route(
    browser: &dyn Browser,
    url: &str,
    output_path: &Path,
    options: &RenderOptions,
) -> Result<Artifact, RenderError> {
    let max_retries = options.max_retries.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        match render_once(browser, url, output_path, options).await {
            Ok(artifact) => {
                tracing::debug!(%url, attempt, bytes = artifact.bytes, changed = artifact.changed, "route rendered");
                return Ok(artifact);
            }
            Err(err) if attempt < max_retries => {
                println!("  Attempt {} failed, retrying... ({})", attempt, chain(&err));
                tracing::warn!(%url, attempt, error = %chain(&err), "render attempt failed");
                tokio::time::sleep(options.backoff).await;
            }
            Err(err) => {
                eprintln!(
                    "✗ Failed to prerender {} after {} attempts: {}",
                    url, attempt, chain(&err)
                );
                return Err(RenderError::Exhausted {
                    url: url.to_string(),
                    attempts: attempt,
                    last: Box::new(err),
                });
            }
        }
    }
}

async fn render_once(
    browser: &dyn Browser,
    url: &str,
    output_path: &Path,
    options: &RenderOptions,
) -> Result<Artifact, RenderError> {
    let mut page = browser.new_page().await?;
    let captured = capture(page.as_mut(), url, options).await;
    page.close().await;

    let html = captured?;
    let path = output_path.to_path_buf();
    tokio::task::spawn_blocking(move || write_artifact(&path, &html))
        .await
        .map_err(|e| RenderError::Write {
            path: output_path.to_path_buf(),
            source: io::Error::other(e),
        })?
        .map_err(|source| RenderError::Write {
            path: output_path.to_path_buf(),
            source,
        })
}

async fn capture(
    page: &mut dyn Page,
    url: &str,
    options: &RenderOptions,
) -> Result<String, RenderError> {
    page.goto(url, &options.navigation).await?;
    let html = page.content().await?;

    if let Some(marker) = &options.ready_marker
        && !html.contains(marker.as_str())
    {
        return Err(RenderError::NotReady {
            url: url.to_string(),
            marker: marker.clone(),
        });
    }

    Ok(html)
}

/// Replace `path` with `html` atomically.
///
/// The document is written to a hidden temporary file next to the target
/// and renamed over it, so readers see either the old file or the complete
/// new one. The temporary file is removed if anything fails.
pub fn write_artifact(path: &Path, html: &str) -> io::Result<Artifact> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let changed = match fs::read(path) {
        Ok(previous) => previous != html.as_bytes(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => true,
        Err(e) => return Err(e),
    };

    let mut tmp = tempfile::Builder::new()
        .prefix(".folio-")
        .suffix(".partial")
        .tempfile_in(parent)?;
    tmp.write_all(html.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;

    Ok(Artifact {
        path: path.to_path_buf(),
        bytes: html.len(),
        digest: format!("{:x}", Sha256::digest(html.as_bytes())),
        changed,
    })
}
