//! Headless Chromium driven through its command line.
//!
//! Every navigation runs the browser once with `--dump-dom`. Chromium's
//! virtual time budget makes it wait until the network is idle and then run
//! pending timers for the settle window before it serializes the DOM, which
//! is the same "network idle, then settle" contract the renderer expects.
//! Pages share one private profile directory that lives as long as the
//! browser handle.

use super::{Browser, BrowserLauncher, NavigationOptions, Page};
use crate::error::RenderError;
use async_trait::async_trait;
use folio_core::BrowserSettings;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tempfile::TempDir;
use tokio::process::Command;

/// Executable names tried in order when none is configured
const CANDIDATES: &[&str] = &[
    "chromium",
    "chromium-browser",
    "google-chrome",
    "google-chrome-stable",
    "chrome",
];

const HEADLESS_ARGS: &[&str] = &[
    "--headless=new",
    "--disable-gpu",
    "--hide-scrollbars",
    "--mute-audio",
    "--no-first-run",
    "--no-default-browser-check",
];

pub struct ChromeLauncher {
    executable: Option<PathBuf>,
    args: Vec<String>,
}

impl ChromeLauncher {
    pub fn new(settings: &BrowserSettings) -> Self {
        Self {
            executable: settings.executable.clone(),
            args: settings.args.clone(),
        }
    }

    fn resolve_executable(&self) -> Result<PathBuf, RenderError> {
        match &self.executable {
            Some(path) if path.components().count() > 1 => {
                if path.exists() {
                    Ok(path.clone())
                } else {
                    Err(RenderError::Browser(format!(
                        "browser executable not found: {}",
                        path.display()
                    )))
                }
            }
            Some(name) => which::which(name).map_err(|e| {
                RenderError::Browser(format!("browser '{}' not on PATH: {}", name.display(), e))
            }),
            None => CANDIDATES
                .iter()
                .find_map(|name| which::which(name).ok())
                .ok_or_else(|| {
                    RenderError::Browser(format!(
                        "no Chromium found on PATH (tried {}); set browser.executable",
                        CANDIDATES.join(", ")
                    ))
                }),
        }
    }
}

#[async_trait]
impl BrowserLauncher for ChromeLauncher {
    async fn launch(&self) -> Result<Box<dyn Browser>, RenderError> {
        let executable = self.resolve_executable()?;

        let output = Command::new(&executable)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                RenderError::Browser(format!("failed to run {}: {}", executable.display(), e))
            })?;
        if !output.status.success() {
            return Err(RenderError::Browser(format!(
                "{} --version exited with {}",
                executable.display(),
                output.status
            )));
        }
        let version = String::from_utf8_lossy(&output.stdout).trim().to_string();

        let profile = tempfile::Builder::new()
            .prefix("folio-chrome-")
            .tempdir()
            .map_err(|e| RenderError::Browser(format!("failed to create browser profile: {}", e)))?;

        tracing::debug!(
            executable = %executable.display(),
            %version,
            profile = %profile.path().display(),
            "browser launched"
        );

        Ok(Box::new(ChromeBrowser {
            executable,
            args: self.args.clone(),
            profile,
        }))
    }
}

pub struct ChromeBrowser {
    executable: PathBuf,
    args: Vec<String>,
    profile: TempDir,
}

#[async_trait]
impl Browser for ChromeBrowser {
    async fn new_page(&self) -> Result<Box<dyn Page>, RenderError> {
        Ok(Box::new(ChromePage {
            executable: self.executable.clone(),
            args: self.args.clone(),
            profile: self.profile.path().to_path_buf(),
            dom: None,
        }))
    }

    async fn close(self: Box<Self>) {
        let path = self.profile.path().to_path_buf();
        if let Err(e) = self.profile.close() {
            tracing::warn!(profile = %path.display(), error = %e, "failed to remove browser profile");
        }
    }
}

pub struct ChromePage {
    executable: PathBuf,
    args: Vec<String>,
    profile: PathBuf,
    dom: Option<String>,
}

impl ChromePage {
    fn command(&self, url: &str, options: &NavigationOptions) -> Command {
        let mut command = Command::new(&self.executable);
        command
            .args(HEADLESS_ARGS)
            .args(&self.args)
            .arg(profile_arg(&self.profile))
            .arg(format!(
                "--virtual-time-budget={}",
                options.settle.as_millis()
            ))
            .arg("--dump-dom")
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }
}

#[async_trait]
impl Page for ChromePage {
    async fn goto(&mut self, url: &str, options: &NavigationOptions) -> Result<(), RenderError> {
        self.dom = None;
        let child = self
            .command(url, options)
            .spawn()
            .map_err(|e| RenderError::Browser(format!("failed to start browser: {}", e)))?;

        // Dropping the future on timeout drops the child, which kills it
        let output = match tokio::time::timeout(options.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|e| RenderError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })?,
            Err(_) => {
                return Err(RenderError::NavigationTimeout {
                    url: url.to_string(),
                    timeout: options.timeout,
                });
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = stderr.lines().last().unwrap_or_default().trim();
            return Err(RenderError::Navigation {
                url: url.to_string(),
                message: format!("browser exited with {}: {}", output.status, detail),
            });
        }

        let dom = String::from_utf8_lossy(&output.stdout).into_owned();
        if dom.trim().is_empty() {
            return Err(RenderError::Navigation {
                url: url.to_string(),
                message: "browser returned an empty document".to_string(),
            });
        }

        self.dom = Some(with_doctype(dom));
        Ok(())
    }

    async fn content(&mut self) -> Result<String, RenderError> {
        self.dom
            .clone()
            .ok_or_else(|| RenderError::Browser("page has not been navigated".to_string()))
    }

    async fn close(self: Box<Self>) {}
}

fn profile_arg(profile: &Path) -> String {
    format!("--user-data-dir={}", profile.display())
}

/// `--dump-dom` prints the root element only; restore the doctype.
fn with_doctype(dom: String) -> String {
    if dom.trim_start().to_ascii_lowercase().starts_with("<!doctype") {
        dom
    } else {
        format!("<!DOCTYPE html>\n{}", dom)
    }
}
