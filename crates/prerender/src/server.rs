//! Static file server supervision.
//!
//! The server runs as a child process serving the output directory. Its
//! stdout is watched for a ready marker, but that signal is only a hint:
//! the orchestrator still polls the URL before rendering anything.

use crate::error::ServerError;
use async_trait::async_trait;
use folio_core::ServerSettings;
use regex::Regex;
use std::path::Path;
use std::process::Stdio;
use std::sync::LazyLock;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{oneshot, watch};

static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https?://[^\s\x1b]+").expect("URL pattern is valid")
});

/// Starts a static server for a directory.
#[async_trait]
pub trait ServerLauncher: Send + Sync {
    async fn start(&self, dir: &Path, port: u16) -> Result<Box<dyn StaticServer>, ServerError>;
}

/// A running static server owned by one pipeline run.
#[async_trait]
pub trait StaticServer: Send + Sync {
    /// Base URL the server is believed to listen on
    fn url(&self) -> &str;

    /// Stop the server. Consumes the handle so it can only happen once.
    async fn close(self: Box<Self>);
}

/// Launches the server as a child process from an argv template.
///
/// `{dir}` and `{port}` in any argument are substituted at start.
pub struct ProcessLauncher {
    command: Vec<String>,
    ready_markers: Vec<String>,
    startup_timeout: Duration,
    shutdown_grace: Duration,
}

impl ProcessLauncher {
    pub fn new(command: Vec<String>, settings: &ServerSettings) -> Self {
        Self {
            command,
            ready_markers: settings.ready_markers.clone(),
            startup_timeout: settings.startup_timeout,
            shutdown_grace: settings.shutdown_grace,
        }
    }

    fn argv(&self, dir: &Path, port: u16) -> Vec<String> {
        let dir = dir.display().to_string();
        let port = port.to_string();
        self.command
            .iter()
            .map(|arg| arg.replace("{dir}", &dir).replace("{port}", &port))
            .collect()
    }
}

#[async_trait]
impl ServerLauncher for ProcessLauncher {
    async fn start(&self, dir: &Path, port: u16) -> Result<Box<dyn StaticServer>, ServerError> {
        let argv = self.argv(dir, port);
        let (program, args) = argv.split_first().ok_or(ServerError::EmptyCommand)?;

        println!("Starting static file server on port {}...", port);
        tracing::debug!(program = %program, args = ?args, "spawning static server");

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ServerError::Spawn {
                program: program.clone(),
                source,
            })?;

        let (ready_tx, ready_rx) = oneshot::channel();
        let (url_tx, url_rx) = watch::channel(None);

        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(watch_stdout(
                stdout,
                self.ready_markers.clone(),
                ready_tx,
                url_tx,
            ));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_stderr(stderr));
        }

        match tokio::time::timeout(self.startup_timeout, ready_rx).await {
            Ok(Ok(())) => println!("Server is ready!"),
            Ok(Err(_)) => {
                tracing::warn!("static server closed its output before reporting readiness");
            }
            Err(_) => println!("Server took longer than expected, proceeding anyway..."),
        }

        let url = url_rx
            .borrow()
            .clone()
            .unwrap_or_else(|| format!("http://localhost:{}", port));

        Ok(Box::new(ProcessServer {
            child,
            url,
            shutdown_grace: self.shutdown_grace,
        }))
    }
}

/// Handle to a spawned static server process.
pub struct ProcessServer {
    child: Child,
    url: String,
    shutdown_grace: Duration,
}

#[async_trait]
impl StaticServer for ProcessServer {
    fn url(&self) -> &str {
        &self.url
    }

    async fn close(self: Box<Self>) {
        let mut this = self;
        terminate(&mut this.child).await;

        match tokio::time::timeout(this.shutdown_grace, this.child.wait()).await {
            Ok(Ok(status)) => tracing::debug!(%status, "static server exited"),
            Ok(Err(e)) => tracing::warn!(error = %e, "failed waiting for static server"),
            Err(_) => {
                tracing::warn!(
                    grace_ms = this.shutdown_grace.as_millis() as u64,
                    "static server ignored termination, killing"
                );
                if let Err(e) = this.child.kill().await {
                    tracing::warn!(error = %e, "failed to kill static server");
                }
            }
        }
    }
}

/// Ask the process to stop gracefully.
#[cfg(unix)]
async fn terminate(child: &mut Child) {
    let Some(pid) = child.id() else {
        return;
    };
    let status = Command::new("kill")
        .arg("-TERM")
        .arg(pid.to_string())
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;
    if let Err(e) = status {
        tracing::warn!(pid, error = %e, "failed to send SIGTERM to static server");
    }
}

#[cfg(not(unix))]
async fn terminate(child: &mut Child) {
    if let Err(e) = child.start_kill() {
        tracing::warn!(error = %e, "failed to stop static server");
    }
}

async fn watch_stdout<R: AsyncRead + Unpin>(
    stdout: R,
    markers: Vec<String>,
    ready_tx: oneshot::Sender<()>,
    url_tx: watch::Sender<Option<String>>,
) {
    let mut reader = BufReader::new(stdout);
    let mut buf = Vec::new();
    let mut ready_tx = Some(ready_tx);

    // Drain to EOF so the child never writes into a closed pipe
    while let Some(line) = next_line(&mut reader, &mut buf).await {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        tracing::debug!(target: "folio::server", "{}", line);

        if let Some(url) = detect_url(line) {
            let recorded = url_tx.send_if_modified(|current| {
                current.is_none() && {
                    *current = Some(url.clone());
                    true
                }
            });
            if recorded {
                tracing::debug!(%url, "detected server URL");
            }
        }

        if markers.iter().any(|m| line.contains(m.as_str()))
            && let Some(tx) = ready_tx.take()
        {
            let _ = tx.send(());
        }
    }
}

async fn forward_stderr<R: AsyncRead + Unpin>(stderr: R) {
    let mut reader = BufReader::new(stderr);
    let mut buf = Vec::new();
    while let Some(line) = next_line(&mut reader, &mut buf).await {
        if !line.trim().is_empty() {
            eprintln!("Server stderr: {}", line.trim());
        }
    }
}

/// Next line of child output, decoded lossily. `None` at EOF or on a read error.
async fn next_line<R: AsyncRead + Unpin>(
    reader: &mut BufReader<R>,
    buf: &mut Vec<u8>,
) -> Option<String> {
    buf.clear();
    match reader.read_until(b'\n', buf).await {
        Ok(0) => None,
        Ok(_) => Some(String::from_utf8_lossy(buf).into_owned()),
        Err(e) => {
            tracing::debug!(error = %e, "static server output closed");
            None
        }
    }
}

/// First http(s) URL on a line of server output, without a trailing slash.
fn detect_url(line: &str) -> Option<String> {
    URL_PATTERN
        .find(line)
        .map(|m| m.as_str().trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn settings(startup_ms: u64, grace_ms: u64) -> ServerSettings {
        ServerSettings {
            port: 0,
            command: None,
            ready_markers: vec!["Accepting connections".to_string(), "Listening".to_string()],
            startup_timeout: Duration::from_millis(startup_ms),
            shutdown_grace: Duration::from_millis(grace_ms),
        }
    }

    fn sh(script: &str) -> Vec<String> {
        vec!["sh".to_string(), "-c".to_string(), script.to_string()]
    }

    #[test]
    fn test_detect_url() {
        assert_eq!(
            detect_url("   - Local:    http://localhost:3001/"),
            Some("http://localhost:3001".to_string())
        );
        assert_eq!(
            detect_url("Accepting connections at https://127.0.0.1:8443"),
            Some("https://127.0.0.1:8443".to_string())
        );
        assert_eq!(detect_url("INFO Accepting connections"), None);
    }

    #[test]
    fn test_argv_substitution() {
        let launcher = ProcessLauncher::new(
            vec![
                "npx".to_string(),
                "serve".to_string(),
                "-s".to_string(),
                "{dir}".to_string(),
                "-l".to_string(),
                "{port}".to_string(),
            ],
            &settings(100, 100),
        );
        assert_eq!(
            launcher.argv(Path::new("/site/dist"), 3001),
            vec!["npx", "serve", "-s", "/site/dist", "-l", "3001"]
        );
    }

    #[tokio::test]
    async fn test_start_rejects_empty_command() {
        let launcher = ProcessLauncher::new(vec![], &settings(100, 100));
        let result = launcher.start(Path::new("."), 3001).await;
        assert!(matches!(result, Err(ServerError::EmptyCommand)));
    }

    #[tokio::test]
    async fn test_start_reports_spawn_failure() {
        let launcher = ProcessLauncher::new(
            vec!["folio-definitely-not-a-program".to_string()],
            &settings(100, 100),
        );
        let result = launcher.start(Path::new("."), 3001).await;
        assert!(matches!(result, Err(ServerError::Spawn { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_start_detects_marker_and_url() {
        let launcher = ProcessLauncher::new(
            sh("echo 'Accepting connections at http://127.0.0.1:{port}'; exec sleep 30"),
            &settings(5000, 1000),
        );
        let started = Instant::now();
        let server = launcher.start(Path::new("."), 4321).await.unwrap();
        assert!(started.elapsed() < Duration::from_secs(4));
        assert_eq!(server.url(), "http://127.0.0.1:4321");
        server.close().await;
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_start_keeps_first_url() {
        let launcher = ProcessLauncher::new(
            sh("echo '   - Local:    http://localhost:{port}'; \
                echo '   - Network:  http://192.168.1.50:{port}'; \
                echo 'Accepting connections'; exec sleep 30"),
            &settings(5000, 1000),
        );
        let server = launcher.start(Path::new("."), 4325).await.unwrap();
        assert_eq!(server.url(), "http://localhost:4325");
        server.close().await;
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_start_tolerates_invalid_utf8_output() {
        let launcher = ProcessLauncher::new(
            sh("printf 'banner \\377\\n'; \
                echo 'Accepting connections at http://127.0.0.1:{port}'; exec sleep 30"),
            &settings(5000, 1000),
        );
        let server = launcher.start(Path::new("."), 4326).await.unwrap();
        assert_eq!(server.url(), "http://127.0.0.1:4326");
        server.close().await;
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_server_survives_writes_after_invalid_utf8() {
        let dir = tempfile::TempDir::new().unwrap();
        let alive = dir.path().join("alive");
        let script = format!(
            "printf 'noise \\377\\n'; echo Listening; sleep 0.5; echo still serving; touch '{}'; exec sleep 30",
            alive.display()
        );
        let launcher = ProcessLauncher::new(sh(&script), &settings(5000, 1000));
        let server = launcher.start(Path::new("."), 4327).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(alive.exists());
        server.close().await;
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_start_proceeds_after_timeout_with_default_url() {
        let launcher = ProcessLauncher::new(sh("exec sleep 30"), &settings(200, 1000));
        let started = Instant::now();
        let server = launcher.start(Path::new("."), 4322).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(200));
        assert_eq!(server.url(), "http://localhost:4322");
        server.close().await;
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_close_escalates_to_kill() {
        // Ignored signals survive exec, so SIGTERM has no effect here
        let launcher = ProcessLauncher::new(
            sh("trap '' TERM; echo Listening; exec sleep 30"),
            &settings(5000, 300),
        );
        let server = launcher.start(Path::new("."), 4323).await.unwrap();
        let started = Instant::now();
        server.close().await;
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(300));
        assert!(elapsed < Duration::from_secs(5));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_close_graceful_is_quick() {
        let launcher =
            ProcessLauncher::new(sh("echo Listening; exec sleep 30"), &settings(5000, 3000));
        let server = launcher.start(Path::new("."), 4324).await.unwrap();
        let started = Instant::now();
        server.close().await;
        assert!(started.elapsed() < Duration::from_secs(3));
    }
}
