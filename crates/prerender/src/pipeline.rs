//! Prerender run orchestration.
//!
//! One run owns exactly one static server and at most one browser. Routes
//! render serially: static pages first, then blog posts. Whatever happens,
//! the run ends in [`Stage::Cleanup`], which closes the browser before the
//! server.

use crate::browser::{Browser, BrowserLauncher};
use crate::error::{PipelineError, chain};
use crate::readiness::wait_until_ready;
use crate::render::{Artifact, RenderOptions, render_route};
use crate::server::ServerLauncher;
use folio_core::{FolioConfig, ReadinessSettings, Route, Worklist};
use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Per-request cap while polling for readiness
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    ServerStarting,
    ServerVerifying,
    BrowserLaunching,
    RenderingStatic,
    RenderingContent,
    Cleanup,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::ServerStarting => "server-starting",
            Stage::ServerVerifying => "server-verifying",
            Stage::BrowserLaunching => "browser-launching",
            Stage::RenderingStatic => "rendering-static",
            Stage::RenderingContent => "rendering-content",
            Stage::Cleanup => "cleanup",
            Stage::Done => "done",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Directory served and written into
    pub dist: PathBuf,
    pub port: u16,
    pub readiness: ReadinessSettings,
    pub render: RenderOptions,
}

impl PipelineSettings {
    pub fn from_config(config: &FolioConfig) -> Self {
        Self {
            dist: config.paths.dist.clone(),
            port: config.server.port,
            readiness: config.readiness.clone(),
            render: RenderOptions::from_config(config),
        }
    }
}

/// Outcome of a successful run
#[derive(Debug)]
pub struct Report {
    pub rendered: Vec<Artifact>,
    pub elapsed: Duration,
}

impl Report {
    /// Number of artifacts whose content differs from the previous run
    pub fn changed(&self) -> usize {
        self.rendered.iter().filter(|a| a.changed).count()
    }
}

pub struct Pipeline {
    settings: PipelineSettings,
    servers: Box<dyn ServerLauncher>,
    browsers: Box<dyn BrowserLauncher>,
    client: reqwest::Client,
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new(
        settings: PipelineSettings,
        servers: Box<dyn ServerLauncher>,
        browsers: Box<dyn BrowserLauncher>,
    ) -> Result<Self, PipelineError> {
        let client = reqwest::Client::builder()
            .timeout(PROBE_TIMEOUT)
            .build()
            .map_err(PipelineError::HttpClient)?;

        Ok(Self {
            settings,
            servers,
            browsers,
            client,
            stages: vec![Stage::Idle],
        })
    }

    /// Stages entered so far, oldest first
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn stage(&self) -> Stage {
        self.stages.last().copied().unwrap_or(Stage::Idle)
    }

    fn enter(&mut self, stage: Stage) {
        tracing::info!(from = %self.stage(), to = %stage, "pipeline stage");
        self.stages.push(stage);
    }

    pub async fn run(&mut self, worklist: &Worklist) -> Result<Report, PipelineError> {
        let started = Instant::now();

        self.enter(Stage::ServerStarting);
        let server = match self
            .servers
            .start(&self.settings.dist, self.settings.port)
            .await
        {
            Ok(server) => server,
            Err(e) => {
                self.enter(Stage::Cleanup);
                self.enter(Stage::Failed);
                return Err(PipelineError::ServerStart(e));
            }
        };

        let mut browser = None;
        let result = self.render_all(server.url(), worklist, &mut browser).await;

        self.enter(Stage::Cleanup);
        if let Some(browser) = browser {
            browser.close().await;
            tracing::debug!("browser closed");
        }
        server.close().await;
        tracing::debug!("static server closed");

        let elapsed = started.elapsed();
        match result {
            Ok(rendered) => {
                self.enter(Stage::Done);
                tracing::info!(
                    routes = rendered.len(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "prerender complete"
                );
                Ok(Report { rendered, elapsed })
            }
            Err(e) => {
                self.enter(Stage::Failed);
                tracing::error!(error = %chain(&e), elapsed_ms = elapsed.as_millis() as u64, "prerender failed");
                Err(e)
            }
        }
    }

    async fn render_all(
        &mut self,
        base_url: &str,
        worklist: &Worklist,
        slot: &mut Option<Box<dyn Browser>>,
    ) -> Result<Vec<Artifact>, PipelineError> {
        self.enter(Stage::ServerVerifying);
        println!("Verifying server is responding...");
        if !wait_until_ready(&self.client, base_url, &self.settings.readiness).await {
            eprintln!("✗ Server failed to start properly");
            return Err(PipelineError::ServerNotReady {
                url: base_url.to_string(),
                attempts: self.settings.readiness.max_attempts,
            });
        }
        println!("✓ Server verified and responding");

        self.enter(Stage::BrowserLaunching);
        println!("Launching headless browser...");
        let launched = self
            .browsers
            .launch()
            .await
            .map_err(PipelineError::BrowserLaunch)?;
        let browser: &dyn Browser = &**slot.insert(launched);

        let mut rendered = Vec::with_capacity(worklist.len());

        self.enter(Stage::RenderingStatic);
        section("Prerendering static pages");
        for route in worklist.static_routes() {
            rendered.push(self.render(browser, base_url, route).await?);
        }

        self.enter(Stage::RenderingContent);
        let posts: Vec<&Route> = worklist.blog_routes().collect();
        section(&format!("Prerendering {} blog posts", posts.len()));
        for route in posts {
            rendered.push(self.render(browser, base_url, route).await?);
        }

        println!();
        println!("{}", "=".repeat(80));
        println!("✓ Prerendered {} routes", rendered.len());
        println!("{}", "=".repeat(80));

        Ok(rendered)
    }

    async fn render(
        &self,
        browser: &dyn Browser,
        base_url: &str,
        route: &Route,
    ) -> Result<Artifact, PipelineError> {
        let url = format!("{}{}", base_url.trim_end_matches('/'), route.path);
        let output = self.settings.dist.join(&route.output);

        println!("Prerendering {} ({})...", route.label, route.path);
        let started = Instant::now();
        match render_route(browser, &url, &output, &self.settings.render).await {
            Ok(artifact) => {
                println!("✓ Saved: {}", route.output.display());
                tracing::debug!(
                    route = %route.path,
                    bytes = artifact.bytes,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "route saved"
                );
                Ok(artifact)
            }
            Err(source) => {
                tracing::error!(route = %route.path, error = %chain(&source), "aborting remaining routes");
                Err(PipelineError::Route {
                    route: route.path.clone(),
                    source,
                })
            }
        }
    }
}

fn section(title: &str) {
    println!();
    println!("{}", "-".repeat(80));
    println!("{}", title);
    println!("{}", "-".repeat(80));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServerError;
    use crate::render::tests::{FakeBrowser, leftovers, options};
    use crate::server::StaticServer;
    use async_trait::async_trait;
    use axum::{Router, http::StatusCode};
    use folio_core::config::default_routes;
    use folio_core::content::parse_document;
    use std::path::Path;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tempfile::TempDir;

    const HOME_LAB: &str = "---\ntitle: Building a Home Lab\nslug: home-lab-setup\ndate: 2024-03-02\ntopics: [homelab, networking]\n---\n\nRacks and cables.\n";
    const DRAFT: &str = "---\ntitle: Untitled draft\n---\n\nNot yet.\n";

    /// Launches an in-process HTTP server, a URL nobody listens on, or nothing
    #[derive(Default)]
    struct FakeLauncher {
        unreachable: bool,
        spawn_fails: bool,
        closed: Arc<AtomicU32>,
    }

    struct FakeServer {
        url: String,
        task: Option<tokio::task::JoinHandle<()>>,
        closed: Arc<AtomicU32>,
    }

    #[async_trait]
    impl ServerLauncher for FakeLauncher {
        async fn start(&self, _dir: &Path, _port: u16) -> Result<Box<dyn StaticServer>, ServerError> {
            if self.spawn_fails {
                return Err(ServerError::Spawn {
                    program: "serve".to_string(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
                });
            }
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();

            let task = if self.unreachable {
                drop(listener);
                None
            } else {
                let app = Router::new().fallback(|| async { (StatusCode::OK, "<div id=\"root\"></div>") });
                Some(tokio::spawn(async move {
                    axum::serve(listener, app).await.unwrap();
                }))
            };

            Ok(Box::new(FakeServer {
                url: format!("http://{}", addr),
                task,
                closed: self.closed.clone(),
            }))
        }
    }

    #[async_trait]
    impl StaticServer for FakeServer {
        fn url(&self) -> &str {
            &self.url
        }

        async fn close(self: Box<Self>) {
            if let Some(task) = &self.task {
                task.abort();
            }
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn settings(dist: &Path) -> PipelineSettings {
        PipelineSettings {
            dist: dist.to_path_buf(),
            port: 0,
            readiness: ReadinessSettings {
                max_attempts: 3,
                interval: Duration::from_millis(10),
            },
            render: options(3),
        }
    }

    fn worklist() -> Worklist {
        let documents: Vec<_> = [("home-lab.md", HOME_LAB), ("draft.md", DRAFT)]
            .into_iter()
            .filter_map(|(name, source)| parse_document(Path::new(name), source).unwrap())
            .collect();
        Worklist::build(&default_routes(), &documents)
    }

    #[tokio::test]
    async fn test_run_renders_every_route() {
        let dist = TempDir::new().unwrap();
        let launcher = FakeLauncher::default();
        let server_closed = launcher.closed.clone();
        let browser = FakeBrowser::default();

        let mut pipeline = Pipeline::new(
            settings(dist.path()),
            Box::new(launcher),
            Box::new(browser.clone()),
        )
        .unwrap();
        let report = pipeline.run(&worklist()).await.unwrap();

        assert_eq!(report.rendered.len(), 7);
        for output in [
            "index.html",
            "about/index.html",
            "projects/index.html",
            "contact/index.html",
            "news/index.html",
            "blog/index.html",
        ] {
            let html = std::fs::read_to_string(dist.path().join(output)).unwrap();
            assert!(html.starts_with("<!DOCTYPE html>"), "{output}");
        }
        let post = std::fs::read_to_string(dist.path().join("blog/home-lab-setup/index.html")).unwrap();
        assert!(post.contains("home-lab-setup"));
        // The slugless draft produces nothing
        assert_eq!(std::fs::read_dir(dist.path().join("blog")).unwrap().count(), 2);

        assert_eq!(
            pipeline.stages(),
            &[
                Stage::Idle,
                Stage::ServerStarting,
                Stage::ServerVerifying,
                Stage::BrowserLaunching,
                Stage::RenderingStatic,
                Stage::RenderingContent,
                Stage::Cleanup,
                Stage::Done,
            ]
        );
        assert_eq!(FakeBrowser::count(&browser.state.browser_closed), 1);
        assert_eq!(server_closed.load(Ordering::SeqCst), 1);
        assert_eq!(
            FakeBrowser::count(&browser.state.opened),
            FakeBrowser::count(&browser.state.closed)
        );
    }

    #[tokio::test]
    async fn test_server_never_ready_skips_browser() {
        let dist = TempDir::new().unwrap();
        let launcher = FakeLauncher {
            unreachable: true,
            ..Default::default()
        };
        let server_closed = launcher.closed.clone();
        let browser = FakeBrowser::default();

        let mut pipeline = Pipeline::new(
            settings(dist.path()),
            Box::new(launcher),
            Box::new(browser.clone()),
        )
        .unwrap();
        let err = pipeline.run(&worklist()).await.unwrap_err();

        assert!(matches!(err, PipelineError::ServerNotReady { attempts: 3, .. }));
        assert_eq!(FakeBrowser::count(&browser.state.launched), 0);
        assert_eq!(server_closed.load(Ordering::SeqCst), 1);
        assert_eq!(
            pipeline.stages(),
            &[
                Stage::Idle,
                Stage::ServerStarting,
                Stage::ServerVerifying,
                Stage::Cleanup,
                Stage::Failed,
            ]
        );
        assert!(!dist.path().join("index.html").exists());
    }

    #[tokio::test]
    async fn test_server_start_failure_skips_browser() {
        let dist = TempDir::new().unwrap();
        let launcher = FakeLauncher {
            spawn_fails: true,
            ..Default::default()
        };
        let browser = FakeBrowser::default();

        let mut pipeline = Pipeline::new(
            settings(dist.path()),
            Box::new(launcher),
            Box::new(browser.clone()),
        )
        .unwrap();
        let err = pipeline.run(&worklist()).await.unwrap_err();

        assert!(matches!(
            err,
            PipelineError::ServerStart(ServerError::Spawn { .. })
        ));
        assert_eq!(FakeBrowser::count(&browser.state.launched), 0);
        assert_eq!(
            pipeline.stages(),
            &[
                Stage::Idle,
                Stage::ServerStarting,
                Stage::Cleanup,
                Stage::Failed,
            ]
        );
        assert!(!dist.path().join("index.html").exists());
    }

    #[tokio::test]
    async fn test_exhausted_route_aborts_remaining() {
        let dist = TempDir::new().unwrap();
        let launcher = FakeLauncher::default();
        let server_closed = launcher.closed.clone();
        let browser = FakeBrowser::default().failing("/projects", u32::MAX);

        let mut pipeline = Pipeline::new(
            settings(dist.path()),
            Box::new(launcher),
            Box::new(browser.clone()),
        )
        .unwrap();
        let err = pipeline.run(&worklist()).await.unwrap_err();

        match &err {
            PipelineError::Route { route, source } => {
                assert_eq!(route, "/projects");
                assert!(source.to_string().contains("after 3 attempts"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(browser.attempts_for("/projects"), 3);
        assert_eq!(browser.attempts_for("/contact"), 0);

        // Routes before the failure keep their artifacts
        assert!(dist.path().join("index.html").exists());
        assert!(dist.path().join("about/index.html").exists());
        assert!(!dist.path().join("projects/index.html").exists());
        assert!(!dist.path().join("contact/index.html").exists());
        assert!(leftovers(dist.path()).is_empty());

        assert_eq!(pipeline.stage(), Stage::Failed);
        assert!(pipeline.stages().contains(&Stage::Cleanup));
        assert!(!pipeline.stages().contains(&Stage::RenderingContent));
        assert_eq!(FakeBrowser::count(&browser.state.browser_closed), 1);
        assert_eq!(server_closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_second_run_is_unchanged() {
        let dist = TempDir::new().unwrap();
        let list = worklist();

        let mut first = Pipeline::new(
            settings(dist.path()),
            Box::new(FakeLauncher::default()),
            Box::new(FakeBrowser::default()),
        )
        .unwrap();
        let report = first.run(&list).await.unwrap();
        assert_eq!(report.changed(), 7);
        let before = std::fs::read(dist.path().join("blog/home-lab-setup/index.html")).unwrap();

        let mut second = Pipeline::new(
            settings(dist.path()),
            Box::new(FakeLauncher::default()),
            Box::new(FakeBrowser::default()),
        )
        .unwrap();
        let report = second.run(&list).await.unwrap();
        assert_eq!(report.changed(), 0);
        let after = std::fs::read(dist.path().join("blog/home-lab-setup/index.html")).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(Stage::ServerVerifying.to_string(), "server-verifying");
        assert_eq!(Stage::RenderingContent.to_string(), "rendering-content");
    }
}
