use anyhow::{Context, Result};
use axum::Router;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

/// Serve a built single-page app.
///
/// Unknown paths fall back to `index.html` so client-side routes resolve.
/// This is the default server a prerender run supervises; the
/// `Accepting connections` line is what it waits for.
pub async fn run(dir: PathBuf, port: u16) -> Result<()> {
    if !dir.is_dir() {
        anyhow::bail!("Directory does not exist: {}", dir.display());
    }

    let app = router(&dir);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to port {}", port))?;
    let port = listener.local_addr()?.port();

    println!("Accepting connections at http://localhost:{}", port);
    tracing::debug!(dir = %dir.display(), port, "serving");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}

fn router(dir: &Path) -> Router {
    let spa = ServeDir::new(dir).fallback(ServeFile::new(dir.join("index.html")));
    Router::new()
        .fallback_service(spa)
        .layer(TraceLayer::new_for_http())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::debug!("shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use std::fs;
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn site() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("index.html"), "<div id=\"root\"></div>").unwrap();
        fs::create_dir_all(dir.path().join("assets")).unwrap();
        fs::write(dir.path().join("assets/app.js"), "render()").unwrap();
        dir
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, String) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_serves_files() {
        let dir = site();
        let (status, body) = get(router(dir.path()), "/assets/app.js").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "render()");
    }

    #[tokio::test]
    async fn test_client_routes_fall_back_to_index() {
        let dir = site();
        let (status, body) = get(router(dir.path()), "/blog/home-lab-setup").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("id=\"root\""));
    }

    #[tokio::test]
    async fn test_rejects_missing_directory() {
        let dir = TempDir::new().unwrap();
        let err = run(dir.path().join("nope"), 0).await.unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }
}
