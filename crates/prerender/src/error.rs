use std::error::Error as StdError;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failure while rendering a single route.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("navigation to {url} timed out after {}ms", timeout.as_millis())]
    NavigationTimeout { url: String, timeout: Duration },

    #[error("navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("page at {url} never rendered ready marker '{marker}'")]
    NotReady { url: String, marker: String },

    #[error("browser error: {0}")]
    Browser(String),

    #[error("failed to write {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to prerender {url} after {attempts} attempts")]
    Exhausted {
        url: String,
        attempts: u32,
        #[source]
        last: Box<RenderError>,
    },
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to spawn '{program}'")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("server command is empty")]
    EmptyCommand,
}

/// Terminal failure of a prerender run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to start static server")]
    ServerStart(#[source] ServerError),

    #[error("static server at {url} did not respond after {attempts} attempts")]
    ServerNotReady { url: String, attempts: u32 },

    #[error("failed to launch browser")]
    BrowserLaunch(#[source] RenderError),

    #[error("prerendering {route} failed")]
    Route {
        route: String,
        #[source]
        source: RenderError,
    },

    #[error("failed to build HTTP client")]
    HttpClient(#[source] reqwest::Error),
}

/// An error followed by its sources, `: ` separated, for progress output.
pub(crate) fn chain(err: &(dyn StdError + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_failure() -> RenderError {
        RenderError::Write {
            path: PathBuf::from("dist/about/index.html"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "permission denied"),
        }
    }

    #[test]
    fn test_messages_do_not_repeat_their_source() {
        let err = PipelineError::Route {
            route: "/about".to_string(),
            source: RenderError::Exhausted {
                url: "http://localhost:3001/about".to_string(),
                attempts: 3,
                last: Box::new(write_failure()),
            },
        };

        assert_eq!(err.to_string(), "prerendering /about failed");
        let rendered = chain(&err);
        assert_eq!(
            rendered,
            "prerendering /about failed: failed to prerender http://localhost:3001/about after 3 attempts: failed to write dist/about/index.html: permission denied"
        );
        assert_eq!(rendered.matches("permission denied").count(), 1);
    }

    #[test]
    fn test_server_start_message() {
        let err = PipelineError::ServerStart(ServerError::Spawn {
            program: "npx".to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "not found"),
        });
        assert_eq!(
            chain(&err),
            "failed to start static server: failed to spawn 'npx': not found"
        );
    }
}
