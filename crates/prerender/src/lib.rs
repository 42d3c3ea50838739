//! Build-time prerendering of a client-rendered site.
//!
//! A run serves the built output directory, waits until it answers, then
//! drives a headless browser through every route and writes the rendered
//! HTML back next to the bundle.

pub mod browser;
pub mod error;
pub mod pipeline;
pub mod readiness;
pub mod render;
pub mod server;

pub use browser::{Browser, BrowserLauncher, ChromeLauncher, NavigationOptions, Page};
pub use error::{PipelineError, RenderError, ServerError};
pub use pipeline::{Pipeline, PipelineSettings, Report, Stage};
pub use readiness::wait_until_ready;
pub use render::{Artifact, RenderOptions, render_route};
pub use server::{ProcessLauncher, ServerLauncher, StaticServer};
