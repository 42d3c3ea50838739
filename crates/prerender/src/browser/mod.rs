//! Headless browser seam.
//!
//! The renderer only needs three things from a browser: open a page,
//! navigate it until client-side rendering has settled, and serialize the
//! resulting DOM. [`chrome`] implements this with a headless Chromium.

pub mod chrome;

use crate::error::RenderError;
use async_trait::async_trait;
use std::time::Duration;

pub use chrome::ChromeLauncher;

/// How a page waits before its DOM is captured.
#[derive(Debug, Clone, Copy)]
pub struct NavigationOptions {
    /// Upper bound for reaching network idle
    pub timeout: Duration,
    /// Extra time for client-side work after network idle
    pub settle: Duration,
}

#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn Browser>, RenderError>;
}

#[async_trait]
pub trait Browser: Send + Sync {
    async fn new_page(&self) -> Result<Box<dyn Page>, RenderError>;

    async fn close(self: Box<Self>);
}

#[async_trait]
pub trait Page: Send {
    /// Navigate to `url` and wait for network idle plus the settle window.
    async fn goto(&mut self, url: &str, options: &NavigationOptions) -> Result<(), RenderError>;

    /// Full serialized document of the current page.
    async fn content(&mut self) -> Result<String, RenderError>;

    async fn close(self: Box<Self>);
}
