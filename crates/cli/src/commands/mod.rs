pub mod feeds;
pub mod prerender;
pub mod routes;
pub mod serve;
pub mod verify;

use anyhow::{Context, Result};
use folio_core::{Document, FolioConfig, Worklist, discover, load_config};
use std::path::Path;

/// Configuration plus everything derived from the content directory
pub struct Site {
    pub config: FolioConfig,
    pub documents: Vec<Document>,
    pub worklist: Worklist,
}

pub fn load_site(config_path: &Path) -> Result<Site> {
    let config = load_config(config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;
    let documents = discover(&config.paths.content).with_context(|| {
        format!(
            "Failed to read blog posts from {}",
            config.paths.content.display()
        )
    })?;
    let worklist = Worklist::build(&config.routes, &documents);

    Ok(Site {
        config,
        documents,
        worklist,
    })
}
