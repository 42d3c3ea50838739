use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration parse error: {0}")]
    ConfigParse(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Content directory does not exist: {}", .0.display())]
    MissingContentDir(PathBuf),

    #[error("Invalid front-matter in {}: {message}", path.display())]
    FrontMatter { path: PathBuf, message: String },

    #[error("Invalid slug '{slug}' in {}: {reason}", path.display())]
    InvalidSlug {
        path: PathBuf,
        slug: String,
        reason: &'static str,
    },

    #[error("Duplicate slug '{slug}' in {} (already used by {})", path.display(), first.display())]
    DuplicateSlug {
        slug: String,
        first: PathBuf,
        path: PathBuf,
    },
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::ConfigParse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
