pub mod config;
pub mod content;
pub mod error;
pub mod routes;
pub mod types;

pub use config::{load_config, parse_folio_toml};
pub use content::discover;
pub use error::{Error, Result};
pub use routes::Worklist;
pub use types::*;
