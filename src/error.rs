// Media Catalog Error Types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Ignore pattern error: {0}")]
    Glob(#[from] globset::Error),

    #[error("Path not found: {0}")]
    PathNotFound(String),

    #[error("Indexing already running: {0}")]
    AlreadyRunning(String),

    #[error("indexing canceled")]
    Canceled,

    #[error("no supported files found for {name} ({mime})")]
    Unsupported { name: String, mime: String },

    #[error("Unreadable file: {0}")]
    UnreadableFile(String),

    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("Write conflict: {0}")]
    WriteConflict(String),

    #[error("photo: can't maintain, {0}")]
    MissingIdentity(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Other(String),
}

impl<T> From<std::sync::PoisonError<T>> for CatalogError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        CatalogError::Other(format!("lock poisoned: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;
