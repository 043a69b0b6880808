use thiserror::Error;

#[derive(Error, Debug)]
pub enum MediaRpcError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Staging error: {0}")]
    Staging(String),
}

pub type Result<T> = std::result::Result<T, MediaRpcError>;
