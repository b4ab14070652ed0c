use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Telegram API error: {description}")]
    Telegram { description: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failures reading or writing the persisted watchlists.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to access store file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("store file {path} is corrupt: {source}")]
    CorruptState {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize store: {0}")]
    Serialize(#[from] serde_json::Error),
}

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;
