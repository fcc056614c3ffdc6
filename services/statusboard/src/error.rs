//! Error types for the status board

/// Errors that can occur inside the status board
#[derive(Debug, thiserror::Error)]
pub enum StatusBoardError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Upstream error: {0}")]
    Upstream(String),
}

/// Result type alias for status board operations
pub type Result<T> = std::result::Result<T, StatusBoardError>;
