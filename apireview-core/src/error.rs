//! Error types for the review indexer

use thiserror::Error;

/// Result type alias for review indexer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for review indexer operations
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed input that cannot be recovered from
    #[error("Parse error: {0}")]
    Parse(String),

    /// A remote fetch (issue tracker, video platform) failed
    #[error("Remote fetch failed: {0}")]
    Remote(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}
