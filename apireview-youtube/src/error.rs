//! Error types for YouTube operations

use thiserror::Error;

/// Result type for YouTube operations
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Missing or rejected API key
    #[error("YouTube authentication error: {0}")]
    Auth(String),

    /// Error reported by the API
    #[error("YouTube API error {code}: {message}")]
    Api { code: u16, message: String },

    /// Unexpected response shape
    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<Error> for apireview_core::Error {
    fn from(err: Error) -> Self {
        apireview_core::Error::Remote(err.to_string())
    }
}
