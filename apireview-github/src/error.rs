//! Error types for GitHub operations

use thiserror::Error;

/// Result type for GitHub operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during GitHub operations
#[derive(Error, Debug)]
pub enum Error {
    /// GitHub REST API error
    #[error("GitHub API error: {0}")]
    Api(#[from] octocrab::Error),

    /// Authentication error
    #[error("GitHub authentication error: {0}")]
    Auth(String),

    /// Missing environment variable
    #[error("Missing environment variable: {0}")]
    MissingEnv(String),

    /// Issue or pull request not found
    #[error("Issue {0} not found")]
    IssueNotFound(String),

    /// Rate limit exceeded
    #[error("GitHub rate limit exceeded, resets at {0}")]
    RateLimited(String),

    /// Unexpected response shape
    #[error("Parse error: {0}")]
    Parse(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl From<std::env::VarError> for Error {
    fn from(err: std::env::VarError) -> Self {
        Error::MissingEnv(err.to_string())
    }
}

impl From<Error> for apireview_core::Error {
    fn from(err: Error) -> Self {
        apireview_core::Error::Remote(err.to_string())
    }
}
