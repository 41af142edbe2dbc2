//! GitHub API client using octocrab

use crate::{Error, Result};
use apireview_core::{RepoName, Secrets};
use octocrab::Octocrab;
use tracing::{debug, info};

/// GitHub API client shared by all repositories
pub struct GitHubClient {
    client: Octocrab,
    http: reqwest::Client,
    token: String,
}

impl GitHubClient {
    /// Create a client authenticated with a personal access token
    pub fn new(token: impl Into<String>) -> Result<Self> {
        let token = token.into();

        let client = Octocrab::builder()
            .personal_token(token.clone())
            .build()
            .map_err(|e| Error::Auth(format!("Failed to create GitHub client: {}", e)))?;

        let http = reqwest::Client::builder()
            .user_agent(concat!("apireview/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;

        info!("Created GitHub client");
        Ok(Self {
            client,
            http,
            token,
        })
    }

    /// Create a client from loaded secrets
    ///
    /// Token is taken from (in priority order):
    /// 1. GITHUB_TOKEN environment variable
    /// 2. ~/.config/apireview/secrets.toml
    pub fn from_secrets(secrets: &Secrets) -> Result<Self> {
        let token = secrets.github_token().ok_or_else(|| {
            Error::Auth(
                "GitHub token not found. Set GITHUB_TOKEN environment variable \
                 or add token to ~/.config/apireview/secrets.toml"
                    .to_string(),
            )
        })?;
        Self::new(token)
    }

    /// Get the underlying octocrab client
    pub fn client(&self) -> &Octocrab {
        &self.client
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn token(&self) -> &str {
        &self.token
    }

    /// Test the connection by fetching repository info
    pub async fn test_connection(&self, repo: &RepoName) -> Result<()> {
        debug!(repo = %repo, "Testing GitHub connection");

        self.client
            .repos(&repo.owner, &repo.repo)
            .get()
            .await
            .map_err(|e| match e {
                octocrab::Error::GitHub { source, .. } if source.message.contains("Not Found") => {
                    Error::Other(format!("Repository {} not found or not accessible", repo))
                }
                octocrab::Error::GitHub { source, .. } if source.message.contains("Bad credentials") => {
                    Error::Auth("Invalid GitHub token".to_string())
                }
                other => Error::Api(other),
            })?;

        info!(repo = %repo, "GitHub connection successful");
        Ok(())
    }
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient").finish_non_exhaustive()
    }
}

/// Parse a repository reference
///
/// Supports formats:
/// - owner/repo
/// - https://github.com/owner/repo
/// - git@github.com:owner/repo.git
pub fn parse_repo(reference: &str) -> Result<RepoName> {
    let path = if reference.starts_with("https://") || reference.starts_with("http://") {
        let url = url::Url::parse(reference).map_err(|e| Error::Parse(e.to_string()))?;
        url.path().trim_start_matches('/').to_string()
    } else if let Some(rest) = reference.strip_prefix("git@") {
        rest.split_once(':')
            .map(|(_, path)| path.to_string())
            .ok_or_else(|| Error::Parse(format!("Invalid SSH URL: {}", reference)))?
    } else {
        reference.to_string()
    };

    let mut parts = path.trim_end_matches('/').trim_end_matches(".git").split('/');
    match (parts.next(), parts.next()) {
        (Some(owner), Some(repo)) if !owner.is_empty() && !repo.is_empty() => Ok(RepoName {
            owner: owner.to_string(),
            repo: repo.to_string(),
        }),
        _ => Err(Error::Parse(format!(
            "Invalid repository format: {}. Expected owner/repo",
            reference
        ))),
    }
}
