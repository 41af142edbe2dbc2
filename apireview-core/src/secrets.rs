//! Credentials for the issue tracker and the video platform
//!
//! Credentials live in `~/.config/apireview/secrets.toml`, separate from the
//! shareable configuration. On Unix the file must not be readable by group
//! or others.
//!
//! Lookup priority:
//! 1. Environment variables (`GITHUB_TOKEN`, `YOUTUBE_API_KEY`)
//! 2. Secrets file

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{Error, Result};

const TEMPLATE: &str = r#"# API review indexer secrets
# Keep this file private (chmod 600) and out of version control.

[github]
# Personal access token, read access to public issues is enough
token = ""

[youtube]
# YouTube Data API v3 key
api_key = ""
"#;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Secrets {
    pub github: GitHubSecrets,
    pub youtube: YouTubeSecrets,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct GitHubSecrets {
    pub token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct YouTubeSecrets {
    pub api_key: Option<String>,
}

impl Secrets {
    /// Load secrets from the default location, or empty secrets if there is no file
    pub fn load() -> Result<Self> {
        match Self::default_secrets_path() {
            Some(path) if path.exists() => Self::load_from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load secrets from a specific file, refusing files others can read
    pub fn load_from_file(path: &Path) -> Result<Self> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            let mode = std::fs::metadata(path)?.permissions().mode();
            if mode & 0o077 != 0 {
                return Err(Error::Config(format!(
                    "Secrets file {} has insecure permissions {:o}. Please run: chmod 600 {}",
                    path.display(),
                    mode & 0o777,
                    path.display()
                )));
            }
        }

        let contents = std::fs::read_to_string(path)?;
        let mut secrets: Secrets = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse secrets: {}", e)))?;

        secrets.github.token = clean(secrets.github.token);
        secrets.youtube.api_key = clean(secrets.youtube.api_key);
        debug!(path = %path.display(), "Loaded secrets");

        Ok(secrets)
    }

    /// Returns `~/.config/apireview/secrets.toml` on Unix
    pub fn default_secrets_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("apireview").join("secrets.toml"))
    }

    /// GitHub token; `GITHUB_TOKEN` wins over the file
    pub fn github_token(&self) -> Option<String> {
        from_env("GITHUB_TOKEN").or_else(|| self.github.token.clone())
    }

    /// YouTube API key; `YOUTUBE_API_KEY` wins over the file
    pub fn youtube_api_key(&self) -> Option<String> {
        from_env("YOUTUBE_API_KEY").or_else(|| self.youtube.api_key.clone())
    }

    /// Write an empty secrets file with owner-only permissions
    ///
    /// Fails if the file already exists.
    pub fn create_template() -> Result<PathBuf> {
        let path = Self::default_secrets_path()
            .ok_or_else(|| Error::Config("Could not determine secrets path".to_string()))?;
        Self::create_template_at(&path)?;
        Ok(path)
    }

    pub fn create_template_at(path: &Path) -> Result<()> {
        if path.exists() {
            return Err(Error::Config(format!(
                "Secrets file already exists at {}",
                path.display()
            )));
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, TEMPLATE)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }

        warn!(path = %path.display(), "Created secrets template - please add your credentials");
        Ok(())
    }
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn from_env(name: &str) -> Option<String> {
    let value = clean(std::env::var(name).ok())?;
    debug!(variable = name, "Using credential from environment");
    Some(value)
}
