//! Configuration management for the review indexer
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (APIREVIEW_*)
//! 3. Config file (~/.config/apireview/config.toml)
//! 4. Default values

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::align::AlignOptions;
use crate::model::RepoName;
use crate::{Error, Result};

/// Where notes are read from and where caches and the index live
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Checkout of the review notes repository
    pub notes_dir: Option<PathBuf>,

    /// Directory holding issues.json, videos.json and reviews.json
    pub data_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            notes_dir: None,
            data_dir: dirs::data_dir()
                .map(|p| p.join("apireview"))
                .unwrap_or_else(|| PathBuf::from("data")),
        }
    }
}

impl PathsConfig {
    /// Issue cache snapshot
    pub fn issues_path(&self) -> PathBuf {
        self.data_dir.join("issues.json")
    }

    /// Video cache snapshot
    pub fn videos_path(&self) -> PathBuf {
        self.data_dir.join("videos.json")
    }

    /// Output index
    pub fn index_path(&self) -> PathBuf {
        self.data_dir.join("reviews.json")
    }

    /// Notes directory, or an error naming how to set it
    pub fn require_notes_dir(&self) -> Result<&Path> {
        self.notes_dir.as_deref().ok_or_else(|| {
            Error::Config(
                "Notes directory not set. Use --notes-dir, APIREVIEW_NOTES_DIR or [paths] notes_dir"
                    .to_string(),
            )
        })
    }
}

/// How review records are assembled
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReviewConfig {
    /// Label prefix denoting a topical area
    pub area_label_prefix: String,

    /// Summary title used when no area labels are present
    pub default_title: String,

    /// How long after a recording ends feedback still belongs to it
    #[serde(with = "humantime_serde")]
    pub grace_period: Duration,

    /// How far before a decision video deep links start
    #[serde(with = "humantime_serde")]
    pub lead_in: Duration,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        let align = AlignOptions::default();
        Self {
            area_label_prefix: "area-".to_string(),
            default_title: "GitHub Quick Reviews".to_string(),
            grace_period: align.grace_period,
            lead_in: align.lead_in,
        }
    }
}

impl ReviewConfig {
    pub fn align_options(&self) -> AlignOptions {
        AlignOptions {
            grace_period: self.grace_period,
            lead_in: self.lead_in,
        }
    }
}

/// Tracker settings for the live feedback path
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// Repositories searched for review decisions, as `owner/repo`
    pub repos: Vec<String>,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            repos: ["dotnet/designs", "dotnet/runtime", "dotnet/winforms"]
                .iter()
                .map(|r| r.to_string())
                .collect(),
        }
    }
}

impl GitHubConfig {
    pub fn repo_names(&self) -> Result<Vec<RepoName>> {
        self.repos.iter().map(|r| r.parse()).collect()
    }
}

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,
    pub review: ReviewConfig,
    pub github: GitHubConfig,
}

impl Config {
    /// Load configuration from the default config file location
    ///
    /// Returns default config if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = Self::default_config_path() {
            if path.exists() {
                return Self::load_from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Get the default config file path
    ///
    /// Returns `~/.config/apireview/config.toml` on Unix
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("apireview").join("config.toml"))
    }

    /// Apply environment variable overrides
    ///
    /// Supported variables:
    /// - APIREVIEW_NOTES_DIR: Notes checkout
    /// - APIREVIEW_DATA_DIR: Cache and index directory
    /// - APIREVIEW_REPOS: Comma-separated `owner/repo` list
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(dir) = std::env::var("APIREVIEW_NOTES_DIR") {
            self.paths.notes_dir = Some(PathBuf::from(dir));
        }

        if let Ok(dir) = std::env::var("APIREVIEW_DATA_DIR") {
            self.paths.data_dir = PathBuf::from(dir);
        }

        if let Ok(repos) = std::env::var("APIREVIEW_REPOS") {
            self.github.repos = split_list(&repos);
        }

        self
    }

    /// Apply CLI flag overrides
    pub fn with_cli_overrides(mut self, notes_dir: Option<PathBuf>, data_dir: Option<PathBuf>) -> Self {
        if let Some(dir) = notes_dir {
            self.paths.notes_dir = Some(dir);
        }

        if let Some(dir) = data_dir {
            self.paths.data_dir = dir;
        }

        self
    }

    /// Load configuration with all overrides applied
    ///
    /// Priority: CLI > env > config file > defaults
    pub fn load_with_overrides(notes_dir: Option<PathBuf>, data_dir: Option<PathBuf>) -> Result<Self> {
        Ok(Self::load()?
            .with_env_overrides()
            .with_cli_overrides(notes_dir, data_dir))
    }

    /// Render as TOML, as written to the config file
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.review.area_label_prefix, "area-");
        assert_eq!(config.review.default_title, "GitHub Quick Reviews");
        assert_eq!(config.review.grace_period, Duration::from_secs(900));
        assert_eq!(config.review.lead_in, Duration::from_secs(10));
        assert!(config.paths.notes_dir.is_none());
        assert_eq!(config.github.repo_names().unwrap().len(), 3);
    }

    #[test]
    fn test_cli_overrides() {
        let config = Config::default().with_cli_overrides(
            Some(PathBuf::from("/notes")),
            Some(PathBuf::from("/data")),
        );

        assert_eq!(config.paths.notes_dir, Some(PathBuf::from("/notes")));
        assert_eq!(config.paths.index_path(), PathBuf::from("/data/reviews.json"));
        assert_eq!(config.paths.issues_path(), PathBuf::from("/data/issues.json"));
        assert_eq!(config.paths.videos_path(), PathBuf::from("/data/videos.json"));
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
[paths]
notes_dir = "/src/apireviews"
data_dir = "/var/lib/apireview"

[review]
area_label_prefix = "area:"
default_title = "API Review"
grace_period = "30m"
lead_in = "5s"

[github]
repos = ["dotnet/runtime"]
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.paths.notes_dir, Some(PathBuf::from("/src/apireviews")));
        assert_eq!(config.review.area_label_prefix, "area:");
        assert_eq!(config.review.grace_period, Duration::from_secs(1800));
        assert_eq!(config.review.align_options().lead_in, Duration::from_secs(5));
        assert_eq!(config.github.repos, vec!["dotnet/runtime"]);
    }

    #[test]
    fn test_partial_toml() {
        let toml = r#"
[review]
default_title = "Design Reviews"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.review.default_title, "Design Reviews");
        // Other fields keep their defaults
        assert_eq!(config.review.area_label_prefix, "area-");
        assert_eq!(config.review.lead_in, Duration::from_secs(10));
    }

    #[test]
    fn test_round_trip_toml() {
        let config = Config::default();
        let parsed: Config = toml::from_str(&config.to_toml().unwrap()).unwrap();
        assert_eq!(parsed.review.grace_period, config.review.grace_period);
        assert_eq!(parsed.github.repos, config.github.repos);
    }

    #[test]
    fn test_invalid_repo_name() {
        let config = GitHubConfig {
            repos: vec!["runtime".to_string()],
        };
        assert!(config.repo_names().is_err());
    }

    #[test]
    fn test_missing_notes_dir() {
        assert!(Config::default().paths.require_notes_dir().is_err());
    }

    #[test]
    fn test_split_list() {
        assert_eq!(split_list(" a/b, c/d ,,"), vec!["a/b", "c/d"]);
    }
}
