//! CLI command implementations

pub mod backlog;
pub mod config;
pub mod feedback;
pub mod index;
pub mod stats;
pub mod video;
pub mod webhook;

pub use backlog::BacklogArgs;
pub use config::ConfigArgs;
pub use feedback::FeedbackArgs;
pub use index::IndexArgs;
pub use stats::StatsArgs;
pub use video::VideoArgs;
pub use webhook::WebhookArgs;

use std::sync::Arc;

use apireview_core::{
    Config, FeedbackCollector, IssueCache, IssueSource, JsonFileStore, OfflineSource, Secrets,
    VideoCache, VideoSource,
};
use apireview_github::GitHubClient;
use apireview_youtube::YouTubeClient;
use tracing::{info, warn};

/// Remote sources behind the caches
///
/// Missing credentials degrade to offline lookups so a warm cache is still
/// usable.
fn sources(offline: bool) -> anyhow::Result<(Arc<dyn IssueSource>, Arc<dyn VideoSource>)> {
    if offline {
        info!("Offline mode, using cached data only");
        return Ok((Arc::new(OfflineSource), Arc::new(OfflineSource)));
    }

    let secrets = Secrets::load()?;

    let issues: Arc<dyn IssueSource> = match GitHubClient::from_secrets(&secrets) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            warn!(error = %e, "GitHub unavailable, issue cache misses will fail");
            Arc::new(OfflineSource)
        }
    };

    let videos: Arc<dyn VideoSource> = match YouTubeClient::from_secrets(&secrets) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            warn!(error = %e, "YouTube unavailable, video cache misses will fail");
            Arc::new(OfflineSource)
        }
    };

    Ok((issues, videos))
}

/// Open the issue and video caches under the data directory
pub(crate) fn open_caches(
    config: &Config,
    offline: bool,
) -> anyhow::Result<(Arc<IssueCache>, Arc<VideoCache>)> {
    let (issue_source, video_source) = sources(offline)?;

    let issues = IssueCache::open(
        issue_source,
        Box::new(JsonFileStore::new(config.paths.issues_path())),
    )?;
    let videos = VideoCache::open(
        video_source,
        Box::new(JsonFileStore::new(config.paths.videos_path())),
    )?;

    Ok((Arc::new(issues), Arc::new(videos)))
}

/// Feedback collector over the configured repositories
pub(crate) fn collector(config: &Config) -> anyhow::Result<FeedbackCollector> {
    let secrets = Secrets::load()?;
    let client = GitHubClient::from_secrets(&secrets)?;
    Ok(FeedbackCollector::new(
        Arc::new(client),
        config.github.repo_names()?,
    ))
}
