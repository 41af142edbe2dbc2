//! Video commands: recording summaries and the video cache

use apireview_core::notes::{notes_path, render_notes, video_description};
use apireview_core::summary::summarize_video;
use apireview_core::{ApiReviewSummary, Config, Secrets};
use apireview_youtube::{YouTubeClient, DEFAULT_PLAYLIST};
use clap::{Args, Subcommand, ValueEnum};

use super::{collector, open_caches};

#[derive(Args, Debug)]
pub struct VideoArgs {
    #[command(subcommand)]
    pub command: VideoCommand,
}

#[derive(Subcommand, Debug)]
pub enum VideoCommand {
    /// Summarize the decisions made during a recording
    Show {
        /// Video id
        id: String,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = SummaryFormat::Notes)]
        format: SummaryFormat,
    },

    /// Add every finished recording of a playlist to the video cache
    Sync {
        /// Playlist id
        #[arg(short, long, default_value = DEFAULT_PLAYLIST)]
        playlist: String,
    },

    /// List cached recordings
    List,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SummaryFormat {
    /// Quick-review notes Markdown
    Notes,
    /// Chapter list for the video description
    Description,
    /// Summary record
    Json,
}

impl VideoArgs {
    pub async fn execute(&self, config: &Config, offline: bool) -> anyhow::Result<()> {
        match &self.command {
            VideoCommand::Show { id, format } => show_video(config, offline, id, *format).await,
            VideoCommand::Sync { playlist } => sync_playlist(config, offline, playlist).await,
            VideoCommand::List => list_videos(config).await,
        }
    }
}

async fn show_video(
    config: &Config,
    offline: bool,
    id: &str,
    format: SummaryFormat,
) -> anyhow::Result<()> {
    let (_, videos) = open_caches(config, offline)?;
    let collector = collector(config)?;

    let Some(summary) = summarize_video(&collector, &videos, id, &config.review).await? else {
        println!("No review decisions found for video {}", id);
        return Ok(());
    };

    print_summary(&summary, format)
}

fn print_summary(summary: &ApiReviewSummary, format: SummaryFormat) -> anyhow::Result<()> {
    match format {
        SummaryFormat::Notes => {
            if let Some(date) = summary.date() {
                eprintln!("Notes path: {}", notes_path(date));
            }
            if let Some(markdown) = render_notes(summary) {
                print!("{}", markdown);
            }
        }
        SummaryFormat::Description => print!("{}", video_description(summary)),
        SummaryFormat::Json => println!("{}", serde_json::to_string_pretty(summary)?),
    }
    Ok(())
}

async fn sync_playlist(config: &Config, offline: bool, playlist: &str) -> anyhow::Result<()> {
    if offline {
        anyhow::bail!("Playlist sync needs network access");
    }

    let client = YouTubeClient::from_secrets(&Secrets::load()?)?;
    let recordings = client.playlist_videos(playlist).await?;

    let (_, videos) = open_caches(config, offline)?;
    let count = videos.insert_all(recordings).await?;
    println!("Cached {} recordings from playlist {}", count, playlist);
    Ok(())
}

async fn list_videos(config: &Config) -> anyhow::Result<()> {
    let (_, videos) = open_caches(config, true)?;
    let all = videos.videos().await;

    if all.is_empty() {
        println!("No cached recordings");
        return Ok(());
    }

    for video in all {
        println!(
            "{}  {}  {:>5}m  {}",
            video.start_date_time.format("%Y-%m-%d"),
            video.id,
            video.duration().as_secs() / 60,
            video.title
        );
    }
    Ok(())
}
