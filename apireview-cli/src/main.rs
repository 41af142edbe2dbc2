//! API review CLI - indexes quick-review notes into review records
//!
//! Reads the notes repository, resolves issues and recordings through local
//! caches, and writes the review index.

mod commands;

use std::path::PathBuf;

use apireview_core::Config;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{BacklogArgs, ConfigArgs, FeedbackArgs, IndexArgs, StatsArgs, VideoArgs, WebhookArgs};

/// Index API design review notes
#[derive(Parser, Debug)]
#[command(name = "apireview")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Notes repository checkout (overrides config and env)
    #[arg(long, global = true, env = "APIREVIEW_NOTES_DIR")]
    notes_dir: Option<PathBuf>,

    /// Directory for caches and the index (overrides config and env)
    #[arg(long, global = true, env = "APIREVIEW_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Never contact GitHub or YouTube; cache misses fail
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show version information
    Version,

    /// Convert all notes files and write the review index
    #[command(visible_alias = "i")]
    Index(IndexArgs),

    /// Show statistics about the notes repository
    Stats(StatsArgs),

    /// List review decisions recorded on GitHub in a time window
    Feedback(FeedbackArgs),

    /// List issues waiting for API review
    Backlog(BacklogArgs),

    /// Work with review recordings
    Video(VideoArgs),

    /// Check whether a webhook delivery affects review state
    Webhook(WebhookArgs),

    /// Show current configuration
    Config(ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    let config = Config::load_with_overrides(cli.notes_dir.clone(), cli.data_dir.clone())?;

    if cli.verbose {
        tracing::info!(
            notes_dir = ?config.paths.notes_dir,
            data_dir = %config.paths.data_dir.display(),
            offline = cli.offline,
            "Configuration loaded"
        );
    }

    match cli.command {
        Some(Commands::Version) => {
            println!("apireview {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Index(args)) => {
            args.execute(&config, cli.offline).await?;
        }
        Some(Commands::Stats(args)) => {
            args.execute(&config)?;
        }
        Some(Commands::Feedback(args)) => {
            args.execute(&config, cli.verbose).await?;
        }
        Some(Commands::Backlog(args)) => {
            args.execute(&config).await?;
        }
        Some(Commands::Video(args)) => {
            args.execute(&config, cli.offline).await?;
        }
        Some(Commands::Webhook(args)) => {
            args.execute()?;
        }
        Some(Commands::Config(args)) => {
            args.execute(&config).await?;
        }
        None => {
            println!("apireview - API design review indexer");
            println!();
            println!("Use --help for usage information");
        }
    }

    Ok(())
}
