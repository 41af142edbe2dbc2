//! Index command: notes files to review index

use std::path::PathBuf;

use anyhow::bail;
use apireview_core::index::{write_index, IndexStats};
use apireview_core::{notes, Config, ReviewConverter};
use clap::Args;
use tracing::info;

use super::open_caches;

#[derive(Args, Debug)]
pub struct IndexArgs {
    /// Where to write the index (defaults to <data_dir>/reviews.json)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print statistics after indexing
    #[arg(long)]
    pub stats: bool,
}

impl IndexArgs {
    pub async fn execute(&self, config: &Config, offline: bool) -> anyhow::Result<()> {
        let notes_dir = config.paths.require_notes_dir()?;
        let parsed = notes::index(notes_dir)?;
        info!(files = parsed.len(), "Parsed notes");

        let (issues, videos) = open_caches(config, offline)?;
        let converter = ReviewConverter::new(issues, videos, config.review.clone());
        let report = converter.convert(&parsed).await;

        let output = self
            .output
            .clone()
            .unwrap_or_else(|| config.paths.index_path());
        write_index(&output, &report.summaries)?;

        println!(
            "Indexed {} reviews to {}",
            report.summaries.len(),
            output.display()
        );
        if !report.skipped.is_empty() {
            println!("Skipped {} files without resolvable items", report.skipped.len());
        }

        if self.stats {
            println!();
            println!("Statistics:");
            print!("{}", IndexStats::from_parsed(&parsed));
        }

        if !report.is_success() {
            for failure in &report.failures {
                eprintln!("  {}: {}", failure.path.display(), failure.error);
            }
            bail!("{} notes files failed to convert", report.failures.len());
        }

        Ok(())
    }
}
