//! Stats command

use apireview_core::index::IndexStats;
use apireview_core::{notes, Config};
use clap::Args;

#[derive(Args, Debug)]
pub struct StatsArgs {
    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatsArgs {
    pub fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let notes_dir = config.paths.require_notes_dir()?;
        let stats = IndexStats::from_parsed(&notes::index(notes_dir)?);

        if self.json {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        } else {
            println!("Statistics for {}:", notes_dir.display());
            print!("{}", stats);
        }
        Ok(())
    }
}
