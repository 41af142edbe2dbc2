//! Feedback command: review decisions from tracker timelines

use anyhow::Context;
use apireview_core::summary::summarize_window;
use apireview_core::timeline::ReviewWindow;
use apireview_core::Config;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use clap::Args;

use super::collector;

#[derive(Args, Debug)]
pub struct FeedbackArgs {
    /// Window start (RFC 3339 timestamp or YYYY-MM-DD)
    #[arg(long)]
    pub start: String,

    /// Window end (RFC 3339 timestamp or YYYY-MM-DD, defaults to now)
    #[arg(long)]
    pub end: Option<String>,

    /// Print the summary as JSON
    #[arg(long)]
    pub json: bool,
}

impl FeedbackArgs {
    pub async fn execute(&self, config: &Config, verbose: bool) -> anyhow::Result<()> {
        let start = parse_time(&self.start)?;
        let end = match &self.end {
            Some(end) => parse_time(end)?,
            None => Utc::now(),
        };
        if end < start {
            anyhow::bail!("Window end {} is before start {}", end, start);
        }

        let collector = collector(config)?;
        let window = ReviewWindow::new(start, end);
        let Some(summary) = summarize_window(&collector, &window, &config.review).await? else {
            println!("No review decisions between {} and {}", start, end);
            return Ok(());
        };

        if self.json {
            println!("{}", serde_json::to_string_pretty(&summary)?);
            return Ok(());
        }

        println!("{}", summary.title);
        println!();
        for item in &summary.items {
            println!(
                "{}  {:<10}  {}  {}",
                item.feedback_date_time.format("%Y-%m-%d %H:%M"),
                item.decision.to_string(),
                item.issue.key(),
                item.issue.title
            );
            if verbose {
                println!("    {}", item.feedback_url);
            }
        }
        Ok(())
    }
}

/// A timestamp, or a bare date meaning midnight UTC
fn parse_time(value: &str) -> anyhow::Result<DateTime<Utc>> {
    if let Ok(time) = DateTime::parse_from_rfc3339(value) {
        return Ok(time.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("Invalid time '{}', expected RFC 3339 or YYYY-MM-DD", value))?;
    Ok(date.and_time(NaiveTime::default()).and_utc())
}
