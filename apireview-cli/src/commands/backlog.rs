//! Backlog command: issues waiting for API review

use apireview_core::{ApiReviewIssue, Config, Secrets};
use apireview_github::GitHubClient;
use clap::Args;

#[derive(Args, Debug)]
pub struct BacklogArgs {
    /// Only this repository (owner/repo); defaults to the configured repos
    #[arg(short, long)]
    pub repo: Option<String>,

    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

impl BacklogArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let repos = match &self.repo {
            Some(repo) => vec![apireview_github::parse_repo(repo)?],
            None => config.github.repo_names()?,
        };
        let client = GitHubClient::from_secrets(&Secrets::load()?)?;

        let mut issues = Vec::new();
        for repo in &repos {
            issues.extend(client.list_ready_for_review(repo).await?);
        }
        issues.sort_by_key(|i| i.created_at);

        if self.json {
            println!("{}", serde_json::to_string_pretty(&issues)?);
            return Ok(());
        }

        if issues.is_empty() {
            println!("No issues waiting for review");
            return Ok(());
        }
        for issue in &issues {
            println!("{}", backlog_line(issue));
        }
        println!();
        println!("{} issues waiting for review", issues.len());
        Ok(())
    }
}

fn backlog_line(issue: &ApiReviewIssue) -> String {
    format!(
        "{}  {:<28}  {:<10}  {}",
        issue.created_at.format("%Y-%m-%d"),
        issue.key().to_string(),
        issue.milestone,
        issue.title
    )
}
