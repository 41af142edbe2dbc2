//! Issue lookup over the REST API

use crate::{Error, GitHubClient, Result};
use apireview_core::model::{normalize_title, API_READY_FOR_REVIEW, NO_MILESTONE};
use apireview_core::{ApiReviewIssue, ApiReviewLabel, IssueRef, IssueSource, RepoName};
use async_trait::async_trait;
use octocrab::models::issues::Issue;
use octocrab::params::State;
use tracing::{debug, info};

impl GitHubClient {
    /// Get a single issue or pull request
    pub async fn get_issue(&self, issue: &IssueRef) -> Result<ApiReviewIssue> {
        debug!(issue = %issue, "Fetching issue");

        let fetched = self
            .client()
            .issues(&issue.owner, &issue.repo)
            .get(issue.number)
            .await
            .map_err(|e| match e {
                octocrab::Error::GitHub { source, .. } if source.message.contains("Not Found") => {
                    Error::IssueNotFound(issue.to_string())
                }
                other => Error::Api(other),
            })?;

        Ok(to_review_issue(&issue.owner, &issue.repo, fetched))
    }

    /// Open issues currently waiting for API review
    pub async fn list_ready_for_review(&self, repo: &RepoName) -> Result<Vec<ApiReviewIssue>> {
        debug!(repo = %repo, "Listing issues ready for review");

        let labels = [API_READY_FOR_REVIEW.to_string()];
        let page = self
            .client()
            .issues(&repo.owner, &repo.repo)
            .list()
            .state(State::Open)
            .labels(&labels)
            .per_page(100)
            .send()
            .await?;

        let issues = self.client().all_pages(page).await?;
        info!(repo = %repo, count = issues.len(), "Listed backlog issues");

        Ok(issues
            .into_iter()
            .map(|i| to_review_issue(&repo.owner, &repo.repo, i))
            .collect())
    }
}

#[async_trait]
impl IssueSource for GitHubClient {
    async fn fetch_issue(&self, issue: &IssueRef) -> apireview_core::Result<ApiReviewIssue> {
        Ok(self.get_issue(issue).await?)
    }
}

/// Convert an octocrab issue into a cache record
fn to_review_issue(owner: &str, repo: &str, issue: Issue) -> ApiReviewIssue {
    ApiReviewIssue {
        owner: owner.to_string(),
        repo: repo.to_string(),
        id: issue.number,
        author: issue.user.login,
        created_at: issue.created_at,
        title: normalize_title(&issue.title),
        url: issue.html_url.to_string(),
        milestone: issue
            .milestone
            .map(|m| m.title)
            .unwrap_or_else(|| NO_MILESTONE.to_string()),
        labels: issue
            .labels
            .into_iter()
            .map(|l| ApiReviewLabel {
                name: l.name,
                background_color: l.color,
                description: l.description.filter(|d| !d.is_empty()),
            })
            .collect(),
    }
}
