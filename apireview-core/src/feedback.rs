//! Feedback attribution for resolved review outcomes
//!
//! Once an outcome is known, the reviewer's comment closest to the decision
//! becomes the feedback for that item. Comments may start with a
//! `[Video](url)` marker pointing into the session recording.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::apis::scan_markdown;
use crate::model::{ApiReviewIssue, ApiReviewItem, RepoName};
use crate::timeline::{resolve_outcome, ReviewOutcome, ReviewWindow, TimelineEvent, TimelineEventKind};
use crate::Result;

/// An issue together with its timeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueTimeline {
    pub issue: ApiReviewIssue,
    pub events: Vec<TimelineEvent>,
}

/// Source of issue timelines, typically the tracker's GraphQL API
#[async_trait]
pub trait TimelineSource: Send + Sync {
    /// Issues of `repo` updated since `since`, with their timelines
    async fn issue_timelines(&self, repo: &RepoName, since: DateTime<Utc>) -> Result<Vec<IssueTimeline>>;
}

/// Comment chosen as the feedback for an outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedbackComment<'a> {
    pub id: &'a str,
    pub body: &'a str,
    pub url: &'a str,
    pub created_at: DateTime<Utc>,
}

/// Find the decision maker's comment closest in time to the decision
///
/// Only comments inside `window` are considered. The actor comparison
/// ignores case; on equal distance the earlier comment wins.
pub fn attribute<'a>(
    events: &'a [TimelineEvent],
    outcome: &ReviewOutcome,
    window: &ReviewWindow,
) -> Option<FeedbackComment<'a>> {
    let mut comments: Vec<FeedbackComment<'a>> = events
        .iter()
        .filter(|e| window.contains(e.created_at))
        .filter(|e| e.actor.eq_ignore_ascii_case(&outcome.decision_maker))
        .filter_map(|e| match &e.kind {
            TimelineEventKind::Commented { id, body, url } => Some(FeedbackComment {
                id,
                body,
                url,
                created_at: e.created_at,
            }),
            _ => None,
        })
        .collect();
    comments.sort_by_key(|c| c.created_at);

    comments
        .into_iter()
        .min_by_key(|c| (c.created_at - outcome.decided_at).num_milliseconds().abs())
}

/// Split a leading `[Video](url)` marker off a comment body
///
/// Returns the video URL, if present, and the remaining Markdown with
/// leading whitespace removed.
pub fn split_video_marker(body: &str) -> (Option<&str>, &str) {
    const PREFIX: &str = "[Video](";

    if let Some(rest) = body.strip_prefix(PREFIX) {
        if let Some(end) = rest.find(')') {
            return (Some(&rest[..end]), rest[end + 1..].trim_start());
        }
    }

    (None, body)
}

/// A resolved review decision from the live path
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewFeedback {
    pub item: ApiReviewItem,
    /// Recording link the reviewer put at the top of the comment
    pub video_url: Option<String>,
}

/// Resolve the outcome of one issue and attach its feedback
pub fn resolve_item(timeline: &IssueTimeline, window: &ReviewWindow) -> Option<ReviewFeedback> {
    let outcome = resolve_outcome(&timeline.events, window)?;
    let comment = attribute(&timeline.events, &outcome, window);

    let (video_url, markdown) = match comment {
        Some(c) => {
            let (video, markdown) = split_video_marker(c.body);
            (video.map(str::to_string), Some(markdown.to_string()))
        }
        None => (None, None),
    };
    let apis = markdown
        .as_deref()
        .map(|m| scan_markdown(m).apis)
        .unwrap_or_default();

    Some(ReviewFeedback {
        item: ApiReviewItem {
            decision: outcome.decision,
            issue: timeline.issue.clone(),
            feedback_date_time: outcome.decided_at,
            feedback_id: comment.map(|c| c.id.to_string()),
            feedback_author: Some(outcome.decision_maker),
            feedback_url: comment.map_or_else(|| timeline.issue.url.clone(), |c| c.url.to_string()),
            feedback_markdown: markdown,
            time_code: std::time::Duration::ZERO,
            apis,
        },
        video_url,
    })
}

/// Collects review feedback across repositories
pub struct FeedbackCollector {
    source: Arc<dyn TimelineSource>,
    repos: Vec<RepoName>,
}

impl FeedbackCollector {
    pub fn new(source: Arc<dyn TimelineSource>, repos: Vec<RepoName>) -> Self {
        Self { source, repos }
    }

    /// Review decisions made inside `window`, ordered by decision time
    ///
    /// Issues without an API review label are ignored. A failing repository
    /// query fails the whole collection.
    pub async fn collect(&self, window: &ReviewWindow) -> Result<Vec<ReviewFeedback>> {
        let mut results = Vec::new();

        for repo in &self.repos {
            let timelines = self.source.issue_timelines(repo, window.start).await?;
            debug!(repo = %repo, issues = timelines.len(), "Fetched issue timelines");

            results.extend(
                timelines
                    .iter()
                    .filter(|t| t.issue.is_api_issue())
                    .filter_map(|t| resolve_item(t, window)),
            );
        }

        results.sort_by_key(|f| f.item.feedback_date_time);
        info!(
            start = %window.start,
            end = %window.end,
            decisions = results.len(),
            "Collected review feedback"
        );
        Ok(results)
    }
}
