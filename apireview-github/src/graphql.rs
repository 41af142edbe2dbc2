//! GraphQL queries for issue timelines
//!
//! The REST timeline endpoint is one request per issue; a review window can
//! touch hundreds of issues, so timelines are fetched in bulk here.

use crate::{Error, GitHubClient, Result};
use apireview_core::feedback::IssueTimeline;
use apireview_core::model::{normalize_title, NO_MILESTONE};
use apireview_core::timeline::{TimelineEvent, TimelineEventKind};
use apireview_core::{ApiReviewIssue, ApiReviewLabel, RepoName, TimelineSource};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

const GRAPHQL_URL: &str = "https://api.github.com/graphql";

/// Login shown for deleted accounts
const GHOST: &str = "ghost";

const ISSUES_QUERY: &str = r#"
    query($owner: String!, $repo: String!, $since: DateTime!, $cursor: String) {
        repository(owner: $owner, name: $repo) {
            issues(first: 50, after: $cursor, filterBy: { since: $since }) {
                pageInfo { hasNextPage endCursor }
                nodes {
                    number
                    title
                    url
                    createdAt
                    author { login }
                    milestone { title }
                    labels(first: 100) { nodes { name color description } }
                    timelineItems(first: 100, itemTypes: [ISSUE_COMMENT, LABELED_EVENT, REOPENED_EVENT, CLOSED_EVENT]) {
                        pageInfo { hasNextPage endCursor }
                        nodes { ...timelineNode }
                    }
                }
            }
        }
    }
"#;

const TIMELINE_QUERY: &str = r#"
    query($owner: String!, $repo: String!, $number: Int!, $cursor: String) {
        repository(owner: $owner, name: $repo) {
            issue(number: $number) {
                timelineItems(first: 100, after: $cursor, itemTypes: [ISSUE_COMMENT, LABELED_EVENT, REOPENED_EVENT, CLOSED_EVENT]) {
                    pageInfo { hasNextPage endCursor }
                    nodes { ...timelineNode }
                }
            }
        }
    }
"#;

const TIMELINE_FRAGMENT: &str = r#"
    fragment timelineNode on IssueTimelineItems {
        __typename
        ... on IssueComment { databaseId body url createdAt author { login } }
        ... on LabeledEvent { createdAt actor { login } label { name } }
        ... on ReopenedEvent { createdAt actor { login } }
        ... on ClosedEvent { createdAt actor { login } }
    }
"#;

/// GraphQL query response wrapper
#[derive(Debug, Deserialize)]
struct GraphQLResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphQLError>>,
}

/// GraphQL error
#[derive(Debug, Deserialize)]
struct GraphQLError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct IssuesData {
    repository: Option<IssuesRepository>,
}

#[derive(Debug, Deserialize)]
struct IssuesRepository {
    issues: Connection<IssueNode>,
}

#[derive(Debug, Deserialize)]
struct TimelineData {
    repository: Option<TimelineRepository>,
}

#[derive(Debug, Deserialize)]
struct TimelineRepository {
    issue: Option<TimelineIssue>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimelineIssue {
    timeline_items: Connection<TimelineNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Connection<T> {
    #[serde(default)]
    page_info: PageInfo,
    nodes: Vec<Option<T>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    has_next_page: bool,
    end_cursor: Option<String>,
}

impl PageInfo {
    fn next_cursor(&self) -> Option<&str> {
        if self.has_next_page {
            self.end_cursor.as_deref()
        } else {
            None
        }
    }
}

#[derive(Debug, Deserialize)]
struct Actor {
    login: String,
}

fn login(actor: Option<Actor>) -> String {
    actor.map(|a| a.login).unwrap_or_else(|| GHOST.to_string())
}

#[derive(Debug, Deserialize)]
struct Named {
    name: String,
}

#[derive(Debug, Deserialize)]
struct MilestoneNode {
    title: String,
}

#[derive(Debug, Deserialize)]
struct LabelNode {
    name: String,
    color: String,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IssueNode {
    number: u64,
    title: String,
    url: String,
    created_at: DateTime<Utc>,
    author: Option<Actor>,
    milestone: Option<MilestoneNode>,
    labels: Connection<LabelNode>,
    timeline_items: Connection<TimelineNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentNode {
    database_id: Option<u64>,
    body: String,
    url: String,
    created_at: DateTime<Utc>,
    author: Option<Actor>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LabeledNode {
    created_at: DateTime<Utc>,
    actor: Option<Actor>,
    label: Named,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StateNode {
    created_at: DateTime<Utc>,
    actor: Option<Actor>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "__typename")]
enum TimelineNode {
    IssueComment(CommentNode),
    LabeledEvent(LabeledNode),
    ReopenedEvent(StateNode),
    ClosedEvent(StateNode),
    #[serde(other)]
    Other,
}

impl TimelineNode {
    fn into_event(self) -> Option<TimelineEvent> {
        match self {
            TimelineNode::IssueComment(c) => {
                // Comment URL fragments use the numeric id
                let id = c
                    .database_id
                    .map(|id| id.to_string())
                    .or_else(|| c.url.rsplit_once("#issuecomment-").map(|(_, id)| id.to_string()))?;
                Some(TimelineEvent::new(
                    login(c.author),
                    c.created_at,
                    TimelineEventKind::Commented {
                        id,
                        body: c.body,
                        url: c.url,
                    },
                ))
            }
            TimelineNode::LabeledEvent(l) => Some(TimelineEvent::new(
                login(l.actor),
                l.created_at,
                TimelineEventKind::Labeled { label: l.label.name },
            )),
            TimelineNode::ReopenedEvent(s) => Some(TimelineEvent::new(
                login(s.actor),
                s.created_at,
                TimelineEventKind::Reopened,
            )),
            TimelineNode::ClosedEvent(s) => Some(TimelineEvent::new(
                login(s.actor),
                s.created_at,
                TimelineEventKind::Closed,
            )),
            TimelineNode::Other => None,
        }
    }
}

fn events(nodes: Vec<Option<TimelineNode>>) -> impl Iterator<Item = TimelineEvent> {
    nodes.into_iter().flatten().filter_map(TimelineNode::into_event)
}

impl IssueNode {
    fn into_issue(self, repo: &RepoName) -> ApiReviewIssue {
        ApiReviewIssue {
            owner: repo.owner.clone(),
            repo: repo.repo.clone(),
            id: self.number,
            author: login(self.author),
            created_at: self.created_at,
            title: normalize_title(&self.title),
            url: self.url,
            milestone: self
                .milestone
                .map(|m| m.title)
                .unwrap_or_else(|| NO_MILESTONE.to_string()),
            labels: self
                .labels
                .nodes
                .into_iter()
                .flatten()
                .map(|l| ApiReviewLabel {
                    name: l.name,
                    background_color: l.color,
                    description: l.description.filter(|d| !d.is_empty()),
                })
                .collect(),
        }
    }
}

impl GitHubClient {
    /// Issues of `repo` updated since `since`, with complete timelines
    pub async fn get_issue_timelines(
        &self,
        repo: &RepoName,
        since: DateTime<Utc>,
    ) -> Result<Vec<IssueTimeline>> {
        debug!(repo = %repo, since = %since, "Fetching issue timelines via GraphQL");

        let mut timelines = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let variables = json!({
                "owner": repo.owner,
                "repo": repo.repo,
                "since": since.to_rfc3339(),
                "cursor": cursor,
            });

            let data: IssuesData = self
                .graphql_query(&format!("{}{}", ISSUES_QUERY, TIMELINE_FRAGMENT), &variables)
                .await?;
            let issues = data
                .repository
                .ok_or_else(|| Error::Other(format!("Repository {} not found", repo)))?
                .issues;

            for mut node in issues.nodes.into_iter().flatten() {
                let mut timeline_cursor = node.timeline_items.page_info.next_cursor().map(String::from);
                let mut issue_events: Vec<TimelineEvent> =
                    events(std::mem::take(&mut node.timeline_items.nodes)).collect();

                while let Some(after) = timeline_cursor {
                    let (more, next) = self.timeline_page(repo, node.number, &after).await?;
                    issue_events.extend(more);
                    timeline_cursor = next;
                }

                timelines.push(IssueTimeline {
                    issue: node.into_issue(repo),
                    events: issue_events,
                });
            }

            match issues.page_info.next_cursor() {
                Some(next) => cursor = Some(next.to_string()),
                None => break,
            }
        }

        info!(repo = %repo, count = timelines.len(), "Fetched issue timelines");
        Ok(timelines)
    }

    /// One further page of an issue timeline
    async fn timeline_page(
        &self,
        repo: &RepoName,
        number: u64,
        cursor: &str,
    ) -> Result<(Vec<TimelineEvent>, Option<String>)> {
        debug!(repo = %repo, number, "Fetching additional timeline page");

        let variables = json!({
            "owner": repo.owner,
            "repo": repo.repo,
            "number": number,
            "cursor": cursor,
        });

        let data: TimelineData = self
            .graphql_query(&format!("{}{}", TIMELINE_QUERY, TIMELINE_FRAGMENT), &variables)
            .await?;
        let items = data
            .repository
            .and_then(|r| r.issue)
            .ok_or_else(|| Error::IssueNotFound(format!("{}#{}", repo, number)))?
            .timeline_items;

        let next = items.page_info.next_cursor().map(String::from);
        Ok((events(items.nodes).collect(), next))
    }

    /// Execute a GraphQL query
    async fn graphql_query<T: for<'de> Deserialize<'de>>(
        &self,
        query: &str,
        variables: &serde_json::Value,
    ) -> Result<T> {
        let request_body = json!({
            "query": query,
            "variables": variables,
        });

        let response = self
            .http()
            .post(GRAPHQL_URL)
            .bearer_auth(self.token())
            .json(&request_body)
            .send()
            .await
            .map_err(|e| Error::Other(format!("GraphQL request failed: {}", e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::FORBIDDEN || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let remaining = header(&response, "x-ratelimit-remaining");
            if remaining.as_deref() == Some("0") || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                let reset = header(&response, "x-ratelimit-reset").unwrap_or_else(|| "unknown".to_string());
                warn!(reset = %reset, "GitHub GraphQL rate limit exceeded");
                return Err(Error::RateLimited(reset));
            }
        }
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::Auth("Invalid GitHub token".to_string()));
        }
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read response".to_string());
            return Err(Error::Other(format!(
                "GraphQL request failed with status {}: {}",
                status, text
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::Other(format!("Failed to read GraphQL response: {}", e)))?;
        parse_response(&body)
    }
}

fn header(response: &reqwest::Response, name: &str) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
}

fn parse_response<T: for<'de> Deserialize<'de>>(body: &str) -> Result<T> {
    let graphql_response: GraphQLResponse<T> = serde_json::from_str(body)
        .map_err(|e| Error::Parse(format!("Failed to parse GraphQL response: {}", e)))?;

    if let Some(errors) = graphql_response.errors.filter(|e| !e.is_empty()) {
        let error_messages: Vec<String> = errors.into_iter().map(|e| e.message).collect();
        return Err(Error::Other(format!(
            "GraphQL errors: {}",
            error_messages.join(", ")
        )));
    }

    graphql_response
        .data
        .ok_or_else(|| Error::Other("GraphQL response missing data".to_string()))
}

#[async_trait]
impl TimelineSource for GitHubClient {
    async fn issue_timelines(
        &self,
        repo: &RepoName,
        since: DateTime<Utc>,
    ) -> apireview_core::Result<Vec<IssueTimeline>> {
        Ok(self.get_issue_timelines(repo, since).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ISSUES_RESPONSE: &str = r#"{
        "data": {
            "repository": {
                "issues": {
                    "pageInfo": { "hasNextPage": false, "endCursor": "Y3Vyc29y" },
                    "nodes": [{
                        "number": 1234,
                        "title": "[API Proposal]: Add Span.Foo",
                        "url": "https://github.com/dotnet/runtime/issues/1234",
                        "createdAt": "2020-03-01T08:00:00Z",
                        "author": null,
                        "milestone": { "title": "5.0" },
                        "labels": { "nodes": [
                            { "name": "api-approved", "color": "0e8a16", "description": "" },
                            { "name": "area-System.Memory", "color": "d4c5f9", "description": "Memory APIs" }
                        ] },
                        "timelineItems": {
                            "pageInfo": { "hasNextPage": false, "endCursor": null },
                            "nodes": [
                                { "__typename": "LabeledEvent", "createdAt": "2020-03-03T17:00:00Z",
                                  "actor": { "login": "terrajobst" }, "label": { "name": "api-ready-for-review" } },
                                { "__typename": "IssueComment", "databaseId": 596000001, "body": "Looks good",
                                  "url": "https://github.com/dotnet/runtime/issues/1234#issuecomment-596000001",
                                  "createdAt": "2020-03-03T18:10:00Z", "author": { "login": "terrajobst" } },
                                { "__typename": "ClosedEvent", "createdAt": "2020-03-03T18:12:00Z", "actor": null },
                                null
                            ]
                        }
                    }]
                }
            }
        }
    }"#;

    fn repo() -> RepoName {
        "dotnet/runtime".parse().unwrap()
    }

    #[test]
    fn test_parse_issue_node() {
        let data: IssuesData = parse_response(ISSUES_RESPONSE).unwrap();
        let issues = data.repository.unwrap().issues;
        assert!(issues.page_info.next_cursor().is_none());

        let mut node = issues.nodes.into_iter().flatten().next().unwrap();
        let node_events: Vec<_> = events(std::mem::take(&mut node.timeline_items.nodes)).collect();
        let issue = node.into_issue(&repo());

        assert_eq!(issue.id, 1234);
        assert_eq!(issue.title, "Add Span.Foo");
        assert_eq!(issue.author, "ghost");
        assert_eq!(issue.milestone, "5.0");
        assert_eq!(issue.labels.len(), 2);
        assert_eq!(issue.labels[0].description, None);
        assert_eq!(issue.labels[1].description.as_deref(), Some("Memory APIs"));

        assert_eq!(node_events.len(), 3);
        assert_eq!(
            node_events[0].kind,
            TimelineEventKind::Labeled {
                label: "api-ready-for-review".to_string()
            }
        );
        match &node_events[1].kind {
            TimelineEventKind::Commented { id, body, .. } => {
                assert_eq!(id, "596000001");
                assert_eq!(body, "Looks good");
            }
            other => panic!("expected comment, got {:?}", other),
        }
        assert_eq!(node_events[2].actor, "ghost");
        assert_eq!(node_events[2].kind, TimelineEventKind::Closed);
    }

    #[test]
    fn test_comment_id_falls_back_to_url() {
        let node: TimelineNode = serde_json::from_str(
            r#"{ "__typename": "IssueComment", "databaseId": null, "body": "",
                 "url": "https://github.com/o/r/issues/1#issuecomment-42",
                 "createdAt": "2020-01-01T00:00:00Z", "author": { "login": "a" } }"#,
        )
        .unwrap();
        match node.into_event().unwrap().kind {
            TimelineEventKind::Commented { id, .. } => assert_eq!(id, "42"),
            other => panic!("expected comment, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_typename_is_skipped() {
        let node: TimelineNode =
            serde_json::from_str(r#"{ "__typename": "AssignedEvent", "createdAt": "2020-01-01T00:00:00Z" }"#)
                .unwrap();
        assert!(node.into_event().is_none());
    }

    #[test]
    fn test_graphql_errors_are_reported() {
        let err = parse_response::<IssuesData>(
            r#"{ "data": null, "errors": [{ "message": "Something went wrong", "path": ["repository", 0] }] }"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("Something went wrong"));
    }

    #[test]
    fn test_page_info_cursor() {
        let page = PageInfo {
            has_next_page: true,
            end_cursor: Some("abc".to_string()),
        };
        assert_eq!(page.next_cursor(), Some("abc"));
        assert!(PageInfo::default().next_cursor().is_none());
    }
}
