//! Canonical review records
//!
//! Parsed records (`ParsedReviewSummary`, `ParsedReviewItem`) live for one
//! indexing run. Resolved records (`ApiReviewSummary`, `ApiReviewItem`) are
//! what ends up in the output index. Issues and videos are owned by their
//! caches and treated as immutable once fetched.

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Label marking an issue as queued for API review
pub const API_READY_FOR_REVIEW: &str = "api-ready-for-review";
/// Label applied when an API proposal is approved
pub const API_APPROVED: &str = "api-approved";
/// Label applied when an API proposal needs more work
pub const API_NEEDS_WORK: &str = "api-needs-work";
/// Milestone value stored for issues without a milestone
pub const NO_MILESTONE: &str = "(None)";

/// Outcome of an API review discussion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApiReviewDecision {
    Approved,
    NeedsWork,
    Rejected,
}

impl ApiReviewDecision {
    /// Match a status keyword from review notes, ignoring case
    ///
    /// Returns `None` for anything that isn't a known keyword; callers decide
    /// how to treat unknown statuses.
    pub fn from_status(status: &str) -> Option<Self> {
        let status = status.trim();
        if status.eq_ignore_ascii_case("approved") {
            Some(Self::Approved)
        } else if status.eq_ignore_ascii_case("needs work") || status.eq_ignore_ascii_case("needswork")
        {
            Some(Self::NeedsWork)
        } else if status.eq_ignore_ascii_case("rejected") {
            Some(Self::Rejected)
        } else {
            None
        }
    }
}

impl fmt::Display for ApiReviewDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Approved => write!(f, "Approved"),
            Self::NeedsWork => write!(f, "Needs Work"),
            Self::Rejected => write!(f, "Rejected"),
        }
    }
}

/// Reference to an issue or pull request on the tracker
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IssueRef {
    pub owner: String,
    pub repo: String,
    pub number: u64,
}

impl IssueRef {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>, number: u64) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            number,
        }
    }

    /// Web URL of the issue
    pub fn url(&self) -> String {
        format!(
            "https://github.com/{}/{}/issues/{}",
            self.owner, self.repo, self.number
        )
    }

    /// Web URL of a comment on the issue
    pub fn comment_url(&self, comment_id: &str) -> String {
        format!("{}#issuecomment-{}", self.url(), comment_id)
    }
}

impl fmt::Display for IssueRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}#{}", self.owner, self.repo, self.number)
    }
}

/// Repository on the tracker, written `owner/repo`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RepoName {
    pub owner: String,
    pub repo: String,
}

impl FromStr for RepoName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().split_once('/') {
            Some((owner, repo))
                if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') =>
            {
                Ok(Self {
                    owner: owner.to_string(),
                    repo: repo.to_string(),
                })
            }
            _ => Err(Error::Config(format!(
                "Invalid repository '{}', expected owner/repo",
                s
            ))),
        }
    }
}

impl fmt::Display for RepoName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// Label attached to a tracker issue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiReviewLabel {
    pub name: String,
    pub background_color: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Tracker issue as stored in the issue cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiReviewIssue {
    pub owner: String,
    pub repo: String,
    pub id: u64,
    pub author: String,
    pub created_at: DateTime<Utc>,
    pub title: String,
    pub url: String,
    pub milestone: String,
    pub labels: Vec<ApiReviewLabel>,
}

impl ApiReviewIssue {
    /// Cache key of this issue
    pub fn key(&self) -> IssueRef {
        IssueRef::new(&self.owner, &self.repo, self.id)
    }

    pub fn has_label(&self, name: &str) -> bool {
        self.labels.iter().any(|l| l.name.eq_ignore_ascii_case(name))
    }

    /// Whether the issue carries any of the API review labels
    pub fn is_api_issue(&self) -> bool {
        [API_READY_FOR_REVIEW, API_APPROVED, API_NEEDS_WORK]
            .iter()
            .any(|label| self.has_label(label))
    }

    /// Names of labels starting with `prefix`, with the prefix removed
    pub fn area_labels<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.labels
            .iter()
            .filter_map(move |l| l.name.strip_prefix(prefix))
    }
}

/// Title prefixes that carry no information in a review record
const TITLE_PREFIXES: &[&str] = &[
    "[api proposal]:",
    "[api proposal]",
    "api proposal:",
    "api proposal -",
    "[proposal]:",
    "[proposal]",
    "proposal:",
];

/// Normalize an issue title for display
///
/// Strips a leading "API proposal" marker (in any of its common spellings)
/// and surrounding whitespace. Titles that consist only of the marker are
/// kept as-is.
pub fn normalize_title(title: &str) -> String {
    let trimmed = title.trim();
    let lower = trimmed.to_ascii_lowercase();

    for prefix in TITLE_PREFIXES {
        if lower.starts_with(prefix) {
            let rest = trimmed[prefix.len()..].trim();
            if !rest.is_empty() {
                return rest.to_string();
            }
        }
    }

    trimmed.to_string()
}

/// Recorded review session as stored in the video cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiReviewVideo {
    pub id: String,
    pub start_date_time: DateTime<Utc>,
    pub end_date_time: DateTime<Utc>,
    pub title: String,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
}

impl ApiReviewVideo {
    /// Length of the recording; zero if the end precedes the start
    pub fn duration(&self) -> Duration {
        (self.end_date_time - self.start_date_time)
            .to_std()
            .unwrap_or_default()
    }

    pub fn url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.id)
    }

    /// Deep link into the recording at `timecode`
    pub fn url_at(&self, timecode: Duration) -> String {
        let total = timecode.as_secs();
        format!(
            "{}&t={}h{}m{}s",
            self.url(),
            total / 3600,
            (total % 3600) / 60,
            total % 60
        )
    }
}

/// One resolved review decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiReviewItem {
    pub decision: ApiReviewDecision,
    pub issue: ApiReviewIssue,
    pub feedback_date_time: DateTime<Utc>,
    #[serde(default)]
    pub feedback_id: Option<String>,
    #[serde(default)]
    pub feedback_author: Option<String>,
    pub feedback_url: String,
    #[serde(default)]
    pub feedback_markdown: Option<String>,
    #[serde(with = "crate::timecode")]
    pub time_code: Duration,
    #[serde(default)]
    pub apis: Vec<String>,
}

/// One review session: an optional recording and the decisions made in it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiReviewSummary {
    #[serde(default)]
    pub video: Option<ApiReviewVideo>,
    pub items: Vec<ApiReviewItem>,
    pub title: String,
}

impl ApiReviewSummary {
    /// Deep link into the session recording, if there is one
    pub fn video_url(&self, timecode: Duration) -> Option<String> {
        self.video.as_ref().map(|v| v.url_at(timecode))
    }

    /// Day of the session, taken from its first item
    pub fn date(&self) -> Option<NaiveDate> {
        self.items.first().map(|i| i.feedback_date_time.date_naive())
    }
}

/// One reviewed issue as written in a notes file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedReviewItem {
    pub decision: ApiReviewDecision,
    pub issue: IssueRef,
    pub issue_url: String,
    pub comment_id: Option<String>,
    pub video_id: Option<String>,
    pub video_url: Option<String>,
    pub timecode: Duration,
    pub description_markdown: String,
    /// Unique, sorted API signatures found in the description
    pub apis: Vec<String>,
    /// Code block languages seen in the description that weren't indexed
    pub other_languages: BTreeSet<String>,
}

/// One notes file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedReviewSummary {
    pub path: PathBuf,
    pub date: NaiveDate,
    /// Items in file order
    pub items: Vec<ParsedReviewItem>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn label(name: &str) -> ApiReviewLabel {
        ApiReviewLabel {
            name: name.to_string(),
            background_color: "ffffff".to_string(),
            description: None,
        }
    }

    #[test]
    fn test_decision_from_status() {
        assert_eq!(
            ApiReviewDecision::from_status("approved"),
            Some(ApiReviewDecision::Approved)
        );
        assert_eq!(
            ApiReviewDecision::from_status("APPROVED"),
            Some(ApiReviewDecision::Approved)
        );
        assert_eq!(
            ApiReviewDecision::from_status("Needs Work"),
            Some(ApiReviewDecision::NeedsWork)
        );
        assert_eq!(
            ApiReviewDecision::from_status("needswork"),
            Some(ApiReviewDecision::NeedsWork)
        );
        assert_eq!(
            ApiReviewDecision::from_status("Rejected"),
            Some(ApiReviewDecision::Rejected)
        );
        assert_eq!(ApiReviewDecision::from_status("Deferred"), None);
    }

    #[test]
    fn test_decision_display_parses_back() {
        for decision in [
            ApiReviewDecision::Approved,
            ApiReviewDecision::NeedsWork,
            ApiReviewDecision::Rejected,
        ] {
            assert_eq!(
                ApiReviewDecision::from_status(&decision.to_string()),
                Some(decision)
            );
        }
    }

    #[test]
    fn test_issue_ref_urls() {
        let issue = IssueRef::new("dotnet", "runtime", 42);
        assert_eq!(issue.url(), "https://github.com/dotnet/runtime/issues/42");
        assert_eq!(
            issue.comment_url("7"),
            "https://github.com/dotnet/runtime/issues/42#issuecomment-7"
        );
        assert_eq!(issue.to_string(), "dotnet/runtime#42");
    }

    #[test]
    fn test_repo_name() {
        let repo: RepoName = "dotnet/runtime".parse().unwrap();
        assert_eq!(repo.owner, "dotnet");
        assert_eq!(repo.to_string(), "dotnet/runtime");
        assert!("dotnet".parse::<RepoName>().is_err());
        assert!("a/b/c".parse::<RepoName>().is_err());
        assert!("/runtime".parse::<RepoName>().is_err());
    }

    #[test]
    fn test_normalize_title() {
        assert_eq!(normalize_title("  Add Span.Foo  "), "Add Span.Foo");
        assert_eq!(normalize_title("[API Proposal]: Add Span.Foo"), "Add Span.Foo");
        assert_eq!(normalize_title("API Proposal: Add Span.Foo"), "Add Span.Foo");
        assert_eq!(normalize_title("Proposal: X"), "X");
        assert_eq!(normalize_title("[API Proposal]"), "[API Proposal]");
    }

    #[test]
    fn test_area_labels() {
        let issue = ApiReviewIssue {
            owner: "dotnet".to_string(),
            repo: "runtime".to_string(),
            id: 1,
            author: "someone".to_string(),
            created_at: Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
            title: "Title".to_string(),
            url: "https://github.com/dotnet/runtime/issues/1".to_string(),
            milestone: NO_MILESTONE.to_string(),
            labels: vec![label("area-System.IO"), label("api-approved"), label("bug")],
        };

        let areas: Vec<&str> = issue.area_labels("area-").collect();
        assert_eq!(areas, vec!["System.IO"]);
        assert!(issue.is_api_issue());
        assert!(issue.has_label("API-APPROVED"));
    }

    #[test]
    fn test_video_links() {
        let video = ApiReviewVideo {
            id: "abc".to_string(),
            start_date_time: Utc.with_ymd_and_hms(2020, 1, 7, 10, 0, 0).unwrap(),
            end_date_time: Utc.with_ymd_and_hms(2020, 1, 7, 12, 0, 0).unwrap(),
            title: "Quick Reviews".to_string(),
            thumbnail_url: None,
        };

        assert_eq!(video.duration(), Duration::from_secs(7200));
        assert_eq!(
            video.url_at(Duration::from_secs(3723)),
            "https://www.youtube.com/watch?v=abc&t=1h2m3s"
        );
    }
}
