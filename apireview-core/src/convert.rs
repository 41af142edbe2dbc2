//! Turning parsed notes into resolved review summaries

use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveTime;
use tracing::{info, warn};

use crate::cache::{IssueCache, VideoCache};
use crate::config::ReviewConfig;
use crate::model::{ApiReviewItem, ApiReviewSummary, ApiReviewVideo, ParsedReviewItem, ParsedReviewSummary};
use crate::summary::derive_title;
use crate::Result;

/// A notes file whose conversion failed
#[derive(Debug)]
pub struct ConversionFailure {
    pub path: PathBuf,
    pub error: crate::Error,
}

/// Outcome of converting a batch of notes files
#[derive(Debug, Default)]
pub struct ConversionReport {
    /// Converted summaries in input order
    pub summaries: Vec<ApiReviewSummary>,
    /// Files that had no resolvable items
    pub skipped: Vec<PathBuf>,
    /// Files that hit a remote fetch failure
    pub failures: Vec<ConversionFailure>,
}

impl ConversionReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Resolves parsed notes against the issue and video caches
pub struct ReviewConverter {
    issues: Arc<IssueCache>,
    videos: Arc<VideoCache>,
    config: ReviewConfig,
}

impl ReviewConverter {
    pub fn new(issues: Arc<IssueCache>, videos: Arc<VideoCache>, config: ReviewConfig) -> Self {
        Self {
            issues,
            videos,
            config,
        }
    }

    /// Convert every parsed file
    ///
    /// A fetch failure only fails the file it happened in; the run goes on
    /// and the failure is reported.
    pub async fn convert(&self, parsed: &[ParsedReviewSummary]) -> ConversionReport {
        let mut report = ConversionReport::default();

        for review in parsed {
            match self.convert_summary(review).await {
                Ok(Some(summary)) => report.summaries.push(summary),
                Ok(None) => {
                    warn!(path = %review.path.display(), "Review has no items, skipping");
                    report.skipped.push(review.path.clone());
                }
                Err(error) => {
                    warn!(path = %review.path.display(), error = %error, "Failed to convert review");
                    report.failures.push(ConversionFailure {
                        path: review.path.clone(),
                        error,
                    });
                }
            }
        }

        info!(
            converted = report.summaries.len(),
            skipped = report.skipped.len(),
            failed = report.failures.len(),
            "Converted reviews"
        );
        report
    }

    /// Convert one parsed file; `Ok(None)` if nothing in it resolves
    pub async fn convert_summary(&self, review: &ParsedReviewSummary) -> Result<Option<ApiReviewSummary>> {
        let video = self.resolve_video(review).await?;

        let mut items = Vec::with_capacity(review.items.len());
        for item in &review.items {
            if item.issue.owner.is_empty() || item.issue.repo.is_empty() || item.issue.number == 0 {
                warn!(path = %review.path.display(), url = %item.issue_url, "Review item doesn't refer to an issue, skipping");
                continue;
            }
            items.push(self.convert_item(review, item).await?);
        }

        if items.is_empty() {
            return Ok(None);
        }

        let title = derive_title(&items, &self.config.area_label_prefix, &self.config.default_title);
        Ok(Some(ApiReviewSummary { video, items, title }))
    }

    /// The session video: the first video id mentioned in the file
    async fn resolve_video(&self, review: &ParsedReviewSummary) -> Result<Option<ApiReviewVideo>> {
        let mut ids = review.items.iter().filter_map(|i| i.video_id.as_deref());
        let Some(first) = ids.next() else {
            return Ok(None);
        };

        let others: Vec<&str> = ids.filter(|id| *id != first).collect();
        if !others.is_empty() {
            warn!(
                path = %review.path.display(),
                video = first,
                ignored = ?others,
                "Review has multiple videos, using the first"
            );
        }

        let video = self.videos.load_video(first).await?;
        if video.is_none() {
            warn!(path = %review.path.display(), video = first, "Video not found");
        }
        Ok(video)
    }

    async fn convert_item(&self, review: &ParsedReviewSummary, item: &ParsedReviewItem) -> Result<ApiReviewItem> {
        let issue = self.issues.get_issue(&item.issue).await?;
        let feedback_url = match &item.comment_id {
            Some(id) => item.issue.comment_url(id),
            None => item.issue.url(),
        };
        let feedback_markdown =
            (!item.description_markdown.is_empty()).then(|| item.description_markdown.clone());

        Ok(ApiReviewItem {
            decision: item.decision,
            issue,
            feedback_date_time: review.date.and_time(NaiveTime::default()).and_utc(),
            feedback_id: item.comment_id.clone(),
            feedback_author: None,
            feedback_url,
            feedback_markdown,
            time_code: item.timecode,
            apis: item.apis.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::tests::{video, FakeIssues, FakeVideos};
    use crate::cache::{MemoryStore, OfflineSource};
    use crate::model::{ApiReviewDecision, ApiReviewIssue, IssueRef};
    use chrono::NaiveDate;
    use std::collections::{BTreeSet, HashMap};
    use std::time::Duration;

    fn parsed_item(repo: &str, number: u64, video_id: Option<&str>) -> ParsedReviewItem {
        let issue = IssueRef::new("dotnet", repo, number);
        ParsedReviewItem {
            decision: ApiReviewDecision::Approved,
            issue_url: issue.url(),
            issue,
            comment_id: Some("42".to_string()),
            video_id: video_id.map(str::to_string),
            video_url: None,
            timecode: Duration::from_secs(65),
            description_markdown: "* Approved".to_string(),
            apis: vec!["T:C".to_string()],
            other_languages: BTreeSet::new(),
        }
    }

    fn parsed(path: &str, items: Vec<ParsedReviewItem>) -> ParsedReviewSummary {
        ParsedReviewSummary {
            path: PathBuf::from(path),
            date: NaiveDate::from_ymd_opt(2020, 3, 17).unwrap(),
            items,
        }
    }

    fn converter() -> ReviewConverter {
        let issues = FakeIssues {
            labels: HashMap::from([(
                IssueRef::new("dotnet", "runtime", 1),
                vec!["area-System.Memory"],
            )]),
            ..Default::default()
        };
        let videos = FakeVideos {
            videos: HashMap::from([("abc".to_string(), video("abc", 17))]),
            ..Default::default()
        };

        ReviewConverter::new(
            Arc::new(IssueCache::open(Arc::new(issues), Box::new(MemoryStore::<ApiReviewIssue>::default())).unwrap()),
            Arc::new(VideoCache::open(Arc::new(videos), Box::new(MemoryStore::<ApiReviewVideo>::default())).unwrap()),
            ReviewConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_convert_resolves_items() {
        let review = parsed(
            "2020/03-17-quick-reviews/README.md",
            vec![parsed_item("runtime", 1, Some("abc")), parsed_item("runtime", 2, Some("other"))],
        );

        let report = converter().convert(&[review]).await;
        assert!(report.is_success());
        assert_eq!(report.summaries.len(), 1);

        let summary = &report.summaries[0];
        assert_eq!(summary.video.as_ref().unwrap().id, "abc");
        assert_eq!(summary.title, "System.Memory");
        assert_eq!(summary.items.len(), 2);

        let item = &summary.items[0];
        assert_eq!(
            item.feedback_url,
            "https://github.com/dotnet/runtime/issues/1#issuecomment-42"
        );
        assert_eq!(item.feedback_date_time.to_rfc3339(), "2020-03-17T00:00:00+00:00");
        assert_eq!(item.time_code, Duration::from_secs(65));
        assert_eq!(item.feedback_markdown.as_deref(), Some("* Approved"));
        assert_eq!(item.apis, vec!["T:C"]);
    }

    #[tokio::test]
    async fn test_empty_files_are_skipped() {
        let report = converter()
            .convert(&[parsed("2020/03-18-quick-reviews/README.md", Vec::new())])
            .await;
        assert!(report.summaries.is_empty());
        assert_eq!(report.skipped.len(), 1);
        assert!(report.is_success());
    }

    #[tokio::test]
    async fn test_incomplete_reference_is_skipped() {
        let review = parsed(
            "2020/03-17-quick-reviews/README.md",
            vec![parsed_item("runtime", 0, None), parsed_item("runtime", 1, None)],
        );
        let report = converter().convert(&[review]).await;
        assert_eq!(report.summaries[0].items.len(), 1);
        assert!(report.summaries[0].video.is_none());
    }

    #[tokio::test]
    async fn test_fetch_failure_only_fails_its_file() {
        let report = converter()
            .convert(&[
                parsed("a/README.md", vec![parsed_item("unreachable", 1, None)]),
                parsed("b/README.md", vec![parsed_item("runtime", 1, None)]),
            ])
            .await;

        assert!(!report.is_success());
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].path, PathBuf::from("a/README.md"));
        assert_eq!(report.summaries.len(), 1);
    }

    #[tokio::test]
    async fn test_offline_miss_is_a_failure() {
        let converter = ReviewConverter::new(
            Arc::new(IssueCache::open(Arc::new(OfflineSource), Box::new(MemoryStore::<ApiReviewIssue>::default())).unwrap()),
            Arc::new(VideoCache::open(Arc::new(OfflineSource), Box::new(MemoryStore::<ApiReviewVideo>::default())).unwrap()),
            ReviewConfig::default(),
        );
        let report = converter
            .convert(&[parsed("a/README.md", vec![parsed_item("runtime", 1, None)])])
            .await;
        assert_eq!(report.failures.len(), 1);
    }
}
