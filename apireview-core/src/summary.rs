//! Assembling review summaries

use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::align::align_items;
use crate::cache::VideoCache;
use crate::config::ReviewConfig;
use crate::feedback::FeedbackCollector;
use crate::model::{ApiReviewItem, ApiReviewSummary, ApiReviewVideo};
use crate::timeline::ReviewWindow;
use crate::Result;

/// Title made of the area labels of all items
///
/// Area names are the label names with `prefix` removed, unique and sorted,
/// joined with ", ". Falls back to `default_title` if there are none.
pub fn derive_title(items: &[ApiReviewItem], prefix: &str, default_title: &str) -> String {
    let areas: BTreeSet<&str> = items
        .iter()
        .flat_map(|item| item.issue.area_labels(prefix))
        .collect();

    if areas.is_empty() {
        default_title.to_string()
    } else {
        areas.into_iter().collect::<Vec<_>>().join(", ")
    }
}

/// Align items to the recording and wrap them in a summary
///
/// Returns `None` if no item survives alignment, since a summary is never
/// published empty.
pub fn build_summary(
    video: Option<ApiReviewVideo>,
    mut items: Vec<ApiReviewItem>,
    config: &ReviewConfig,
) -> Option<ApiReviewSummary> {
    items.sort_by_key(|i| i.feedback_date_time);
    let items = align_items(items, video.as_ref(), &config.align_options());
    if items.is_empty() {
        return None;
    }

    let title = derive_title(&items, &config.area_label_prefix, &config.default_title);
    Some(ApiReviewSummary { video, items, title })
}

/// Summary of the decisions made inside a time window
pub async fn summarize_window(
    collector: &FeedbackCollector,
    window: &ReviewWindow,
    config: &ReviewConfig,
) -> Result<Option<ApiReviewSummary>> {
    let feedback = collector.collect(window).await?;
    let items = feedback.into_iter().map(|f| f.item).collect();
    Ok(build_summary(None, items, config))
}

/// Summary of the decisions made during a recorded session
///
/// The window spans the recording plus the grace period. Returns `None` if
/// the video is unknown or nothing was decided.
pub async fn summarize_video(
    collector: &FeedbackCollector,
    videos: &VideoCache,
    video_id: &str,
    config: &ReviewConfig,
) -> Result<Option<ApiReviewSummary>> {
    let Some(video) = videos.load_video(video_id).await? else {
        info!(video = video_id, "Video not found");
        return Ok(None);
    };

    let grace = chrono::Duration::from_std(config.grace_period).unwrap_or(chrono::Duration::zero());
    let window = ReviewWindow::new(video.start_date_time, video.end_date_time + grace);
    let feedback = collector.collect(&window).await?;
    debug!(video = video_id, decisions = feedback.len(), "Collected feedback for video");

    let items = feedback.into_iter().map(|f| f.item).collect();
    Ok(build_summary(Some(video), items, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::tests::{issue, video};
    use crate::cache::{MemoryStore, OfflineSource};
    use crate::feedback::{IssueTimeline, TimelineSource};
    use crate::model::{ApiReviewDecision, RepoName, API_APPROVED};
    use crate::timeline::{TimelineEvent, TimelineEventKind};
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};
    use std::sync::Arc;
    use std::time::Duration;

    fn item(labels: &[&str], at: DateTime<Utc>) -> ApiReviewItem {
        ApiReviewItem {
            decision: ApiReviewDecision::Approved,
            issue: issue("dotnet", "runtime", 1, labels),
            feedback_date_time: at,
            feedback_id: None,
            feedback_author: None,
            feedback_url: String::new(),
            feedback_markdown: None,
            time_code: Duration::ZERO,
            apis: Vec::new(),
        }
    }

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 3, 17, hour, minute, 0).unwrap()
    }

    #[test]
    fn test_derive_title() {
        let items = vec![
            item(&["area-System.Runtime", "api-approved"], at(17, 0)),
            item(&["area-System.IO", "area-System.Runtime"], at(17, 5)),
        ];
        assert_eq!(
            derive_title(&items, "area-", "GitHub Quick Reviews"),
            "System.IO, System.Runtime"
        );
        assert_eq!(
            derive_title(&items[..0], "area-", "GitHub Quick Reviews"),
            "GitHub Quick Reviews"
        );
    }

    #[test]
    fn test_build_summary_drops_empty() {
        let config = ReviewConfig::default();
        // Decided a day after the recording
        let items = vec![item(&[], Utc.with_ymd_and_hms(2020, 3, 18, 17, 0, 0).unwrap())];
        assert!(build_summary(Some(video("abc", 17)), items, &config).is_none());
        assert!(build_summary(None, Vec::new(), &config).is_none());
    }

    #[test]
    fn test_build_summary_sorts_and_aligns() {
        let config = ReviewConfig::default();
        let items = vec![item(&[], at(17, 30)), item(&["area-Meta"], at(17, 10))];

        let summary = build_summary(Some(video("abc", 17)), items, &config).unwrap();
        assert_eq!(summary.title, "Meta");
        assert_eq!(summary.items[0].feedback_date_time, at(17, 10));
        assert_eq!(summary.items[1].time_code, Duration::from_secs(10 * 60 + 10));
    }

    struct OneDecision;

    #[async_trait]
    impl TimelineSource for OneDecision {
        async fn issue_timelines(&self, _repo: &RepoName, _since: DateTime<Utc>) -> Result<Vec<IssueTimeline>> {
            Ok(vec![IssueTimeline {
                issue: issue("dotnet", "runtime", 5, &[API_APPROVED, "area-System.Text"]),
                events: vec![TimelineEvent::new(
                    "reviewer",
                    at(19, 10),
                    TimelineEventKind::Labeled {
                        label: API_APPROVED.to_string(),
                    },
                )],
            }])
        }
    }

    #[tokio::test]
    async fn test_summarize_video_includes_grace_period() {
        let collector = FeedbackCollector::new(Arc::new(OneDecision), vec!["dotnet/runtime".parse().unwrap()]);
        let videos = VideoCache::open(
            Arc::new(OfflineSource),
            Box::new(MemoryStore::new(vec![video("abc", 17)])),
        )
        .unwrap();

        // Recording ends at 19:00, the decision at 19:10 is inside the grace period
        let summary = summarize_video(&collector, &videos, "abc", &ReviewConfig::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(summary.items.len(), 1);
        assert_eq!(summary.title, "System.Text");
        assert_eq!(summary.video.unwrap().id, "abc");
    }

    #[tokio::test]
    async fn test_summarize_window_without_video() {
        let collector = FeedbackCollector::new(Arc::new(OneDecision), vec!["dotnet/runtime".parse().unwrap()]);
        let window = ReviewWindow::new(at(19, 0), at(20, 0));

        let summary = summarize_window(&collector, &window, &ReviewConfig::default())
            .await
            .unwrap()
            .unwrap();
        assert!(summary.video.is_none());
        assert_eq!(summary.items[0].time_code, Duration::ZERO);

        let empty = ReviewWindow::new(at(20, 0), at(21, 0));
        assert!(summarize_window(&collector, &empty, &ReviewConfig::default())
            .await
            .unwrap()
            .is_none());
    }
}
