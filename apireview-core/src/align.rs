//! Mapping feedback times onto a session recording

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::{ApiReviewItem, ApiReviewVideo};

/// Tuning for [`align_items`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignOptions {
    /// How long after the recording ends feedback still belongs to it
    #[serde(with = "humantime_serde")]
    pub grace_period: Duration,
    /// How far before a decision a deep link starts
    #[serde(with = "humantime_serde")]
    pub lead_in: Duration,
}

impl Default for AlignOptions {
    fn default() -> Self {
        Self {
            grace_period: Duration::from_secs(15 * 60),
            lead_in: Duration::from_secs(10),
        }
    }
}

/// Assign in-video timecodes to items sorted by feedback time
///
/// Without a video every timecode is zero. With a video, items outside
/// `[start, end + grace_period]` are dropped. The first kept item starts at
/// zero; each following item starts `lead_in` after the previous kept item's
/// feedback, unless that would reach past the end of the recording, in which
/// case it reuses the previous timecode.
pub fn align_items(
    items: Vec<ApiReviewItem>,
    video: Option<&ApiReviewVideo>,
    options: &AlignOptions,
) -> Vec<ApiReviewItem> {
    let Some(video) = video else {
        return items
            .into_iter()
            .map(|mut item| {
                item.time_code = Duration::ZERO;
                item
            })
            .collect();
    };

    let grace = chrono::Duration::from_std(options.grace_period).unwrap_or(chrono::Duration::zero());
    let review_end = video.end_date_time + grace;
    let duration = video.duration();

    let mut aligned: Vec<ApiReviewItem> = Vec::with_capacity(items.len());
    for mut item in items {
        let during_review =
            video.start_date_time <= item.feedback_date_time && item.feedback_date_time <= review_end;
        if !during_review {
            debug!(
                issue = %item.issue.key(),
                at = %item.feedback_date_time,
                "Feedback outside of recording, excluded"
            );
            continue;
        }

        item.time_code = match aligned.last() {
            None => Duration::ZERO,
            Some(previous) => {
                let offset = (previous.feedback_date_time - video.start_date_time)
                    .to_std()
                    .unwrap_or_default();
                let candidate = offset + options.lead_in;
                if candidate >= duration {
                    previous.time_code
                } else {
                    candidate
                }
            }
        };
        aligned.push(item);
    }

    aligned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ApiReviewDecision, ApiReviewIssue, NO_MILESTONE};
    use chrono::{DateTime, TimeZone, Utc};

    fn at(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 3, 17, 17, 0, 0).unwrap() + chrono::Duration::minutes(minutes)
    }

    fn item(id: u64, minutes: i64) -> ApiReviewItem {
        ApiReviewItem {
            decision: ApiReviewDecision::Approved,
            issue: ApiReviewIssue {
                owner: "o".to_string(),
                repo: "r".to_string(),
                id,
                author: "a".to_string(),
                created_at: at(-100),
                title: "t".to_string(),
                url: format!("https://github.com/o/r/issues/{id}"),
                milestone: NO_MILESTONE.to_string(),
                labels: Vec::new(),
            },
            feedback_date_time: at(minutes),
            feedback_id: None,
            feedback_author: None,
            feedback_url: String::new(),
            feedback_markdown: None,
            time_code: Duration::from_secs(99),
            apis: Vec::new(),
        }
    }

    fn video() -> ApiReviewVideo {
        ApiReviewVideo {
            id: "abc".to_string(),
            start_date_time: at(0),
            end_date_time: at(60),
            title: "Quick Reviews".to_string(),
            thumbnail_url: None,
        }
    }

    fn codes(items: &[ApiReviewItem]) -> Vec<u64> {
        items.iter().map(|i| i.time_code.as_secs()).collect()
    }

    #[test]
    fn test_without_video_all_zero() {
        let aligned = align_items(vec![item(1, 5), item(2, 10)], None, &AlignOptions::default());
        assert_eq!(codes(&aligned), vec![0, 0]);
    }

    #[test]
    fn test_lead_in_from_previous_item() {
        let aligned = align_items(
            vec![item(1, 5), item(2, 10), item(3, 20)],
            Some(&video()),
            &AlignOptions::default(),
        );
        assert_eq!(codes(&aligned), vec![0, 5 * 60 + 10, 10 * 60 + 10]);
    }

    #[test]
    fn test_items_outside_grace_window_excluded() {
        let aligned = align_items(
            vec![item(1, -1), item(2, 5), item(3, 74), item(4, 76)],
            Some(&video()),
            &AlignOptions::default(),
        );
        let ids: Vec<u64> = aligned.iter().map(|i| i.issue.id).collect();
        assert_eq!(ids, vec![2, 3]);
        assert_eq!(codes(&aligned), vec![0, 5 * 60 + 10]);
    }

    #[test]
    fn test_clamps_past_end_of_recording() {
        let aligned = align_items(
            vec![item(1, 30), item(2, 59), item(3, 62), item(4, 70)],
            Some(&video()),
            &AlignOptions::default(),
        );
        // 59m + 10s is still inside, 62m + 10s is not
        assert_eq!(codes(&aligned), vec![0, 30 * 60 + 10, 59 * 60 + 10, 59 * 60 + 10]);
    }

    #[test]
    fn test_timecodes_never_decrease() {
        let items: Vec<_> = (0..20).map(|n| item(n, n as i64 * 4)).collect();
        let aligned = align_items(items, Some(&video()), &AlignOptions::default());
        assert!(aligned.windows(2).all(|w| w[0].time_code <= w[1].time_code));
    }
}
