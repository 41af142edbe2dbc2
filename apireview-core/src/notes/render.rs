//! Rendering resolved summaries back into quick-review notes

use chrono::NaiveDate;

use super::parser::{Link, StatusLine};
use crate::model::{ApiReviewItem, ApiReviewSummary};
use crate::timecode;

/// Relative path of the notes file for a review date
pub fn notes_path(date: NaiveDate) -> String {
    date.format("%Y/%m-%d-quick-reviews/README.md").to_string()
}

/// Status line of a resolved item
pub fn status_line(summary: &ApiReviewSummary, item: &ApiReviewItem) -> StatusLine {
    StatusLine {
        status: item.decision.to_string(),
        issue: Link::new(
            format!("#{}/{}", item.issue.repo, item.issue.id),
            &item.feedback_url,
        ),
        video: summary
            .video_url(item.time_code)
            .map(|url| Link::new("Video", url)),
    }
}

/// Markdown body of a notes file: one section per item
pub fn render_items(summary: &ApiReviewSummary) -> String {
    let mut out = String::new();

    for item in &summary.items {
        out.push_str(&format!("## {}\n\n", item.issue.title));
        out.push_str(&format!("{}\n\n", status_line(summary, item)));

        if let Some(markdown) = &item.feedback_markdown {
            out.push_str(markdown);
            out.push('\n');
        }
    }

    out
}

/// Complete notes file, or `None` for a summary without items
pub fn render_notes(summary: &ApiReviewSummary) -> Option<String> {
    let date = summary.date()?;
    Some(format!(
        "# Quick Reviews {}\n\n{}",
        date.format("%m/%d/%Y"),
        render_items(summary)
    ))
}

/// Chapter list for the recording's description
///
/// Angle brackets are replaced since the video platform rejects them.
pub fn video_description(summary: &ApiReviewSummary) -> String {
    let mut out = String::new();
    for item in &summary.items {
        out.push_str(&format!(
            "{} - {}: {} {}\n",
            timecode::format(item.time_code),
            item.decision,
            item.issue.title,
            item.feedback_url
        ));
    }
    out.replace('<', "(").replace('>', ")")
}
