//! Quick-review notes grammar
//!
//! A notes file is free Markdown in which each reviewed issue starts with a
//! status line:
//!
//! ```text
//! **Approved** | [#1234](https://github.com/owner/repo/issues/1234#issuecomment-5) | [Video](https://www.youtube.com/watch?v=abc&t=0h5m10s)
//! ```
//!
//! Everything up to the next status line is the item's description.

use std::fmt;
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

use chrono::NaiveDate;
use regex::Regex;
use tracing::warn;

use crate::apis::scan_markdown;
use crate::model::{ApiReviewDecision, IssueRef, ParsedReviewItem};

static STATUS_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\*\*(?P<status>[^*]+)\*\* \| \[(?P<issue_text>[^\]]+)\]\((?P<issue_url>[^)]*)\)(?: \| \[(?P<video_text>[^\]]+)\]\((?P<video_url>[^)]*)\))?",
    )
    .expect("status line pattern is valid")
});

static ISSUE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"https://github\.com/(?P<owner>[^/]+)/(?P<repo>[^/]+)/(?:issues|pull)/(?P<number>[0-9]+)(?:#issuecomment-(?P<comment>[0-9]+))?",
    )
    .expect("issue url pattern is valid")
});

static VIDEO_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"https://www\.youtube\.com/watch\?v=(?P<id>[^&]+)(?:&t=(?P<hours>[0-9]+)h(?P<minutes>[0-9]+)m(?P<seconds>[0-9]+)s)?",
    )
    .expect("video url pattern is valid")
});

static SHORT_VIDEO_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https://youtu\.be/(?P<id>[^?]+)(?:\?t=(?P<seconds>[0-9]+)s?)?")
        .expect("short video url pattern is valid")
});

static NOTES_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|/)(?P<year>[0-9]{4})/(?P<month>[0-9]{1,2})-(?P<day>[0-9]{1,2})-quick-reviews/README\.md$")
        .expect("notes path pattern is valid")
});

/// Markdown link as it appears on a status line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub text: String,
    pub url: String,
}

impl Link {
    pub fn new(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            url: url.into(),
        }
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]({})", self.text, self.url)
    }
}

/// The line that opens a review item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    /// Status keyword exactly as written
    pub status: String,
    pub issue: Link,
    pub video: Option<Link>,
}

impl StatusLine {
    /// Match a status line; anything after the recognized prefix is ignored
    pub fn parse(line: &str) -> Option<Self> {
        let caps = STATUS_LINE.captures(line)?;
        let video = match (caps.name("video_text"), caps.name("video_url")) {
            (Some(text), Some(url)) => Some(Link::new(text.as_str(), url.as_str())),
            _ => None,
        };

        Some(Self {
            status: caps["status"].to_string(),
            issue: Link::new(&caps["issue_text"], &caps["issue_url"]),
            video,
        })
    }

    /// Decision named by the status keyword
    ///
    /// Unknown keywords are logged and treated as a rejection, so that a
    /// decided item is never silently dropped.
    pub fn decision(&self) -> ApiReviewDecision {
        ApiReviewDecision::from_status(&self.status).unwrap_or_else(|| {
            warn!(status = %self.status, "Unknown review status, assuming rejected");
            ApiReviewDecision::Rejected
        })
    }
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "**{}** | {}", self.status, self.issue)?;
        if let Some(video) = &self.video {
            write!(f, " | {video}")?;
        }
        Ok(())
    }
}

/// Issue reference and optional comment id from a tracker URL
pub fn parse_issue_url(url: &str) -> Option<(IssueRef, Option<String>)> {
    let caps = ISSUE_URL.captures(url)?;
    let number = caps["number"].parse().ok()?;
    let issue = IssueRef::new(&caps["owner"], &caps["repo"], number);
    let comment = caps.name("comment").map(|m| m.as_str().to_string());
    Some((issue, comment))
}

/// Video id and timecode from a long or short video URL
///
/// Offsets too large to represent make the URL unparsable.
pub fn parse_video_url(url: &str) -> Option<(String, Duration)> {
    let seconds_of = |caps: &regex::Captures<'_>, name: &str, scale: u64| match caps.name(name) {
        Some(m) => m.as_str().parse::<u64>().ok()?.checked_mul(scale),
        None => Some(0),
    };

    let (id, seconds) = if let Some(caps) = VIDEO_URL.captures(url) {
        let seconds = seconds_of(&caps, "hours", 3600).and_then(|h| {
            h.checked_add(seconds_of(&caps, "minutes", 60)?)?
                .checked_add(seconds_of(&caps, "seconds", 1)?)
        });
        (caps["id"].to_string(), seconds)
    } else {
        let caps = SHORT_VIDEO_URL.captures(url)?;
        (caps["id"].to_string(), seconds_of(&caps, "seconds", 1))
    };

    match seconds {
        Some(seconds) => Some((id, Duration::from_secs(seconds))),
        None => {
            warn!(url, "Video timecode out of range");
            None
        }
    }
}

/// Review date encoded in a notes path relative to the notes root
///
/// Returns `None` for paths outside the `YYYY/MM-DD-quick-reviews/README.md`
/// convention, and for folder names that aren't a real calendar date.
pub fn review_date(relative: &Path) -> Option<NaiveDate> {
    let normalized = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    let caps = NOTES_PATH.captures(&normalized)?;

    NaiveDate::from_ymd_opt(
        caps["year"].parse().ok()?,
        caps["month"].parse().ok()?,
        caps["day"].parse().ok()?,
    )
}

/// Drop second-level headings
fn strip_headings(content: &str) -> Vec<&str> {
    content
        .lines()
        .filter(|line| !line.starts_with("## "))
        .collect()
}

/// Split lines into item ranges, each starting at a status line
///
/// Lines before the first status line don't belong to any item.
fn item_ranges(lines: &[&str]) -> Vec<std::ops::Range<usize>> {
    let starts: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, line)| STATUS_LINE.is_match(line))
        .map(|(i, _)| i)
        .collect();

    starts
        .iter()
        .enumerate()
        .map(|(n, &start)| {
            let end = starts.get(n + 1).copied().unwrap_or(lines.len());
            start..end
        })
        .collect()
}

fn parse_item(lines: &[&str]) -> Option<ParsedReviewItem> {
    let header = StatusLine::parse(lines.first()?)?;

    let Some((issue, comment_id)) = parse_issue_url(&header.issue.url) else {
        warn!(url = %header.issue.url, "Skipping review item with unrecognized issue URL");
        return None;
    };

    let video_url = header.video.as_ref().map(|v| v.url.clone());
    let (video_id, timecode) = match video_url.as_deref().and_then(parse_video_url) {
        Some((id, timecode)) => (Some(id), timecode),
        None => (None, Duration::ZERO),
    };

    let description_markdown = lines[1..].join("\n").trim().to_string();
    let scan = scan_markdown(&description_markdown);

    Some(ParsedReviewItem {
        decision: header.decision(),
        issue,
        issue_url: header.issue.url,
        comment_id,
        video_id,
        video_url,
        timecode,
        description_markdown,
        apis: scan.apis,
        other_languages: scan.other_languages,
    })
}

/// Parse the items of one notes document, in file order
pub fn parse_items(content: &str) -> Vec<ParsedReviewItem> {
    let lines = strip_headings(content);
    item_ranges(&lines)
        .into_iter()
        .filter_map(|range| parse_item(&lines[range]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_status_line_example() {
        let line = "**Approved** | [#1](https://github.com/o/r/issues/1) | [Video](https://www.youtube.com/watch?v=abc&t=1h2m3s)";
        let items = parse_items(line);
        assert_eq!(items.len(), 1);

        let item = &items[0];
        assert_eq!(item.decision, ApiReviewDecision::Approved);
        assert_eq!(item.issue, IssueRef::new("o", "r", 1));
        assert_eq!(item.comment_id, None);
        assert_eq!(item.video_id.as_deref(), Some("abc"));
        assert_eq!(item.timecode, Duration::from_secs(3723));
    }

    #[test]
    fn test_status_line_round_trip() {
        for line in [
            "**approved** | [#1](https://github.com/o/r/issues/1)",
            "**NEEDS WORK** | [dotnet/runtime#7](https://github.com/dotnet/runtime/pull/7#issuecomment-9) | [Video](https://youtu.be/xyz?t=42)",
        ] {
            let parsed = StatusLine::parse(line).unwrap();
            assert_eq!(parsed.to_string(), line);
            assert_eq!(StatusLine::parse(&parsed.to_string()), Some(parsed));
        }
    }

    #[test]
    fn test_decision_casing() {
        for status in ["approved", "APPROVED", "Approved"] {
            let line = format!("**{status}** | [#1](https://github.com/o/r/issues/1)");
            assert_eq!(
                StatusLine::parse(&line).unwrap().decision(),
                ApiReviewDecision::Approved
            );
        }
    }

    #[test]
    fn test_unknown_status_defaults_to_rejected() {
        let line = StatusLine::parse("**Deferred** | [#1](https://github.com/o/r/issues/1)").unwrap();
        assert_eq!(line.decision(), ApiReviewDecision::Rejected);
    }

    #[test]
    fn test_issue_url_shapes() {
        assert_eq!(
            parse_issue_url("https://github.com/dotnet/runtime/issues/123#issuecomment-456"),
            Some((IssueRef::new("dotnet", "runtime", 123), Some("456".to_string())))
        );
        assert_eq!(
            parse_issue_url("https://github.com/dotnet/runtime/pull/9"),
            Some((IssueRef::new("dotnet", "runtime", 9), None))
        );
        assert_eq!(parse_issue_url("https://example.com/issues/1"), None);
    }

    #[test]
    fn test_video_url_shapes() {
        assert_eq!(
            parse_video_url("https://www.youtube.com/watch?v=abc"),
            Some(("abc".to_string(), Duration::ZERO))
        );
        assert_eq!(
            parse_video_url("https://youtu.be/abc?t=90s"),
            Some(("abc".to_string(), Duration::from_secs(90)))
        );
        assert_eq!(
            parse_video_url("https://youtu.be/abc"),
            Some(("abc".to_string(), Duration::ZERO))
        );
        assert_eq!(parse_video_url("https://vimeo.com/1"), None);
    }

    #[test]
    fn test_oversized_video_offset_is_unparsable() {
        assert_eq!(
            parse_video_url("https://www.youtube.com/watch?v=abc&t=9999999999999999h0m0s"),
            None
        );
        assert_eq!(
            parse_video_url("https://youtu.be/abc?t=99999999999999999999999s"),
            None
        );

        let content = "**Approved** | [#2](https://github.com/o/r/issues/2) | \
                       [Video](https://www.youtube.com/watch?v=abc&t=9999999999999999h0m0s)";
        let items = parse_items(content);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].video_id, None);
        assert_eq!(items[0].timecode, Duration::ZERO);
    }

    #[test]
    fn test_unrecognized_issue_url_discards_item() {
        let content = "**Approved** | [#1](https://example.com/1)\n\ntext\n\n**Approved** | [#2](https://github.com/o/r/issues/2)";
        let items = parse_items(content);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].issue.number, 2);
    }

    #[test]
    fn test_descriptions_and_headings() {
        let content = "\
# Quick Reviews

Preamble that belongs to no item.

## Allow tuples

**Approved** | [#1](https://github.com/o/r/issues/1)
**Needs Work** | [#2](https://github.com/o/r/issues/2)

* Rename the method

```C#
class C { public int Foo(string a); }
```

## Trailing heading
";
        let items = parse_items(content);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].description_markdown, "");
        assert!(items[0].apis.is_empty());
        assert!(items[1].description_markdown.starts_with("* Rename the method"));
        assert!(!items[1].description_markdown.contains("Trailing heading"));
        assert_eq!(items[1].apis, vec!["M:C.Foo(string)", "T:C"]);
    }

    #[test]
    fn test_items_without_video_have_zero_timecode() {
        let content = "**Approved** | [#1](https://github.com/o/r/issues/1)\n**Rejected** | [#2](https://github.com/o/r/issues/2)\n";
        let items = parse_items(content);
        assert_eq!(items.len(), 2);
        assert!(items
            .iter()
            .all(|i| i.video_id.is_none() && i.timecode == Duration::ZERO));
    }

    #[test]
    fn test_no_status_lines() {
        assert!(parse_items("# Notes\n\nNothing was decided.").is_empty());
    }

    #[test]
    fn test_review_date() {
        assert_eq!(
            review_date(&PathBuf::from("2020/03-17-quick-reviews/README.md")),
            NaiveDate::from_ymd_opt(2020, 3, 17)
        );
        assert_eq!(
            review_date(&PathBuf::from("2021/1-5-quick-reviews/README.md")),
            NaiveDate::from_ymd_opt(2021, 1, 5)
        );
        assert_eq!(review_date(&PathBuf::from("2020/02-30-quick-reviews/README.md")), None);
        assert_eq!(review_date(&PathBuf::from("2020/03-17-design/README.md")), None);
        assert_eq!(review_date(&PathBuf::from("README.md")), None);
    }
}
