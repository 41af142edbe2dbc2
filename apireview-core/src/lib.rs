//! API review core - review record extraction and resolution
//!
//! This crate turns hand-written quick-review notes, tracker timelines and
//! recording metadata into canonical review records. Network access lives in
//! the integration crates; everything here talks to the outside world through
//! the [`cache::IssueSource`], [`cache::VideoSource`] and
//! [`feedback::TimelineSource`] traits.

pub mod align;
pub mod apis;
pub mod cache;
pub mod config;
pub mod convert;
pub mod error;
pub mod feedback;
pub mod index;
pub mod model;
pub mod notes;
pub mod secrets;
pub mod summary;
pub mod timecode;
pub mod timeline;
pub mod webhook;

pub use cache::{IssueCache, IssueSource, JsonFileStore, MemoryStore, OfflineSource, SnapshotStore, VideoCache, VideoSource};
pub use config::Config;
pub use convert::{ConversionReport, ReviewConverter};
pub use error::{Error, Result};
pub use feedback::{FeedbackCollector, IssueTimeline, TimelineSource};
pub use model::{
    ApiReviewDecision, ApiReviewIssue, ApiReviewItem, ApiReviewLabel, ApiReviewSummary, ApiReviewVideo, IssueRef,
    RepoName,
};
pub use secrets::Secrets;
pub use timeline::{ReviewWindow, TimelineEvent, TimelineEventKind};
