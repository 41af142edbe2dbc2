//! Review outcome resolution from an issue timeline
//!
//! The tracker records review decisions as label changes and close/reopen
//! events. [`OutcomeState`] folds a sorted event sequence into at most one
//! decision:
//!
//! | Event | Effect |
//! |-------|--------|
//! | `api-ready-for-review` labeled | drop the tentative outcome, set the ready marker |
//! | `api-approved` labeled | tentative outcome = Approved, clear the ready marker |
//! | `api-needs-work` labeled | only while ready: tentative outcome = NeedsWork, clear the ready marker |
//! | reopened | drop a pending rejection |
//! | closed | only while ready: pending rejection = Rejected |
//!
//! A pending rejection overrides the tentative outcome. Label names compare
//! case-insensitively.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{ApiReviewDecision, API_APPROVED, API_NEEDS_WORK, API_READY_FOR_REVIEW};

/// What happened on an issue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TimelineEventKind {
    Labeled { label: String },
    Reopened,
    Closed,
    Commented { id: String, body: String, url: String },
}

/// One entry of an issue timeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEvent {
    pub actor: String,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: TimelineEventKind,
}

impl TimelineEvent {
    pub fn new(actor: impl Into<String>, created_at: DateTime<Utc>, kind: TimelineEventKind) -> Self {
        Self {
            actor: actor.into(),
            created_at,
            kind,
        }
    }
}

/// Inclusive time range being summarized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReviewWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl ReviewWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, time: DateTime<Utc>) -> bool {
        self.start <= time && time <= self.end
    }
}

/// A decision and who made it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewOutcome {
    pub decision: ApiReviewDecision,
    pub decision_maker: String,
    pub decided_at: DateTime<Utc>,
}

impl ReviewOutcome {
    fn from_event(decision: ApiReviewDecision, event: &TimelineEvent) -> Self {
        Self {
            decision,
            decision_maker: event.actor.clone(),
            decided_at: event.created_at,
        }
    }
}

/// Rolling state of the outcome fold
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutcomeState {
    /// Time of the ready-for-review label not yet turned into a decision
    pub ready_since: Option<DateTime<Utc>>,
    pub current: Option<ReviewOutcome>,
    pub rejection: Option<ReviewOutcome>,
}

impl OutcomeState {
    pub fn apply(&mut self, event: &TimelineEvent) {
        match &event.kind {
            TimelineEventKind::Labeled { label } if label.eq_ignore_ascii_case(API_READY_FOR_REVIEW) => {
                self.current = None;
                self.ready_since = Some(event.created_at);
            }
            TimelineEventKind::Labeled { label } if label.eq_ignore_ascii_case(API_APPROVED) => {
                self.current = Some(ReviewOutcome::from_event(ApiReviewDecision::Approved, event));
                self.ready_since = None;
            }
            TimelineEventKind::Labeled { label } if label.eq_ignore_ascii_case(API_NEEDS_WORK) => {
                if self.ready_since.take().is_some() {
                    self.current =
                        Some(ReviewOutcome::from_event(ApiReviewDecision::NeedsWork, event));
                }
            }
            TimelineEventKind::Reopened => self.rejection = None,
            TimelineEventKind::Closed => {
                if self.ready_since.is_some() {
                    self.rejection =
                        Some(ReviewOutcome::from_event(ApiReviewDecision::Rejected, event));
                }
            }
            TimelineEventKind::Labeled { .. } | TimelineEventKind::Commented { .. } => {}
        }
    }

    /// Final outcome, if it was decided inside `window`
    pub fn finish(self, window: &ReviewWindow) -> Option<ReviewOutcome> {
        let outcome = self.rejection.or(self.current)?;
        window.contains(outcome.decided_at).then_some(outcome)
    }
}

/// Resolve the review outcome of one issue within `window`
///
/// Events after the end of the window are ignored. Events are ordered by
/// time; the order of events sharing a timestamp is kept as given.
pub fn resolve_outcome(events: &[TimelineEvent], window: &ReviewWindow) -> Option<ReviewOutcome> {
    let mut relevant: Vec<&TimelineEvent> = events
        .iter()
        .filter(|e| e.created_at <= window.end)
        .collect();
    relevant.sort_by_key(|e| e.created_at);

    let mut state = OutcomeState::default();
    for event in relevant {
        state.apply(event);
    }
    state.finish(window)
}
