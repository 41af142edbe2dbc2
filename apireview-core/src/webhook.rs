//! Relevance check for tracker webhook deliveries
//!
//! A delivery is relevant when its action can change review state and an
//! API review label is involved, either as the label being (un)applied or
//! on the issue or pull request itself.

use serde::Deserialize;

use crate::model::{API_APPROVED, API_NEEDS_WORK, API_READY_FOR_REVIEW};
use crate::Result;

const RELEVANT_ACTIONS: &[&str] = &[
    "opened",
    "edited",
    "deleted",
    "closed",
    "reopened",
    "assigned",
    "unassigned",
    "labeled",
    "unlabeled",
    "transferred",
    "milestoned",
    "demilestoned",
];

const RELEVANT_LABELS: &[&str] = &[API_READY_FOR_REVIEW, API_APPROVED, API_NEEDS_WORK];

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookLabel {
    pub name: Option<String>,
}

/// Issue or pull request carried by a delivery
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LabeledEntity {
    #[serde(default)]
    pub labels: Option<Vec<WebhookLabel>>,
}

/// The fields of a delivery that decide relevance; everything else is ignored
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookPayload {
    pub action: Option<String>,
    pub issue: Option<LabeledEntity>,
    pub pull_request: Option<LabeledEntity>,
    pub label: Option<WebhookLabel>,
}

impl WebhookPayload {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

fn is_relevant_label(label: &WebhookLabel) -> bool {
    label
        .name
        .as_deref()
        .is_some_and(|name| RELEVANT_LABELS.iter().any(|l| l.eq_ignore_ascii_case(name)))
}

fn has_relevant_label(entity: Option<&LabeledEntity>) -> bool {
    entity
        .and_then(|e| e.labels.as_deref())
        .is_some_and(|labels| labels.iter().any(is_relevant_label))
}

/// Whether a delivery may change the review state of an issue
pub fn is_relevant(payload: &WebhookPayload) -> bool {
    let action_matches = payload
        .action
        .as_deref()
        .is_some_and(|action| RELEVANT_ACTIONS.iter().any(|a| a.eq_ignore_ascii_case(action)));
    if !action_matches {
        return false;
    }

    payload.label.as_ref().is_some_and(is_relevant_label)
        || has_relevant_label(payload.issue.as_ref())
        || has_relevant_label(payload.pull_request.as_ref())
}
