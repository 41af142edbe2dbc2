//! The review index: the pipeline's output file, and statistics over it

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::model::{ApiReviewSummary, ParsedReviewSummary};
use crate::Result;

/// Write summaries as a JSON array, replacing any existing index
pub fn write_index(path: &Path, summaries: &[ApiReviewSummary]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(summaries)?)?;
    info!(path = %path.display(), summaries = summaries.len(), "Wrote review index");
    Ok(())
}

pub fn read_index(path: &Path) -> Result<Vec<ApiReviewSummary>> {
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

/// Figures about a set of parsed notes files
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IndexStats {
    pub repos: usize,
    pub issues: usize,
    pub reviews: usize,
    pub review_items: usize,
    pub avg_items_per_review: f64,
    pub apis: usize,
    /// Time between the first and the last review
    pub span_years: f64,
    /// Sessions are two hours long
    pub hours_in_review: usize,
    /// Code block languages that were seen but not indexed
    pub other_languages: BTreeSet<String>,
}

impl IndexStats {
    pub fn from_parsed(reviews: &[ParsedReviewSummary]) -> Self {
        let items = || reviews.iter().flat_map(|r| r.items.iter());

        let repos: HashSet<(&str, &str)> = items()
            .map(|i| (i.issue.owner.as_str(), i.issue.repo.as_str()))
            .collect();
        let issues: HashSet<_> = items().map(|i| &i.issue).collect();
        let apis: HashSet<&str> = items()
            .flat_map(|i| i.apis.iter().map(String::as_str))
            .collect();
        let other_languages = items()
            .flat_map(|i| i.other_languages.iter().cloned())
            .collect();

        let review_items = items().count();
        let avg_items_per_review = if reviews.is_empty() {
            0.0
        } else {
            review_items as f64 / reviews.len() as f64
        };

        let dates = reviews.iter().map(|r| r.date);
        let span_years = match (dates.clone().min(), dates.max()) {
            (Some(first), Some(last)) => (last - first).num_days() as f64 / 365.0,
            _ => 0.0,
        };

        Self {
            repos: repos.len(),
            issues: issues.len(),
            reviews: reviews.len(),
            review_items,
            avg_items_per_review,
            apis: apis.len(),
            span_years,
            hours_in_review: reviews.len() * 2,
            other_languages,
        }
    }
}

impl fmt::Display for IndexStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "   Number of repos        : {}", self.repos)?;
        writeln!(f, "   Number of issues       : {}", self.issues)?;
        writeln!(f, "   Number of reviews      : {}", self.reviews)?;
        writeln!(f, "   Number of review items : {}", self.review_items)?;
        writeln!(f, "   Avg items per review   : {:.1}", self.avg_items_per_review)?;
        writeln!(f, "   Number of APIs         : {}", self.apis)?;
        writeln!(f, "   Doing reviews for      : {:.1} years", self.span_years)?;
        writeln!(f, "   Time spent in reviews  : {} hours", self.hours_in_review)?;
        if !self.other_languages.is_empty() {
            let languages: Vec<&str> = self.other_languages.iter().map(String::as_str).collect();
            writeln!(f, "   Other languages        : {}", languages.join(", "))?;
        }
        Ok(())
    }
}
