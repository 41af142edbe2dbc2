//! Quick-review notes: discovery, parsing and rendering

mod parser;
mod render;

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::model::ParsedReviewSummary;
use crate::{Error, Result};

pub use parser::{parse_issue_url, parse_items, parse_video_url, review_date, Link, StatusLine};
pub use render::{notes_path, render_items, render_notes, status_line, video_description};

/// Find notes files under `root`, in path order
///
/// Only files following the `YYYY/MM-DD-quick-reviews/README.md` layout are
/// returned; unreadable directory entries are logged and skipped.
pub fn discover(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(Error::Config(format!(
            "Notes directory not found: {}",
            root.display()
        )));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "Error accessing notes entry");
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        if review_date(relative).is_some() {
            files.push(entry.path().to_path_buf());
        }
    }

    debug!(root = %root.display(), count = files.len(), "Discovered notes files");
    Ok(files)
}

/// Parse one notes file
///
/// Returns `Ok(None)` if the path doesn't follow the notes layout relative
/// to `root`. Invalid UTF-8 is replaced rather than rejected.
pub fn read_notes(root: &Path, path: &Path) -> Result<Option<ParsedReviewSummary>> {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let Some(date) = review_date(relative) else {
        return Ok(None);
    };

    let bytes = std::fs::read(path)?;
    let content = match String::from_utf8(bytes) {
        Ok(content) => content,
        Err(e) => {
            warn!(path = %path.display(), error = %e.utf8_error(), "Notes file is not valid UTF-8");
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }
    };
    let items = parse_items(&content);
    debug!(path = %path.display(), items = items.len(), "Parsed notes file");

    Ok(Some(ParsedReviewSummary {
        path: path.to_path_buf(),
        date,
        items,
    }))
}

/// Parse every notes file under `root`
///
/// Files that can't be read are logged and left out.
pub fn index(root: &Path) -> Result<Vec<ParsedReviewSummary>> {
    let mut summaries = Vec::new();
    for path in discover(root)? {
        match read_notes(root, &path) {
            Ok(Some(summary)) => summaries.push(summary),
            Ok(None) => {}
            Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable notes file"),
        }
    }
    Ok(summaries)
}
