//! Issue and video caches
//!
//! Both caches keep every record they have ever fetched in a snapshot (by
//! default a JSON file) and only go to the remote source on a miss. After
//! each miss the full snapshot is rewritten. A cache instance holds its lock
//! across the remote fetch, so concurrent misses are serialized and the
//! snapshot has a single writer.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::model::{ApiReviewIssue, ApiReviewVideo, IssueRef};
use crate::{Error, Result};

/// Remote lookup of tracker issues
#[async_trait]
pub trait IssueSource: Send + Sync {
    async fn fetch_issue(&self, issue: &IssueRef) -> Result<ApiReviewIssue>;
}

/// Remote lookup of recorded sessions
#[async_trait]
pub trait VideoSource: Send + Sync {
    /// `Ok(None)` if the video doesn't exist or isn't a finished recording
    async fn fetch_video(&self, id: &str) -> Result<Option<ApiReviewVideo>>;
}

/// Source that refuses every fetch, for running from snapshots only
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineSource;

#[async_trait]
impl IssueSource for OfflineSource {
    async fn fetch_issue(&self, issue: &IssueRef) -> Result<ApiReviewIssue> {
        Err(Error::Remote(format!("Issue {issue} is not cached (offline)")))
    }
}

#[async_trait]
impl VideoSource for OfflineSource {
    async fn fetch_video(&self, id: &str) -> Result<Option<ApiReviewVideo>> {
        Err(Error::Remote(format!("Video {id} is not cached (offline)")))
    }
}

/// Persistent storage for a cache snapshot
pub trait SnapshotStore<T>: Send + Sync {
    /// All stored records; empty if nothing was stored yet
    fn load(&self) -> Result<Vec<T>>;

    /// Replace the stored records
    fn save(&self, records: &[T]) -> Result<()>;
}

/// Snapshot stored as a pretty-printed JSON array
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<T> SnapshotStore<T> for JsonFileStore
where
    T: Serialize + DeserializeOwned,
{
    fn load(&self) -> Result<Vec<T>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let contents = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    fn save(&self, records: &[T]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // Write next to the target and rename so a failed write keeps the old snapshot
        let temp = self.path.with_extension("json.tmp");
        std::fs::write(&temp, serde_json::to_string_pretty(records)?)?;
        std::fs::rename(&temp, &self.path)?;
        Ok(())
    }
}

/// Snapshot kept in memory, for tests and dry runs
#[derive(Debug)]
pub struct MemoryStore<T> {
    records: std::sync::Mutex<Vec<T>>,
    saves: std::sync::atomic::AtomicUsize,
}

impl<T> Default for MemoryStore<T> {
    fn default() -> Self {
        Self {
            records: std::sync::Mutex::new(Vec::new()),
            saves: Default::default(),
        }
    }
}

impl<T: Clone> MemoryStore<T> {
    pub fn new(records: Vec<T>) -> Self {
        Self {
            records: std::sync::Mutex::new(records),
            saves: Default::default(),
        }
    }

    pub fn records(&self) -> Vec<T> {
        self.records
            .lock()
            .map(|r| r.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    /// Number of times the snapshot was written
    pub fn save_count(&self) -> usize {
        self.saves.load(std::sync::atomic::Ordering::SeqCst)
    }
}

impl<T: Clone + Send> SnapshotStore<T> for MemoryStore<T> {
    fn load(&self) -> Result<Vec<T>> {
        Ok(self.records())
    }

    fn save(&self, records: &[T]) -> Result<()> {
        let mut stored = self
            .records
            .lock()
            .map_err(|_| Error::Other("Snapshot lock poisoned".to_string()))?;
        *stored = records.to_vec();
        self.saves.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    }
}

impl<T: SnapshotStore<R> + ?Sized, R> SnapshotStore<R> for Arc<T> {
    fn load(&self) -> Result<Vec<R>> {
        (**self).load()
    }

    fn save(&self, records: &[R]) -> Result<()> {
        (**self).save(records)
    }
}

/// Tracker issues keyed by (owner, repo, number)
pub struct IssueCache {
    source: Arc<dyn IssueSource>,
    store: Box<dyn SnapshotStore<ApiReviewIssue>>,
    issues: Mutex<BTreeMap<IssueRef, ApiReviewIssue>>,
}

impl IssueCache {
    /// Open a cache over an existing snapshot
    pub fn open(
        source: Arc<dyn IssueSource>,
        store: Box<dyn SnapshotStore<ApiReviewIssue>>,
    ) -> Result<Self> {
        let issues: BTreeMap<_, _> = store
            .load()?
            .into_iter()
            .map(|issue| (issue.key(), issue))
            .collect();
        debug!(count = issues.len(), "Loaded issue cache");

        Ok(Self {
            source,
            store,
            issues: Mutex::new(issues),
        })
    }

    /// Get an issue, fetching and persisting it on a miss
    pub async fn get_issue(&self, issue: &IssueRef) -> Result<ApiReviewIssue> {
        let mut issues = self.issues.lock().await;
        if let Some(cached) = issues.get(issue) {
            return Ok(cached.clone());
        }

        info!(issue = %issue, "Loading issue");
        let fetched = self.source.fetch_issue(issue).await?;

        // Memory only changes once the snapshot holds the new record
        let mut snapshot: Vec<ApiReviewIssue> = issues.values().cloned().collect();
        snapshot.push(fetched.clone());
        snapshot.sort_by_key(ApiReviewIssue::key);
        self.store.save(&snapshot)?;

        issues.insert(issue.clone(), fetched.clone());
        Ok(fetched)
    }

    pub async fn len(&self) -> usize {
        self.issues.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Recorded sessions keyed by video id
pub struct VideoCache {
    source: Arc<dyn VideoSource>,
    store: Box<dyn SnapshotStore<ApiReviewVideo>>,
    videos: Mutex<BTreeMap<String, ApiReviewVideo>>,
}

impl VideoCache {
    /// Open a cache over an existing snapshot
    pub fn open(
        source: Arc<dyn VideoSource>,
        store: Box<dyn SnapshotStore<ApiReviewVideo>>,
    ) -> Result<Self> {
        let videos: BTreeMap<_, _> = store
            .load()?
            .into_iter()
            .map(|video| (video.id.clone(), video))
            .collect();
        debug!(count = videos.len(), "Loaded video cache");

        Ok(Self {
            source,
            store,
            videos: Mutex::new(videos),
        })
    }

    /// Look up a video, fetching and persisting it on a miss
    ///
    /// Videos the source doesn't know are not remembered, so a later run
    /// asks again.
    pub async fn load_video(&self, id: &str) -> Result<Option<ApiReviewVideo>> {
        let mut videos = self.videos.lock().await;
        if let Some(cached) = videos.get(id) {
            return Ok(Some(cached.clone()));
        }

        info!(video = id, "Loading video");
        let Some(fetched) = self.source.fetch_video(id).await? else {
            debug!(video = id, "Video not found");
            return Ok(None);
        };

        let snapshot = Self::snapshot(videos.values().chain(std::iter::once(&fetched)));
        self.store.save(&snapshot)?;

        videos.insert(fetched.id.clone(), fetched.clone());
        Ok(Some(fetched))
    }

    /// Add or replace videos obtained elsewhere, e.g. from a playlist
    pub async fn insert_all(&self, new_videos: Vec<ApiReviewVideo>) -> Result<usize> {
        let mut videos = self.videos.lock().await;
        let count = new_videos.len();
        let mut updated = videos.clone();
        for video in new_videos {
            updated.insert(video.id.clone(), video);
        }
        self.store.save(&Self::snapshot(updated.values()))?;

        *videos = updated;
        Ok(count)
    }

    /// All cached videos ordered by start time
    pub async fn videos(&self) -> Vec<ApiReviewVideo> {
        Self::snapshot(self.videos.lock().await.values())
    }

    fn snapshot<'a>(videos: impl Iterator<Item = &'a ApiReviewVideo>) -> Vec<ApiReviewVideo> {
        let mut snapshot: Vec<ApiReviewVideo> = videos.cloned().collect();
        snapshot.sort_by(|a, b| {
            a.start_date_time
                .cmp(&b.start_date_time)
                .then_with(|| a.id.cmp(&b.id))
        });
        snapshot
    }
}
