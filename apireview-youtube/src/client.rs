//! YouTube Data API client

use crate::{Error, Result};
use apireview_core::{ApiReviewVideo, Secrets, VideoSource};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info};

const API_BASE: &str = "https://www.googleapis.com/youtube/v3";

/// Playlist holding the quick review recordings
pub const DEFAULT_PLAYLIST: &str = "PL1rZQsJPBU2S49OQPjupSJF-qeIEz9_ju";

/// The videos endpoint accepts at most this many ids per request
const MAX_IDS_PER_REQUEST: usize = 50;

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct ListResponse<T> {
    #[serde(default)]
    items: Vec<T>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: u16,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoResource {
    id: String,
    snippet: Snippet,
    live_streaming_details: Option<LiveStreamingDetails>,
}

#[derive(Debug, Deserialize)]
struct Snippet {
    title: String,
    #[serde(default)]
    thumbnails: Thumbnails,
}

#[derive(Debug, Default, Deserialize)]
struct Thumbnails {
    medium: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LiveStreamingDetails {
    actual_start_time: Option<DateTime<Utc>>,
    actual_end_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItem {
    content_details: PlaylistItemDetails,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemDetails {
    video_id: String,
}

impl VideoResource {
    /// Recording record, or `None` for uploads and unfinished streams
    fn into_video(self) -> Option<ApiReviewVideo> {
        let details = self.live_streaming_details?;
        Some(ApiReviewVideo {
            id: self.id,
            start_date_time: details.actual_start_time?,
            end_date_time: details.actual_end_time?,
            title: self.snippet.title,
            thumbnail_url: self.snippet.thumbnails.medium.map(|t| t.url),
        })
    }
}

/// YouTube Data API client authenticated with an API key
pub struct YouTubeClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl YouTubeClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("apireview/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            api_key: api_key.into(),
            base_url: API_BASE.to_string(),
        })
    }

    /// Create a client from loaded secrets
    ///
    /// The key is taken from YOUTUBE_API_KEY or ~/.config/apireview/secrets.toml.
    pub fn from_secrets(secrets: &Secrets) -> Result<Self> {
        let key = secrets.youtube_api_key().ok_or_else(|| {
            Error::Auth(
                "YouTube API key not found. Set YOUTUBE_API_KEY environment variable \
                 or add api_key to ~/.config/apireview/secrets.toml"
                    .to_string(),
            )
        })?;
        Self::new(key)
    }

    /// Finished recordings among `ids`, in response order
    pub async fn get_videos(&self, ids: &[String]) -> Result<Vec<ApiReviewVideo>> {
        let mut videos = Vec::new();

        for chunk in ids.chunks(MAX_IDS_PER_REQUEST) {
            let id = chunk.join(",");
            debug!(count = chunk.len(), "Fetching video details");

            let response: ListResponse<VideoResource> = self
                .get(
                    "videos",
                    &[("part", "snippet,liveStreamingDetails"), ("id", id.as_str())],
                )
                .await?;
            videos.extend(response.items.into_iter().filter_map(VideoResource::into_video));
        }

        Ok(videos)
    }

    /// All finished recordings in a playlist, ordered by start time
    pub async fn playlist_videos(&self, playlist_id: &str) -> Result<Vec<ApiReviewVideo>> {
        let mut ids = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![
                ("part", "contentDetails"),
                ("playlistId", playlist_id),
                ("maxResults", "50"),
            ];
            if let Some(token) = page_token.as_deref() {
                query.push(("pageToken", token));
            }

            let response: ListResponse<PlaylistItem> = self.get("playlistItems", &query).await?;
            ids.extend(response.items.into_iter().map(|i| i.content_details.video_id));

            match response.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        let mut videos = self.get_videos(&ids).await?;
        videos.sort_by(|a, b| a.start_date_time.cmp(&b.start_date_time));

        info!(playlist_id, items = ids.len(), recordings = videos.len(), "Listed playlist");
        Ok(videos)
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: &str, query: &[(&str, &str)]) -> Result<T> {
        let response = self
            .http
            .get(format!("{}/{}", self.base_url, endpoint))
            .query(query)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        parse_body(status.as_u16(), &body)
    }
}

fn parse_body<T: DeserializeOwned>(status: u16, body: &str) -> Result<T> {
    if !(200..300).contains(&status) {
        let (code, message) = match serde_json::from_str::<ErrorResponse>(body) {
            Ok(err) => (err.error.code, err.error.message),
            Err(_) => (status, body.to_string()),
        };
        return Err(match code {
            401 | 403 => Error::Auth(message),
            _ => Error::Api { code, message },
        });
    }

    serde_json::from_str(body).map_err(|e| Error::Parse(format!("Failed to parse response: {}", e)))
}

#[async_trait]
impl VideoSource for YouTubeClient {
    async fn fetch_video(&self, id: &str) -> apireview_core::Result<Option<ApiReviewVideo>> {
        let mut videos = self.get_videos(&[id.to_string()]).await?;
        Ok(videos.pop())
    }
}

impl std::fmt::Debug for YouTubeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YouTubeClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIDEOS_RESPONSE: &str = r#"{
        "kind": "youtube#videoListResponse",
        "items": [
            {
                "id": "R5G4scTRRNQ",
                "snippet": {
                    "title": "GitHub Quick Reviews",
                    "thumbnails": {
                        "default": { "url": "https://i.ytimg.com/vi/R5G4scTRRNQ/default.jpg" },
                        "medium": { "url": "https://i.ytimg.com/vi/R5G4scTRRNQ/mqdefault.jpg" }
                    }
                },
                "liveStreamingDetails": {
                    "actualStartTime": "2020-03-03T17:02:11Z",
                    "actualEndTime": "2020-03-03T19:01:40Z"
                }
            },
            {
                "id": "upcoming1",
                "snippet": { "title": "Scheduled", "thumbnails": {} },
                "liveStreamingDetails": { "scheduledStartTime": "2030-01-01T17:00:00Z" }
            },
            {
                "id": "upload1",
                "snippet": { "title": "Plain upload" }
            }
        ]
    }"#;

    #[test]
    fn test_only_finished_streams_are_recordings() {
        let response: ListResponse<VideoResource> = parse_body(200, VIDEOS_RESPONSE).unwrap();
        let videos: Vec<_> = response
            .items
            .into_iter()
            .filter_map(VideoResource::into_video)
            .collect();

        assert_eq!(videos.len(), 1);
        let video = &videos[0];
        assert_eq!(video.id, "R5G4scTRRNQ");
        assert_eq!(video.title, "GitHub Quick Reviews");
        assert_eq!(
            video.thumbnail_url.as_deref(),
            Some("https://i.ytimg.com/vi/R5G4scTRRNQ/mqdefault.jpg")
        );
        assert_eq!(video.start_date_time.to_rfc3339(), "2020-03-03T17:02:11+00:00");
    }

    #[test]
    fn test_playlist_page() {
        let response: ListResponse<PlaylistItem> = parse_body(
            200,
            r#"{ "nextPageToken": "CAUQAA",
                 "items": [ { "contentDetails": { "videoId": "a" } }, { "contentDetails": { "videoId": "b" } } ] }"#,
        )
        .unwrap();
        assert_eq!(response.next_page_token.as_deref(), Some("CAUQAA"));
        let ids: Vec<_> = response.items.into_iter().map(|i| i.content_details.video_id).collect();
        assert_eq!(ids, ["a", "b"]);
    }

    #[test]
    fn test_api_errors() {
        let err = parse_body::<ListResponse<PlaylistItem>>(
            403,
            r#"{ "error": { "code": 403, "message": "API key not valid" } }"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Auth(ref m) if m == "API key not valid"));

        let err = parse_body::<ListResponse<PlaylistItem>>(500, "backend error").unwrap_err();
        assert!(matches!(err, Error::Api { code: 500, .. }));
    }

    #[test]
    fn test_missing_key_is_auth_error() {
        let secrets = Secrets::default();
        // Environment may provide a key; only check the error path when it doesn't
        if secrets.youtube_api_key().is_none() {
            assert!(matches!(YouTubeClient::from_secrets(&secrets), Err(Error::Auth(_))));
        }
    }
}
