use reqwest::Client;
use serde::Deserialize;

use crate::domain::track::Track;
use crate::services::resolver::ResolveError;

const API_BASE: &str = "https://www.googleapis.com/youtube/v3";
const PAGE_LIMIT: u32 = 50;

#[derive(Deserialize)]
struct SearchResponse {
    items: Vec<SearchItem>,
}

#[derive(Deserialize)]
struct SearchItem {
    id: SearchId,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchId {
    video_id: Option<String>,
}

#[derive(Deserialize)]
struct VideosResponse {
    items: Vec<VideoItem>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoItem {
    id: String,
    snippet: Snippet,
    content_details: Option<ContentDetails>,
}

#[derive(Deserialize)]
struct PlaylistItemsResponse {
    items: Vec<PlaylistItem>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItem {
    content_details: PlaylistItemDetails,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemDetails {
    video_id: String,
}

#[derive(Deserialize)]
struct PlaylistsResponse {
    items: Vec<PlaylistInfo>,
}

#[derive(Deserialize)]
struct PlaylistInfo {
    snippet: PlaylistSnippet,
}

#[derive(Deserialize)]
struct PlaylistSnippet {
    title: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    title: String,
    channel_title: String,
    thumbnails: Option<Thumbnails>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContentDetails {
    duration: String,
}

#[derive(Deserialize)]
struct Thumbnails {
    high: Option<Thumbnail>,
    default: Option<Thumbnail>,
}

#[derive(Deserialize)]
struct Thumbnail {
    url: String,
}

/// Thin client over the YouTube Data API v3.
pub struct YouTubeClient {
    http: Client,
    api_key: String,
}

impl YouTubeClient {
    pub fn new(http: Client, api_key: String) -> Self {
        Self { http, api_key }
    }

    /// First search hit with its duration filled in.
    pub async fn search_first(&self, query: &str) -> Result<Track, ResolveError> {
        let search: SearchResponse = self
            .get(
                "search",
                &[
                    ("part", "snippet"),
                    ("type", "video"),
                    ("maxResults", "1"),
                    ("q", query),
                ],
            )
            .await?;

        let video_id = search
            .items
            .into_iter()
            .find_map(|item| item.id.video_id)
            .ok_or(ResolveError::NotFound)?;
        self.get_video(&video_id).await
    }

    pub async fn get_video(&self, video_id: &str) -> Result<Track, ResolveError> {
        self.get_videos(&[video_id.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or(ResolveError::NotFound)
    }

    /// Looks up to 50 videos in one request. Unavailable videos are left out.
    pub async fn get_videos(&self, video_ids: &[String]) -> Result<Vec<Track>, ResolveError> {
        if video_ids.is_empty() {
            return Ok(Vec::new());
        }

        let ids = video_ids.join(",");
        let videos: VideosResponse = self
            .get("videos", &[("part", "snippet,contentDetails"), ("id", ids.as_str())])
            .await?;

        Ok(videos.items.into_iter().map(video_to_track).collect())
    }

    /// Returns the playlist title and its first page of playable videos.
    pub async fn get_playlist(
        &self,
        playlist_id: &str,
    ) -> Result<(String, Vec<Track>), ResolveError> {
        let limit = PAGE_LIMIT.to_string();
        let info_params = [("part", "snippet"), ("id", playlist_id)];
        let items_params = [
            ("part", "contentDetails"),
            ("maxResults", limit.as_str()),
            ("playlistId", playlist_id),
        ];
        let (info, items) = tokio::join!(
            self.get::<PlaylistsResponse>("playlists", &info_params),
            self.get::<PlaylistItemsResponse>("playlistItems", &items_params),
        );

        let title = info?
            .items
            .into_iter()
            .next()
            .map(|p| p.snippet.title)
            .ok_or(ResolveError::NotFound)?;

        let video_ids: Vec<String> = items?
            .items
            .into_iter()
            .map(|item| item.content_details.video_id)
            .collect();

        let tracks = self.get_videos(&video_ids).await?;
        Ok((title, tracks))
    }

    async fn get<R: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<R, ResolveError> {
        let resp = self
            .http
            .get(format!("{API_BASE}/{endpoint}"))
            .query(params)
            .query(&[("key", &self.api_key)])
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                tracing::warn!(endpoint, "YouTube API request failed: {e}");
                ResolveError::Failed(format!("YouTube API request failed: {e}"))
            })?;

        resp.json().await.map_err(|e| {
            tracing::warn!(endpoint, "YouTube API parse failed: {e}");
            ResolveError::Failed(format!("unexpected YouTube API response: {e}"))
        })
    }
}

fn video_to_track(item: VideoItem) -> Track {
    let thumbnail = item
        .snippet
        .thumbnails
        .and_then(|t| t.high.or(t.default))
        .map(|t| t.url);
    let duration_secs = item
        .content_details
        .and_then(|d| parse_iso8601_duration(&d.duration))
        .unwrap_or(0);

    Track {
        title: item.snippet.title,
        locator: format!("https://www.youtube.com/watch?v={}", item.id),
        duration_secs,
        source_label: item.snippet.channel_title,
        thumbnail,
    }
}

/// Parses the `P#DT#H#M#S` form the Data API uses for video lengths.
fn parse_iso8601_duration(raw: &str) -> Option<u64> {
    let rest = raw.strip_prefix('P')?;
    let mut total = 0u64;
    let mut number = String::new();
    let mut in_time = false;

    for c in rest.chars() {
        match c {
            '0'..='9' => number.push(c),
            'T' if number.is_empty() => in_time = true,
            unit => {
                let value: u64 = number.parse().ok()?;
                number.clear();
                total += value
                    * match (unit, in_time) {
                        ('W', false) => 7 * 86_400,
                        ('D', false) => 86_400,
                        ('H', true) => 3_600,
                        ('M', true) => 60,
                        ('S', true) => 1,
                        _ => return None,
                    };
            }
        }
    }

    number.is_empty().then_some(total)
}
