use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use songbird::input::Input;

use crate::infrastructure::audio::AudioSource;
use crate::infrastructure::youtube::YouTubeClient;
use crate::services::resolver::{ResolveError, Resolved, StreamError, TrackResolver};

static YOUTUBE_VIDEO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:youtube\.com/watch\?(?:.*&)?v=|youtu\.be/|youtube\.com/shorts/)([A-Za-z0-9_-]{11})",
    )
    .unwrap()
});

static YOUTUBE_PLAYLIST_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"youtube\.com/.*[?&]list=([A-Za-z0-9_-]+)").unwrap());

#[derive(Debug, PartialEq, Eq)]
enum Query<'a> {
    Playlist(&'a str),
    Video(&'a str),
    Search(&'a str),
}

/// Playlist links win over the video they were opened from.
fn classify(query: &str) -> Query<'_> {
    if let Some(caps) = YOUTUBE_PLAYLIST_RE.captures(query) {
        if let Some(id) = caps.get(1) {
            return Query::Playlist(id.as_str());
        }
    }
    if let Some(caps) = YOUTUBE_VIDEO_RE.captures(query) {
        if let Some(id) = caps.get(1) {
            return Query::Video(id.as_str());
        }
    }
    Query::Search(query.trim())
}

pub struct YoutubeResolver {
    http: Client,
    youtube: YouTubeClient,
}

impl YoutubeResolver {
    pub fn new(http: Client, api_key: String) -> Self {
        Self {
            youtube: YouTubeClient::new(http.clone(), api_key),
            http,
        }
    }
}

#[async_trait]
impl TrackResolver for YoutubeResolver {
    type Stream = Input;

    async fn resolve(&self, query: &str) -> Result<Resolved, ResolveError> {
        match classify(query) {
            Query::Playlist(id) => {
                let (title, tracks) = self.youtube.get_playlist(id).await?;
                if tracks.is_empty() {
                    return Err(ResolveError::NotFound);
                }
                Ok(Resolved::Playlist { title, tracks })
            }
            Query::Video(id) => self.youtube.get_video(id).await.map(Resolved::Track),
            Query::Search("") => Err(ResolveError::NotFound),
            Query::Search(terms) => self.youtube.search_first(terms).await.map(Resolved::Track),
        }
    }

    async fn open_stream(&self, locator: &str) -> Result<Input, StreamError> {
        AudioSource::open(self.http.clone(), locator).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognises_video_links() {
        assert_eq!(
            classify("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
            Query::Video("dQw4w9WgXcQ")
        );
        assert_eq!(
            classify("https://youtu.be/dQw4w9WgXcQ?t=10"),
            Query::Video("dQw4w9WgXcQ")
        );
        assert_eq!(
            classify("https://youtube.com/shorts/dQw4w9WgXcQ"),
            Query::Video("dQw4w9WgXcQ")
        );
        assert_eq!(
            classify("https://www.youtube.com/watch?feature=share&v=dQw4w9WgXcQ"),
            Query::Video("dQw4w9WgXcQ")
        );
    }

    #[test]
    fn playlist_takes_precedence() {
        assert_eq!(
            classify("https://www.youtube.com/watch?v=dQw4w9WgXcQ&list=PL1234abcd"),
            Query::Playlist("PL1234abcd")
        );
        assert_eq!(
            classify("https://www.youtube.com/playlist?list=PL1234abcd"),
            Query::Playlist("PL1234abcd")
        );
    }

    #[test]
    fn everything_else_is_a_search() {
        assert_eq!(
            classify("  never gonna give you up "),
            Query::Search("never gonna give you up")
        );
        assert_eq!(
            classify("https://example.com/watch?v=dQw4w9WgXcQ"),
            Query::Search("https://example.com/watch?v=dQw4w9WgXcQ")
        );
    }
}
