use async_trait::async_trait;

use crate::domain::track::Track;

/// Result of turning a user query into something playable.
#[derive(Debug, Clone)]
pub enum Resolved {
    Track(Track),
    Playlist { title: String, tracks: Vec<Track> },
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("No results found for your query")]
    NotFound,
    #[error("Could not resolve your query: {0}")]
    Failed(String),
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct StreamError(pub String);

/// Looks tracks up and opens their audio streams. Stateless from the
/// session's point of view.
#[async_trait]
pub trait TrackResolver: Send + Sync {
    type Stream: Send + 'static;

    async fn resolve(&self, query: &str) -> Result<Resolved, ResolveError>;

    async fn open_stream(&self, locator: &str) -> Result<Self::Stream, StreamError>;
}
