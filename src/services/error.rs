use crate::domain::queue::QueueFull;
use crate::services::resolver::{ResolveError, StreamError};
use crate::services::transport::TransportError;

#[derive(Debug, thiserror::Error)]
pub enum MusicError {
    #[error("You must be in a voice channel")]
    NotInVoiceChannel,
    #[error("This command must be used in a server")]
    NotInGuild,
    #[error("I'm not connected to a voice channel")]
    NotConnected,
    #[error(transparent)]
    QueueFull(#[from] QueueFull),
    #[error("{0}")]
    InvalidState(&'static str),
    #[error(transparent)]
    ResolveFailure(#[from] ResolveError),
    #[error("Could not open the audio stream: {0}")]
    StreamFailure(#[from] StreamError),
    #[error("Voice connection failed: {0}")]
    TransportFailure(#[from] TransportError),
}
