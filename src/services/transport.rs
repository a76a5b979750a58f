use std::fmt;

use async_trait::async_trait;
use poise::serenity_prelude::{ChannelId, GuildId};
use tokio::sync::mpsc;

use crate::domain::volume::Volume;

/// Tags one `play` call so notifications from a stream that has since been
/// stopped or replaced can be told apart from the live one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PlaybackId(u64);

impl PlaybackId {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for PlaybackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Ready,
    /// Dropped by the network; the driver may still reconnect.
    Disconnected,
    /// Torn down on purpose; no reconnect will follow.
    Destroyed,
}

/// Inbound notifications from the transport, delivered in order to the
/// owning session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    TrackEnded(PlaybackId),
    TrackErrored(PlaybackId, String),
    Connection(ConnectionState),
}

pub type EventSender = mpsc::UnboundedSender<TransportEvent>;

#[derive(Debug, Clone, Copy)]
pub struct JoinParams {
    pub voice_channel: ChannelId,
    pub text_channel: ChannelId,
}

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct TransportError(pub String);

/// A live voice connection with a player subscribed to it. Owned by exactly
/// one session; nothing else holds a handle to it.
#[async_trait]
pub trait VoiceConnection: Send + 'static {
    type Stream: Send + 'static;

    async fn play(
        &mut self,
        stream: Self::Stream,
        playback: PlaybackId,
        volume: Volume,
    ) -> Result<(), TransportError>;

    async fn pause(&mut self) -> Result<(), TransportError>;

    async fn resume(&mut self) -> Result<(), TransportError>;

    /// Stops the live stream, if any.
    async fn stop(&mut self);

    async fn set_volume(&mut self, volume: Volume);

    async fn disconnect(&mut self);
}

#[async_trait]
pub trait VoiceTransport: Send + Sync + 'static {
    type Stream: Send + 'static;
    type Connection: VoiceConnection<Stream = Self::Stream>;

    /// Joins `params.voice_channel`. Track and connectivity notifications for
    /// the returned connection are sent on `events`.
    async fn connect(
        &self,
        guild_id: GuildId,
        params: &JoinParams,
        events: EventSender,
    ) -> Result<Self::Connection, TransportError>;
}
