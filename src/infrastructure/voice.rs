use std::sync::Arc;

use async_trait::async_trait;
use poise::serenity_prelude::GuildId;
use songbird::events::{CoreEvent, Event, EventContext, EventHandler, TrackEvent};
use songbird::input::Input;
use songbird::tracks::{Track, TrackHandle};
use songbird::{Call, Songbird};
use tokio::sync::Mutex;

use crate::domain::volume::Volume;
use crate::services::transport::{
    ConnectionState, EventSender, JoinParams, PlaybackId, TransportError, TransportEvent,
    VoiceConnection, VoiceTransport,
};

/// Joins voice channels through the songbird manager registered on the
/// serenity client.
pub struct SongbirdTransport {
    manager: Arc<Songbird>,
}

impl SongbirdTransport {
    pub fn new(manager: Arc<Songbird>) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl VoiceTransport for SongbirdTransport {
    type Stream = Input;
    type Connection = SongbirdConnection;

    async fn connect(
        &self,
        guild_id: GuildId,
        params: &JoinParams,
        events: EventSender,
    ) -> Result<SongbirdConnection, TransportError> {
        let call = match self.manager.join(guild_id, params.voice_channel).await {
            Ok(call) => call,
            Err(e) => {
                let _ = self.manager.remove(guild_id).await;
                return Err(TransportError(format!("could not join voice: {e}")));
            }
        };

        {
            let mut handler = call.lock().await;
            for event in [
                CoreEvent::DriverConnect,
                CoreEvent::DriverReconnect,
                CoreEvent::DriverDisconnect,
            ] {
                handler.add_global_event(
                    Event::Core(event),
                    ConnectionNotifier {
                        events: events.clone(),
                    },
                );
            }
        }

        Ok(SongbirdConnection {
            manager: self.manager.clone(),
            guild_id,
            call,
            current: None,
            events,
        })
    }
}

/// One guild's songbird call. The handle of the live track is kept here so
/// pause, volume and stop never go through the call's own queue.
pub struct SongbirdConnection {
    manager: Arc<Songbird>,
    guild_id: GuildId,
    call: Arc<Mutex<Call>>,
    current: Option<TrackHandle>,
    events: EventSender,
}

impl SongbirdConnection {
    fn current(&self) -> Result<&TrackHandle, TransportError> {
        self.current
            .as_ref()
            .ok_or_else(|| TransportError("no active track".to_string()))
    }
}

fn control_error(e: impl std::fmt::Display) -> TransportError {
    TransportError(e.to_string())
}

#[async_trait]
impl VoiceConnection for SongbirdConnection {
    type Stream = Input;

    async fn play(
        &mut self,
        stream: Input,
        playback: PlaybackId,
        volume: Volume,
    ) -> Result<(), TransportError> {
        let handle = {
            let mut call = self.call.lock().await;
            call.play_only(Track::from(stream).volume(volume.gain()))
        };

        handle
            .add_event(
                Event::Track(TrackEvent::End),
                TrackEndNotifier {
                    playback,
                    events: self.events.clone(),
                },
            )
            .map_err(control_error)?;
        handle
            .add_event(
                Event::Track(TrackEvent::Error),
                TrackErrorNotifier {
                    playback,
                    events: self.events.clone(),
                },
            )
            .map_err(control_error)?;

        self.current = Some(handle);
        Ok(())
    }

    async fn pause(&mut self) -> Result<(), TransportError> {
        self.current()?.pause().map_err(control_error)
    }

    async fn resume(&mut self) -> Result<(), TransportError> {
        self.current()?.play().map_err(control_error)
    }

    async fn stop(&mut self) {
        if let Some(handle) = self.current.take() {
            if let Err(e) = handle.stop() {
                tracing::debug!(guild_id = %self.guild_id, "track already stopped: {e}");
            }
        }
    }

    async fn set_volume(&mut self, volume: Volume) {
        if let Some(handle) = &self.current {
            if let Err(e) = handle.set_volume(volume.gain()) {
                tracing::warn!(guild_id = %self.guild_id, "failed to apply volume: {e}");
            }
        }
    }

    async fn disconnect(&mut self) {
        self.current = None;
        self.call.lock().await.remove_all_global_events();
        if let Err(e) = self.manager.remove(self.guild_id).await {
            tracing::warn!(guild_id = %self.guild_id, "failed to leave voice channel: {e}");
        }
    }
}

struct TrackEndNotifier {
    playback: PlaybackId,
    events: EventSender,
}

#[async_trait]
impl EventHandler for TrackEndNotifier {
    async fn act(&self, _ctx: &EventContext<'_>) -> Option<Event> {
        let _ = self.events.send(TransportEvent::TrackEnded(self.playback));
        None
    }
}

struct TrackErrorNotifier {
    playback: PlaybackId,
    events: EventSender,
}

#[async_trait]
impl EventHandler for TrackErrorNotifier {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        let reason = match ctx {
            EventContext::Track(tracks) => tracks
                .first()
                .map(|(state, _)| format!("{:?}", state.playing)),
            _ => None,
        };
        let reason = reason.unwrap_or_else(|| "unknown playback error".to_string());
        let _ = self
            .events
            .send(TransportEvent::TrackErrored(self.playback, reason));
        None
    }
}

struct ConnectionNotifier {
    events: EventSender,
}

#[async_trait]
impl EventHandler for ConnectionNotifier {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        let state = match ctx {
            EventContext::DriverConnect(_) | EventContext::DriverReconnect(_) => {
                ConnectionState::Ready
            }
            // songbird only leaves the reason empty for a requested leave.
            EventContext::DriverDisconnect(data) if data.reason.is_some() => {
                ConnectionState::Disconnected
            }
            EventContext::DriverDisconnect(_) => ConnectionState::Destroyed,
            _ => return None,
        };
        let _ = self.events.send(TransportEvent::Connection(state));
        None
    }
}
